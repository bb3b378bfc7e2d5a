use serde::Serialize;
use serde_json::{Value, json};

use crate::codec::{self, StorageEntry};
use crate::node::FieldNode;

/// Something that can be flattened into stored key/value entries.
pub trait Storable {
    fn storage_entries(&self) -> Vec<StorageEntry>;
}

/// Data handed to the rendering layer. The renderer owns all presentation
/// and UI state; it only receives this snapshot.
pub trait RenderSource {
    fn render_data(&self) -> Value;
}

/// Submission checks run before anything is persisted.
pub trait Validatable {
    /// Returns every violation found; empty means valid.
    fn validate(&self) -> Vec<Violation>;
}

/// One failed check, addressed by a readable path such as
/// `_repeater[0]._field1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Storable for FieldNode {
    fn storage_entries(&self) -> Vec<StorageEntry> {
        codec::storage_entries(self)
    }
}

impl RenderSource for FieldNode {
    fn render_data(&self) -> Value {
        let schema = self.schema();
        let mut data = json!({
            "name": self.name().as_str(),
            "base_name": self.name().base(),
            "type": self.kind().tag(),
            "label": schema.label(),
            "required": schema.is_required(),
        });
        if schema.is_complex() {
            let groups: Vec<Value> = self
                .values()
                .iter()
                .map(|group| {
                    json!({
                        "type": group.group_type().map(|t| t.as_str()),
                        "fields": group.fields().iter().map(|f| f.render_data()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            let group_types: Vec<Value> = schema
                .groups()
                .iter()
                .map(|g| json!(g.group_type().map(|t| t.as_str())))
                .collect();
            data["values"] = Value::Array(groups);
            data["group_types"] = Value::Array(group_types);
        } else {
            data["value"] = json!(self.value());
        }
        data
    }
}

impl Validatable for FieldNode {
    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        check(self, self.name().as_str(), &mut violations);
        violations
    }
}

fn check(node: &FieldNode, path: &str, out: &mut Vec<Violation>) {
    let required = node.schema().is_required();
    if !node.schema().is_complex() {
        let blank = node.value().is_none_or(|v| v.trim().is_empty());
        if required && blank {
            out.push(Violation {
                field: path.to_string(),
                message: "value is required".into(),
            });
        }
        return;
    }
    if required && node.values().is_empty() {
        out.push(Violation {
            field: path.to_string(),
            message: "at least one entry is required".into(),
        });
    }
    for (index, group) in node.values().iter().enumerate() {
        for field in group.fields() {
            check(field, &format!("{path}[{index}].{}", field.name()), out);
        }
    }
}
