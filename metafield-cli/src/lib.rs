//! Commands behind the `metafield` binary.
//!
//! A container is described by a JSON file:
//!
//! ```json
//! {
//!   "title": "Book Details",
//!   "record_type": "book",
//!   "fields": [
//!     { "name": "subtitle", "kind": "text" },
//!     { "name": "authors", "kind": "repeater",
//!       "groups": [ { "fields": [ { "name": "name", "kind": "text" } ] } ] }
//!   ]
//! }
//! ```
//!
//! Every `kind` is resolved through the default [`KindRegistry`], so the
//! aliases `groups` and `complex` work for group-sets.
//!
//! Tokens and stored rows must survive between runs: commands refuse to run
//! without a configured secret and database file where they need them.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use metafield_crypto::NonceService;
use metafield_model::{Container, ContainerRegistry, ContainerSettings, FieldSpec, KindRegistry, Storable};
use metafield_request::config::DATABASE_ENV;
use metafield_request::{ContainerService, MetafieldConfig, RequestContext, SaveOutcome};
use metafield_storage::SqliteMetaStore;
use metafield_types::OwnerId;
use serde::Deserialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "metafield")]
#[command(about = "Save and load nested custom fields")]
pub struct Args {
    /// Path to metafield.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a save token for a container
    Token {
        /// Container definition (JSON)
        #[arg(short, long)]
        schema: PathBuf,
    },
    /// Check a save token for a container
    Verify {
        #[arg(short, long)]
        schema: PathBuf,
        #[arg(short, long)]
        token: String,
    },
    /// Save a request body for a record
    Save {
        #[arg(short, long)]
        schema: PathBuf,
        #[arg(short, long)]
        owner: OwnerId,
        /// Request body (JSON): `{"params": {...}, "autosave": false}`
        #[arg(short, long)]
        request: PathBuf,
        /// Skip the token check and validation
        #[arg(long)]
        force: bool,
    },
    /// Print the stored fields of a record
    Load {
        #[arg(short, long)]
        schema: PathBuf,
        #[arg(short, long)]
        owner: OwnerId,
        /// Print the renderer snapshot instead of the stored entries
        #[arg(long)]
        render: bool,
    },
}

#[derive(Debug, Deserialize)]
struct ContainerFile {
    title: String,
    #[serde(flatten)]
    settings: ContainerSettings,
    fields: Vec<FieldSpec>,
}

/// Reads and registers a container definition.
pub fn load_container(path: &Path) -> Result<Container> {
    let contents = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file: ContainerFile =
        serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))?;
    let kinds = KindRegistry::default();
    let fields = file
        .fields
        .iter()
        .map(|spec| kinds.build(spec))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid fields in {}", path.display()))?;
    let mut container = Container::new(&file.title);
    container.setup(file.settings)?;
    let mut registry = ContainerRegistry::new();
    container
        .add_fields(&mut registry, fields)
        .with_context(|| format!("Invalid fields in {}", path.display()))?;
    Ok(container)
}

/// Loads the config file when given, defaults plus environment otherwise.
pub fn load_config(path: Option<&Path>) -> Result<MetafieldConfig> {
    let config = match path {
        Some(path) => MetafieldConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => MetafieldConfig::from_env()?,
    };
    Ok(config)
}

fn service(config: &MetafieldConfig, schema: &Path) -> Result<ContainerService<SqliteMetaStore>> {
    let container = load_container(schema)?;
    let store = config.open_store().context("Failed to open store")?;
    let nonces = config.nonce_service()?;
    Ok(ContainerService::new(container, store, Arc::new(nonces)))
}

/// Refuses commands whose tokens or rows would die with the process.
fn require_persistent(config: &MetafieldConfig, command: &Command) -> Result<()> {
    let needs_secret = match command {
        Command::Token { .. } | Command::Verify { .. } => true,
        Command::Save { force, .. } => !force,
        Command::Load { render, .. } => *render,
    };
    let needs_store = matches!(command, Command::Save { .. } | Command::Load { .. });
    if needs_secret && !config.has_persistent_secret() {
        bail!("no nonce secret configured: set nonce.secret or nonce.passphrase in metafield.toml");
    }
    if needs_store && !config.has_persistent_store() {
        bail!("no database configured: set storage.database_path in metafield.toml or {DATABASE_ENV}");
    }
    Ok(())
}

/// Runs one command, writing its output to `out`.
pub fn run(config: &MetafieldConfig, command: &Command, out: &mut impl Write) -> Result<()> {
    require_persistent(config, command)?;
    match command {
        Command::Token { schema } => {
            let service = service(config, schema)?;
            writeln!(out, "{}={}", service.container().nonce_name(), service.create_token())?;
        }
        Command::Verify { schema, token } => {
            let container = load_container(schema)?;
            let nonces = config.nonce_service()?;
            match nonces.verify_token(token, &container.nonce_name()) {
                Some(age) => writeln!(out, "valid ({age:?})")?,
                None => bail!("token is not valid for {}", container.nonce_name()),
            }
        }
        Command::Save {
            schema,
            owner,
            request,
            force,
        } => {
            let service = service(config, schema)?;
            let body =
                fs::read_to_string(request).with_context(|| format!("Failed to read {}", request.display()))?;
            let request = RequestContext::from_json(&body).context("Failed to parse request body")?;
            if *force {
                let summary = service.save(*owner, &request)?;
                writeln!(out, "saved: {} written, {} removed", summary.written, summary.removed)?;
                return Ok(());
            }
            match service.handle_save(*owner, &request)? {
                SaveOutcome::Saved(summary) => {
                    writeln!(out, "saved: {} written, {} removed", summary.written, summary.removed)?;
                }
                SaveOutcome::Skipped => bail!("save skipped: missing or invalid token"),
                SaveOutcome::Invalid(violations) => {
                    for violation in &violations {
                        writeln!(out, "{}: {}", violation.field, violation.message)?;
                    }
                    bail!("save refused: {} invalid fields", violations.len());
                }
            }
        }
        Command::Load { schema, owner, render } => {
            let service = service(config, schema)?;
            if *render {
                let data = service.render(*owner)?;
                writeln!(out, "{}", serde_json::to_string_pretty(&data)?)?;
                return Ok(());
            }
            let report = service.load(*owner)?;
            for field in &report.fields {
                for entry in field.storage_entries() {
                    writeln!(out, "{}\t{}", entry.key, entry.value)?;
                }
            }
            if !report.unknown_keys.is_empty() {
                info!("{} stored keys matched no field", report.unknown_keys.len());
            }
        }
    }
    Ok(())
}
