//! `turnos` server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `TURNOS_*`
//! environment variables, opens the SQLite store and either serves the HTTP
//! API or runs one maintenance command and exits.
//!
//! ```text
//! turnos                          # serve
//! turnos import mayo.pdf --add-new
//! turnos export-controllers -o controladores.json
//! turnos import-controllers controladores.json
//! ```
//!
//! Logs go to stderr so exports written to stdout stay valid JSON.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use turnos_core::{controller::Controller, store::ShiftStore};
use turnos_store_sqlite::SqliteStore;
use turnos_web::{
  AppState, ServerConfig,
  auth::IdentityToolkitVerifier,
  upload::{process_file, success_message},
};

#[derive(Parser)]
#[command(author, version, about = "Controller shift roster server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (default).
  Serve,
  /// Import a roster file (PDF or text) into the store and exit.
  Import {
    file: PathBuf,
    /// Create controllers that are not in the store yet.
    #[arg(long)]
    add_new: bool,
  },
  /// Write the controller directory as JSON.
  ExportControllers {
    /// Output file; standard output when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Create or update controllers from a directory export.
  ImportControllers { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TURNOS"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, server_cfg).await,
    Command::Import { file, add_new } => import(&store, &file, add_new).await,
    Command::ExportControllers { output } => export_controllers(&store, output.as_deref()).await,
    Command::ImportControllers { file } => import_controllers(&store, &file).await,
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  if server_cfg.firebase_api_key.is_empty() {
    tracing::warn!("firebase_api_key is not set; logins will fail");
  }

  let verifier = IdentityToolkitVerifier::new(
    server_cfg.identity_endpoint.clone(),
    server_cfg.firebase_api_key.clone(),
  );
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  let state = AppState {
    store:    Arc::new(store),
    config:   Arc::new(server_cfg),
    verifier: Arc::new(verifier),
  };
  let app = turnos_web::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn import(store: &SqliteStore, file: &Path, add_new: bool) -> anyhow::Result<()> {
  let bytes = tokio::fs::read(file)
    .await
    .with_context(|| format!("failed to read {}", file.display()))?;

  let summary = process_file(store, Bytes::from(bytes), add_new)
    .await
    .with_context(|| format!("failed to import {}", file.display()))?;

  println!("{}", success_message(&summary));
  println!("{}", serde_json::to_string_pretty(&summary)?);
  Ok(())
}

async fn export_controllers(store: &SqliteStore, output: Option<&Path>) -> anyhow::Result<()> {
  let controllers = store
    .list_controllers()
    .await
    .context("failed to list controllers")?;
  let json = serde_json::to_string_pretty(&controllers)?;

  match output {
    Some(path) => tokio::fs::write(path, json)
      .await
      .with_context(|| format!("failed to write {}", path.display()))?,
    None => println!("{json}"),
  }
  tracing::info!(count = controllers.len(), "exported controllers");
  Ok(())
}

async fn import_controllers(store: &SqliteStore, file: &Path) -> anyhow::Result<()> {
  let json = tokio::fs::read_to_string(file)
    .await
    .with_context(|| format!("failed to read {}", file.display()))?;
  let records: Vec<Controller> = serde_json::from_str(&json)
    .with_context(|| format!("{} is not a controller directory export", file.display()))?;

  let summary = store
    .import_controllers(records)
    .await
    .with_context(|| format!("failed to import {}", file.display()))?;

  println!("{}", serde_json::to_string_pretty(&summary)?);
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
