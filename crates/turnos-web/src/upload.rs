//! Roster upload: from the uploaded file to one committed import.

use axum::{
  Json,
  extract::{Multipart, State},
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use turnos_core::{import::ImportSummary, store::ShiftStore};

use crate::{AppState, Result, auth::AdminController, error::Error};

/// Parse `bytes` as a roster and import it into `store`.
///
/// The document is parsed completely before anything is written, so a
/// malformed file leaves the store untouched. The import itself runs in a
/// single transaction.
pub async fn process_file<S>(store: &S, bytes: Bytes, add_new: bool) -> Result<ImportSummary>
where
  S: ShiftStore,
{
  // PDF text extraction is CPU-bound.
  let roster = tokio::task::spawn_blocking(move || turnos_roster::parse(&bytes))
    .await
    .map_err(|e| Error::Internal(e.to_string()))??;

  info!(
    year = roster.year,
    month = roster.month,
    rows = roster.rows.len(),
    add_new,
    "importing roster",
  );
  store
    .import_roster(roster.into_entries(), add_new)
    .await
    .map_err(Error::store)
}

/// The confirmation shown after a successful upload.
pub fn success_message(summary: &ImportSummary) -> String {
  let (controllers, shifts) = summary.counts();
  format!(
    "Archivo cargado con éxito. Usuarios reconocidos: {controllers}, turnos agregados: {shifts}"
  )
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
  pub message: String,
  pub summary: ImportSummary,
}

/// Checkbox semantics: present and not explicitly false.
fn is_checked(value: &str) -> bool {
  !matches!(
    value.trim().to_ascii_lowercase().as_str(),
    "" | "0" | "false" | "off"
  )
}

/// `POST /upload`: multipart with a `file` part and an optional `add_new`.
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  AdminController(admin): AdminController,
  mut multipart: Multipart,
) -> Result<Json<UploadResponse>>
where
  S: ShiftStore + 'static,
{
  let mut file: Option<(String, Bytes)> = None;
  let mut add_new = false;

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| Error::BadRequest(e.body_text()))?
  {
    let name = field.name().map(str::to_owned);
    match name.as_deref() {
      Some("file") => {
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let data = field
          .bytes()
          .await
          .map_err(|e| Error::BadRequest(e.body_text()))?;
        // Browsers send an empty, unnamed part when nothing was chosen.
        if !file_name.is_empty() {
          file = Some((file_name, data));
        }
      }
      Some("add_new") => {
        let value = field
          .text()
          .await
          .map_err(|e| Error::BadRequest(e.body_text()))?;
        add_new = is_checked(&value);
      }
      _ => {}
    }
  }

  let (file_name, bytes) = file.ok_or(Error::NoFile)?;
  info!(admin = admin.id, file = %file_name, len = bytes.len(), add_new, "roster upload");

  let summary = process_file(state.store.as_ref(), bytes, add_new).await?;
  Ok(Json(UploadResponse { message: success_message(&summary), summary }))
}
