//! `GET /api/controllers`: the controller directory, for administrators.

use axum::{Json, extract::State};
use turnos_core::{controller::Controller, store::ShiftStore};

use crate::{AppState, Result, auth::AdminController, error::Error};

pub async fn list<S>(
  State(state): State<AppState<S>>,
  AdminController(_admin): AdminController,
) -> Result<Json<Vec<Controller>>>
where
  S: ShiftStore + 'static,
{
  let controllers = state.store.list_controllers().await.map_err(Error::store)?;
  Ok(Json(controllers))
}
