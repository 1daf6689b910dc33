//! Handlers for the system settings document.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/settings` | Any signed-in user |
//! | `PUT`  | `/settings` | Administrators only; replaces the whole document |

use axum::{Json, extract::State};
use mdm_core::{advisor::Advisor, settings::SystemSettings, store::RequestStore};
use mdm_engine::LifecycleEngine;

use crate::{error::ApiError, identity::CurrentUser};

/// `GET /settings`
pub async fn get<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(_actor): CurrentUser,
) -> Result<Json<SystemSettings>, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  Ok(Json(engine.store().get_settings().await.map_err(ApiError::store)?))
}

/// `PUT /settings`
pub async fn put<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(actor): CurrentUser,
  Json(settings): Json<SystemSettings>,
) -> Result<Json<SystemSettings>, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  if !actor.is_admin() {
    return Err(ApiError::Forbidden("only administrators may change settings".into()));
  }
  engine.store().put_settings(settings).await.map_err(ApiError::store)?;
  tracing::info!(actor = %actor.user_id, ?settings, "settings updated");
  Ok(Json(settings))
}
