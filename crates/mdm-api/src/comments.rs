//! Handlers for the two comment threads.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/requests/{id}/comments` | Requester or staff; body `{"text":"..."}` |
//! | `POST` | `/requests/{id}/internal-comments` | Staff only |
//!
//! Both return 201 as soon as the comment is stored. An advisory reply, when
//! enabled in the settings document, arrives later on the same thread.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use mdm_core::{
  advisor::Advisor,
  request::{Comment, CommentVisibility},
  store::RequestStore,
};
use mdm_engine::LifecycleEngine;
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, identity::CurrentUser, requests::parse_id};

#[derive(Debug, Deserialize)]
pub struct CommentBody {
  pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
  pub comment:            Comment,
  pub advisory_scheduled: bool,
}

async fn post_comment<S, A>(
  engine: LifecycleEngine<S, A>,
  actor: mdm_core::actor::Actor,
  id: String,
  text: String,
  visibility: CommentVisibility,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  let id = parse_id(&id)?;
  let settings = engine.store().get_settings().await.map_err(ApiError::store)?;
  let receipt = engine.add_comment(&id, &text, &actor, visibility, &settings.advisory).await?;
  Ok((
    StatusCode::CREATED,
    Json(CommentResponse {
      comment:            receipt.comment,
      advisory_scheduled: receipt.scheduled.is_some(),
    }),
  ))
}

/// `POST /requests/{id}/comments`
pub async fn create_public<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(actor): CurrentUser,
  Path(id): Path<String>,
  Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  post_comment(engine, actor, id, body.text, CommentVisibility::Public).await
}

/// `POST /requests/{id}/internal-comments`
pub async fn create_internal<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(actor): CurrentUser,
  Path(id): Path<String>,
  Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  post_comment(engine, actor, id, body.text, CommentVisibility::Internal).await
}
