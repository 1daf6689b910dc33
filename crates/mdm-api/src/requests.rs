//! Handlers for `/requests` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/requests` | Filters: `requester_id`, `status`, `request_type`, `region`, `date_prefix`, `limit`, `offset` |
//! | `POST`   | `/requests` | Body: [`NewRequest`]; returns 201 + stored request |
//! | `GET`    | `/requests/{id}` | Requesters get the view without internal comments |
//! | `DELETE` | `/requests/{id}` | Administrators only; 204 |
//! | `PUT`    | `/requests/{id}/data` | Body: submitted data; requester only, while `Submitted` |
//! | `POST`   | `/requests/{id}/status` | Body: `{"status":"InProgress"}` |
//! | `POST`   | `/requests/{id}/status-suggestion` | Advisor's decision, not applied |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use mdm_core::{
  advisor::{Advisor, StatusDecision},
  request::{NewRequest, Request, RequestId},
  status::RequestStatus,
  store::{RequestQuery, RequestStore},
  submission::{Region, RequestType, SubmittedData},
};
use mdm_engine::LifecycleEngine;
use serde::Deserialize;

use crate::{error::ApiError, identity::CurrentUser};

pub(crate) fn parse_id(raw: &str) -> Result<RequestId, ApiError> {
  raw.parse().map_err(|e: mdm_core::Error| ApiError::BadRequest(e.to_string()))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub requester_id: Option<String>,
  pub status:       Option<RequestStatus>,
  pub request_type: Option<RequestType>,
  pub region:       Option<Region>,
  /// `YYYYMMDD`.
  pub date_prefix:  Option<String>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

impl From<ListParams> for RequestQuery {
  fn from(p: ListParams) -> Self {
    Self {
      requester_id: p.requester_id,
      status:       p.status,
      request_type: p.request_type,
      region:       p.region,
      date_prefix:  p.date_prefix,
      limit:        p.limit,
      offset:       p.offset,
    }
  }
}

/// `GET /requests[?status=...&region=...]`
pub async fn list<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(actor): CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Request>>, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  Ok(Json(engine.list_requests(&actor, params.into()).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /requests`
pub async fn create<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(actor): CurrentUser,
  Json(body): Json<NewRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  let settings = engine.store().get_settings().await.map_err(ApiError::store)?;
  let request = engine.create_request(&actor, body, &settings.submission).await?;
  Ok((StatusCode::CREATED, Json(request)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /requests/{id}`
pub async fn get_one<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(actor): CurrentUser,
  Path(id): Path<String>,
) -> Result<Json<Request>, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  let id = parse_id(&id)?;
  Ok(Json(engine.view_request(&id, &actor).await?))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /requests/{id}`: removes the whole document and cancels any
/// advisory pass still waiting to run against it.
pub async fn delete_one<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(actor): CurrentUser,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  let id = parse_id(&id)?;
  if !actor.is_admin() {
    return Err(ApiError::Forbidden("only administrators may delete requests".into()));
  }
  if !engine.store().delete_request(&id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("request {id} not found")));
  }
  let cancelled = engine.tasks().cancel_request(&id);
  tracing::info!(request_id = %id, actor = %actor.user_id, cancelled, "request deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Edit data ───────────────────────────────────────────────────────────────

/// `PUT /requests/{id}/data`
pub async fn update_data<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(actor): CurrentUser,
  Path(id): Path<String>,
  Json(data): Json<SubmittedData>,
) -> Result<Json<Request>, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  let id = parse_id(&id)?;
  let settings = engine.store().get_settings().await.map_err(ApiError::store)?;
  let request = engine.update_submitted_data(&id, &actor, data, &settings.submission).await?;
  Ok(Json(request.redacted_for_requester()))
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: RequestStatus,
}

/// `POST /requests/{id}/status`. Returns the request after the transition.
pub async fn transition<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(actor): CurrentUser,
  Path(id): Path<String>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Request>, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  let id = parse_id(&id)?;
  engine.transition(&id, body.status, &actor).await?;
  Ok(Json(engine.view_request(&id, &actor).await?))
}

/// `POST /requests/{id}/status-suggestion`
pub async fn suggest<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(actor): CurrentUser,
  Path(id): Path<String>,
) -> Result<Json<StatusDecision>, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  let id = parse_id(&id)?;
  Ok(Json(engine.suggest_status(&id, &actor).await?))
}
