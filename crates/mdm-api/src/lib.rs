//! JSON REST API for the MDM request portal.
//!
//! Exposes an axum [`Router`] backed by a [`LifecycleEngine`]. Identity comes
//! from headers set by the upstream identity provider (see [`identity`]);
//! TLS and sign-in are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", mdm_api::api_router(engine.clone()))
//! ```

pub mod comments;
pub mod error;
pub mod events;
pub mod identity;
pub mod requests;
pub mod settings;

use axum::{
  Router,
  routing::{get, post, put},
};
use mdm_core::{advisor::Advisor, store::RequestStore};
use mdm_engine::LifecycleEngine;

pub use error::ApiError;
pub use identity::CurrentUser;

/// Build a fully-materialised API router for `engine`.
pub fn api_router<S, A>(engine: LifecycleEngine<S, A>) -> Router<()>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  Router::new()
    // Requests
    .route("/requests", get(requests::list::<S, A>).post(requests::create::<S, A>))
    .route(
      "/requests/{id}",
      get(requests::get_one::<S, A>).delete(requests::delete_one::<S, A>),
    )
    .route("/requests/{id}/data", put(requests::update_data::<S, A>))
    .route("/requests/{id}/status", post(requests::transition::<S, A>))
    .route("/requests/{id}/status-suggestion", post(requests::suggest::<S, A>))
    // Comments
    .route("/requests/{id}/comments", post(comments::create_public::<S, A>))
    .route("/requests/{id}/internal-comments", post(comments::create_internal::<S, A>))
    // Live updates
    .route("/requests/{id}/events", get(events::stream::<S, A>))
    // Settings
    .route("/settings", get(settings::get::<S, A>).put(settings::put::<S, A>))
    .with_state(engine)
}
