//! Caller identity, forwarded by the upstream identity provider as headers.
//!
//! | Header | Required | Notes |
//! |--------|----------|-------|
//! | `x-user-id` | yes | |
//! | `x-user-email` | yes | |
//! | `x-user-name` | no | Display name; falls back to the email |
//! | `x-user-role` | yes | `controller`, `mdm` or `administrator` |

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use mdm_core::actor::{ASSISTANT_USER_ID, Actor, UserRole};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller. Present in a handler means the headers were
/// valid.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Actor);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

/// Build the caller's [`Actor`] from request headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
  let missing = |name: &str| ApiError::Unauthorized(format!("missing {name} header"));

  let user_id = header(headers, USER_ID_HEADER).ok_or_else(|| missing(USER_ID_HEADER))?;
  let email = header(headers, USER_EMAIL_HEADER).ok_or_else(|| missing(USER_EMAIL_HEADER))?;
  let role: UserRole = header(headers, USER_ROLE_HEADER)
    .ok_or_else(|| missing(USER_ROLE_HEADER))?
    .parse()
    .map_err(|_| ApiError::Unauthorized("unknown role".into()))?;

  if role == UserRole::Assistant || user_id == ASSISTANT_USER_ID {
    return Err(ApiError::Unauthorized("the assistant identity is reserved".into()));
  }

  Ok(Actor {
    user_id: user_id.to_owned(),
    email: email.to_owned(),
    display_name: header(headers, USER_NAME_HEADER).map(str::to_owned),
    role,
  })
}

impl<St> FromRequestParts<St> for CurrentUser
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
    actor_from_headers(&parts.headers).map(CurrentUser)
  }
}
