//! `GET /requests/{id}/events`: live changes to one request as Server-Sent
//! Events.
//!
//! Each event is named after the change (`created`, `status_changed`,
//! `comment_added`, `data_updated`, `deleted`) and carries the
//! [`RequestChange`] as JSON. Clients re-fetch the request to see the new
//! state. A `lagged` event means notifications were dropped. The stream ends
//! after `deleted`.

use axum::{
  extract::{Path, State},
  response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, stream};
use mdm_core::{
  advisor::Advisor,
  request::CommentVisibility,
  store::{ChangeKind, RequestChange, RequestStore, SubscriptionError},
};
use mdm_engine::LifecycleEngine;

use crate::{error::ApiError, identity::CurrentUser, requests::parse_id};

fn event_name(change: &ChangeKind) -> &'static str {
  match change {
    ChangeKind::Created => "created",
    ChangeKind::StatusChanged { .. } => "status_changed",
    ChangeKind::CommentAdded { .. } => "comment_added",
    ChangeKind::DataUpdated => "data_updated",
    ChangeKind::Deleted => "deleted",
  }
}

/// Requesters are not told that an internal comment exists.
fn visible_to(change: &RequestChange, staff: bool) -> bool {
  staff
    || !matches!(change.change, ChangeKind::CommentAdded {
      visibility: CommentVisibility::Internal,
    })
}

pub async fn stream<S, A>(
  State(engine): State<LifecycleEngine<S, A>>,
  CurrentUser(actor): CurrentUser,
  Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  let id = parse_id(&id)?;
  // Subscribe first so nothing committed after the access check is missed.
  let subscription = engine.store().subscribe(Some(id.clone()));
  engine.view_request(&id, &actor).await?;
  let staff = actor.is_staff();

  let events = stream::unfold(Some(subscription), move |state| async move {
    let mut sub = state?;
    loop {
      match sub.recv().await {
        Ok(change) if visible_to(&change, staff) => {
          let done = change.change == ChangeKind::Deleted;
          let event = Event::default().event(event_name(&change.change)).json_data(&change);
          return Some((event, (!done).then_some(sub)));
        }
        Ok(_) => continue,
        Err(SubscriptionError::Lagged(n)) => {
          let event = Event::default().event("lagged").data(n.to_string());
          return Some((Ok(event), Some(sub)));
        }
        Err(SubscriptionError::Closed) => return None,
      }
    }
  });

  Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
