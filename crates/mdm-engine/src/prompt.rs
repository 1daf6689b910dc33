//! Prompt text for the three advisor calls.

use mdm_core::{
  request::{Comment, Request},
  status::RequestStatus,
};
use strum::IntoEnumIterator as _;

const PERSONA: &str = "You are an assistant working with the Master Data Management (MDM) \
                       team. The team handles change requests for WBS elements, profit \
                       centers and cost centers.";

fn regions(request: &Request) -> String {
  let regions = request.regions();
  if regions.is_empty() {
    return request.region.to_string();
  }
  regions.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn summary(request: &Request) -> String {
  format!(
    "Request {id}\n- Type: {kind}\n- Region: {regions}\n- Status: {status}\n- Created: {created}",
    id = request.id,
    kind = request.request_type,
    regions = regions(request),
    status = request.status,
    created = request.created_at.to_rfc3339(),
  )
}

fn thread(comments: &[Comment]) -> String {
  if comments.is_empty() {
    return "(none)".to_owned();
  }
  comments
    .iter()
    .map(|c| format!("- {}: \"{}\"", c.user_name, c.text))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Reply to a requester's public comment.
pub fn public_reply(request: &Request, comment: &Comment) -> String {
  format!(
    "{PERSONA}\n\n\
     The requester has commented on their request. Write the team's reply.\n\n\
     {summary}\n\n\
     Requester's comment: \"{text}\"\n\n\
     Answer the comment helpfully and guide the requester through the request process. \
     Write as a member of the MDM team and do not mention being an AI. \
     Use no more than 2-3 sentences.",
    summary = summary(request),
    text = comment.text,
  )
}

/// Reply to a staff member's internal comment, with suggested next steps.
pub fn internal_reply(request: &Request, comment: &Comment) -> String {
  format!(
    "{PERSONA}\n\n\
     A team member has left an internal note on a request. Respond to it for the team.\n\n\
     {summary}\n- Requester: {requester}\n\n\
     Team member's note: \"{text}\"\n\n\
     Address the note and suggest concrete next steps where they make sense. \
     Point out any issues the team should consider. Keep it to 3-4 sentences.",
    summary = summary(request),
    requester = request.requester_email,
    text = comment.text,
  )
}

/// Ask for a structured `{shouldUpdate, newStatus, reason}` decision.
pub fn status_advisory(request: &Request) -> String {
  let data = serde_json::to_string(&request.submitted_data).unwrap_or_default();
  let history = request
    .history
    .iter()
    .map(|h| {
      format!(
        "- {} (by {}) at {}",
        h.status,
        h.changed_by_user_name,
        h.timestamp.to_rfc3339()
      )
    })
    .collect::<Vec<_>>()
    .join("\n");
  let statuses = RequestStatus::iter()
    .map(|s| format!("\"{s}\""))
    .collect::<Vec<_>>()
    .join(", ");

  format!(
    "{PERSONA}\n\n\
     Decide whether the status of the request below should change.\n\n\
     {summary}\n- Submitted data: {data}\n\n\
     Requester comments:\n{public}\n\n\
     Internal comments:\n{internal}\n\n\
     Status history:\n{history}\n\n\
     Allowed status values: {statuses}\n\n\
     Answer with a single JSON object and nothing else, using these fields:\n\
     - shouldUpdate: true or false\n\
     - newStatus: one of the allowed values, or null when no change is needed\n\
     - reason: a short explanation\n\n\
     Example: {{\"shouldUpdate\": true, \"newStatus\": \"Completed\", \"reason\": \"All \
     requested changes have been made\"}}\n\
     Example: {{\"shouldUpdate\": false, \"newStatus\": null, \"reason\": \"Still waiting on \
     the requester\"}}",
    summary = summary(request),
    public = thread(&request.comments),
    internal = thread(&request.internal_comments),
  )
}
