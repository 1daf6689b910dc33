//! Engine tests against the in-memory SQLite store with scripted advisors.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use mdm_core::{
  actor::{ASSISTANT_ACTOR_NAME, ASSISTANT_COMMENT_NAME, ASSISTANT_USER_ID, Actor, UserRole},
  advisor::{Advisor, GenerationConfig},
  request::{CommentVisibility, NewRequest, Request, RequestId},
  settings::{AdvisorySettings, SubmissionSettings},
  status::{RequestStatus, TerminalPolicy},
  store::{RequestQuery, RequestStore},
  submission::{ChangeType, Region, RequestType, SubmittedData, WbsData},
};
use mdm_store_sqlite::SqliteStore;

use crate::{
  AdvisoryTrigger, EngineConfig, Error, LifecycleEngine, TransitionOutcome,
  clock::{Clock as _, FixedClock},
  tasks::AdvisoryKey,
};

// ─── Scripted advisor ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Script {
  Text(&'static str),
  Fail,
  Hang,
}

#[derive(Debug, thiserror::Error)]
#[error("advisor unavailable")]
struct Unavailable;

/// Answers reply prompts and status prompts from separate scripts.
#[derive(Debug)]
struct ScriptedAdvisor {
  reply:    Script,
  decision: Script,
  calls:    Mutex<Vec<GenerationConfig>>,
}

impl ScriptedAdvisor {
  fn new(reply: Script, decision: Script) -> Self {
    Self { reply, decision, calls: Mutex::new(Vec::new()) }
  }

  fn calls(&self) -> Vec<GenerationConfig> { self.calls.lock().unwrap().clone() }
}

impl Advisor for ScriptedAdvisor {
  type Error = Unavailable;

  async fn generate(&self, _prompt: &str, config: GenerationConfig) -> Result<String, Unavailable> {
    self.calls.lock().unwrap().push(config);
    let script = if config == GenerationConfig::STATUS_ADVISORY {
      self.decision.clone()
    } else {
      self.reply.clone()
    };
    match script {
      Script::Text(t) => Ok(t.to_owned()),
      Script::Fail => Err(Unavailable),
      Script::Hang => std::future::pending().await,
    }
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

type Engine = LifecycleEngine<SqliteStore, ScriptedAdvisor>;

struct Harness {
  engine:  Engine,
  clock:   Arc<FixedClock>,
  advisor: Arc<ScriptedAdvisor>,
}

async fn harness_with(advisor: ScriptedAdvisor, config: EngineConfig) -> Harness {
  let store = Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"));
  let advisor = Arc::new(advisor);
  let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap()));
  let engine = LifecycleEngine::with_clock(store, advisor.clone(), config, clock.clone());
  Harness { engine, clock, advisor }
}

async fn harness(advisor: ScriptedAdvisor) -> Harness {
  harness_with(advisor, EngineConfig::default()).await
}

fn quiet() -> ScriptedAdvisor { ScriptedAdvisor::new(Script::Fail, Script::Fail) }

fn person(user_id: &str, role: UserRole) -> Actor {
  Actor {
    user_id:      user_id.into(),
    email:        format!("{user_id}@example.com"),
    display_name: Some(user_id.to_uppercase()),
    role,
  }
}

fn requester() -> Actor { person("ada", UserRole::Controller) }

fn staff() -> Actor { person("mdm", UserRole::Mdm) }

fn wbs(region: Region) -> SubmittedData {
  SubmittedData::Wbs(WbsData {
    change_type:        ChangeType::New,
    controlling_area:   "1000".into(),
    company_code:       "2100".into(),
    project_name:       "Harbour".into(),
    project_definition: "P-HARBOUR".into(),
    responsible_pccc:   "PC-42".into(),
    region,
    extra:              serde_json::Map::new(),
  })
}

fn new_wbs() -> NewRequest {
  NewRequest {
    request_type:   RequestType::Wbs,
    region:         None,
    submitted_data: wbs(Region::Dk),
  }
}

async fn submit(h: &Harness) -> Request {
  h.engine
    .create_request(&requester(), new_wbs(), &SubmissionSettings::default())
    .await
    .unwrap()
}

async fn reload(h: &Harness, id: &RequestId) -> Request {
  h.engine.store().get_request(id).await.unwrap().unwrap()
}

fn advisory(public: bool, internal: bool, complete: bool) -> AdvisorySettings {
  AdvisorySettings {
    enable_ai_replies:          public,
    enable_ai_internal_replies: internal,
    enable_ai_task_completion:  complete,
  }
}

fn assert_status_mirrors_history(r: &Request) {
  assert_eq!(r.status, r.history.last().unwrap().status);
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ids_count_up_within_a_day() {
  let h = harness(quiet()).await;

  let first = submit(&h).await;
  let second = submit(&h).await;
  assert_eq!(first.id.as_str(), "20250307001");
  assert_eq!(second.id.as_str(), "20250307002");

  h.clock.advance(ChronoDuration::days(1));
  assert_eq!(submit(&h).await.id.as_str(), "20250308001");
}

#[tokio::test]
async fn created_request_starts_submitted() {
  let h = harness(quiet()).await;
  let r = submit(&h).await;

  assert_eq!(r.status, RequestStatus::Submitted);
  assert_eq!(r.region, Region::Dk);
  assert_eq!(r.history.len(), 1);
  assert_eq!(r.history[0].changed_by_user_id, "ada");
  assert_eq!(reload(&h, &r.id).await, r);
}

#[tokio::test]
async fn id_collision_moves_to_next_sequence() {
  let h = harness(quiet()).await;
  // Someone else already holds sequence 2 while only one request is counted.
  let squatter = Request::submitted(
    RequestId::new(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(), 2).unwrap(),
    &person("bob", UserRole::Controller),
    RequestType::Wbs,
    Region::Uk,
    wbs(Region::Uk),
    h.clock.now(),
  );
  h.engine.store().create_request(&squatter).await.unwrap();

  let r = submit(&h).await;
  assert_eq!(r.id.as_str(), "20250307003");
}

#[tokio::test]
async fn id_collision_budget_is_bounded() {
  let config = EngineConfig { max_id_attempts: 1, ..Default::default() };
  let h = harness_with(quiet(), config).await;
  let squatter = Request::submitted(
    RequestId::new(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(), 2).unwrap(),
    &person("bob", UserRole::Controller),
    RequestType::Wbs,
    Region::Uk,
    wbs(Region::Uk),
    h.clock.now(),
  );
  h.engine.store().create_request(&squatter).await.unwrap();

  let err = h
    .engine
    .create_request(&requester(), new_wbs(), &SubmissionSettings::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::IdCollision { ref prefix, attempts: 1 } if prefix == "20250307"));
}

#[tokio::test]
async fn deleted_early_ids_do_not_block_creation() {
  let h = harness(quiet()).await;
  let mut ids = Vec::new();
  for _ in 0..10 {
    ids.push(submit(&h).await.id);
  }
  for id in &ids[..5] {
    assert!(h.engine.store().delete_request(id).await.unwrap());
  }

  // Five remain, so the first guess (006) is taken; the retry skips past 010.
  let r = submit(&h).await;
  assert_eq!(r.id.as_str(), "20250307011");
  assert_eq!(submit(&h).await.id.as_str(), "20250307012");
}

#[tokio::test]
async fn payload_must_match_type() {
  let h = harness(quiet()).await;
  let bad = NewRequest { request_type: RequestType::Pc, ..new_wbs() };
  let err = h
    .engine
    .create_request(&requester(), bad, &SubmissionSettings::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(mdm_core::Error::DataTypeMismatch { .. })));
  assert_eq!(h.engine.store().count_requests(&RequestQuery::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn edits_allowed_only_while_submitted() {
  let h = harness(quiet()).await;
  let r = submit(&h).await;
  let settings = SubmissionSettings::default();

  h.clock.advance(ChronoDuration::minutes(5));
  let edited = h
    .engine
    .update_submitted_data(&r.id, &requester(), wbs(Region::Nl), &settings)
    .await
    .unwrap();
  assert_eq!(edited.submitted_data, wbs(Region::Nl));
  assert_eq!(reload(&h, &r.id).await.updated_at, h.clock.now());

  h.engine.transition(&r.id, RequestStatus::InProgress, &staff()).await.unwrap();
  let err = h
    .engine
    .update_submitted_data(&r.id, &requester(), wbs(Region::Se), &settings)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(mdm_core::Error::NotEditable(RequestStatus::InProgress))));
}

// ─── Transitions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn same_status_transition_writes_nothing() {
  let h = harness(quiet()).await;
  let r = submit(&h).await;

  h.clock.advance(ChronoDuration::minutes(1));
  let outcome = h.engine.transition(&r.id, RequestStatus::Submitted, &staff()).await.unwrap();
  assert_eq!(outcome, TransitionOutcome::Unchanged);

  let after = reload(&h, &r.id).await;
  assert_eq!(after.history.len(), 1);
  assert_eq!(after.updated_at, r.updated_at);
}

#[tokio::test]
async fn each_transition_appends_one_entry() {
  let h = harness(quiet()).await;
  let r = submit(&h).await;
  let path = [
    RequestStatus::InProgress,
    RequestStatus::PendingInfo,
    RequestStatus::InProgress,
    RequestStatus::ForwardedToSd,
    RequestStatus::Completed,
  ];

  for (i, status) in path.into_iter().enumerate() {
    h.clock.advance(ChronoDuration::minutes(1));
    let outcome = h.engine.transition(&r.id, status, &staff()).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::Changed(ref e) if e.status == status));

    let now = reload(&h, &r.id).await;
    assert_eq!(now.history.len(), i + 2);
    assert_eq!(now.history[i + 1].status, status);
    assert_eq!(now.updated_at, h.clock.now());
    assert_status_mirrors_history(&now);
  }
}

#[tokio::test]
async fn terminal_states_reopen_unless_locked() {
  let h = harness(quiet()).await;
  let r = submit(&h).await;
  h.engine.transition(&r.id, RequestStatus::Rejected, &staff()).await.unwrap();
  let reopened = h.engine.transition(&r.id, RequestStatus::InProgress, &staff()).await.unwrap();
  assert!(matches!(reopened, TransitionOutcome::Changed(_)));

  let locked = EngineConfig { terminal_policy: TerminalPolicy::Locked, ..Default::default() };
  let h = harness_with(quiet(), locked).await;
  let r = submit(&h).await;
  h.engine.transition(&r.id, RequestStatus::Completed, &staff()).await.unwrap();
  let err = h.engine.transition(&r.id, RequestStatus::InProgress, &staff()).await.unwrap_err();
  assert!(matches!(err, Error::Core(mdm_core::Error::TerminalStatus(RequestStatus::Completed))));
  assert_eq!(reload(&h, &r.id).await.history.len(), 2);
}

#[tokio::test]
async fn requesters_cannot_change_status() {
  let h = harness(quiet()).await;
  let r = submit(&h).await;
  let err = h.engine.transition(&r.id, RequestStatus::Completed, &requester()).await.unwrap_err();
  assert!(matches!(err, Error::Core(mdm_core::Error::Forbidden(_))));
}

#[tokio::test]
async fn missing_request_is_not_found() {
  let h = harness(quiet()).await;
  let id: RequestId = "20250307042".parse().unwrap();
  let err = h.engine.transition(&id, RequestStatus::InProgress, &staff()).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(ref missing) if *missing == id));
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_comments_are_rejected() {
  let h = harness(quiet()).await;
  let r = submit(&h).await;
  let all_on = advisory(true, true, true);

  for text in ["", "   ", "\n\t "] {
    let err = h
      .engine
      .add_comment(&r.id, text, &requester(), CommentVisibility::Public, &all_on)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Core(mdm_core::Error::BlankComment)));
  }
  assert!(reload(&h, &r.id).await.comments.is_empty());
  assert_eq!(h.engine.tasks().pending(), 0);
}

#[tokio::test]
async fn disabled_flags_schedule_nothing() {
  let h = harness(ScriptedAdvisor::new(Script::Text("hi"), Script::Fail)).await;
  let r = submit(&h).await;

  let receipt = h
    .engine
    .add_comment(
      &r.id,
      "hello",
      &requester(),
      CommentVisibility::Public,
      &advisory(false, true, true),
    )
    .await
    .unwrap();
  assert_eq!(receipt.scheduled, None);
  assert_eq!(receipt.comment.text, "hello");
  assert_eq!(receipt.comment.user_name, "ADA");

  h.engine.tasks().flush().await;
  assert!(h.advisor.calls().is_empty());
  assert_eq!(reload(&h, &r.id).await.comments.len(), 1);
}

#[tokio::test]
async fn internal_comments_are_staff_only() {
  let h = harness(quiet()).await;
  let r = submit(&h).await;
  let err = h
    .engine
    .add_comment(
      &r.id,
      "psst",
      &requester(),
      CommentVisibility::Internal,
      &advisory(false, false, false),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(mdm_core::Error::Forbidden(_))));
}

// ─── Advisory pass ───────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_public_reply() {
  let h = harness(ScriptedAdvisor::new(
    Script::Text("  Thanks, the team is on it.  "),
    Script::Fail,
  ))
  .await;
  let r = submit(&h).await;

  h.engine.transition(&r.id, RequestStatus::InProgress, &staff()).await.unwrap();
  let after = reload(&h, &r.id).await;
  assert_eq!(after.status, RequestStatus::InProgress);
  assert_eq!(after.history.len(), 2);

  let receipt = h
    .engine
    .add_comment(
      &r.id,
      "When will this be done?",
      &requester(),
      CommentVisibility::Public,
      &advisory(true, false, false),
    )
    .await
    .unwrap();
  let key = receipt.scheduled.expect("pass scheduled");
  assert!(h.engine.tasks().is_pending(&key));
  // The reply is not written synchronously.
  assert_eq!(reload(&h, &r.id).await.comments.len(), 1);

  h.engine.tasks().flush().await;

  let after = reload(&h, &r.id).await;
  assert_eq!(after.comments.len(), 2);
  let reply = &after.comments[1];
  assert!(reply.is_ai_response);
  assert_eq!(reply.user_id, ASSISTANT_USER_ID);
  assert_eq!(reply.user_name, ASSISTANT_COMMENT_NAME);
  assert_eq!(reply.text, "Thanks, the team is on it.");
  assert!(after.internal_comments.is_empty());
  assert_eq!(h.advisor.calls(), vec![GenerationConfig::PUBLIC_REPLY]);
}

#[tokio::test]
async fn advisor_failures_never_reach_the_commenter() {
  let bad_decisions = [
    Script::Fail,
    Script::Text("not json"),
    Script::Text(r#"{"shouldUpdate": "yes"}"#),
    Script::Text(r#"{"shouldUpdate": true, "newStatus": "Archived"}"#),
    Script::Text("   "),
  ];

  for decision in bad_decisions {
    let advisor = ScriptedAdvisor::new(Script::Text("Checking the cost center."), decision);
    let h = harness(advisor).await;
    let r = submit(&h).await;

    let receipt = h
      .engine
      .add_comment(
        &r.id,
        "Can we close this?",
        &staff(),
        CommentVisibility::Internal,
        &advisory(false, true, true),
      )
      .await;
    assert!(receipt.is_ok());
    h.engine.tasks().flush().await;

    let after = reload(&h, &r.id).await;
    assert_eq!(after.status, RequestStatus::Submitted);
    assert_eq!(after.history.len(), 1);
    // The staff note and the reply; no announcement.
    assert_eq!(after.internal_comments.len(), 2);
    assert!(after.internal_comments[1].is_ai_response);
  }
}

#[tokio::test]
async fn failed_reply_writes_nothing() {
  let h = harness(ScriptedAdvisor::new(Script::Fail, Script::Fail)).await;
  let r = submit(&h).await;

  h.engine
    .add_comment(
      &r.id,
      "Hello?",
      &requester(),
      CommentVisibility::Public,
      &advisory(true, true, true),
    )
    .await
    .unwrap();
  h.engine
    .add_comment(
      &r.id,
      "Status?",
      &staff(),
      CommentVisibility::Internal,
      &advisory(true, true, true),
    )
    .await
    .unwrap();
  h.engine.tasks().flush().await;

  let after = reload(&h, &r.id).await;
  assert_eq!(after.comments.len(), 1);
  assert_eq!(after.internal_comments.len(), 1);
  assert_eq!(after.history.len(), 1);
  // A failed internal reply never chains into the status advisory.
  assert!(!h.advisor.calls().contains(&GenerationConfig::STATUS_ADVISORY));
}

#[tokio::test]
async fn advice_for_current_status_is_ignored() {
  let h = harness(ScriptedAdvisor::new(
    Script::Text("Looks good."),
    Script::Text(r#"{"shouldUpdate": true, "newStatus": "Submitted", "reason": "fine"}"#),
  ))
  .await;
  let r = submit(&h).await;

  h.engine
    .add_comment(
      &r.id,
      "Anything missing?",
      &staff(),
      CommentVisibility::Internal,
      &advisory(false, true, true),
    )
    .await
    .unwrap();
  h.engine.tasks().flush().await;

  let after = reload(&h, &r.id).await;
  assert_eq!(after.history.len(), 1);
  assert_eq!(after.internal_comments.len(), 2);
  assert!(!after.internal_comments.iter().any(|c| c.text.starts_with("I've updated the status")));
}

#[tokio::test]
async fn advised_transition_is_applied_and_announced() {
  let h = harness(ScriptedAdvisor::new(
    Script::Text("All fields are present."),
    Script::Text(
      "Here is my analysis:\n{\"shouldUpdate\": true, \"newStatus\": \"Completed\", \
       \"reason\": \"Element created in SAP\"}",
    ),
  ))
  .await;
  let r = submit(&h).await;

  h.engine
    .add_comment(
      &r.id,
      "Created it in SAP.",
      &staff(),
      CommentVisibility::Internal,
      &advisory(false, true, true),
    )
    .await
    .unwrap();
  h.engine.tasks().flush().await;

  let after = reload(&h, &r.id).await;
  assert_eq!(after.status, RequestStatus::Completed);
  assert_status_mirrors_history(&after);
  let entry = after.last_history().unwrap();
  assert_eq!(entry.changed_by_user_id, ASSISTANT_USER_ID);
  assert_eq!(entry.changed_by_user_name, ASSISTANT_ACTOR_NAME);

  let texts: Vec<_> = after.internal_comments.iter().map(|c| c.text.as_str()).collect();
  assert_eq!(texts, [
    "Created it in SAP.",
    "All fields are present.",
    "I've updated the status to Completed. Reason: Element created in SAP",
  ]);
  assert!(after.comments.is_empty());
  assert_eq!(h.advisor.calls(), vec![
    GenerationConfig::INTERNAL_REPLY,
    GenerationConfig::STATUS_ADVISORY
  ]);
}

#[tokio::test]
async fn task_completion_needs_its_own_flag() {
  let h = harness(ScriptedAdvisor::new(
    Script::Text("Noted."),
    Script::Text(r#"{"shouldUpdate": true, "newStatus": "Rejected", "reason": "dup"}"#),
  ))
  .await;
  let r = submit(&h).await;

  h.engine
    .add_comment(
      &r.id,
      "Duplicate?",
      &staff(),
      CommentVisibility::Internal,
      &advisory(false, true, false),
    )
    .await
    .unwrap();
  h.engine.tasks().flush().await;

  assert_eq!(reload(&h, &r.id).await.status, RequestStatus::Submitted);
  assert_eq!(h.advisor.calls(), vec![GenerationConfig::INTERNAL_REPLY]);
}

#[tokio::test]
async fn hung_advisor_times_out() {
  let config = EngineConfig { advisor_timeout: Duration::from_millis(20), ..Default::default() };
  let h = harness_with(ScriptedAdvisor::new(Script::Hang, Script::Hang), config).await;
  let r = submit(&h).await;
  let comment = h
    .engine
    .add_comment(
      &r.id,
      "Ping",
      &requester(),
      CommentVisibility::Public,
      &advisory(false, false, false),
    )
    .await
    .unwrap()
    .comment;

  let report = h
    .engine
    .run_advisory_pass(&AdvisoryTrigger {
      key: AdvisoryKey::new(r.id.clone()),
      visibility: CommentVisibility::Public,
      comment,
      settings: advisory(true, false, false),
    })
    .await;
  assert!(report.reply.is_none());
  assert!(report.failure.unwrap().contains("did not answer"));
  assert_eq!(reload(&h, &r.id).await.comments.len(), 1);
}

#[tokio::test]
async fn pass_for_deleted_request_is_absorbed() {
  let h = harness(ScriptedAdvisor::new(Script::Text("hi"), Script::Fail)).await;
  let r = submit(&h).await;
  let receipt = h
    .engine
    .add_comment(
      &r.id,
      "Hello",
      &requester(),
      CommentVisibility::Public,
      &advisory(true, false, false),
    )
    .await
    .unwrap();

  h.engine.store().delete_request(&r.id).await.unwrap();
  let report = h
    .engine
    .run_advisory_pass(&AdvisoryTrigger {
      key: receipt.scheduled.clone().unwrap(),
      visibility: CommentVisibility::Public,
      comment: receipt.comment,
      settings: advisory(true, false, false),
    })
    .await;
  assert!(report.failure.is_some());

  assert_eq!(h.engine.tasks().cancel_request(&r.id), 1);
  h.engine.tasks().flush().await;
  assert!(h.advisor.calls().is_empty());
}

// ─── Suggestions and views ───────────────────────────────────────────────────

#[tokio::test]
async fn suggestion_is_returned_not_applied() {
  let h = harness(ScriptedAdvisor::new(
    Script::Fail,
    Script::Text(
      r#"{"shouldUpdate": true, "newStatus": "PendingInfo", "reason": "missing owner"}"#,
    ),
  ))
  .await;
  let r = submit(&h).await;

  let decision = h.engine.suggest_status(&r.id, &staff()).await.unwrap();
  assert_eq!(decision.target(r.status), Some(RequestStatus::PendingInfo));
  assert_eq!(decision.reason(), "missing owner");
  assert_eq!(reload(&h, &r.id).await.history.len(), 1);

  let err = h.engine.suggest_status(&r.id, &requester()).await.unwrap_err();
  assert!(matches!(err, Error::Core(mdm_core::Error::Forbidden(_))));
}

#[tokio::test]
async fn suggestion_refuses_requesters_before_looking_up_the_id() {
  let h = harness(quiet()).await;
  let r = submit(&h).await;
  let unknown = RequestId::new(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(), 999).unwrap();

  // Same answer whether or not the id exists.
  for id in [&r.id, &unknown] {
    let err = h.engine.suggest_status(id, &requester()).await.unwrap_err();
    assert!(matches!(err, Error::Core(mdm_core::Error::Forbidden(_))), "{id}");
  }

  let mut nameless = staff();
  nameless.user_id = String::new();
  let err = h.engine.suggest_status(&r.id, &nameless).await.unwrap_err();
  assert!(matches!(err, Error::Core(mdm_core::Error::MissingActorId)));
  assert!(h.advisor.calls().is_empty());
}

#[tokio::test]
async fn suggestion_failures_are_surfaced() {
  let h = harness(ScriptedAdvisor::new(Script::Fail, Script::Text("no idea"))).await;
  let r = submit(&h).await;
  let err = h.engine.suggest_status(&r.id, &staff()).await.unwrap_err();
  assert!(matches!(err, Error::Advisory(_)));
}

#[tokio::test]
async fn requesters_see_only_their_own_public_view() {
  let h = harness(quiet()).await;
  let mine = submit(&h).await;
  let theirs = h
    .engine
    .create_request(&person("bob", UserRole::Controller), new_wbs(), &SubmissionSettings::default())
    .await
    .unwrap();
  let none = advisory(false, false, false);
  h.engine
    .add_comment(&mine.id, "internal only", &staff(), CommentVisibility::Internal, &none)
    .await
    .unwrap();

  let view = h.engine.view_request(&mine.id, &requester()).await.unwrap();
  assert!(view.internal_comments.is_empty());
  let staff_view = h.engine.view_request(&mine.id, &staff()).await.unwrap();
  assert_eq!(staff_view.internal_comments.len(), 1);

  assert!(matches!(
    h.engine.view_request(&theirs.id, &requester()).await,
    Err(Error::Core(mdm_core::Error::Forbidden(_)))
  ));

  let listed = h.engine.list_requests(&requester(), RequestQuery::default()).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id, mine.id);
  assert!(listed[0].internal_comments.is_empty());
  assert_eq!(h.engine.list_requests(&staff(), RequestQuery::default()).await.unwrap().len(), 2);
}
