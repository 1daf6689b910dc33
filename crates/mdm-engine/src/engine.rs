//! [`LifecycleEngine`], the single owner of request mutations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mdm_core::{
  actor::Actor,
  advisor::{Advisor, GenerationConfig, StatusDecision},
  lifecycle,
  request::{Comment, CommentVisibility, HistoryEntry, NewRequest, Request, RequestId},
  settings::{AdvisorySettings, SubmissionSettings},
  status::RequestStatus,
  store::{CreateOutcome, RequestQuery, RequestStore},
  submission::SubmittedData,
};

use crate::{
  AdvisoryError, EngineConfig, Error, Result,
  clock::{Clock, SystemClock},
  prompt,
  tasks::{AdvisoryKey, AdvisoryTasks},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
  /// The status changed and this entry was appended to the history.
  Changed(HistoryEntry),
  /// The request already had the requested status; nothing was written.
  Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentReceipt {
  pub comment:   Comment,
  /// The advisory pass scheduled by this comment, if the settings enable one.
  pub scheduled: Option<AdvisoryKey>,
}

/// Everything an advisory pass needs, captured when the comment is written.
#[derive(Debug, Clone)]
pub struct AdvisoryTrigger {
  pub key:        AdvisoryKey,
  pub visibility: CommentVisibility,
  pub comment:    Comment,
  pub settings:   AdvisorySettings,
}

/// What one advisory pass did. Failures are recorded, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
  pub reply:        Option<Comment>,
  pub transition:   Option<HistoryEntry>,
  pub announcement: Option<Comment>,
  pub failure:      Option<String>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct LifecycleEngine<S, A> {
  store:   Arc<S>,
  advisor: Arc<A>,
  clock:   Arc<dyn Clock>,
  config:  EngineConfig,
  tasks:   AdvisoryTasks,
}

impl<S, A> Clone for LifecycleEngine<S, A> {
  fn clone(&self) -> Self {
    Self {
      store:   self.store.clone(),
      advisor: self.advisor.clone(),
      clock:   self.clock.clone(),
      config:  self.config.clone(),
      tasks:   self.tasks.clone(),
    }
  }
}

impl<S, A> LifecycleEngine<S, A>
where
  S: RequestStore + 'static,
  A: Advisor + 'static,
{
  pub fn new(store: Arc<S>, advisor: Arc<A>, config: EngineConfig) -> Self {
    Self::with_clock(store, advisor, config, Arc::new(SystemClock))
  }

  pub fn with_clock(
    store: Arc<S>,
    advisor: Arc<A>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self { store, advisor, clock, config, tasks: AdvisoryTasks::new() }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  /// Pending advisory passes.
  pub fn tasks(&self) -> &AdvisoryTasks { &self.tasks }

  fn now(&self) -> DateTime<Utc> { self.clock.now() }

  async fn load(&self, id: &RequestId) -> Result<Request> {
    self
      .store
      .get_request(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(id.clone()))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// Fetch a request as `actor` may see it. Requesters get the redacted view.
  pub async fn view_request(&self, id: &RequestId, actor: &Actor) -> Result<Request> {
    let request = self.load(id).await?;
    lifecycle::authorize_read(&request, actor)?;
    Ok(if actor.is_staff() { request } else { request.redacted_for_requester() })
  }

  /// List requests visible to `actor`. Non-staff only ever see their own.
  pub async fn list_requests(&self, actor: &Actor, query: RequestQuery) -> Result<Vec<Request>> {
    let mut query = query;
    if !actor.is_staff() {
      query.requester_id = Some(actor.user_id.clone());
    }
    let requests = self.store.query_requests(&query).await.map_err(Error::store)?;
    Ok(if actor.is_staff() {
      requests
    } else {
      requests.into_iter().map(Request::redacted_for_requester).collect()
    })
  }

  // ── Creation and edits ────────────────────────────────────────────────────

  /// Create a request in `Submitted` with the next free id for today.
  ///
  /// The sequence starts at one past the number of requests already carrying
  /// today's prefix. If that id is taken (a concurrent writer, or gaps left
  /// by deletes), the next attempt moves past the highest sequence in use.
  /// At most `max_id_attempts` ids are tried.
  pub async fn create_request(
    &self,
    requester: &Actor,
    new: NewRequest,
    settings: &SubmissionSettings,
  ) -> Result<Request> {
    requester.validate()?;
    lifecycle::validate_submission(new.request_type, &new.submitted_data, settings)?;
    let region = new
      .region
      .or_else(|| new.submitted_data.primary_region())
      .ok_or(mdm_core::Error::EmptyBulk)?;

    let now = self.now();
    let date = now.date_naive();
    let prefix = RequestId::date_prefix(date);
    let existing = self
      .store
      .count_requests(&RequestQuery { date_prefix: Some(prefix.clone()), ..Default::default() })
      .await
      .map_err(Error::store)?;
    let mut sequence = u32::try_from(existing).unwrap_or(u32::MAX).saturating_add(1);

    for attempt in 1..=self.config.max_id_attempts {
      let id = RequestId::new(date, sequence)?;
      let request = Request::submitted(
        id,
        requester,
        new.request_type,
        region,
        new.submitted_data.clone(),
        now,
      );
      match self.store.create_request(&request).await.map_err(Error::store)? {
        CreateOutcome::Created => {
          tracing::info!(
            request_id = %request.id,
            request_type = %request.request_type,
            requester = %requester.user_id,
            "request created"
          );
          return Ok(request);
        }
        CreateOutcome::AlreadyExists => {
          tracing::warn!(request_id = %request.id, attempt, "request id already taken, retrying");
          let highest =
            self.store.max_sequence(&prefix).await.map_err(Error::store)?.unwrap_or_default();
          sequence = sequence.max(highest).saturating_add(1);
        }
      }
    }

    Err(Error::IdCollision { prefix, attempts: self.config.max_id_attempts })
  }

  /// Replace the payload of a request that is still `Submitted`.
  pub async fn update_submitted_data(
    &self,
    id: &RequestId,
    actor: &Actor,
    data: SubmittedData,
    settings: &SubmissionSettings,
  ) -> Result<Request> {
    let mut request = self.load(id).await?;
    lifecycle::authorize_edit(&request, actor)?;
    lifecycle::validate_submission(request.request_type, &data, settings)?;

    let now = self.now();
    if !self
      .store
      .update_submitted_data(id, &data, now)
      .await
      .map_err(Error::store)?
    {
      return Err(Error::NotFound(id.clone()));
    }
    tracing::info!(request_id = %id, actor = %actor.user_id, "submitted data updated");

    request.submitted_data = data;
    request.updated_at = now;
    Ok(request)
  }

  // ── Transitions ───────────────────────────────────────────────────────────

  /// Move a request to `new_status`, appending one history entry.
  ///
  /// Asking for the current status is a no-op and writes nothing.
  pub async fn transition(
    &self,
    id: &RequestId,
    new_status: RequestStatus,
    actor: &Actor,
  ) -> Result<TransitionOutcome> {
    let request = self.load(id).await?;
    let planned = lifecycle::plan_transition(
      &request,
      new_status,
      actor,
      self.config.terminal_policy,
      self.now(),
    )?;

    let Some(entry) = planned else {
      tracing::debug!(request_id = %id, status = %new_status, "status unchanged");
      return Ok(TransitionOutcome::Unchanged);
    };

    if !self.store.record_transition(id, &entry).await.map_err(Error::store)? {
      return Err(Error::NotFound(id.clone()));
    }
    tracing::info!(
      request_id = %id,
      from = %request.status,
      to = %new_status,
      actor = %actor.user_id,
      "status changed"
    );
    Ok(TransitionOutcome::Changed(entry))
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  /// Append a comment, then schedule an advisory pass if `settings` enable
  /// one for this thread. The pass runs detached; its outcome never affects
  /// this call.
  pub async fn add_comment(
    &self,
    id: &RequestId,
    text: &str,
    author: &Actor,
    visibility: CommentVisibility,
    settings: &AdvisorySettings,
  ) -> Result<CommentReceipt> {
    let comment = lifecycle::new_comment(author, text, self.now())?;
    let request = self.load(id).await?;
    lifecycle::authorize_comment(&request, author, visibility)?;

    if !self
      .store
      .append_comment(id, visibility, &comment)
      .await
      .map_err(Error::store)?
    {
      return Err(Error::NotFound(id.clone()));
    }
    tracing::info!(request_id = %id, ?visibility, author = %author.user_id, "comment added");

    let wants_pass = match visibility {
      CommentVisibility::Public => settings.enable_ai_replies,
      CommentVisibility::Internal => settings.enable_ai_internal_replies,
    };
    let scheduled = wants_pass.then(|| {
      let trigger = AdvisoryTrigger {
        key: AdvisoryKey::new(id.clone()),
        visibility,
        comment: comment.clone(),
        settings: *settings,
      };
      self.schedule_pass(trigger)
    });

    Ok(CommentReceipt { comment, scheduled })
  }

  fn schedule_pass(&self, trigger: AdvisoryTrigger) -> AdvisoryKey {
    let key = trigger.key.clone();
    tracing::debug!(
      request_id = %key.request_id,
      trigger = %key.trigger,
      delay_ms = u64::try_from(self.config.advisory_delay.as_millis()).unwrap_or(u64::MAX),
      "advisory pass scheduled"
    );
    let engine = self.clone();
    self.tasks.schedule(key.clone(), self.config.advisory_delay, async move {
      engine.run_advisory_pass(&trigger).await;
    });
    key
  }

  // ── Advisory ──────────────────────────────────────────────────────────────

  /// Run one advisory pass now. Any failure is logged and reported, never
  /// returned as an error.
  pub async fn run_advisory_pass(&self, trigger: &AdvisoryTrigger) -> PassReport {
    let mut report = PassReport::default();
    if let Err(e) = self.advise(trigger, &mut report).await {
      tracing::warn!(
        request_id = %trigger.key.request_id,
        trigger = %trigger.key.trigger,
        error = %e,
        "advisory pass failed"
      );
      report.failure = Some(e.to_string());
    }
    report
  }

  async fn advise(
    &self,
    trigger: &AdvisoryTrigger,
    report: &mut PassReport,
  ) -> Result<(), AdvisoryError> {
    let id = &trigger.key.request_id;
    let settings = &trigger.settings;

    match trigger.visibility {
      CommentVisibility::Public => {
        if !settings.enable_ai_replies {
          return Ok(());
        }
        let request = self.load_for_pass(id).await?;
        let text = self
          .generate(
            &prompt::public_reply(&request, &trigger.comment),
            GenerationConfig::PUBLIC_REPLY,
          )
          .await?;
        let reply = lifecycle::assistant_comment(&text, self.now());
        self.append_for_pass(id, CommentVisibility::Public, &reply).await?;
        report.reply = Some(reply);
      }

      CommentVisibility::Internal => {
        if !settings.enable_ai_internal_replies {
          return Ok(());
        }
        let request = self.load_for_pass(id).await?;
        let text = self
          .generate(
            &prompt::internal_reply(&request, &trigger.comment),
            GenerationConfig::INTERNAL_REPLY,
          )
          .await?;
        let reply = lifecycle::assistant_comment(&text, self.now());
        self.append_for_pass(id, CommentVisibility::Internal, &reply).await?;
        report.reply = Some(reply);

        if settings.enable_ai_task_completion {
          self.apply_advice(id, report).await?;
        }
      }
    }
    Ok(())
  }

  /// Ask for a status decision and apply it as the assistant.
  async fn apply_advice(
    &self,
    id: &RequestId,
    report: &mut PassReport,
  ) -> Result<(), AdvisoryError> {
    // Re-read so the decision sees the reply that was just appended.
    let request = self.load_for_pass(id).await?;
    let decision = self.decide(&request).await?;

    let Some(target) = decision.target(request.status) else {
      tracing::debug!(request_id = %id, "advisor recommends no status change");
      return Ok(());
    };

    let outcome = self
      .transition(id, target, &Actor::assistant())
      .await
      .map_err(|e| AdvisoryError::Transition(Box::new(e)))?;
    let TransitionOutcome::Changed(entry) = outcome else {
      return Ok(());
    };
    report.transition = Some(entry);

    let note = lifecycle::assistant_comment(
      &lifecycle::status_change_note(target, decision.reason()),
      self.now(),
    );
    self.append_for_pass(id, CommentVisibility::Internal, &note).await?;
    report.announcement = Some(note);
    Ok(())
  }

  /// Run the status advisory for `id` and return the decision without
  /// applying it. Unlike a pass, failures are returned to the caller.
  pub async fn suggest_status(&self, id: &RequestId, actor: &Actor) -> Result<StatusDecision> {
    actor.validate()?;
    if !actor.is_staff() {
      return Err(
        mdm_core::Error::Forbidden(format!("{} may not request status advice", actor.role)).into(),
      );
    }
    let request = self.load(id).await?;
    Ok(self.decide(&request).await?)
  }

  async fn decide(&self, request: &Request) -> Result<StatusDecision, AdvisoryError> {
    let raw = self
      .generate(&prompt::status_advisory(request), GenerationConfig::STATUS_ADVISORY)
      .await?;
    StatusDecision::from_completion(&raw).map_err(AdvisoryError::Decision)
  }

  /// One bounded advisor call. Blank output counts as a failure.
  async fn generate(
    &self,
    prompt: &str,
    config: GenerationConfig,
  ) -> Result<String, AdvisoryError> {
    let limit = self.config.advisor_timeout;
    let raw = tokio::time::timeout(limit, self.advisor.generate(prompt, config))
      .await
      .map_err(|_| AdvisoryError::Timeout(limit))?
      .map_err(|e| AdvisoryError::Gateway(Box::new(e)))?;

    let text = raw.trim();
    if text.is_empty() {
      return Err(AdvisoryError::EmptyResponse);
    }
    Ok(text.to_owned())
  }

  async fn load_for_pass(&self, id: &RequestId) -> Result<Request, AdvisoryError> {
    self
      .store
      .get_request(id)
      .await
      .map_err(AdvisoryError::store)?
      .ok_or(AdvisoryError::RequestGone)
  }

  async fn append_for_pass(
    &self,
    id: &RequestId,
    visibility: CommentVisibility,
    comment: &Comment,
  ) -> Result<(), AdvisoryError> {
    let appended = self
      .store
      .append_comment(id, visibility, comment)
      .await
      .map_err(AdvisoryError::store)?;
    if !appended {
      return Err(AdvisoryError::RequestGone);
    }
    tracing::info!(request_id = %id, ?visibility, "assistant comment added");
    Ok(())
  }
}
