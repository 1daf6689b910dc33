//! Registry of delayed advisory passes.
//!
//! Every pass is a spawned tokio task keyed by the request it belongs to and
//! the comment that triggered it. Keeping the handles lets callers cancel a
//! request's pending passes (e.g. on delete), cancel everything at shutdown,
//! or [`flush`](AdvisoryTasks::flush) the registry: skip the remaining delays
//! and wait for every pass to finish.

use std::{
  collections::HashMap,
  future::Future,
  sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
  },
  time::Duration,
};

use mdm_core::request::RequestId;
use tokio::{sync::watch, task::JoinHandle};
use uuid::Uuid;

/// Identifies one scheduled pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdvisoryKey {
  pub request_id: RequestId,
  /// Fresh per triggering comment.
  pub trigger:    Uuid,
}

impl AdvisoryKey {
  pub fn new(request_id: RequestId) -> Self { Self { request_id, trigger: Uuid::new_v4() } }
}

struct Registered {
  /// Distinguishes a task from a later one scheduled under the same key.
  generation: u64,
  handle:     JoinHandle<()>,
}

struct Registry {
  handles:     Mutex<HashMap<AdvisoryKey, Registered>>,
  generations: AtomicU64,
  /// `true` while a flush is in progress; pending delays end early.
  expedite:    watch::Sender<bool>,
}

/// Drops a task's registration when the task ends, including by panic or
/// abort. Leaves a newer registration under the same key alone.
struct Deregister {
  tasks:      AdvisoryTasks,
  key:        AdvisoryKey,
  generation: u64,
}

impl Drop for Deregister {
  fn drop(&mut self) {
    let mut handles = self.tasks.handles();
    if handles.get(&self.key).is_some_and(|r| r.generation == self.generation) {
      handles.remove(&self.key);
    }
  }
}

#[derive(Clone)]
pub struct AdvisoryTasks {
  inner: Arc<Registry>,
}

impl Default for AdvisoryTasks {
  fn default() -> Self { Self::new() }
}

impl AdvisoryTasks {
  pub fn new() -> Self {
    let (expedite, _) = watch::channel(false);
    Self {
      inner: Arc::new(Registry {
        handles: Mutex::new(HashMap::new()),
        generations: AtomicU64::new(0),
        expedite,
      }),
    }
  }

  fn handles(&self) -> MutexGuard<'_, HashMap<AdvisoryKey, Registered>> {
    self.inner.handles.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Run `work` after `delay` on a detached task. Scheduling a key that is
  /// still pending aborts the earlier task.
  pub fn schedule<F>(&self, key: AdvisoryKey, delay: Duration, work: F)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
    let registration = Deregister { tasks: self.clone(), key: key.clone(), generation };
    let expedite = self.inner.expedite.subscribe();

    // Held across spawn + insert so the task cannot deregister itself first.
    let mut handles = self.handles();
    let handle = tokio::spawn(async move {
      let _registration = registration;
      tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = expedited(expedite) => {}
      }
      work.await;
    });
    let previous = handles.insert(key, Registered { generation, handle });
    drop(handles);

    if let Some(previous) = previous {
      previous.handle.abort();
    }
  }

  /// Abort one pending pass. Returns whether it was still registered.
  pub fn cancel(&self, key: &AdvisoryKey) -> bool {
    let removed = self.handles().remove(key);
    match removed {
      Some(registered) => {
        registered.handle.abort();
        true
      }
      None => false,
    }
  }

  /// Abort every pending pass for `request_id`.
  pub fn cancel_request(&self, request_id: &RequestId) -> usize {
    let doomed: Vec<Registered> = {
      let mut handles = self.handles();
      let keys: Vec<AdvisoryKey> =
        handles.keys().filter(|key| key.request_id == *request_id).cloned().collect();
      keys.iter().filter_map(|key| handles.remove(key)).collect()
    };
    for registered in &doomed {
      registered.handle.abort();
    }
    let cancelled = doomed.len();
    if cancelled > 0 {
      tracing::debug!(request_id = %request_id, cancelled, "cancelled advisory passes");
    }
    cancelled
  }

  pub fn cancel_all(&self) -> usize {
    let drained: Vec<_> = self.handles().drain().collect();
    for (_, registered) in &drained {
      registered.handle.abort();
    }
    drained.len()
  }

  /// Number of passes scheduled but not yet finished.
  pub fn pending(&self) -> usize { self.handles().len() }

  pub fn is_pending(&self, key: &AdvisoryKey) -> bool { self.handles().contains_key(key) }

  /// Start every pending pass now and wait until all of them have finished,
  /// including passes scheduled while the flush is running.
  pub async fn flush(&self) {
    self.inner.expedite.send_replace(true);
    loop {
      let drained: Vec<_> = self.handles().drain().collect();
      if drained.is_empty() {
        break;
      }
      for (key, registered) in drained {
        if let Err(e) = registered.handle.await {
          if e.is_panic() {
            tracing::error!(
              request_id = %key.request_id,
              trigger = %key.trigger,
              "advisory task panicked: {e}"
            );
          }
        }
      }
    }
    self.inner.expedite.send_replace(false);
  }
}

/// Resolves once a flush is running. Never resolves if the registry is gone.
async fn expedited(mut rx: watch::Receiver<bool>) {
  loop {
    if *rx.borrow_and_update() {
      return;
    }
    if rx.changed().await.is_err() {
      std::future::pending::<()>().await;
    }
  }
}
