//! Time source for the engine. Tests pin it with [`FixedClock`].

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
  pub fn new(at: DateTime<Utc>) -> Self { Self(Mutex::new(at)) }

  pub fn set(&self, at: DateTime<Utc>) {
    *self.0.lock().unwrap_or_else(PoisonError::into_inner) = at;
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.0.lock().unwrap_or_else(PoisonError::into_inner);
    *now += by;
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> { *self.0.lock().unwrap_or_else(PoisonError::into_inner) }
}
