use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the epoch-millisecond timestamps written to `lastFetched`.
pub trait Clock: Send + Sync {
  fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  #[inline]
  fn now_millis(&self) -> i64 {
    chrono::Utc::now().timestamp_millis()
  }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
  millis: AtomicI64,
}

impl ManualClock {
  pub fn new(millis: i64) -> Self {
    Self {
      millis: AtomicI64::new(millis),
    }
  }

  pub fn set(&self, millis: i64) {
    self.millis.store(millis, Ordering::Relaxed);
  }

  pub fn advance(&self, millis: i64) {
    self.millis.fetch_add(millis, Ordering::Relaxed);
  }
}

impl Clock for ManualClock {
  #[inline]
  fn now_millis(&self) -> i64 {
    self.millis.load(Ordering::Relaxed)
  }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
  fn now_millis(&self) -> i64 {
    (**self).now_millis()
  }
}
