//! Cooperative cancellation and deadlines, propagated from the pipeline's
//! top-level timeout down through every nested pool.
//!
//! Every layer (pipeline, repo worker, scanner runner, clone) carries a
//! [`Deadline`] inherited from its parent and may install a tighter one, and
//! checks a shared [`CancelToken`] at each event emission and between unit
//! launches, per §5.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A cloneable, shareable cancellation flag. Cheap to check; safe to hand to
/// worker threads and to gix's `should_interrupt` parameter (it derefs to
/// the same `AtomicBool` the caller polls).
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is never cancelled unless [`cancel`](Self::cancel) is called.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Marks this token (and every clone of it) cancelled.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// `true` if [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Exposes the underlying flag for APIs (like `zero_git`) that want a
    /// bare `&AtomicBool`.
    #[must_use]
    pub fn as_atomic(&self) -> &AtomicBool {
        &self.0
    }
}

/// A point in time after which a unit of work should be abandoned.
///
/// `None` means no deadline (wait forever, barring external cancellation).
#[derive(Clone, Copy, Debug)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline — the caller's timeout is infinite.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// A deadline `secs` seconds from now.
    #[must_use]
    pub fn after(secs: u64) -> Self {
        Self(Some(Instant::now() + Duration::from_secs(secs)))
    }

    /// Installs a tighter deadline than `self`, if `secs` from now would
    /// expire sooner than the inherited one. A child never gets *more* time
    /// than its parent granted.
    #[must_use]
    pub fn tighten(&self, secs: u64) -> Self {
        let candidate = Instant::now() + Duration::from_secs(secs);
        match self.0 {
            Some(parent) if parent < candidate => *self,
            _ => Self(Some(candidate)),
        }
    }

    /// `true` if the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Time remaining, or `None` if there is no deadline.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }
}
