//! Cancellation and deadline signal shared between the binary and the engine.
//!
//! The token is checked before every store round trip. Clones share the same
//! flag, so a Ctrl-C handler holding one clone stops the run holding another.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::DoctorError;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Time left before the deadline, `None` when the run is unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails if the run was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), DoctorError> {
        if self.is_cancelled() {
            return Err(DoctorError::Cancelled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Err(DoctorError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
