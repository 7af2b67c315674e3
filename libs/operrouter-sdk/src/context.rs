//! Per-call context carrying an optional deadline.

use std::time::{Duration, Instant};

use crate::error::OperRouterError;

/// Deadline propagated into every operation.
///
/// Adapters apply their own default timeout when no deadline is set. The
/// FFI adapter can only check the deadline before the native call starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context without a deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Context expiring `timeout` from now. A timeout too large to
    /// represent as an instant means no deadline.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Context expiring at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Time budget for the next call: the remaining deadline or `default`.
    ///
    /// # Errors
    ///
    /// Returns [`OperRouterError::Timeout`] when the deadline already passed.
    pub fn budget(&self, default: Duration) -> Result<Duration, OperRouterError> {
        match self.remaining() {
            None => Ok(default),
            Some(left) if left.is_zero() => Err(OperRouterError::Timeout(Duration::ZERO)),
            Some(left) => Ok(left),
        }
    }

    /// Fail fast when the deadline already passed.
    ///
    /// # Errors
    ///
    /// Returns [`OperRouterError::Timeout`] when the deadline already passed.
    pub fn check(&self) -> Result<(), OperRouterError> {
        match self.remaining() {
            Some(left) if left.is_zero() => Err(OperRouterError::Timeout(Duration::ZERO)),
            _ => Ok(()),
        }
    }
}
