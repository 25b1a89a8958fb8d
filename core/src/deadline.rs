//! Overall time budget for one bootstrap attempt.

use std::time::{Duration, Instant};

/// A point in time after which in-flight work is abandoned.
///
/// A deadline without a budget never expires.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use extload_core::Deadline;
///
/// let unbounded = Deadline::none();
/// assert!(!unbounded.is_expired());
/// assert_eq!(unbounded.remaining(), None);
///
/// let spent = Deadline::after(Duration::ZERO);
/// assert!(spent.is_expired());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self {
            started: Instant::now(),
            budget: None,
        }
    }

    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget: Some(budget),
        }
    }

    /// Builds from an optional budget.
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::none, Self::after)
    }

    /// Time left before expiry, or `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .map(|budget| budget.saturating_sub(self.started.elapsed()))
    }

    /// Time since the deadline was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}
