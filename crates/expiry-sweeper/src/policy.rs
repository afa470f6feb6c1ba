//! Expiry policy and the verdicts it produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of checking a file's age against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExpiryVerdict {
    /// The file reached its maximum age and may be deleted.
    Expired,
    /// The file is still alive. `remaining` is `None` when expiry is disabled,
    /// otherwise always strictly positive.
    Alive { remaining: Option<Duration> },
}

impl ExpiryVerdict {
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }

    #[must_use]
    pub const fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Expired => None,
            Self::Alive { remaining } => *remaining,
        }
    }
}

/// Maximum age a file may reach before it becomes eligible for deletion.
///
/// A zero duration disables expiry entirely: no file is ever reported expired
/// and the sweeper never deletes anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExpiryPolicy {
    expiry: Duration,
}

impl ExpiryPolicy {
    /// Create a policy expiring files after `expiry`.
    #[must_use]
    pub const fn new(expiry: Duration) -> Self {
        Self { expiry }
    }

    /// Create a policy from a whole number of hours (`0` disables expiry).
    #[must_use]
    pub const fn from_hours(hours: u64) -> Self {
        Self::new(Duration::from_secs(hours.saturating_mul(60 * 60)))
    }

    /// A policy that never expires anything.
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// The configured maximum age.
    #[must_use]
    pub const fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Whether expiry is switched off.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.expiry.is_zero()
    }

    /// Evaluate a file last modified at `last_modified` as of `now`.
    ///
    /// The boundary is inclusive: a file exactly `expiry` old is expired.
    /// A modification time in the future counts as zero elapsed time.
    #[must_use]
    pub fn evaluate(&self, last_modified: DateTime<Utc>, now: DateTime<Utc>) -> ExpiryVerdict {
        if self.is_disabled() {
            return ExpiryVerdict::Alive { remaining: None };
        }

        let elapsed = now
            .signed_duration_since(last_modified)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if elapsed >= self.expiry {
            ExpiryVerdict::Expired
        } else {
            ExpiryVerdict::Alive {
                remaining: Some(self.expiry - elapsed),
            }
        }
    }

    /// Absolute instant at which a file modified at `last_modified` expires.
    /// `None` when expiry is disabled or the instant is not representable.
    #[must_use]
    pub fn expires_at(&self, last_modified: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.is_disabled() {
            return None;
        }
        let expiry = chrono::Duration::from_std(self.expiry).ok()?;
        last_modified.checked_add_signed(expiry)
    }
}
