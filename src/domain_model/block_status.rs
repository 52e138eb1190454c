use crate::domain_model::Email;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the backend's view of an email: attempts so far and, if the
/// account is blocked, for how long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatus {
    pub email: String,
    pub is_blocked: bool,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remaining_minutes: u32,
}

impl BlockStatus {
    /// Status of an email the backend has no record for.
    pub fn clear(email: &Email) -> Self {
        Self {
            email: email.as_str().to_owned(),
            is_blocked: false,
            attempts: 0,
            blocked_at: None,
            expires_at: None,
            remaining_minutes: 0,
        }
    }

    /// Seconds the countdown starts from when this status is observed.
    pub fn countdown_seed_secs(&self) -> Option<u32> {
        if self.is_blocked && self.remaining_minutes > 0 {
            Some(self.remaining_minutes.saturating_mul(60))
        } else {
            None
        }
    }
}

pub fn is_login_allowed(status: &BlockStatus) -> bool {
    !status.is_blocked
}

/// Client-observed position of an email in the attempt/block cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// No status fetched yet, or the fetch failed.
    Unknown,
    Clear,
    Warning { attempts: u32 },
    Blocked { remaining_minutes: u32 },
}

impl GuardState {
    pub fn from_status(status: &BlockStatus) -> Self {
        if status.is_blocked {
            GuardState::Blocked {
                remaining_minutes: status.remaining_minutes,
            }
        } else if status.attempts > 0 {
            GuardState::Warning {
                attempts: status.attempts,
            }
        } else {
            GuardState::Clear
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, GuardState::Blocked { .. })
    }
}

/// `m:ss` rendering of a countdown.
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
