use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
pub const ACCOUNT_BLOCKED: &str = "ACCOUNT_BLOCKED";
pub const USER_ALREADY_LOGGED_IN: &str = "USER_ALREADY_LOGGED_IN";
pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

const GENERIC_FAILURE: &str = "Login failed. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Body of a `200` login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSuccess {
    pub user: AuthenticatedUser,
    pub session: Session,
}

/// Body of every non-2xx response from the auth endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginAttemptResult {
    Success(LoginSuccess),
    InvalidCredentials {
        remaining_attempts: Option<u32>,
    },
    AccountBlocked {
        remaining_minutes: Option<u32>,
    },
    /// Anything else: transport errors, unexpected statuses, or codes the
    /// guard does not handle (such as `USER_ALREADY_LOGGED_IN`).
    Failed {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },
}

impl LoginAttemptResult {
    /// Classifies a non-2xx login response. Both the status and the code have
    /// to match for one of the specific variants.
    pub fn from_failure(status: u16, body: Option<ErrorBody>) -> Self {
        let Some(body) = body else {
            return LoginAttemptResult::Failed {
                status: Some(status),
                code: None,
                message: GENERIC_FAILURE.to_string(),
            };
        };
        let details = body.details.clone().unwrap_or_default();

        match (status, body.code.as_str()) {
            (401, INVALID_CREDENTIALS) => LoginAttemptResult::InvalidCredentials {
                remaining_attempts: details.remaining_attempts,
            },
            (423, ACCOUNT_BLOCKED) => LoginAttemptResult::AccountBlocked {
                remaining_minutes: details.remaining_minutes,
            },
            _ => LoginAttemptResult::Failed {
                status: Some(status),
                code: Some(body.code.clone()).filter(|c| !c.is_empty()),
                message: if body.message.is_empty() {
                    GENERIC_FAILURE.to_string()
                } else {
                    body.message.clone()
                },
            },
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        LoginAttemptResult::Failed {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LoginAttemptResult::Success(_))
    }

    /// Text shown to the user for this outcome.
    pub fn user_message(&self) -> String {
        match self {
            LoginAttemptResult::Success(success) => {
                format!("Signed in as {}", success.user.email)
            }
            LoginAttemptResult::InvalidCredentials {
                remaining_attempts: Some(n),
            } => format!("Invalid email or password. {}", attempts_warning(*n)),
            LoginAttemptResult::InvalidCredentials {
                remaining_attempts: None,
            } => "Invalid email or password.".to_string(),
            LoginAttemptResult::AccountBlocked {
                remaining_minutes: Some(m),
            } => format!(
                "Account temporarily blocked. Try again in {} minute{}.",
                m,
                if *m == 1 { "" } else { "s" }
            ),
            LoginAttemptResult::AccountBlocked {
                remaining_minutes: None,
            } => "Account temporarily blocked.".to_string(),
            LoginAttemptResult::Failed { message, .. } => message.clone(),
        }
    }
}

pub fn attempts_warning(remaining: u32) -> String {
    if remaining == 1 {
        "1 attempt remaining".to_string()
    } else {
        format!("{} attempts remaining", remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(code: &str, details: Option<ErrorDetails>) -> Option<ErrorBody> {
        Some(ErrorBody {
            code: code.to_string(),
            message: format!("{} message", code),
            details,
        })
    }

    #[test]
    fn warning_copy_is_pluralized() {
        assert_eq!(attempts_warning(2), "2 attempts remaining");
        assert_eq!(attempts_warning(1), "1 attempt remaining");
        assert_eq!(attempts_warning(0), "0 attempts remaining");
    }

    #[test]
    fn invalid_credentials_needs_401_and_code() {
        let details = ErrorDetails {
            remaining_attempts: Some(2),
            remaining_minutes: None,
        };
        assert_eq!(
            LoginAttemptResult::from_failure(401, body(INVALID_CREDENTIALS, Some(details.clone()))),
            LoginAttemptResult::InvalidCredentials {
                remaining_attempts: Some(2)
            }
        );
        assert!(matches!(
            LoginAttemptResult::from_failure(400, body(INVALID_CREDENTIALS, Some(details))),
            LoginAttemptResult::Failed {
                status: Some(400),
                ..
            }
        ));
    }

    #[test]
    fn blocked_reads_remaining_minutes() {
        let details = ErrorDetails {
            remaining_attempts: None,
            remaining_minutes: Some(4),
        };
        let result = LoginAttemptResult::from_failure(423, body(ACCOUNT_BLOCKED, Some(details)));
        assert_eq!(
            result,
            LoginAttemptResult::AccountBlocked {
                remaining_minutes: Some(4)
            }
        );
        assert_eq!(
            result.user_message(),
            "Account temporarily blocked. Try again in 4 minutes."
        );
    }

    #[test]
    fn already_logged_in_is_not_a_guard_concern() {
        let result = LoginAttemptResult::from_failure(409, body(USER_ALREADY_LOGGED_IN, None));
        match result {
            LoginAttemptResult::Failed { status, code, message } => {
                assert_eq!(status, Some(409));
                assert_eq!(code.as_deref(), Some(USER_ALREADY_LOGGED_IN));
                assert_eq!(message, "USER_ALREADY_LOGGED_IN message");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_body_falls_back_to_generic_message() {
        let result = LoginAttemptResult::from_failure(502, None);
        assert_eq!(result.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn error_body_round_trips_wire_names() {
        let json = r#"{"code":"INVALID_CREDENTIALS","message":"nope","details":{"remainingAttempts":1}}"#;
        let parsed: ErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.details.unwrap().remaining_attempts, Some(1));
    }
}
