use crate::application_port::BackendError;
use crate::domain_model::*;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, body) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.status(), code.body())
    } else if err.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            ErrorBody {
                code: "NOT_FOUND".to_string(),
                message: "Not found".to_string(),
                details: None,
            },
        )
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            ErrorBody {
                code: "BAD_REQUEST".to_string(),
                message: e.to_string(),
                details: None,
            },
        )
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorBody {
                code: "METHOD_NOT_ALLOWED".to_string(),
                message: "Method not allowed".to_string(),
                details: None,
            },
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody {
                code: INTERNAL_ERROR.to_string(),
                message: format!("Unhandled error: {:?}", err),
                details: None,
            },
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

#[derive(Debug, Clone, Error)]
pub enum ApiErrorCode {
    #[error("Invalid email or password")]
    InvalidCredentials { remaining_attempts: u32 },
    #[error("Account temporarily blocked")]
    AccountBlocked { remaining_minutes: u32 },
    #[error("User is already logged in on another device")]
    UserAlreadyLoggedIn,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials { .. } => StatusCode::UNAUTHORIZED,
            ApiErrorCode::AccountBlocked { .. } => StatusCode::LOCKED,
            ApiErrorCode::UserAlreadyLoggedIn => StatusCode::CONFLICT,
            ApiErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (code, details) = match self {
            ApiErrorCode::InvalidCredentials { remaining_attempts } => (
                INVALID_CREDENTIALS,
                Some(ErrorDetails {
                    remaining_attempts: Some(*remaining_attempts),
                    remaining_minutes: None,
                }),
            ),
            ApiErrorCode::AccountBlocked { remaining_minutes } => (
                ACCOUNT_BLOCKED,
                Some(ErrorDetails {
                    remaining_attempts: None,
                    remaining_minutes: Some(*remaining_minutes),
                }),
            ),
            ApiErrorCode::UserAlreadyLoggedIn => (USER_ALREADY_LOGGED_IN, None),
            ApiErrorCode::InvalidToken => (INVALID_TOKEN, None),
            ApiErrorCode::InternalError => (INTERNAL_ERROR, None),
        };
        ErrorBody {
            code: code.to_string(),
            message: self.to_string(),
            details,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<BackendError> for ApiErrorCode {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::InvalidCredentials { remaining_attempts } => {
                ApiErrorCode::InvalidCredentials { remaining_attempts }
            }
            BackendError::AccountBlocked { remaining_minutes } => {
                ApiErrorCode::AccountBlocked { remaining_minutes }
            }
            BackendError::AlreadyLoggedIn => ApiErrorCode::UserAlreadyLoggedIn,
            BackendError::TokenInvalid | BackendError::TokenExpired => ApiErrorCode::InvalidToken,
            BackendError::Store(e) => ApiErrorCode::internal(e),
            BackendError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
