use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::logger::*;
use serde::Deserialize;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{self, reject};

pub async fn block_status(
    email: String,
    auth_backend: Arc<dyn AuthBackend>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let email = match urlencoding::decode(&email) {
        Ok(decoded) => Email::new(decoded),
        Err(_) => Email::new(&email),
    };

    let status = auth_backend
        .block_status(&email)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub device_info: String,
}

pub async fn login(
    body: LoginRequest,
    auth_backend: Arc<dyn AuthBackend>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        email: Email::new(&body.email),
        password: body.password,
        device_info: body.device_info,
    };

    let result = auth_backend.login(login_input).await;
    if let Err(e) = &result {
        debug!(email = %body.email, error = %e, "login rejected");
    }
    let success = result
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&success))
}

pub async fn logout(
    token: String,
    auth_backend: Arc<dyn AuthBackend>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_backend
        .logout(&token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(StatusCode::NO_CONTENT)
}
