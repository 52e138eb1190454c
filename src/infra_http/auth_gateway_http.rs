use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Backend origin, e.g. `http://127.0.0.1:8080`. A trailing slash is ignored.
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    device_info: String,
}

pub struct HttpAuthGateway {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpAuthGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            http_client,
        })
    }

    fn block_status_url(&self, email: &Email) -> String {
        format!(
            "{}/api/auth/block-status/{}",
            self.base_url,
            urlencoding::encode(email.as_str())
        )
    }

    fn login_url(&self) -> String {
        format!("{}/api/auth/login", self.base_url)
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

#[async_trait::async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn get_block_status(&self, email: &Email) -> Result<BlockStatus, GatewayError> {
        let url = self.block_status_url(email);
        let start = Instant::now();
        let response = self.http_client.get(&url).send().await.map_err(transport)?;

        let status = response.status();
        debug!(%email, %status, elapsed = ?start.elapsed(), "block status response");

        if status == StatusCode::NOT_FOUND {
            return Ok(BlockStatus::clear(email));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<BlockStatus>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn attempt_login(
        &self,
        email: &Email,
        password: &str,
        device_info: &DeviceInfo,
    ) -> Result<LoginAttemptResult, GatewayError> {
        let body = LoginRequest {
            email: email.as_str(),
            password,
            device_info: device_info.to_wire(),
        };

        let start = Instant::now();
        let response = self
            .http_client
            .post(self.login_url())
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        debug!(%email, %status, elapsed = ?start.elapsed(), "login response");

        if status.is_success() {
            let success = response
                .json::<LoginSuccess>()
                .await
                .map_err(|e| GatewayError::Decode(e.to_string()))?;
            return Ok(LoginAttemptResult::Success(success));
        }

        let text = response.text().await.unwrap_or_default();
        let error_body = serde_json::from_str::<ErrorBody>(&text).ok();
        if error_body.is_none() {
            debug!(%status, body = %text, "login error without a JSON body");
        }
        Ok(LoginAttemptResult::from_failure(status.as_u16(), error_body))
    }
}
