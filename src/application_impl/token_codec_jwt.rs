use crate::application_port::{BackendError, TokenCodec, TokenVerifyResult};
use crate::domain_model::UserId;
use crate::domain_port::Clock;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub session_ttl: Duration,
    pub signing_key: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String, // user id
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String, // session id, released on logout
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
    clock: Arc<dyn Clock>,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        JwtHs256Codec { cfg, clock }
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = true;
        v.set_audience(&[self.cfg.audience.clone()]);
        v.set_issuer(&[self.cfg.issuer.clone()]);
        v
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_session_token(
        &self,
        user: UserId,
        jti: &str,
    ) -> Result<(String, DateTime<Utc>), BackendError> {
        let iat_dt = self.clock.now();
        let exp_dt = iat_dt + self.cfg.session_ttl;
        let claims = SessionClaims {
            sub: user.0.to_string(),
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            jti: jti.to_owned(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| BackendError::InternalError(e.to_string()))?;
        Ok((token, exp_dt))
    }

    async fn verify_session_token(&self, token: &str) -> Result<TokenVerifyResult, BackendError> {
        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &self.validation(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => BackendError::TokenExpired,
            _ => BackendError::TokenInvalid,
        })?;
        let user_id = data
            .claims
            .sub
            .parse::<UserId>()
            .map_err(|_| BackendError::TokenInvalid)?;
        Ok(TokenVerifyResult {
            user_id,
            jti: data.claims.jti,
        })
    }
}
