use super::error::*;
use super::handler;
use crate::application_port::AuthBackend;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Routes under `/api/auth`.
pub fn routes(
    auth_backend: Arc<dyn AuthBackend>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let block_status = warp::get()
        .and(warp::path("block-status"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(with(auth_backend.clone()))
        .and_then(handler::block_status);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(auth_backend.clone()))
        .and_then(handler::login);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(with_bearer_token())
        .and(with(auth_backend.clone()))
        .and_then(handler::logout);

    warp::path("api")
        .and(warp::path("auth"))
        .and(block_status.or(login).or(logout))
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_bearer_token() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(
        |header: Option<String>| async move {
            match header.as_deref().and_then(|h| h.strip_prefix("Bearer ")) {
                Some(token) if !token.is_empty() => Ok(token.to_owned()),
                _ => Err(reject::custom(ApiErrorCode::InvalidToken)),
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{FakeCredentialHasher, RealAuthBackend};
    use crate::application_port::BlockPolicy;
    use crate::domain_model::*;
    use crate::domain_port::SystemClock;
    use warp::http::StatusCode;

    async fn backend() -> Arc<dyn AuthBackend> {
        let backend = RealAuthBackend::in_memory(
            BlockPolicy::default(),
            Arc::new(FakeCredentialHasher::new()),
            Arc::new(SystemClock),
        );
        backend
            .register(&Email::new("admin@example.com"), "pw")
            .await
            .unwrap();
        Arc::new(backend)
    }

    #[tokio::test]
    async fn block_status_for_unknown_email() {
        let api = routes(backend().await).recover(recover_error);
        let res = warp::test::request()
            .method("GET")
            .path("/api/auth/block-status/new%40example.com")
            .reply(&api)
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        let status: BlockStatus = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(status.email, "new@example.com");
        assert!(!status.is_blocked);
        assert_eq!(status.attempts, 0);
    }

    #[tokio::test]
    async fn bad_password_is_401_with_remaining_attempts() {
        let api = routes(backend().await).recover(recover_error);
        let res = warp::test::request()
            .method("POST")
            .path("/api/auth/login")
            .json(&serde_json::json!({
                "email": "admin@example.com",
                "password": "wrong",
                "deviceInfo": "{}"
            }))
            .reply(&api)
            .await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorBody = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body.code, INVALID_CREDENTIALS);
        assert_eq!(body.details.unwrap().remaining_attempts, Some(2));
    }

    #[tokio::test]
    async fn blocked_account_is_423() {
        let api = routes(backend().await).recover(recover_error);
        for _ in 0..3 {
            warp::test::request()
                .method("POST")
                .path("/api/auth/login")
                .json(&serde_json::json!({"email": "admin@example.com", "password": "wrong"}))
                .reply(&api)
                .await;
        }

        let res = warp::test::request()
            .method("POST")
            .path("/api/auth/login")
            .json(&serde_json::json!({"email": "admin@example.com", "password": "pw"}))
            .reply(&api)
            .await;

        assert_eq!(res.status().as_u16(), 423);
        let body: ErrorBody = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body.code, ACCOUNT_BLOCKED);
        assert_eq!(body.details.unwrap().remaining_minutes, Some(5));
    }

    #[tokio::test]
    async fn login_then_logout() {
        let api = routes(backend().await).recover(recover_error);
        let res = warp::test::request()
            .method("POST")
            .path("/api/auth/login")
            .json(&serde_json::json!({"email": "admin@example.com", "password": "pw"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let success: LoginSuccess = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(success.user.email, "admin@example.com");

        let res = warp::test::request()
            .method("POST")
            .path("/api/auth/logout")
            .header(
                "authorization",
                format!("Bearer {}", success.session.access_token),
            )
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn logout_without_token_is_401() {
        let api = routes(backend().await).recover(recover_error);
        let res = warp::test::request()
            .method("POST")
            .path("/api/auth/logout")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorBody = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body.code, INVALID_TOKEN);
    }
}
