use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::logger::*;
use crate::settings::Settings;
use nanoid::nanoid;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// The development auth backend wired from settings: memory stores, the
/// configured hasher, HS256 session tokens, and the seeded users.
pub struct Server {
    pub auth_backend: Arc<dyn AuthBackend>,
    pub run_id: String,
    cleanup_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let alphabet: [char; 16] = [
            '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
        ];
        let run_id = nanoid!(10, &alphabet);
        let backend_settings = &settings.backend;

        let credential_hasher: Arc<dyn CredentialHasher> =
            match backend_settings.hasher.as_str() {
                "fake" => Arc::new(FakeCredentialHasher::new()),
                "argon2" => Arc::new(Argon2PasswordHasher {}),
                other => return Err(anyhow::anyhow!("Unknown hasher: {}", other)),
            };

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(
            JwtConfig {
                issuer: "login-guard.dev".to_string(),
                audience: "sign-in".to_string(),
                session_ttl: Duration::from_secs(backend_settings.token_ttl_secs),
                signing_key: backend_settings.signing_key.clone().into_bytes(),
            },
            clock.clone(),
        ));

        let auth_backend: Arc<dyn AuthBackend> = Arc::new(RealAuthBackend::new(
            Arc::new(MemoryAttemptStore::new()),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemorySessionStore::new()),
            credential_hasher,
            token_codec,
            clock,
            backend_settings.policy()?,
        ));

        for user in &backend_settings.users {
            let user_id = auth_backend
                .register(&Email::new(&user.email), &user.password)
                .await?;
            debug!(email = %user.email, %user_id, "seeded user");
        }

        let cancel = CancellationToken::new();
        let cleanup_handle = tokio::spawn(run_cleanup(
            auth_backend.clone(),
            CLEANUP_INTERVAL,
            cancel.clone(),
        ));

        info!(
            %run_id,
            users = backend_settings.users.len(),
            max_attempts = backend_settings.max_attempts,
            block_minutes = backend_settings.block_minutes,
            "server started"
        );

        Ok(Self {
            auth_backend,
            run_id,
            cleanup_handle: Mutex::new(Some(cleanup_handle)),
            cancel,
        })
    }

    pub async fn shutdown(&self) {
        info!(run_id = %self.run_id, "server shutting down...");

        self.cancel.cancel();

        let handle = self
            .cleanup_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let r = handle.await;
            info!("cleanup handle dropped: {:?}", r);
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Periodically drops attempt records that can no longer block anyone.
async fn run_cleanup(
    auth_backend: Arc<dyn AuthBackend>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = auth_backend.cleanup().await {
                    warn!(error = %e, "attempt cleanup failed");
                }
            }
        }
    }
}
