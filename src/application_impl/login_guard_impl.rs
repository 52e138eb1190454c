use crate::application_impl::Countdown;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{AuthGateway, GatewayError};
use crate::logger::*;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{mpsc, watch};

const NETWORK_FAILURE: &str = "Unable to reach the server. Please try again.";

/// Attempt/block tracking for one sign-in form.
///
/// Status is re-fetched whenever the email changes and after failed logins;
/// results that arrive for an email the form has since moved away from are
/// discarded.
pub struct LoginAttemptGuard {
    core: Arc<GuardCore>,
}

struct GuardCore {
    gateway: Arc<dyn AuthGateway>,
    options: GuardOptions,
    inner: Mutex<GuardInner>,
    recheck_tx: mpsc::UnboundedSender<u64>,
}

struct GuardInner {
    email: Option<Email>,
    // bumped on every email change; async results carry the value they started with
    generation: u64,
    // fetches are numbered as they start; a result older than the last
    // applied one (or than a successful login) is dropped
    next_seq: u64,
    applied_seq: u64,
    status: Option<BlockStatus>,
    state: GuardState,
    warning: Option<String>,
    countdown: Option<Countdown>,
}

impl GuardInner {
    /// Seconds left on a block that is still running. A block whose
    /// countdown has reached zero, or that never got one, is left to the
    /// backend to decide.
    fn refusing_secs(&self) -> Option<u32> {
        let status = self.status.as_ref()?;
        if is_login_allowed(status) {
            return None;
        }
        self.countdown
            .as_ref()
            .map(Countdown::remaining)
            .filter(|secs| *secs > 0)
    }

    fn reset(&mut self) {
        self.status = None;
        self.state = GuardState::Unknown;
        self.warning = None;
        self.countdown = None;
    }
}

impl LoginAttemptGuard {
    /// Must be called from within a tokio runtime.
    pub fn new(gateway: Arc<dyn AuthGateway>, options: GuardOptions) -> Self {
        let (recheck_tx, recheck_rx) = mpsc::unbounded_channel();
        let core = Arc::new(GuardCore {
            gateway,
            options,
            inner: Mutex::new(GuardInner {
                email: None,
                generation: 0,
                next_seq: 0,
                applied_seq: 0,
                status: None,
                state: GuardState::Unknown,
                warning: None,
                countdown: None,
            }),
            recheck_tx,
        });

        tokio::spawn(recheck_worker(Arc::downgrade(&core), recheck_rx));

        Self { core }
    }

    pub fn options(&self) -> &GuardOptions {
        &self.core.options
    }

    /// Plain status read, without touching the guard's state.
    pub async fn get_block_status(&self, email: &Email) -> Result<BlockStatus, GatewayError> {
        self.core.gateway.get_block_status(email).await
    }

    /// Points the guard at `email`. Nothing happens if it already is.
    pub async fn set_email(&self, email: impl Into<Email>) -> GuardView {
        let email: Email = email.into();
        let next = (!email.is_empty()).then_some(email);

        let generation = {
            let mut inner = self.core.lock();
            if inner.email == next {
                return self.core.view_locked(&inner);
            }
            inner.generation += 1;
            inner.email = next.clone();
            inner.reset();
            inner.generation
        };

        if let Some(email) = next {
            if self.core.options.policy == BlockingPolicy::Enabled {
                self.core.fetch_and_apply(generation, email).await;
            }
        }
        self.view()
    }

    /// Re-fetches the status of the current email.
    pub async fn refresh(&self) -> GuardView {
        if let Some((generation, email)) = self.core.current() {
            if self.core.options.policy == BlockingPolicy::Enabled {
                self.core.fetch_and_apply(generation, email).await;
            }
        }
        self.view()
    }

    pub async fn attempt_login(&self, password: &str, device_info: &DeviceInfo) -> LoginAttemptResult {
        let enabled = self.core.options.policy == BlockingPolicy::Enabled;

        let (generation, email, refusal) = {
            let inner = self.core.lock();
            let Some(email) = inner.email.clone() else {
                return LoginAttemptResult::Failed {
                    status: None,
                    code: None,
                    message: "Enter an email address.".to_string(),
                };
            };
            let refusal = if enabled {
                inner.refusing_secs().map(|secs| secs.div_ceil(60))
            } else {
                None
            };
            (inner.generation, email, refusal)
        };

        if let Some(minutes) = refusal {
            debug!(%email, minutes, "login refused while blocked");
            return LoginAttemptResult::AccountBlocked {
                remaining_minutes: Some(minutes),
            };
        }

        let result = match self
            .core
            .gateway
            .attempt_login(&email, password, device_info)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(%email, error = %e, "login request failed");
                LoginAttemptResult::network(NETWORK_FAILURE)
            }
        };

        if !enabled {
            return result;
        }

        match &result {
            LoginAttemptResult::Success(_) => {
                let mut inner = self.core.lock();
                if inner.generation == generation {
                    debug!(%email, "login succeeded, clearing block state");
                    inner.next_seq += 1;
                    inner.applied_seq = inner.next_seq;
                    inner.status = Some(BlockStatus::clear(&email));
                    inner.state = GuardState::Clear;
                    inner.warning = None;
                    inner.countdown = None;
                }
            }
            LoginAttemptResult::InvalidCredentials { remaining_attempts } => {
                {
                    let mut inner = self.core.lock();
                    if inner.generation == generation {
                        inner.warning = remaining_attempts.map(attempts_warning);
                    }
                }
                self.core.fetch_and_apply(generation, email).await;
            }
            LoginAttemptResult::AccountBlocked { .. } => {
                self.core.fetch_and_apply(generation, email).await;
            }
            LoginAttemptResult::Failed { .. } => {}
        }

        result
    }

    pub fn view(&self) -> GuardView {
        let inner = self.core.lock();
        self.core.view_locked(&inner)
    }

    pub fn is_allowed(&self) -> bool {
        self.view().allowed
    }

    /// `m:ss` of the running countdown, if any.
    pub fn countdown(&self) -> Option<String> {
        self.view().countdown_text()
    }

    pub fn subscribe_countdown(&self) -> Option<watch::Receiver<u32>> {
        self.core
            .lock()
            .countdown
            .as_ref()
            .map(Countdown::subscribe)
    }

    /// Stops the countdown and ignores anything still in flight.
    pub fn close(&self) {
        let mut inner = self.core.lock();
        inner.generation += 1;
        inner.countdown = None;
    }
}

impl Drop for LoginAttemptGuard {
    fn drop(&mut self) {
        self.close();
    }
}

impl GuardCore {
    fn lock(&self) -> MutexGuard<'_, GuardInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> Option<(u64, Email)> {
        let inner = self.lock();
        inner.email.clone().map(|email| (inner.generation, email))
    }

    fn view_locked(&self, inner: &GuardInner) -> GuardView {
        let allowed =
            self.options.policy == BlockingPolicy::Disabled || inner.refusing_secs().is_none();
        GuardView {
            email: inner.email.clone(),
            state: inner.state,
            status: inner.status.clone(),
            countdown_secs: inner.countdown.as_ref().map(Countdown::remaining),
            warning: inner.warning.clone(),
            allowed,
        }
    }

    async fn fetch_and_apply(&self, generation: u64, email: Email) {
        let seq = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            inner.next_seq += 1;
            inner.next_seq
        };

        let result = self.gateway.get_block_status(&email).await;

        let mut inner = self.lock();
        if inner.generation != generation || seq <= inner.applied_seq {
            debug!(%email, seq, "discarding stale block status");
            return;
        }
        inner.applied_seq = seq;

        match result {
            Ok(status) => self.apply_status(&mut inner, generation, status),
            Err(e) => {
                warn!(%email, error = %e, "block status unavailable, leaving login enabled");
                inner.status = None;
                inner.state = GuardState::Unknown;
                inner.countdown = None;
            }
        }
    }

    fn apply_status(&self, inner: &mut GuardInner, generation: u64, status: BlockStatus) {
        let state = GuardState::from_status(&status);
        if state != inner.state {
            debug!(email = %status.email, from = ?inner.state, to = ?state, "guard state changed");
        }

        inner.countdown = status
            .countdown_seed_secs()
            .map(|seconds| self.start_countdown(generation, seconds));
        if matches!(state, GuardState::Clear | GuardState::Blocked { .. }) {
            inner.warning = None;
        }
        inner.status = Some(status);
        inner.state = state;
    }

    fn start_countdown(&self, generation: u64, seconds: u32) -> Countdown {
        if self.options.recheck_on_expiry {
            let recheck_tx = self.recheck_tx.clone();
            Countdown::start_with_expiry(seconds, self.options.tick, move || {
                let _ = recheck_tx.send(generation);
            })
        } else {
            Countdown::start(seconds, self.options.tick)
        }
    }
}

/// Re-fetches status for countdowns that ran out. Exits with the guard.
async fn recheck_worker(core: Weak<GuardCore>, mut rx: mpsc::UnboundedReceiver<u64>) {
    while let Some(generation) = rx.recv().await {
        let Some(core) = core.upgrade() else {
            break;
        };
        match core.current() {
            Some((current, email)) if current == generation => {
                debug!(%email, "countdown finished, rechecking block status");
                core.fetch_and_apply(generation, email).await;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{FakeCredentialHasher, RealAuthBackend};
    use crate::infra_memory::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    const PASSWORD: &str = "correct-horse";

    struct Harness {
        clock: Arc<ManualClock>,
        guard: LoginAttemptGuard,
    }

    async fn harness(options: GuardOptions) -> Harness {
        let clock = Arc::new(ManualClock::starting_now());
        let backend = RealAuthBackend::in_memory(
            BlockPolicy::default(),
            Arc::new(FakeCredentialHasher::new()),
            clock.clone(),
        );
        backend
            .register(&Email::new("user@example.com"), PASSWORD)
            .await
            .unwrap();
        let gateway = Arc::new(LocalAuthGateway::new(Arc::new(backend)));
        Harness {
            clock,
            guard: LoginAttemptGuard::new(gateway, options),
        }
    }

    fn device() -> DeviceInfo {
        DeviceInfo::detect()
    }

    #[tokio::test]
    async fn fresh_email_is_clear_and_allowed() {
        let h = harness(GuardOptions::default()).await;

        let view = h.guard.set_email("new@example.com").await;

        assert_eq!(view.state, GuardState::Clear);
        let status = view.status.unwrap();
        assert!(!status.is_blocked);
        assert_eq!(status.attempts, 0);
        assert!(view.allowed);
        assert_eq!(view.countdown_secs, None);
    }

    #[tokio::test]
    async fn reading_status_twice_is_idempotent() {
        let h = harness(GuardOptions::default()).await;
        let email = Email::new("user@example.com");
        h.guard.set_email(email.clone()).await;
        h.guard.attempt_login("wrong", &device()).await;

        let first = h.guard.get_block_status(&email).await.unwrap();
        let second = h.guard.get_block_status(&email).await.unwrap();
        assert_eq!(first.attempts, second.attempts);
        assert_eq!(first.is_blocked, second.is_blocked);
    }

    #[tokio::test]
    async fn three_failures_warn_then_block() {
        let h = harness(GuardOptions::default()).await;
        h.guard.set_email("user@example.com").await;

        let mut warnings = Vec::new();
        for _ in 0..3 {
            let result = h.guard.attempt_login("wrong", &device()).await;
            assert!(matches!(result, LoginAttemptResult::InvalidCredentials { .. }));
            warnings.push(h.guard.view().warning);
        }

        assert_eq!(warnings[0].as_deref(), Some("2 attempts remaining"));
        assert_eq!(warnings[1].as_deref(), Some("1 attempt remaining"));

        let view = h.guard.view();
        assert!(view.status.as_ref().unwrap().is_blocked);
        assert_eq!(view.state, GuardState::Blocked { remaining_minutes: 5 });
        assert!(!view.allowed);
        assert_eq!(view.warning, None);
        assert_eq!(view.countdown_secs, Some(300));
        assert_eq!(h.guard.countdown().as_deref(), Some("5:00"));
    }

    #[tokio::test]
    async fn warning_state_tracks_backend_attempts() {
        let h = harness(GuardOptions::default()).await;
        h.guard.set_email("user@example.com").await;
        h.guard.attempt_login("wrong", &device()).await;

        assert_eq!(h.guard.view().state, GuardState::Warning { attempts: 1 });
    }

    #[tokio::test]
    async fn blocked_form_refuses_without_calling_backend() {
        let h = harness(GuardOptions::default()).await;
        h.guard.set_email("user@example.com").await;
        for _ in 0..3 {
            h.guard.attempt_login("wrong", &device()).await;
        }

        let result = h.guard.attempt_login(PASSWORD, &device()).await;
        assert_eq!(
            result,
            LoginAttemptResult::AccountBlocked {
                remaining_minutes: Some(5)
            }
        );
    }

    #[tokio::test]
    async fn success_clears_warning_immediately() {
        let h = harness(GuardOptions::default()).await;
        h.guard.set_email("user@example.com").await;
        h.guard.attempt_login("wrong", &device()).await;
        assert!(h.guard.view().warning.is_some());

        let result = h.guard.attempt_login(PASSWORD, &device()).await;
        assert!(result.is_success());

        let view = h.guard.view();
        assert_eq!(view.state, GuardState::Clear);
        assert_eq!(view.warning, None);
        assert_eq!(view.status.unwrap().attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_block_is_rechecked_when_countdown_ends() {
        let h = harness(GuardOptions::default()).await;
        h.guard.set_email("user@example.com").await;
        for _ in 0..3 {
            h.guard.attempt_login("wrong", &device()).await;
        }
        assert!(!h.guard.is_allowed());

        // backend and countdown both move past the block
        h.clock.advance(chrono::Duration::minutes(5));
        tokio::time::sleep(Duration::from_secs(301)).await;

        let view = h.guard.view();
        assert!(view.allowed);
        assert_eq!(view.state, GuardState::Clear);
        assert_eq!(view.countdown_secs, None);
    }

    #[tokio::test(start_paused = true)]
    async fn without_recheck_elapsed_countdown_hands_login_to_backend() {
        let options = GuardOptions {
            recheck_on_expiry: false,
            ..GuardOptions::default()
        };
        let h = harness(options).await;
        h.guard.set_email("user@example.com").await;
        for _ in 0..3 {
            h.guard.attempt_login("wrong", &device()).await;
        }

        h.clock.advance(chrono::Duration::minutes(5));
        tokio::time::sleep(Duration::from_secs(301)).await;

        let view = h.guard.view();
        assert_eq!(view.countdown_secs, Some(0));
        assert!(view.state.is_blocked());
        assert!(view.allowed);

        let result = h.guard.attempt_login(PASSWORD, &device()).await;
        assert!(result.is_success(), "got {:?}", result);
        assert_eq!(h.guard.view().state, GuardState::Clear);
    }

    #[tokio::test(start_paused = true)]
    async fn running_countdown_still_refuses_locally() {
        let options = GuardOptions {
            recheck_on_expiry: false,
            ..GuardOptions::default()
        };
        let h = harness(options).await;
        h.guard.set_email("user@example.com").await;
        for _ in 0..3 {
            h.guard.attempt_login("wrong", &device()).await;
        }

        h.clock.advance(chrono::Duration::minutes(5));
        tokio::time::sleep(Duration::from_secs(250)).await;

        // backend would accept, but the form still shows 0:50
        let result = h.guard.attempt_login(PASSWORD, &device()).await;
        assert_eq!(
            result,
            LoginAttemptResult::AccountBlocked {
                remaining_minutes: Some(1)
            }
        );
    }

    #[tokio::test]
    async fn disabled_policy_never_fetches_or_blocks() {
        let options = GuardOptions {
            policy: BlockingPolicy::Disabled,
            ..GuardOptions::default()
        };
        let h = harness(options).await;
        let view = h.guard.set_email("user@example.com").await;
        assert_eq!(view.state, GuardState::Unknown);
        assert!(view.allowed);

        for _ in 0..4 {
            h.guard.attempt_login("wrong", &device()).await;
        }
        let view = h.guard.view();
        assert!(view.allowed);
        assert_eq!(view.warning, None);
        assert_eq!(view.countdown_secs, None);
    }

    #[tokio::test]
    async fn empty_email_is_not_fetched() {
        let h = harness(GuardOptions::default()).await;
        let view = h.guard.set_email("   ").await;
        assert_eq!(view.email, None);
        assert_eq!(view.state, GuardState::Unknown);

        let result = h.guard.attempt_login(PASSWORD, &device()).await;
        assert!(matches!(result, LoginAttemptResult::Failed { status: None, .. }));
    }

    // region scripted gateway

    /// Gateway whose status replies can be held back per email.
    #[derive(Default)]
    struct ScriptedGateway {
        statuses: Mutex<HashMap<String, BlockStatus>>,
        gates: Mutex<HashMap<String, Arc<Notify>>>,
        fail: Mutex<bool>,
        calls: AtomicUsize,
    }

    impl ScriptedGateway {
        fn set(&self, status: BlockStatus) {
            self.statuses
                .lock()
                .unwrap()
                .insert(status.email.clone(), status);
        }

        fn hold(&self, email: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.gates
                .lock()
                .unwrap()
                .insert(email.to_string(), gate.clone());
            gate
        }

        fn release(&self, email: &str) {
            self.gates.lock().unwrap().remove(email);
        }
    }

    #[async_trait::async_trait]
    impl AuthGateway for ScriptedGateway {
        async fn get_block_status(&self, email: &Email) -> Result<BlockStatus, GatewayError> {
            // the reply is decided when the request is made, not when it lands
            let status = self
                .statuses
                .lock()
                .unwrap()
                .get(email.as_str())
                .cloned()
                .unwrap_or_else(|| BlockStatus::clear(email));
            let gate = self.gates.lock().unwrap().get(email.as_str()).cloned();
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if *self.fail.lock().unwrap() {
                return Err(GatewayError::Transport("connection refused".to_string()));
            }
            Ok(status)
        }

        async fn attempt_login(
            &self,
            _email: &Email,
            _password: &str,
            _device_info: &DeviceInfo,
        ) -> Result<LoginAttemptResult, GatewayError> {
            Err(GatewayError::Transport("connection reset".to_string()))
        }
    }

    fn blocked(email: &str, minutes: u32) -> BlockStatus {
        let now = chrono::Utc::now();
        BlockStatus {
            email: email.to_string(),
            is_blocked: true,
            attempts: 3,
            blocked_at: Some(now),
            expires_at: Some(now + chrono::Duration::minutes(minutes as i64)),
            remaining_minutes: minutes,
        }
    }

    // endregion

    #[tokio::test]
    async fn stale_status_does_not_overwrite_newer_email() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.set(blocked("a@x.com", 5));
        let gate = gateway.hold("a@x.com");
        let guard = Arc::new(LoginAttemptGuard::new(
            gateway.clone(),
            GuardOptions::default(),
        ));

        let pending = {
            let guard = guard.clone();
            tokio::spawn(async move { guard.set_email("a@x.com").await })
        };
        while gateway.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let view = guard.set_email("b@x.com").await;
        assert_eq!(view.state, GuardState::Clear);

        gate.notify_one();
        pending.await.unwrap();

        let view = guard.view();
        assert_eq!(view.email, Some(Email::new("b@x.com")));
        assert_eq!(view.state, GuardState::Clear);
        assert!(view.allowed);
        assert_eq!(view.countdown_secs, None);
    }

    #[tokio::test]
    async fn older_refresh_landing_last_is_dropped() {
        let gateway = Arc::new(ScriptedGateway::default());
        let guard = Arc::new(LoginAttemptGuard::new(
            gateway.clone(),
            GuardOptions::default(),
        ));
        guard.set_email("a@x.com").await;

        gateway.set(blocked("a@x.com", 1));
        let gate = gateway.hold("a@x.com");
        let pending = {
            let guard = guard.clone();
            tokio::spawn(async move { guard.refresh().await })
        };
        while gateway.calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        gateway.release("a@x.com");
        gateway.set(BlockStatus::clear(&Email::new("a@x.com")));
        let view = guard.refresh().await;
        assert_eq!(view.state, GuardState::Clear);

        gate.notify_one();
        pending.await.unwrap();

        let view = guard.view();
        assert_eq!(view.state, GuardState::Clear);
        assert!(view.allowed);
        assert_eq!(view.countdown_secs, None);
    }

    #[tokio::test]
    async fn same_email_does_not_refetch() {
        let gateway = Arc::new(ScriptedGateway::default());
        let guard = LoginAttemptGuard::new(gateway.clone(), GuardOptions::default());

        guard.set_email("a@x.com").await;
        guard.set_email(" a@x.com ").await;
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);

        guard.set_email("b@x.com").await;
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn status_failure_fails_open() {
        let gateway = Arc::new(ScriptedGateway::default());
        *gateway.fail.lock().unwrap() = true;
        let guard = LoginAttemptGuard::new(gateway, GuardOptions::default());

        let view = guard.set_email("a@x.com").await;
        assert_eq!(view.state, GuardState::Unknown);
        assert!(view.allowed);
    }

    #[tokio::test]
    async fn login_transport_error_is_generic_failure() {
        let gateway = Arc::new(ScriptedGateway::default());
        let guard = LoginAttemptGuard::new(gateway, GuardOptions::default());
        guard.set_email("a@x.com").await;

        let result = guard.attempt_login("pw", &device()).await;
        assert_eq!(result, LoginAttemptResult::network(NETWORK_FAILURE));
        assert_eq!(guard.view().state, GuardState::Clear);
    }

    #[tokio::test(start_paused = true)]
    async fn email_change_cancels_countdown() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.set(blocked("a@x.com", 1));
        let guard = LoginAttemptGuard::new(gateway, GuardOptions::default());

        guard.set_email("a@x.com").await;
        let rx = guard.subscribe_countdown().unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(*rx.borrow(), 58);

        guard.set_email("b@x.com").await;
        assert!(guard.subscribe_countdown().is_none());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*rx.borrow(), 58);
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_countdown() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.set(blocked("a@x.com", 1));
        let guard = LoginAttemptGuard::new(gateway, GuardOptions::default());

        guard.set_email("a@x.com").await;
        let rx = guard.subscribe_countdown().unwrap();
        guard.close();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*rx.borrow(), 60);
        assert_eq!(guard.view().countdown_secs, None);
    }
}
