use crate::application_impl::LoginAttemptGuard;
use crate::domain_port::AuthGateway;
use crate::infra_http::HttpAuthGateway;
use crate::infra_memory::LocalAuthGateway;
use crate::server::Server;
use crate::settings::Settings;
use std::sync::Arc;

/// Builds the guard over the gateway named in `[guard].gateway`. The local
/// gateway runs its own in-process [`Server`].
pub async fn guard_from_settings(settings: &Settings) -> anyhow::Result<LoginAttemptGuard> {
    let options = settings.guard.options()?;

    let gateway: Arc<dyn AuthGateway> = match settings.guard.gateway.as_str() {
        "http" => Arc::new(HttpAuthGateway::new(settings.http.gateway_config())?),
        "local" => {
            let server = Server::try_new(settings).await?;
            Arc::new(LocalAuthGateway::new(server.auth_backend.clone()))
        }
        other => return Err(anyhow::anyhow!("Unknown gateway: {}", other)),
    };

    Ok(LoginAttemptGuard::new(gateway, options))
}
