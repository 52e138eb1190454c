use login_guard::api;
use login_guard::application_impl::LoginAttemptGuard;
use login_guard::application_port::GuardView;
use login_guard::domain_model::*;
use login_guard::logger::*;
use login_guard::server::*;
use login_guard::settings::*;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let project_settings = parse_settings(cli.settings.as_deref())?;

    let logger = Logger::new_bootstrap(project_settings.log.json);
    info!(settings = ?cli.settings, gateway = %project_settings.guard.gateway, "settings loaded");
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
        json: project_settings.log.json,
    };
    logger.reload_from_config(&logger_config)?;

    match cli.command {
        Command::Status { email } => status(&project_settings, email).await,
        Command::Login { email, password } => login(&project_settings, email, password).await,
        Command::Watch { email } => watch(&project_settings, email).await,
        Command::Serve => serve(&project_settings).await,
    }
}

async fn status(settings: &Settings, email: String) -> anyhow::Result<()> {
    let guard = guard_from_settings(settings).await?;
    let view = guard.set_email(email.as_str()).await;
    print_view(&view);
    Ok(())
}

async fn login(settings: &Settings, email: String, password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let guard = guard_from_settings(settings).await?;
    guard.set_email(email.as_str()).await;

    let result = guard.attempt_login(&password, &DeviceInfo::detect()).await;
    match &result {
        LoginAttemptResult::Success(success) => {
            println!("logged in as {} ({})", success.user.email, success.user.id);
            println!("session expires at {}", success.session.expires_at);
        }
        failure => println!("{}", failure.user_message()),
    }

    print_view(&guard.view());
    Ok(())
}

async fn watch(settings: &Settings, email: String) -> anyhow::Result<()> {
    let guard = guard_from_settings(settings).await?;
    guard.set_email(email.as_str()).await;

    tokio::select! {
        _ = follow_countdown(&guard) => {
            print_view(&guard.view());
        }
        _ = signal::ctrl_c() => {
            guard.close();
        }
    }
    Ok(())
}

async fn follow_countdown(guard: &LoginAttemptGuard) {
    let tick = guard.options().tick;
    loop {
        if guard.is_allowed() {
            println!("login allowed");
            return;
        }

        match guard.subscribe_countdown() {
            Some(mut remaining) => {
                println!("blocked, retry in {}", format_time(*remaining.borrow_and_update()));
                while remaining.changed().await.is_ok() {
                    let secs = *remaining.borrow_and_update();
                    println!("{}", format_time(secs));
                    if secs == 0 {
                        break;
                    }
                }
                guard.refresh().await;
            }
            None => {
                tokio::time::sleep(tick).await;
                guard.refresh().await;
            }
        }
    }
}

fn print_view(view: &GuardView) {
    if let Some(email) = &view.email {
        println!("email:     {}", email);
    }
    println!("state:     {:?}", view.state);
    if let Some(status) = &view.status {
        println!("attempts:  {}", status.attempts);
        if status.is_blocked {
            println!("blocked:   {} minute(s) left", status.remaining_minutes);
        }
    }
    if let Some(countdown) = view.countdown_text() {
        println!("countdown: {}", countdown);
    }
    if let Some(warning) = &view.warning {
        println!("warning:   {}", warning);
    }
    println!("allowed:   {}", view.allowed);
}

async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let address: std::net::SocketAddr = settings.backend.address.parse()?;
    let server = Arc::new(Server::try_new(settings).await?);

    let routes = api::auth::routes(server.auth_backend.clone())
        .recover(api::auth::recover_error)
        .with(warp::trace::request());

    let (bound, serving) = warp::serve(routes).try_bind_with_graceful_shutdown(address, async {
        if let Err(e) = signal::ctrl_c().await {
            error!("could not register SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    })?;
    info!(%bound, "listening");
    serving.await;

    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => info!("server shutdown successfully"),
        Err(_) => error!("server shutdown timed out"),
    }

    Ok(())
}
