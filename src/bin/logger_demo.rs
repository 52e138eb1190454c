use login_guard::logger::*;

// $ cargo run --bin logger_demo -- json
fn main() -> anyhow::Result<()> {
    let json = std::env::args().nth(1).as_deref() == Some("json");
    let logger = Logger::new_bootstrap(json);
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let config = LogConfig {
        filter: "login_guard=debug".to_string(),
        json,
    };
    logger.reload_from_config(&config)?;
    trace!("application trace log");
    debug!(email = "admin@example.com", attempts = 2, "application debug log");
    info!("application info log");

    Ok(())
}
