use std::process::ExitCode;

use tokio::signal;
use tracing::{error, info};

use salon::{Broker, BrokerServer, Config};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = salon::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        salon::logging::init_console_only(&config.logging.level);
    }

    info!("salon - room-based chat broker");

    let server = match BrokerServer::bind(&config.server).await {
        Ok(server) => server,
        Err(e) => {
            error!(
                "Failed to bind {}:{}: {}",
                config.server.host, config.server.port, e
            );
            return ExitCode::FAILURE;
        }
    };

    let broker = Broker::start(&config.broker);
    let shutdown = broker.shutdown_token();
    let listener = tokio::spawn(server.run(
        broker.sender(),
        config.broker.outbox_capacity,
        shutdown.clone(),
    ));

    shutdown_signal().await;
    info!("Shutdown signal received");

    shutdown.cancel();
    match listener.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Listener stopped with error: {}", e),
        Err(e) => error!("Listener task failed: {}", e),
    }

    match broker.shutdown().await {
        Ok(report) => {
            info!(
                rooms = report.rooms_released,
                members = report.members_released,
                pending = report.pending_dropped,
                "Shutdown complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Broker shutdown failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
