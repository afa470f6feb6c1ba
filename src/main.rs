use anyhow::Result;
use clap::Parser;
use std::{path::PathBuf, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use expiry_file_server::{
    config::{Config, ConfigOverrides, ServerSettings, defaults::DEFAULT_CONFIG_FILE},
    utils::{format_duration, format_size},
    web::{AppState, WebServer},
};
use expiry_sweeper::{SweepScheduler, Sweeper};

#[derive(Parser)]
#[command(name = "expiry-file-server")]
#[command(version)]
#[command(about = "A local file server with uploads and automatic file expiry")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (JSON, or TOML for *.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Directory to browse and sweep
    #[arg(short, long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Directory uploads are written to
    #[arg(short, long, value_name = "DIR")]
    uploaddir: Option<PathBuf>,

    /// File expiry in hours (0 disables expiry)
    #[arg(short, long, value_name = "HOURS")]
    expiry: Option<u64>,

    /// Time between sweep passes (e.g. 30s, 5m)
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    sweep_interval: Option<Duration>,

    /// Maximum upload request size in bytes
    #[arg(long, value_name = "BYTES")]
    max_upload_size: Option<usize>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Print the resolved configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            workdir: self.workdir.clone(),
            uploaddir: self.uploaddir.clone(),
            file_expiry_hours: self.expiry,
            sweep_interval: self.sweep_interval,
            max_upload_size: self.max_upload_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!(
        "expiry_file_server={level},expiry_sweeper={level}",
        level = cli.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(&cli.config, cli.overrides())?;

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    info!("Starting Expiry File Server v{}", env!("CARGO_PKG_VERSION"));

    let settings = ServerSettings::prepare(&config)?;

    info!("Work directory: {}", settings.work_dir.display());
    info!("Upload directory: {}", settings.upload_dir.display());
    if settings.policy.is_disabled() {
        info!("File expiry: disabled");
    } else {
        info!(
            "File expiry: {}, sweep every {}",
            format_duration(settings.policy.expiry()),
            format_duration(settings.sweep_interval)
        );
    }
    info!("Maximum upload size: {}", format_size(settings.max_upload_size as u64));

    let cancellation_token = CancellationToken::new();

    let scheduler = SweepScheduler::new(
        Sweeper::new(settings.policy),
        settings.work_dir.clone(),
        settings.sweep_interval,
    );
    let sweep_status = scheduler.status();
    let sweep_handle = scheduler.spawn(cancellation_token.clone());

    tokio::spawn(shutdown_signal(cancellation_token.clone()));

    let port = settings.port;
    let server = WebServer::new(AppState::new(settings, sweep_status));
    info!("File browser: http://localhost:{}/", port);
    info!("File upload:  http://localhost:{}/uploads", port);

    let served = server
        .serve_with_cancellation(cancellation_token.clone())
        .await;

    cancellation_token.cancel();
    if let Err(e) = sweep_handle.await {
        tracing::error!("File sweep task ended abnormally: {}", e);
    }

    served?;
    info!("Expiry File Server stopped");
    Ok(())
}

/// Cancel `cancellation_token` on Ctrl+C or SIGTERM.
async fn shutdown_signal(cancellation_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down gracefully"),
        () = terminate => info!("Received SIGTERM, shutting down gracefully"),
    }

    cancellation_token.cancel();
}
