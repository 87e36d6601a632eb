//! Prometheus exporter for Philips Hue sensor readings.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use hue_exporter_prometheus::bridge::HueClient;
use hue_exporter_prometheus::{
    ExporterConfig, HttpServer, MetricCollector, SensorPoller, credentials, register,
};

/// Prometheus exporter for Philips Hue sensor readings.
#[derive(Parser, Debug)]
#[command(name = "hue-exporter-prometheus")]
#[command(about = "Export Hue bridge sensor readings as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Hue bridge hostname or IP address; discovered on the local network
    /// when not set.
    #[arg(long)]
    bridge: Option<String>,

    /// Bridge credential (or set HUE_USER in the environment).
    #[arg(long)]
    user: Option<String>,

    /// Prometheus metrics port.
    #[arg(long, default_value_t = 2112)]
    metrics_port: u16,

    /// Prometheus metrics path.
    #[arg(long, default_value = "/metrics")]
    metrics_path: String,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Register a new credential with the bridge, then exit.
    #[arg(long)]
    register: bool,

    /// Overall deadline for waiting on registration, in seconds.
    #[arg(long, default_value_t = 60)]
    register_timeout: u64,

    /// Path to the stored credential file.
    #[arg(long)]
    user_key_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Find the bridge
    let mut client = match &args.bridge {
        Some(host) => HueClient::new(host),
        None => {
            let client = HueClient::discover()
                .await
                .context("could not discover bridge")?;
            info!(bridge = client.host(), "discovered bridge");
            client
        }
    };

    // One-time registration: obtain a credential and exit
    if args.register {
        let deadline = Duration::from_secs(args.register_timeout);
        let user = register::register(&client, deadline)
            .await
            .context("could not register user")?;

        match &args.user_key_path {
            Some(path) => {
                credentials::save(path, &user)
                    .with_context(|| format!("could not write user key to {}", path.display()))?;
                info!(path = %path.display(), "registration successful, saved user key");
            }
            None => {
                info!(
                    user_key = %user,
                    "registration successful, use this key as HUE_USER or with --user"
                );
            }
        }

        return Ok(());
    }

    // Steady state: resolve the credential and serve
    let env_user = std::env::var(credentials::CREDENTIAL_ENV).ok();
    let user = credentials::resolve(
        args.user.as_deref(),
        env_user.as_deref(),
        args.user_key_path.as_deref(),
    )?;
    client.set_user(user);

    let config = ExporterConfig::new(args.metrics_port, &args.metrics_path)?;

    let collector = Arc::new(MetricCollector::new());
    let server = HttpServer::new(collector.clone(), config.listen, config.path.clone());
    let poller = SensorPoller::new(client, collector);

    info!(addr = %config.listen, path = %config.path, "starting prometheus metrics");

    let http_task = tokio::spawn(server.run());
    let poller_task = tokio::spawn(poller.run());

    tokio::select! {
        result = poller_task => match result {
            Ok(Err(e)) => Err(anyhow::Error::new(e).context("could not get sensors")),
            Ok(Ok(())) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("poller task failed: {}", e)),
        },
        result = http_task => match result {
            Ok(Err(e)) => Err(e.context("could not start prometheus")),
            Ok(Ok(())) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("HTTP task failed: {}", e)),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
            Ok(())
        }
    }
}
