use std::env;

use anyhow::{Context, Result};
use probe_core::config::Config;
use probe_core::schedule::Shutdown;
use probe_core::sink::{InfluxWriter, Sink, SinkOptions};
use probe_core::supervisor::Supervisor;
use tokio::signal;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "monitoring_config.json";

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
    )
    .init();

  info!("Starting probe-core");

  let path = env::args().nth(1).unwrap_or_else(|| String::from(DEFAULT_CONFIG_PATH));
  let config = Config::load(&path).with_context(|| format!("Failed to load {}", path))?;
  info!(%path, "Parsed configuration");

  let identity = config.identity();
  info!(source = %identity.source, "Using source name");

  let backend = &config.backend_config;
  let writer = InfluxWriter::new(&backend.url(), &backend.token(), &backend.organisation, &backend.bucket);
  let (sink, errors) = Sink::new(writer, SinkOptions::default());
  tokio::spawn(errors.drain());
  info!(url = %backend.url(), bucket = %backend.bucket, "Setup backend done");

  // Graceful stop on Ctrl-C; without it the monitors run until killed.
  let (trigger, shutdown) = Shutdown::channel();
  tokio::spawn(async move {
    if signal::ctrl_c().await.is_ok() {
      info!("Shutdown signal received");
      let _ = trigger.send(true);
    }
  });

  Supervisor::new(config.monitors(), identity, sink.clone())
    .run_until(shutdown)
    .await;

  sink.close().await;

  Ok(())
}
