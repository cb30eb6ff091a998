//! Starts one scheduler per monitor and keeps them alive.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::monitor::Probe;
use crate::monitor::models::{LocalIdentity, Monitor};
use crate::schedule::{ScheduleOptions, Scheduler, Shutdown};
use crate::sink::Sink;

pub struct Supervisor {
  monitors: Vec<Monitor>,
  identity: LocalIdentity,
  sink: Sink,
  options: ScheduleOptions,
}

impl Supervisor {
  pub fn new(monitors: Vec<Monitor>, identity: LocalIdentity, sink: Sink) -> Self {
    Self {
      monitors,
      identity,
      sink,
      options: ScheduleOptions::default(),
    }
  }

  /// Applies `options` to every scheduler, e.g. to bound concurrent probes
  /// per monitor.
  pub fn with_options(mut self, options: ScheduleOptions) -> Self {
    self.options = options;
    self
  }

  /// Runs every monitor until the process is terminated.
  pub async fn run(self) {
    self.run_until(Shutdown::never()).await
  }

  /// Runs every monitor until `shutdown` fires, then flushes the sink.
  /// Probes in flight at that point finish on their own and their points
  /// may miss the flush.
  pub async fn run_until(self, shutdown: Shutdown) {
    info!(count = self.monitors.len(), "Starting monitors");

    let mut schedulers = JoinSet::new();

    for monitor in self.monitors {
      let probe = Probe::new(monitor, self.identity.clone(), self.sink.clone());
      let scheduler = Scheduler::new(Arc::new(probe), self.options.clone());

      schedulers.spawn(scheduler.run(shutdown.clone()));
    }

    while let Some(result) = schedulers.join_next().await {
      if let Err(error) = result {
        error!(%error, "Scheduler task failed");
      }
    }

    self.sink.flush().await;
    info!("All monitors stopped");
  }
}
