//! The asynchronous write path to the time-series backend.
//!
//! A [`Sink`] is a cheap, cloneable handle shared by every probe. Writing a
//! point only pushes it onto an unbounded queue; a single background task
//! batches queued points and hands each batch to a [`Writer`] on the
//! blocking pool. A failed batch is reported once on the [`SinkErrors`]
//! channel and dropped, it is never retried and no caller learns about it.
//!
//! # Example
//!
//! ```rust, no_run
//! use probe_core::sink::{InfluxWriter, Point, Sink, SinkOptions};
//!
//! async fn write_one() {
//!   let writer = InfluxWriter::new("http://localhost:8086", "user:pass", "org", "bucket");
//!   let (sink, errors) = Sink::new(writer, SinkOptions::default());
//!   tokio::spawn(errors.drain());
//!
//!   sink.write(Point::new("simplePortMonitor").field("isOnline", true));
//!   sink.close().await;
//! }
//!
//! # tokio_test::block_on(async {
//! write_one().await;
//! # })
//! ```

mod errors;
mod influx;
mod line_protocol;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tokio::task;
use tracing::{debug, error};

pub use errors::SinkError;
pub use influx::InfluxWriter;
pub use line_protocol::{FieldValue, Point};

/// Delivers one batch of points to the backend.
///
/// Called on the blocking pool, implementations may block on I/O.
pub trait Writer: Send + Sync + 'static {
  fn write(&self, points: &[Point]) -> Result<(), SinkError>;
}

/// Batching behaviour of a [`Sink`].
#[derive(Debug, Clone)]
pub struct SinkOptions {
  /// Number of queued points that triggers a flush.
  pub batch_size: usize,

  /// Longest time a point waits in the queue.
  pub flush_interval: Duration,
}

impl Default for SinkOptions {
  fn default() -> Self {
    Self {
      batch_size: 5000,
      flush_interval: Duration::from_secs(1),
    }
  }
}

enum Command {
  Point(Point),
  Flush(oneshot::Sender<()>),
  Close(oneshot::Sender<()>),
}

/// Handle to the background batching task.
#[derive(Clone)]
pub struct Sink {
  commands: mpsc::UnboundedSender<Command>,
}

/// Receiving end of the sink's write error channel.
pub struct SinkErrors {
  errors: mpsc::UnboundedReceiver<SinkError>,
}

impl Sink {
  /// Spawns the batching task on the current runtime.
  ///
  /// The task stops after [`close`](Sink::close), or once every handle is
  /// dropped, flushing whatever is still queued.
  pub fn new<W: Writer>(writer: W, options: SinkOptions) -> (Sink, SinkErrors) {
    let (commands, receiver) = mpsc::unbounded_channel();
    let (errors_tx, errors) = mpsc::unbounded_channel();

    tokio::spawn(run(Arc::new(writer), options, receiver, errors_tx));

    (Sink { commands }, SinkErrors { errors })
  }

  /// Queues a point. Never blocks; points written after the sink closed are
  /// dropped.
  pub fn write(&self, point: Point) {
    if self.commands.send(Command::Point(point)).is_err() {
      debug!("Sink is closed, dropping point");
    }
  }

  /// Writes everything queued so far and waits for it.
  pub async fn flush(&self) {
    let (done, wait) = oneshot::channel();

    if self.commands.send(Command::Flush(done)).is_ok() {
      let _ = wait.await;
    }
  }

  /// Flushes and stops the batching task.
  pub async fn close(&self) {
    let (done, wait) = oneshot::channel();

    if self.commands.send(Command::Close(done)).is_ok() {
      let _ = wait.await;
    }
  }
}

impl SinkErrors {
  /// Waits for the next write error. Returns `None` once the sink stopped.
  pub async fn recv(&mut self) -> Option<SinkError> {
    self.errors.recv().await
  }

  /// Logs and discards every write error until the sink stops.
  pub async fn drain(mut self) {
    while let Some(error) = self.recv().await {
      error!(%error, "Backend write error");
    }
  }
}

async fn run<W: Writer>(
  writer: Arc<W>,
  options: SinkOptions,
  mut commands: mpsc::UnboundedReceiver<Command>,
  errors: mpsc::UnboundedSender<SinkError>,
) {
  let batch_size = options.batch_size.max(1);
  let mut batch = Vec::with_capacity(batch_size.min(1024));
  let mut ticker = time::interval(options.flush_interval.max(Duration::from_millis(1)));
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    tokio::select! {
      command = commands.recv() => match command {
        Some(Command::Point(point)) => {
          batch.push(point);

          if batch.len() >= batch_size {
            flush(&writer, &mut batch, &errors).await;
          }
        }
        Some(Command::Flush(done)) => {
          flush(&writer, &mut batch, &errors).await;
          let _ = done.send(());
        }
        Some(Command::Close(done)) => {
          flush(&writer, &mut batch, &errors).await;
          let _ = done.send(());
          break;
        }
        None => {
          flush(&writer, &mut batch, &errors).await;
          break;
        }
      },
      _ = ticker.tick() => flush(&writer, &mut batch, &errors).await,
    }
  }

  debug!("Sink stopped");
}

async fn flush<W: Writer>(writer: &Arc<W>, batch: &mut Vec<Point>, errors: &mpsc::UnboundedSender<SinkError>) {
  if batch.is_empty() {
    return;
  }

  let points = std::mem::take(batch);
  let writer = Arc::clone(writer);

  let result = match task::spawn_blocking(move || writer.write(&points)).await {
    Ok(result) => result,
    Err(error) => Err(error.into()),
  };

  if let Err(error) = result {
    let _ = errors.send(error);
  }
}
