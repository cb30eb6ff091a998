//! A module for firing scheduled items at a fixed cadence.
//!
//! The [`schedule`](crate::schedule) module runs one timer per item. Each
//! item must implement the [`Schedulable`] trait, which defines an
//! identifier, an interval and the work to do on every tick.
//!
//! Every tick spawns the item's work as a detached task and goes straight
//! back to waiting, so a slow run never delays the next tick. Runs of the
//! same item overlap when one outlives the interval, unless
//! [`ScheduleOptions::max_in_flight`] caps them.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! use probe_core::schedule::{Schedulable, ScheduleOptions, Scheduler, Shutdown};
//!
//! struct Task {
//!     runs: AtomicUsize,
//! }
//!
//! impl Schedulable for Task {
//!     type Id = &'static str;
//!
//!     fn get_id(&self) -> Self::Id { "task" }
//!     fn get_interval(&self) -> Duration { Duration::from_millis(10) }
//!
//!     async fn fire(self: Arc<Self>) {
//!         self.runs.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let task = Arc::new(Task { runs: AtomicUsize::new(0) });
//! let (trigger, shutdown) = Shutdown::channel();
//! let handle = Scheduler::new(Arc::clone(&task), ScheduleOptions::default()).spawn(shutdown);
//!
//! tokio::time::sleep(Duration::from_millis(55)).await;
//! trigger.send(true).unwrap();
//! handle.await.unwrap();
//!
//! assert!(task.runs.load(Ordering::SeqCst) >= 1);
//! # })
//! ```

use std::fmt::Display;
use std::future::{self, Future};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// A trait for items that can be scheduled.
pub trait Schedulable: Send + Sync + 'static {
  /// Identifier used in logs.
  type Id: Display + Send + Sync;

  /// Returns the identifier of the item.
  fn get_id(&self) -> Self::Id;

  /// Returns the time between two ticks. Read once, when the scheduler
  /// starts.
  fn get_interval(&self) -> Duration;

  /// The work done on every tick.
  fn fire(self: Arc<Self>) -> impl Future<Output = ()> + Send + 'static;
}

/// Tuning for a [`Scheduler`].
#[derive(Debug, Clone, Default)]
pub struct ScheduleOptions {
  /// Upper bound on concurrent runs of one item. A tick that finds the
  /// bound reached is skipped. `None` leaves runs unbounded.
  pub max_in_flight: Option<usize>,
}

/// Stop signal for schedulers.
///
/// A scheduler holding [`Shutdown::never`] runs until the process exits.
/// Runs that are already in flight are not cancelled either way.
#[derive(Debug, Clone)]
pub struct Shutdown {
  signal: Option<watch::Receiver<bool>>,
}

impl Shutdown {
  /// A signal that never fires.
  pub fn never() -> Self {
    Self { signal: None }
  }

  /// A signal fired by sending `true` through the returned sender. Dropping
  /// the sender without sending leaves the signal unfired.
  pub fn channel() -> (watch::Sender<bool>, Self) {
    let (trigger, signal) = watch::channel(false);

    (trigger, Self { signal: Some(signal) })
  }

  pub fn is_fired(&self) -> bool {
    self.signal.as_ref().is_some_and(|signal| *signal.borrow())
  }

  /// Resolves once the signal fires.
  pub async fn wait(&mut self) {
    let Some(signal) = self.signal.as_mut() else {
      return future::pending().await;
    };

    while !*signal.borrow_and_update() {
      if signal.changed().await.is_err() {
        return future::pending().await;
      }
    }
  }
}

/// Fires one [`Schedulable`] item at a fixed cadence.
pub struct Scheduler<Item: Schedulable> {
  item: Arc<Item>,
  guard: Option<Arc<Semaphore>>,
}

impl<Item: Schedulable> Scheduler<Item> {
  pub fn new(item: Arc<Item>, options: ScheduleOptions) -> Self {
    Self {
      item,
      guard: options
        .max_in_flight
        .map(|limit| Arc::new(Semaphore::new(limit.max(1)))),
    }
  }

  /// Spawns [`run`](Scheduler::run) as a task on the current runtime.
  pub fn spawn(self, shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(self.run(shutdown))
  }

  /// Ticks until `shutdown` fires.
  ///
  /// The first tick comes one interval after the start. Ticks missed
  /// while the runtime was busy are skipped, not caught up.
  pub async fn run(self, mut shutdown: Shutdown) {
    let id = self.item.get_id();
    let interval = self.item.get_interval();

    if interval.is_zero() {
      warn!(%id, "Zero interval, not scheduling");
      return;
    }

    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(%id, interval_ms = interval.as_millis(), "Scheduler started");

    loop {
      tokio::select! {
        _ = ticker.tick() => self.tick(&id),
        _ = shutdown.wait() => break,
      }
    }

    debug!(%id, "Scheduler stopped");
  }

  fn tick(&self, id: &Item::Id) {
    let permit = match &self.guard {
      None => None,
      Some(guard) => match Arc::clone(guard).try_acquire_owned() {
        Ok(permit) => Some(permit),
        Err(_) => {
          debug!(%id, "Previous runs still in flight, skipping tick");
          return;
        }
      },
    };

    let run = Arc::clone(&self.item).fire();

    tokio::spawn(async move {
      run.await;
      drop(permit);
    });
  }
}
