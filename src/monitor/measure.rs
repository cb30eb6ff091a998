use std::sync::Arc;
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use tracing::debug;

use crate::monitor::collectors::{Certificate, Port, Ssl, Web};
use crate::monitor::models::{
  Kind, LocalIdentity, Measurement, Monitor, Outcome, PortOutcome, SslOutcome, WebOutcome,
};
use crate::schedule::Schedulable;
use crate::sink::{Point, Sink};

#[doc(hidden)]
#[macro_export]
macro_rules! measure {
  ($block:block) => {{
    let start = std::time::Instant::now();
    let result = { $block };

    (result, start.elapsed())
  }};
}

/// Whole milliseconds of `elapsed`, as stored in measurements.
pub(crate) fn millis(elapsed: Duration) -> i64 {
  i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
}

impl SslOutcome {
  /// Builds an online outcome from the leaf certificate of a handshake that
  /// started at `started`. Both spans are signed and unclamped.
  pub fn from_certificate(certificate: &Certificate, started: OffsetDateTime) -> Self {
    let started_ms = i64::try_from(started.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX);

    Self {
      is_online: true,
      common_name: certificate.common_name.clone(),
      time_to_expire: certificate.not_after.saturating_mul(1000).saturating_sub(started_ms),
      time_since_valid: started_ms.saturating_sub(certificate.not_before.saturating_mul(1000)),
    }
  }
}

impl Monitor {
  /// Performs one probe for this monitor.
  ///
  /// The exact behavior depends on the monitor's [`Kind`]:
  ///
  /// - **`Kind::Port`** – Opens and immediately closes a connection.
  /// - **`Kind::Web`** – Sends a `GET` and waits for the response head.
  /// - **`Kind::Ssl`** – Performs a verified TLS handshake and reads the
  ///   leaf certificate.
  ///
  /// Never fails: a probe error yields the negative outcome of its kind and
  /// is kept in [`error`](Measurement#structfield.error). Response times are
  /// wall-clock and recorded either way.
  pub async fn measure(&self, identity: &LocalIdentity) -> Measurement {
    let timestamp = OffsetDateTime::now_utc();
    let started = Instant::now();

    let (outcome, error) = match self.kind {
      Kind::Port => {
        let (result, elapsed) = measure!({ Port::measure(self).await });
        let outcome = PortOutcome {
          is_online: result.is_ok(),
          response_time: millis(elapsed),
        };

        (Outcome::Port(outcome), result.err().map(Into::into))
      }
      Kind::Web => match Web::measure(self, started).await {
        Ok(response) => {
          let outcome = WebOutcome {
            is_online: true,
            status_code: response.status_code,
            response_time: millis(response.elapsed),
          };

          (Outcome::Web(outcome), None)
        }
        Err(error) => {
          let outcome = WebOutcome {
            response_time: millis(started.elapsed()),
            ..Default::default()
          };

          (Outcome::Web(outcome), Some(error.into()))
        }
      },
      Kind::Ssl => match Ssl::measure(self).await {
        Ok(Some(certificate)) => (
          Outcome::Ssl(SslOutcome::from_certificate(&certificate, timestamp)),
          None,
        ),
        Ok(None) => {
          let outcome = SslOutcome {
            is_online: true,
            ..Default::default()
          };

          (Outcome::Ssl(outcome), None)
        }
        Err(error) => (Outcome::Ssl(SslOutcome::default()), Some(error.into())),
      },
    };

    Measurement {
      timestamp,
      name: self.name.clone(),
      source: identity.source.clone(),
      outcome,
      error,
    }
  }
}

/// A monitor bound to everything one of its probes needs: the identity to
/// tag points with and the sink to submit them to.
pub struct Probe {
  monitor: Monitor,
  identity: LocalIdentity,
  sink: Sink,
}

impl Probe {
  pub fn new(monitor: Monitor, identity: LocalIdentity, sink: Sink) -> Self {
    Self {
      monitor,
      identity,
      sink,
    }
  }

  /// Measures once and submits the resulting point.
  pub async fn run(&self) {
    let measurement = self.monitor.measure(&self.identity).await;

    if let Some(error) = &measurement.error {
      debug!(monitor = %self.monitor.name, kind = %self.monitor.kind, %error, "Probe failed");
    }

    self.sink.write(Point::from(&measurement));
  }
}

impl Schedulable for Probe {
  type Id = String;

  fn get_id(&self) -> Self::Id {
    self.monitor.name.clone()
  }

  fn get_interval(&self) -> Duration {
    self.monitor.interval
  }

  async fn fire(self: Arc<Self>) {
    self.run().await
  }
}
