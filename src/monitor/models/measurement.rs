use time::OffsetDateTime;

use crate::monitor::errors::ProbeError;
use crate::monitor::models::Kind;
use crate::sink::Point;

/// Common name recorded when no certificate could be inspected.
pub const CN_NOT_OBTAINED: &str = "notObtained";

/// Represents a single probe performed by a monitor.
///
/// Exactly one `Measurement` exists per executed probe. A failed probe still
/// produces one, carrying a negative [`Outcome`] and the error that caused it.
#[derive(Debug)]
pub struct Measurement {
  /// Instant the probe started.
  pub timestamp: OffsetDateTime,

  /// Display name of the monitor that produced this measurement.
  pub name: String,

  /// Identity of the process that ran the probe.
  pub source: String,

  /// Normalized probe result.
  pub outcome: Outcome,

  /// Error that turned the outcome negative, kept for logging only.
  pub error: Option<ProbeError>,
}

/// The normalized result of a probe, one variant per monitor kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Port(PortOutcome),
  Web(WebOutcome),
  Ssl(SslOutcome),
}

/// Result of a port probe.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortOutcome {
  pub is_online: bool,

  /// Milliseconds from probe start to connect or failure.
  pub response_time: i64,
}

/// Result of a web probe.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WebOutcome {
  pub is_online: bool,

  /// Received status code, `0` when no response arrived.
  pub status_code: u16,

  /// Milliseconds from probe start until the response headers were
  /// available, or until the failure.
  pub response_time: i64,
}

/// Result of an SSL probe.
#[derive(Debug, Clone, PartialEq)]
pub struct SslOutcome {
  pub is_online: bool,

  /// Subject common name of the leaf certificate.
  pub common_name: String,

  /// Milliseconds from probe start until the certificate expires,
  /// negative once it has expired.
  pub time_to_expire: i64,

  /// Milliseconds since the certificate became valid, negative while it is
  /// not valid yet.
  pub time_since_valid: i64,
}

impl Default for SslOutcome {
  fn default() -> Self {
    Self {
      is_online: false,
      common_name: String::from(CN_NOT_OBTAINED),
      time_to_expire: 0,
      time_since_valid: 0,
    }
  }
}

impl Outcome {
  pub fn kind(&self) -> Kind {
    match self {
      Outcome::Port(_) => Kind::Port,
      Outcome::Web(_) => Kind::Web,
      Outcome::Ssl(_) => Kind::Ssl,
    }
  }

  pub fn is_online(&self) -> bool {
    match self {
      Outcome::Port(outcome) => outcome.is_online,
      Outcome::Web(outcome) => outcome.is_online,
      Outcome::Ssl(outcome) => outcome.is_online,
    }
  }
}

impl From<&Measurement> for Point {
  fn from(measurement: &Measurement) -> Self {
    let point = Point::new(measurement.outcome.kind().as_str())
      .tag("name", measurement.name.as_str())
      .tag("source", measurement.source.as_str())
      .timestamp(measurement.timestamp);

    match &measurement.outcome {
      Outcome::Port(outcome) => point
        .field("responseTime", outcome.response_time)
        .field("isOnline", outcome.is_online),
      Outcome::Web(outcome) => point
        .field("statusCode", outcome.status_code)
        .field("responseTime", outcome.response_time)
        .field("isOnline", outcome.is_online),
      Outcome::Ssl(outcome) => point
        .field("commonName", outcome.common_name.as_str())
        .field("isOnline", outcome.is_online)
        .field("timeToExpire", outcome.time_to_expire)
        .field("timeSinceValid", outcome.time_since_valid),
    }
  }
}
