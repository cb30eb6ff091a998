//! The configuration document, read once at startup.
//!
//! ```json
//! {
//!   "backendConfig": {
//!     "protocol": "http", "host": "localhost", "port": 8086,
//!     "organisation": "org", "bucket": "probes",
//!     "username": "user", "password": "secret"
//!   },
//!   "localConfig": { "displayNameSource": "eu-1" },
//!   "monitors": [{
//!     "displayNameTarget": "website", "intervalInMilliseconds": 5000,
//!     "timeoutInMilliseconds": 2000, "type": "simpleWebMonitor",
//!     "protocolName": "https", "destination": "example.org", "port": 443
//!   }]
//! }
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::monitor::models::{Kind, LocalIdentity, Monitor, Transport};

/// Errors that abort startup.
#[derive(Error, Debug)]
pub enum ConfigError {
  /// The document could not be read.
  #[error("Cannot read configuration: {0}")]
  Load(#[from] std::io::Error),

  /// The document is not a valid configuration.
  #[error("Cannot parse configuration: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Reasons a single monitor entry is skipped. Never fatal.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EntryError {
  #[error("Type not known or implemented: {0}")]
  UnknownType(String),

  #[error("Protocol {protocol:?} is not supported by {kind}")]
  UnsupportedProtocol { kind: Kind, protocol: String },

  #[error("Interval must be greater than zero")]
  ZeroInterval,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
  pub backend_config: BackendConfig,
  pub local_config: LocalConfig,
  #[serde(default)]
  pub monitors: Vec<MonitorEntry>,
}

/// Connection settings for the time-series backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
  pub protocol: String,
  pub host: String,
  pub port: u16,
  pub organisation: String,
  pub bucket: String,
  pub username: String,
  pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalConfig {
  pub display_name_source: String,
}

/// A monitor as written in the document, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorEntry {
  pub display_name_target: String,
  pub interval_in_milliseconds: u64,
  pub timeout_in_milliseconds: u64,
  #[serde(rename = "type")]
  pub kind: String,
  pub protocol_name: String,
  pub destination: String,
  pub port: u16,
}

impl BackendConfig {
  /// `protocol://host:port`
  pub fn url(&self) -> String {
    format!("{}://{}:{}", self.protocol, self.host, self.port)
  }

  /// `username:password`, the token form InfluxDB 1.8 accepts on its v2
  /// write endpoint.
  pub fn token(&self) -> String {
    format!("{}:{}", self.username, self.password)
  }
}

impl Config {
  /// Reads and parses the document at `path`.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path)?;

    Ok(content.parse()?)
  }

  pub fn identity(&self) -> LocalIdentity {
    LocalIdentity::new(self.local_config.display_name_source.as_str())
  }

  /// Validated monitor definitions, in document order. Each rejected entry
  /// is logged once and left out; the others are unaffected.
  pub fn monitors(&self) -> Vec<Monitor> {
    self
      .monitors
      .iter()
      .filter_map(|entry| match Monitor::try_from(entry) {
        Ok(monitor) => Some(monitor),
        Err(error) => {
          warn!(monitor = %entry.display_name_target, %error, "Skipping monitor");
          None
        }
      })
      .collect()
  }
}

impl FromStr for Config {
  type Err = serde_json::Error;

  fn from_str(content: &str) -> Result<Self, Self::Err> {
    serde_json::from_str(content)
  }
}

impl TryFrom<&MonitorEntry> for Monitor {
  type Error = EntryError;

  fn try_from(entry: &MonitorEntry) -> Result<Self, Self::Error> {
    let kind: Kind = entry.kind.parse().map_err(EntryError::UnknownType)?;

    if entry.interval_in_milliseconds == 0 {
      return Err(EntryError::ZeroInterval);
    }

    let protocol = entry.protocol_name.to_lowercase();
    let supported = match kind {
      Kind::Web => matches!(protocol.as_str(), "http" | "https"),
      Kind::Port => entry.protocol_name.parse::<Transport>().is_ok(),
      Kind::Ssl => entry
        .protocol_name
        .parse::<Transport>()
        .is_ok_and(|transport| !transport.is_datagram()),
    };

    if !supported {
      return Err(EntryError::UnsupportedProtocol {
        kind,
        protocol: entry.protocol_name.clone(),
      });
    }

    Ok(Monitor {
      name: entry.display_name_target.clone(),
      interval: Duration::from_millis(entry.interval_in_milliseconds),
      timeout: Duration::from_millis(entry.timeout_in_milliseconds),
      kind,
      protocol,
      destination: entry.destination.clone(),
      port: entry.port,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::io::{self, Write};
  use std::sync::{Arc, Mutex};

  use tracing_subscriber::fmt::MakeWriter;

  use super::*;

  /// Collects formatted log output in memory.
  #[derive(Clone, Default)]
  struct Logs(Arc<Mutex<Vec<u8>>>);

  impl Logs {
    fn lines(&self) -> Vec<String> {
      String::from_utf8_lossy(&self.0.lock().unwrap())
        .lines()
        .map(String::from)
        .collect()
    }
  }

  impl Write for Logs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
      Ok(())
    }
  }

  impl<'a> MakeWriter<'a> for Logs {
    type Writer = Logs;

    fn make_writer(&'a self) -> Self::Writer {
      self.clone()
    }
  }

  const DOCUMENT: &str = r#"{
    "backendConfig": {
      "protocol": "http",
      "host": "influx",
      "port": 8086,
      "organisation": "org",
      "bucket": "probes",
      "username": "user",
      "password": "secret"
    },
    "localConfig": { "displayNameSource": "eu-1" },
    "monitors": [
      {
        "displayNameTarget": "db",
        "intervalInMilliseconds": 100,
        "timeoutInMilliseconds": 50,
        "type": "simplePortMonitor",
        "protocolName": "tcp",
        "destination": "10.0.0.5",
        "port": 5432
      },
      {
        "displayNameTarget": "foo",
        "intervalInMilliseconds": 100,
        "timeoutInMilliseconds": 50,
        "type": "simpleFooMonitor",
        "protocolName": "tcp",
        "destination": "10.0.0.6",
        "port": 1
      },
      {
        "displayNameTarget": "site",
        "intervalInMilliseconds": 500,
        "timeoutInMilliseconds": 2000,
        "type": "simpleWebMonitor",
        "protocolName": "HTTPS",
        "destination": "example.org",
        "port": 443
      },
      {
        "displayNameTarget": "cert",
        "intervalInMilliseconds": 60000,
        "timeoutInMilliseconds": 2000,
        "type": "simpleSSLMonitor",
        "protocolName": "tcp",
        "destination": "example.org",
        "port": 443
      }
    ]
  }"#;

  fn entry(kind: &str, protocol: &str, interval: u64) -> MonitorEntry {
    MonitorEntry {
      display_name_target: String::from("entry"),
      interval_in_milliseconds: interval,
      timeout_in_milliseconds: 10,
      kind: String::from(kind),
      protocol_name: String::from(protocol),
      destination: String::from("localhost"),
      port: 1,
    }
  }

  #[test]
  fn parses_document() {
    let config: Config = DOCUMENT.parse().unwrap();

    assert_eq!(config.backend_config.url(), "http://influx:8086");
    assert_eq!(config.backend_config.token(), "user:secret");
    assert_eq!(config.identity(), LocalIdentity::new("eu-1"));
    assert_eq!(config.monitors.len(), 4);
  }

  #[test]
  fn unknown_type_is_skipped() {
    let config: Config = DOCUMENT.parse().unwrap();
    let monitors = config.monitors();

    let names: Vec<_> = monitors.iter().map(|monitor| monitor.name.as_str()).collect();
    assert_eq!(names, vec!["db", "site", "cert"], "siblings of an unknown type are kept");

    assert_eq!(monitors[0].kind, Kind::Port);
    assert_eq!(monitors[0].interval, Duration::from_millis(100));
    assert_eq!(monitors[0].timeout, Duration::from_millis(50));
    assert_eq!(monitors[1].protocol, "https", "scheme is normalized");
    assert_eq!(monitors[2].kind, Kind::Ssl);
  }

  #[test]
  fn unknown_type_is_logged_once() {
    let config: Config = DOCUMENT.parse().unwrap();
    let logs = Logs::default();
    let subscriber = tracing_subscriber::fmt()
      .with_writer(logs.clone())
      .with_ansi(false)
      .without_time()
      .finish();

    let monitors = tracing::subscriber::with_default(subscriber, || config.monitors());

    let lines = logs.lines();
    assert_eq!(monitors.len(), 3);
    assert_eq!(lines.len(), 1, "one event for the skipped entry: {lines:?}");
    assert!(lines[0].contains("WARN"));
    assert!(lines[0].contains("monitor=foo"));
    assert!(lines[0].contains("simpleFooMonitor"));
  }

  #[test]
  fn entry_validation() {
    assert_eq!(
      Monitor::try_from(&entry("simpleFooMonitor", "tcp", 10)),
      Err(EntryError::UnknownType(String::from("simpleFooMonitor")))
    );
    assert_eq!(
      Monitor::try_from(&entry("simplePortMonitor", "tcp", 0)),
      Err(EntryError::ZeroInterval)
    );
    assert_eq!(
      Monitor::try_from(&entry("simpleWebMonitor", "ftp", 10)),
      Err(EntryError::UnsupportedProtocol {
        kind: Kind::Web,
        protocol: String::from("ftp"),
      })
    );
    assert!(Monitor::try_from(&entry("simpleSSLMonitor", "udp", 10)).is_err());
    assert!(Monitor::try_from(&entry("simplePortMonitor", "udp", 10)).is_ok());
  }

  #[test]
  fn malformed_document_is_a_parse_error() {
    let mut file = std::env::temp_dir();
    file.push(format!("probe-core-malformed-{}.json", std::process::id()));
    fs::File::create(&file).unwrap().write_all(b"{ \"monitors\": [").unwrap();

    let result = Config::load(&file);
    let _ = fs::remove_file(&file);

    assert!(matches!(result, Err(ConfigError::Parse(_))));
  }

  #[test]
  fn missing_document_is_a_load_error() {
    let result = Config::load("/nonexistent/monitoring_config.json");

    assert!(matches!(result, Err(ConfigError::Load(_))));
  }

  #[test]
  fn missing_section_is_a_parse_error() {
    let result = "{ \"monitors\": [] }".parse::<Config>();

    assert!(result.is_err(), "backend and local sections are required");
  }
}
