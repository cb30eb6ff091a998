use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

/// A single monitor definition, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
  /// Display name of the target, written as the `name` tag.
  pub name: String,

  /// How often the monitor should perform a check.
  pub interval: Duration,

  /// Upper bound for the I/O of one check.
  pub timeout: Duration,

  /// Which check this monitor runs.
  pub kind: Kind,

  /// Transport (`tcp`, `udp`, ...) for port and SSL checks, scheme
  /// (`http` or `https`) for web checks.
  pub protocol: String,

  /// Host name or address, without scheme or port.
  pub destination: String,

  /// Destination port.
  pub port: u16,
}

/// The check a monitor performs.
///
/// The string form doubles as the measurement name of every point the
/// monitor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
  /// Raw transport reachability.
  Port,

  /// HTTP endpoint liveness.
  Web,

  /// TLS certificate validity.
  Ssl,
}

impl Kind {
  pub const fn as_str(&self) -> &'static str {
    match self {
      Kind::Port => "simplePortMonitor",
      Kind::Web => "simpleWebMonitor",
      Kind::Ssl => "simpleSSLMonitor",
    }
  }
}

impl fmt::Display for Kind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Kind {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "simplePortMonitor" => Ok(Kind::Port),
      "simpleWebMonitor" => Ok(Kind::Web),
      "simpleSSLMonitor" => Ok(Kind::Ssl),
      other => Err(other.to_owned()),
    }
  }
}

/// Transport used by port and SSL checks, named the way the configuration
/// names it. The `4`/`6` suffixes restrict resolution to one address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
  Tcp,
  Tcp4,
  Tcp6,
  Udp,
  Udp4,
  Udp6,
}

impl Transport {
  /// Whether this transport is datagram based.
  pub fn is_datagram(&self) -> bool {
    matches!(self, Transport::Udp | Transport::Udp4 | Transport::Udp6)
  }

  /// Whether `address` belongs to the family this transport allows.
  pub fn accepts(&self, address: &IpAddr) -> bool {
    match self {
      Transport::Tcp | Transport::Udp => true,
      Transport::Tcp4 | Transport::Udp4 => address.is_ipv4(),
      Transport::Tcp6 | Transport::Udp6 => address.is_ipv6(),
    }
  }
}

impl FromStr for Transport {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.to_lowercase().as_str() {
      "tcp" => Ok(Transport::Tcp),
      "tcp4" => Ok(Transport::Tcp4),
      "tcp6" => Ok(Transport::Tcp6),
      "udp" => Ok(Transport::Udp),
      "udp4" => Ok(Transport::Udp4),
      "udp6" => Ok(Transport::Udp6),
      _ => Err(value.to_owned()),
    }
  }
}

/// Identity of this process instance, written as the `source` tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalIdentity {
  pub source: String,
}

impl LocalIdentity {
  pub fn new(source: impl Into<String>) -> Self {
    Self {
      source: source.into(),
    }
  }
}

impl Monitor {
  /// Parses the configured protocol as a transport.
  ///
  /// Only meaningful for port and SSL monitors.
  pub fn transport(&self) -> Result<Transport, String> {
    self.protocol.parse()
  }

  /// `destination:port`, bracketing IPv6 literals.
  pub fn address(&self) -> String {
    match self.destination.parse::<IpAddr>() {
      Ok(IpAddr::V6(address)) => format!("[{}]:{}", address, self.port),
      _ => format!("{}:{}", self.destination, self.port),
    }
  }
}
