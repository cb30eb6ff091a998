use std::net::{IpAddr, SocketAddr, TcpStream};
use std::time::Duration;

use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::error::ErrorStack;
use openssl::nid::Nid;
use openssl::ssl::{SslConnector, SslMethod};
use openssl::x509::X509Ref;
use tokio::{task, time};
use tracing::warn;

use crate::monitor::collectors::resolve;
use crate::monitor::errors::SslError;
use crate::monitor::models::{Monitor, Transport};

/// The parts of a leaf certificate a probe records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
  pub common_name: String,

  /// Unix time in seconds.
  pub not_before: i64,

  /// Unix time in seconds.
  pub not_after: i64,
}

impl Certificate {
  pub fn from_x509(certificate: &X509Ref) -> Result<Self, ErrorStack> {
    let common_name = match certificate.subject_name().entries_by_nid(Nid::COMMONNAME).next() {
      Some(entry) => entry.data().to_string()?,
      None => String::new(),
    };

    Ok(Self {
      common_name,
      not_before: unix_seconds(certificate.not_before())?,
      not_after: unix_seconds(certificate.not_after())?,
    })
  }
}

fn unix_seconds(time: &Asn1TimeRef) -> Result<i64, ErrorStack> {
  let diff = Asn1Time::from_unix(0)?.diff(time)?;

  Ok(i64::from(diff.days) * 86_400 + i64::from(diff.secs))
}

pub struct Ssl;

impl Ssl {
  /// Performs a TLS handshake with the monitor's destination using the
  /// system trust store and host name verification.
  ///
  /// Returns the leaf of the verified chain, or `None` when the handshake
  /// succeeded but no readable leaf came out of it.
  pub async fn measure(monitor: &Monitor) -> Result<Option<Certificate>, SslError> {
    let connector = SslConnector::builder(SslMethod::tls_client())?.build();

    Self::measure_with(monitor, connector).await
  }

  /// [`measure`](Ssl::measure) against the trust settings of `connector`.
  pub(crate) async fn measure_with(
    monitor: &Monitor,
    connector: SslConnector,
  ) -> Result<Option<Certificate>, SslError> {
    let transport = monitor
      .transport()
      .ok()
      .filter(|transport| !transport.is_datagram())
      .ok_or_else(|| SslError::UnsupportedProtocol {
        protocol: monitor.protocol.clone(),
      })?;

    time::timeout(monitor.timeout, Self::connect(monitor, transport, connector))
      .await
      .map_err(|_| SslError::Timeout {
        addr: monitor.address(),
        timeout_ms: monitor.timeout.as_millis(),
      })?
  }

  async fn connect(
    monitor: &Monitor,
    transport: Transport,
    connector: SslConnector,
  ) -> Result<Option<Certificate>, SslError> {
    let addresses = resolve::lookup(&monitor.destination, transport).await?;
    let host = monitor.destination.clone();
    let port = monitor.port;
    let timeout = monitor.timeout;

    task::spawn_blocking(move || Self::handshake(&connector, &host, &addresses, port, timeout)).await?
  }

  fn handshake(
    connector: &SslConnector,
    host: &str,
    addresses: &[IpAddr],
    port: u16,
    timeout: Duration,
  ) -> Result<Option<Certificate>, SslError> {
    let stream = Self::open(host, addresses, port, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let stream = connector.connect(host.trim_matches(|c| c == '[' || c == ']'), stream)?;

    let leaf = stream
      .ssl()
      .verified_chain()
      .and_then(|chain| chain.get(0))
      .map(Certificate::from_x509);

    Ok(Self::readable_leaf(host, leaf))
  }

  /// A handshake that went through stays a success even when its leaf is
  /// missing or unreadable; the certificate fields then keep their defaults.
  fn readable_leaf(host: &str, leaf: Option<Result<Certificate, ErrorStack>>) -> Option<Certificate> {
    match leaf {
      Some(Ok(certificate)) => Some(certificate),
      Some(Err(error)) => {
        warn!(host, %error, "Cannot read leaf certificate");
        None
      }
      None => {
        warn!(host, "Handshake succeeded without a verified chain");
        None
      }
    }
  }

  fn open(host: &str, addresses: &[IpAddr], port: u16, timeout: Duration) -> Result<TcpStream, SslError> {
    let mut last_error = None;

    for address in addresses {
      match TcpStream::connect_timeout(&SocketAddr::new(*address, port), timeout) {
        Ok(stream) => return Ok(stream),
        Err(error) => last_error = Some(error),
      }
    }

    Err(match last_error {
      Some(error) => error.into(),
      None => SslError::NoAddress {
        host: host.to_owned(),
      },
    })
  }
}
