//! A module describing probe errors.
//!
//! None of these leave the probe that raised them: a failed probe is turned
//! into a negative outcome and the error is only logged.

use std::net::TcpStream;

use thiserror::Error;

/// Represents all possible errors that can occur during a probe.
///
/// Wraps specific errors for port, web and SSL probes.
#[derive(Error, Debug)]
pub enum ProbeError {
  /// An error occurred during a port probe.
  #[error("Port error: {0}")]
  Port(#[from] PortError),

  /// An error occurred during a web probe.
  #[error("Web error: {0}")]
  Web(#[from] WebError),

  /// An error occurred during an SSL probe.
  #[error("SSL error: {0}")]
  Ssl(#[from] SslError),
}

/// Errors that can occur during a port probe.
#[derive(Error, Debug)]
pub enum PortError {
  /// DNS resolution failed for the target host.
  #[error("DNS resolve error: {0}")]
  Dns(#[from] trust_dns_resolver::error::ResolveError),

  /// The host resolved to no address usable with the transport.
  #[error("No usable address for {host:?}")]
  NoAddress { host: String },

  /// The configured protocol is not a known transport.
  #[error("Unsupported protocol {protocol:?}")]
  UnsupportedProtocol { protocol: String },

  /// No connection was established within the timeout.
  #[error("No connection to {addr:?} within {timeout_ms}ms")]
  Timeout { addr: String, timeout_ms: u128 },

  /// The connection attempt failed.
  #[error("Connect error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors that can occur during a web probe.
#[derive(Error, Debug)]
pub enum WebError {
  /// The request failed before a response arrived.
  #[error("Transport error: {0}")]
  Transport(#[from] curl::Error),

  /// The request finished without a status line.
  #[error("No response status received")]
  NoResponse,

  /// The blocking request task did not complete.
  #[error("Request task failed: {0}")]
  Aborted(#[from] tokio::task::JoinError),
}

/// Errors that can occur during an SSL probe.
#[derive(Error, Debug)]
pub enum SslError {
  /// DNS resolution failed for the target host.
  #[error("DNS resolve error: {0}")]
  Dns(#[from] trust_dns_resolver::error::ResolveError),

  /// The host resolved to no address usable with the transport.
  #[error("No usable address for {host:?}")]
  NoAddress { host: String },

  /// The configured protocol cannot carry TLS.
  #[error("Unsupported protocol {protocol:?}")]
  UnsupportedProtocol { protocol: String },

  /// The handshake did not complete within the timeout.
  #[error("No handshake with {addr:?} within {timeout_ms}ms")]
  Timeout { addr: String, timeout_ms: u128 },

  /// The TCP connection failed.
  #[error("Connect error: {0}")]
  Io(#[from] std::io::Error),

  /// The TLS context could not be set up, or a certificate could not be read.
  #[error("OpenSSL error: {0}")]
  Openssl(#[from] openssl::error::ErrorStack),

  /// The handshake or certificate verification failed.
  #[error("Handshake error: {0}")]
  Handshake(#[from] openssl::ssl::HandshakeError<TcpStream>),

  /// The blocking handshake task did not complete.
  #[error("Handshake task failed: {0}")]
  Aborted(#[from] tokio::task::JoinError),
}
