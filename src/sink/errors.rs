//! A module describing backend write errors.

use thiserror::Error;

/// Errors that can occur while writing a batch to the backend.
///
/// Reported on the sink's error channel, never retried.
#[derive(Error, Debug)]
pub enum SinkError {
  /// The request could not be sent or no response arrived.
  #[error("Transport error: {0}")]
  Transport(#[from] curl::Error),

  /// The backend answered with a non-success status.
  #[error("Backend rejected write with status {status}: {body}")]
  Status { status: u32, body: String },

  /// The blocking write task did not complete.
  #[error("Write task failed: {0}")]
  Aborted(#[from] tokio::task::JoinError),
}
