//! A module containing a set of models for monitor probes.

mod measurement;
mod monitor;

pub use measurement::{CN_NOT_OBTAINED, Measurement, Outcome, PortOutcome, SslOutcome, WebOutcome};
pub use monitor::{Kind, LocalIdentity, Monitor, Transport};
