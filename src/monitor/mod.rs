//! A module for monitors and the probes they run.
//!
//! # Example
//!
//! ```rust, no_run
//! use std::time::Duration;
//!
//! use probe_core::monitor::models::{Kind, LocalIdentity, Monitor};
//!
//! async fn measure_port() {
//!   let monitor = Monitor {
//!     name: String::from("database"),
//!     interval: Duration::from_secs(10),
//!     timeout: Duration::from_secs(2),
//!     kind: Kind::Port,
//!     protocol: String::from("tcp"),
//!     destination: String::from("db.internal"),
//!     port: 5432,
//!   };
//!
//!   let measurement = monitor.measure(&LocalIdentity::new("eu-1")).await;
//!
//!   assert!(measurement.outcome.is_online() && measurement.error.is_none());
//! }
//!
//! # tokio_test::block_on(async {
//! measure_port().await;
//! # })
//! ```

mod collectors;
mod measure;

pub mod errors;
pub mod models;

pub use collectors::Certificate;
pub use measure::Probe;
