#![forbid(unsafe_code)]

//! Probe core library.
//!
//! ## Features
//!
//! - **config** – Reads the JSON configuration document and expands it into
//!   validated [Monitor](monitor::models::Monitor) definitions.
//! - **monitor** – Port, web and SSL probes. Every probe yields exactly one
//!   [Measurement](monitor::models::Measurement), failed probes included.
//! - **schedule** – The [Schedulable](schedule::Schedulable) trait and the
//!   [Scheduler](schedule::Scheduler) that fires an item at a fixed cadence,
//!   never waiting for earlier runs.
//! - **sink** – A shared, non-blocking batching writer to InfluxDB with an
//!   asynchronous error channel.
//! - **supervisor** – Wires one scheduler per monitor to the sink.

pub mod config;
pub mod monitor;
pub mod schedule;
pub mod sink;
pub mod supervisor;
