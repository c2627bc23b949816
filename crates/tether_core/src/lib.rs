//! Core infrastructure for Tether hosts.
//!
//! `tether_engine` emits structured `tracing` events for every activation,
//! cleanup and reconciliation, plus a warning when an activation returns no
//! cleanup. This crate wires those events to an output:
//!
//! - [`TracingConfig`] - Builder for the global `tracing` subscriber
//! - [`TracingFormat`] - Pretty, compact or JSON output
//!
//! # Example
//!
//! ```no_run
//! use tether_core::TracingConfig;
//!
//! // Honors TETHER_LOG and TETHER_LOG_FORMAT.
//! TracingConfig::from_env().unwrap_or_default().init();
//! ```
//!
//! # Architecture
//!
//! - **Layer 1** (`tether_engine`, `tether_core`): Reconciliation engine and infrastructure
//! - **Layer 2** (host bindings): UI frameworks calling the site lifecycle hooks

mod tracing_setup;

pub use tracing_setup::{FILTER_ENV, FORMAT_ENV, TracingConfig, TracingError, TracingFormat};
