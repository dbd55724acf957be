//! Metrics collection and export for curfew.
//!
//! This crate provides a unified metrics interface using the `metrics` crate facade.
//! When the `prometheus` feature is enabled, metrics can be scraped from an
//! HTTP listener bound to the configured address.
//!
//! # Usage
//!
//! ```rust,ignore
//! use curfew_metrics::{counter, flip, gauge};
//!
//! counter!(flip::PASSES_TOTAL).increment(1);
//! gauge!(curfew_metrics::registry::MANAGED_CHANNELS).set(12.0);
//! ```
//!
//! # Features
//!
//! - `prometheus`: Enable the Prometheus exporter

mod definitions;
mod error;
mod recorder;

pub use {
    definitions::*,
    error::{Error, Result},
    recorder::{DEFAULT_LISTEN, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
