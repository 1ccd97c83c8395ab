// SPDX-License-Identifier: MIT
//
// SMT Data Interaction Client

//! SMT Core Library
//!
//! Client-side connector to the SMT telemetry platform: connect to a named data
//! source and collect its tag metadata, push buffered samples, and query
//! historical data over HTTP.
//!
//! # Architecture
//!
//! The library is organized into modules following the request path:
//! - `tag`: Tag metadata and its guarded buffer of pending samples
//! - `params` / `validation`: Typed query parameters and checks for untyped input
//! - `request`: Wire parameter sets for each operation
//! - `transport`: Single-shot HTTP POST with uniform failure mapping
//! - `response`: Error-envelope check and per-operation result mapping
//! - `client`: Facade tying the above together
//! - `config`, `metrics`, `error`: Ambient concerns
//!
//! ```text
//! caller ─> request (validate + build) ─> transport (POST) ─> response (check + map) ─> caller
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod params;
pub mod request;
pub mod response;
pub mod tag;
pub mod transport;
pub mod validation;

pub use client::DataInteractionClient;
pub use config::ClientConfig;
pub use error::{Error, Result, TransportError};
pub use params::{RequestParams, TagSelector, ValueFilter, ValueKind};
pub use tag::{Sample, SampleValue, Tag, TagId, TimePoint};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
