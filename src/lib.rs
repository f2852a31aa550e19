//! Prometheus metrics exporter for OpenSIPS.
//!
//! The exporter is scrape-driven: each request to `/metrics` fetches a fresh
//! statistics snapshot from the OpenSIPS management interface, routes every
//! `module:name` statistic to the processor owning its module, and renders
//! the collected samples in the text exposition format.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │    OpenSIPS     │────>│    Collector    │────>│   HTTP Server   │
//! │  (mi_datagram)  │     │  (processors)   │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! Statistics unknown to the exporter are skipped silently, so it keeps
//! working against OpenSIPS versions and modules it has never seen.
//!
//! # Usage
//!
//! Run the exporter binary, optionally with a configuration file:
//!
//! ```bash
//! opensips-exporter --config config.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod exposition;
pub mod http;
pub mod metric;
pub mod mi;
pub mod processors;
pub mod registry;
pub mod snapshot;

pub use collector::{Collector, CollectorStats, ScrapeOutput, SharedCollector};
pub use config::ExporterConfig;
pub use http::HttpServer;
pub use metric::{MetricDesc, Sample, ValueKind};
pub use mi::{DatagramClient, MiError, SharedProvider, StatisticsProvider};
pub use registry::Registry;
pub use snapshot::{Snapshot, Statistic, StatisticKey};
