//! Eaton UPS Prometheus Exporter
//!
//! A Prometheus metrics exporter for Eaton UPS devices with a network card
//! speaking the `mbdetnrs` REST API.
//!
//! # Overview
//!
//! The exporter logs into each configured UPS, walks its REST resources
//! (identification, temperature sensor, input/output ports and battery) and
//! exposes the readings as Prometheus gauges. Collection happens on demand:
//! every scrape of `/metrics` polls the devices afresh.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐      HTTPS/JSON      ┌──────────────────────────┐
//! │  UPS (1..N) │ ◄─────────────────►  │         Exporter         │
//! └─────────────┘   token sessions     │                          │
//!                                      │  ┌────────────────────┐  │
//!                                      │  │ DeviceScraper (xN) │  │      HTTP      ┌────────────┐
//!                                      │  └────────────────────┘  │ ◄────────────► │ Prometheus │
//!                                      │  ┌────────────────────┐  │   /metrics     └────────────┘
//!                                      │  │   Orchestrator     │  │
//!                                      │  └────────────────────┘  │
//!                                      └──────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`ups`] - Device session, scraper and API type definitions
//! - [`collection`] - Sequential and concurrent multi-device collection
//! - [`translate`] - Snapshot to gauge translation
//! - [`metrics`] - Prometheus text rendering
//! - [`server`] - HTTP server
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use eaton_ups_exporter::{collection::CollectionOrchestrator, config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     let orchestrator = CollectionOrchestrator::from_json_file("devices.json", &config.exporter)?;
//!     server::start(config, orchestrator).await?;
//!     Ok(())
//! }
//! ```

pub mod collection;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod translate;
pub mod ups;
