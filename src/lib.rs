//! Prometheus exporter for Philips Hue sensor readings.
//!
//! This crate polls a Hue bridge for its sensors and exposes every usable
//! state reading as a gauge via an HTTP `/metrics` endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Hue Bridge    │────>│     Poller +    │────>│   HTTP Server   │
//! │  (REST API)     │     │    Collector    │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! The poller fetches all sensors once a minute and writes translated
//! observations into the shared collector; Prometheus scrapes them back out
//! through the HTTP server. A one-time `--register` flow obtains the bridge
//! credential, which requires pressing the physical link button on the
//! bridge.

pub mod bridge;
pub mod collector;
pub mod config;
pub mod credentials;
pub mod http;
pub mod poller;
pub mod register;
pub mod translate;

pub use bridge::{BridgeClient, HueClient};
pub use collector::{MetricCollector, SharedCollector};
pub use config::ExporterConfig;
pub use http::HttpServer;
pub use poller::SensorPoller;
