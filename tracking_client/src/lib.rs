//! Real-time bus tracking client.
//!
//! - `client`: the `TrackingClient` state machine (connect, subscribe, dispatch, reconnect).
//! - `config`: endpoint, reconnect policy and replay settings.
//! - `subscriptions`: bus id -> callback registry.
//! - `transport`: the `Connector`/`Connection` seam and the events they report.
//! - `ws`: the `tungstenite` implementation of that seam.
pub mod client;
pub mod config;
pub mod subscriptions;
pub mod transport;
pub mod ws;

pub use client::{ConnectionState, TrackingClient};
pub use config::{ClientConfig, ReconnectPolicy};
pub use ws::WsConnector;
