//! Shared networking constants and helpers used by the tracking client and server.

/// Real-time tracking endpoint used when no URL is configured.
pub const DEFAULT_TRACKING_URL: &str = "wss://ws.mtcconnect.com/tracking";
/// Delay before reconnecting after an abnormal close, in milliseconds.
pub const RECONNECT_DELAY_MS: u64 = 3000;
/// Port the local simulation server listens on.
pub const DEFAULT_SERVER_PORT: u16 = 9001;

/// Helper to format an address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}

/// Plain-text WebSocket URL for a local simulation server, e.g. `ws://127.0.0.1:9001/tracking`.
pub fn local_tracking_url(ip: &str, port: u16) -> String {
    format!("ws://{}/tracking", addr(ip, port))
}
