//! Real-time bus tracking client.
//!
//! `TrackingClient` owns one logical connection to the tracking service and a
//! registry of per-bus callbacks. Its lifecycle is a small state machine:
//!
//! ```text
//! Disconnected --connect()--> Connecting --opened--> Connected
//!      ^                          |                      |
//!      +------ failed / closed ---+----------------------+
//! ```
//!
//! After an abnormal close or a failed open a reconnect is scheduled according
//! to the configured `ReconnectPolicy`. Reconnects are deadlines, not sleeps:
//! they fire from `poll`, which is also where transport events are turned into
//! state changes and callback invocations. All of that happens on the thread
//! that calls `poll`; the client is not meant to be shared between threads.
//!
//! `disconnect()` is the only way to stop the reconnect loop: it cancels any
//! pending reconnect and abandons the current connection generation, so a
//! close event that arrives afterwards is ignored.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, error, info, warn};
use strum_macros::Display;
use transit_common::{ControlMessage, LocationPayload, TrackingMessage};

use crate::config::ClientConfig;
use crate::subscriptions::Subscriptions;
use crate::transport::{Connection, Connector, EventSink, TransportEvent};

/// Granularity of `run`'s polling loop.
const RUN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionState {
    /// No connection and none being opened.
    Disconnected,
    /// Waiting for the transport to open.
    Connecting,
    /// Open; control frames go out immediately.
    Connected,
}

/// Subscribes buses to location updates over a reconnecting connection.
pub struct TrackingClient {
    config: ClientConfig,
    connector: Box<dyn Connector>,
    connection: Option<Box<dyn Connection>>,
    state: ConnectionState,
    subscriptions: Subscriptions,
    generation: u64,
    events_tx: Sender<(u64, TransportEvent)>,
    events_rx: Receiver<(u64, TransportEvent)>,
    reconnect_at: Option<Instant>,
    failed_attempts: u32,
}

impl TrackingClient {
    /// Create a disconnected client. Nothing is opened until `connect`.
    pub fn new(config: ClientConfig, connector: impl Connector + 'static) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            config,
            connector: Box::new(connector),
            connection: None,
            state: ConnectionState::Disconnected,
            subscriptions: Subscriptions::new(),
            generation: 0,
            events_tx,
            events_rx,
            reconnect_at: None,
            failed_attempts: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// `true` only in `ConnectionState::Connected`.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Time left until the scheduled reconnect, if one is pending.
    pub fn pending_reconnect(&self) -> Option<Duration> {
        self.reconnect_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Bus ids with a registered callback.
    pub fn subscribed_buses(&self) -> Vec<String> {
        self.subscriptions.bus_ids()
    }

    /// Start connecting. Does nothing while already connecting or connected.
    ///
    /// Failures are logged and answered with a scheduled reconnect.
    pub fn connect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            debug!("connect() ignored: client is {}", self.state);
            return;
        }
        self.reconnect_at = None;
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        info!("Connecting to {}", self.config.url);

        let sink = EventSink::new(self.generation, self.events_tx.clone());
        match self.connector.open(&self.config.url, sink) {
            Ok(connection) => self.connection = Some(connection),
            Err(e) => {
                error!("Error connecting to {}: {}", self.config.url, e);
                self.state = ConnectionState::Disconnected;
                self.schedule_reconnect();
            }
        }
    }

    /// Close the connection, forget all subscriptions and stop reconnecting.
    pub fn disconnect(&mut self) {
        self.reconnect_at = None;
        self.failed_attempts = 0;
        self.generation += 1;
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
        self.subscriptions.clear();
        if self.state != ConnectionState::Disconnected {
            info!("Disconnected from {}", self.config.url);
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Call `callback` with every position update for `bus_id`, replacing any
    /// earlier callback for the same bus.
    ///
    /// The server is told right away when connected; otherwise the
    /// subscription is only stored.
    pub fn subscribe<F>(&mut self, bus_id: &str, callback: F)
    where
        F: FnMut(&LocationPayload) + 'static,
    {
        if self.subscriptions.insert(bus_id, Box::new(callback)) {
            debug!("Replaced callback for bus {}", bus_id);
        }
        if self.is_connected() {
            self.send_control(ControlMessage::Subscribe {
                bus_id: String::from(bus_id),
            });
        } else {
            debug!("Stored subscription for bus {} while {}", bus_id, self.state);
        }
    }

    /// Stop delivering updates for `bus_id`.
    pub fn unsubscribe(&mut self, bus_id: &str) {
        self.subscriptions.remove(bus_id);
        if self.is_connected() {
            self.send_control(ControlMessage::Unsubscribe {
                bus_id: String::from(bus_id),
            });
        }
    }

    /// Call `callback` with every decoded inbound frame, whatever its type.
    pub fn subscribe_to_all<F>(&mut self, callback: F)
    where
        F: FnMut(&TrackingMessage) + 'static,
    {
        self.subscriptions.set_all(Box::new(callback));
    }

    /// Wait up to `timeout` for transport events, handle everything queued,
    /// and fire a due reconnect. Returns the number of events handled.
    ///
    /// The wait ends early when a scheduled reconnect becomes due.
    pub fn poll(&mut self, timeout: Duration) -> usize {
        let now = Instant::now();
        let mut wait_until = now + timeout;
        if let Some(at) = self.reconnect_at {
            wait_until = wait_until.min(at);
        }

        let mut handled = 0;
        match self
            .events_rx
            .recv_timeout(wait_until.saturating_duration_since(now))
        {
            Ok((generation, event)) => {
                if self.handle_event(generation, event) {
                    handled += 1;
                }
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
        }
        while let Ok((generation, event)) = self.events_rx.try_recv() {
            if self.handle_event(generation, event) {
                handled += 1;
            }
        }

        self.reconnect_if_due();
        handled
    }

    /// Poll until `shutdown` is set, then disconnect.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Relaxed) {
            self.poll(RUN_POLL_INTERVAL);
        }
        info!("Tracking loop stopping...");
        self.disconnect();
    }

    fn handle_event(&mut self, generation: u64, event: TransportEvent) -> bool {
        if generation != self.generation {
            debug!("Dropping event from abandoned connection: {:?}", event);
            return false;
        }
        match event {
            TransportEvent::Opened => {
                info!("Connected to {}", self.config.url);
                self.state = ConnectionState::Connected;
                self.failed_attempts = 0;
                if self.config.replay_subscriptions {
                    for bus_id in self.subscriptions.bus_ids() {
                        self.send_control(ControlMessage::Subscribe { bus_id });
                    }
                }
            }
            TransportEvent::Message(text) => self.dispatch(&text),
            TransportEvent::Closed(reason) => {
                warn!(
                    "Connection to {} closed: {}",
                    self.config.url,
                    reason.as_deref().unwrap_or("no reason given")
                );
                self.connection_lost();
            }
            TransportEvent::Failed(reason) => {
                error!("Connection to {} failed: {}", self.config.url, reason);
                self.connection_lost();
            }
        }
        true
    }

    fn dispatch(&mut self, text: &str) {
        match TrackingMessage::parse(text) {
            Ok(message) => {
                let invoked = self.subscriptions.dispatch(&message);
                debug!("{} frame delivered to {} callback(s)", message.kind(), invoked);
            }
            Err(e) => error!("Error parsing tracking message: {} ({})", e, text),
        }
    }

    fn connection_lost(&mut self) {
        self.connection = None;
        self.state = ConnectionState::Disconnected;
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        let delay = self.config.reconnect.delay_for(self.failed_attempts);
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.reconnect_at = Some(Instant::now() + delay);
        info!("Reconnecting to {} in {:?}", self.config.url, delay);
    }

    fn reconnect_if_due(&mut self) {
        let due = match self.reconnect_at {
            Some(at) => Instant::now() >= at,
            None => false,
        };
        if due {
            self.reconnect_at = None;
            self.connect();
        }
    }

    fn send_control(&mut self, message: ControlMessage) {
        let Some(connection) = self.connection.as_mut() else {
            warn!("Not connected; dropping {:?}", message);
            return;
        };
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode {:?}: {}", message, e);
                return;
            }
        };
        debug!("Sending {}", text);
        if let Err(e) = connection.send_text(text) {
            warn!("Failed to send {:?}: {}", message, e);
        }
    }
}
