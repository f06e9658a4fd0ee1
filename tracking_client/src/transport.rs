//! Transport seam between the `TrackingClient` state machine and the socket.
//!
//! A `Connector` starts opening a connection and returns immediately with a
//! `Connection` handle for outbound frames. Everything that happens on the
//! wire afterwards (open, inbound text, close, failure) is reported back as
//! `TransportEvent`s through the `EventSink` handed to `open`. Each sink is
//! stamped with the generation of the connect attempt that created it, so the
//! client can drop events from connections it has already abandoned.
use crossbeam_channel::Sender;
use transit_common::Result;

/// Something that happened on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake finished; frames can be sent.
    Opened,
    /// Inbound text frame.
    Message(String),
    /// Peer closed the connection, with the close reason if one was given.
    Closed(Option<String>),
    /// Connecting or I/O failed; the connection is gone.
    Failed(String),
}

/// Event channel for one connect attempt.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: Sender<(u64, TransportEvent)>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, tx: Sender<(u64, TransportEvent)>) -> Self {
        Self { generation, tx }
    }

    /// Report an event. Returns `false` once the client is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

/// Outbound half of an open (or opening) connection.
pub trait Connection {
    /// Queue a text frame.
    fn send_text(&mut self, text: String) -> Result<()>;
    /// Start closing. Events reported afterwards are ignored by the client.
    fn close(&mut self);
}

/// Opens connections to the tracking service.
pub trait Connector {
    /// Begin connecting to `url`; progress is reported through `events`.
    ///
    /// An `Err` means the attempt could not even be started.
    fn open(&mut self, url: &str, events: EventSink) -> Result<Box<dyn Connection>>;
}
