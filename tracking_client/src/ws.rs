//! WebSocket transport built on `tungstenite`.
//!
//! Every connection gets its own I/O thread which owns the socket: it performs
//! the (blocking) handshake, then alternates between flushing queued outbound
//! frames and reading with a short socket timeout. Whatever happens is
//! reported to the client through the connection's `EventSink`.
use std::io::ErrorKind;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use log::{debug, error, info};
use transit_common::{Result, TransitError};
use tungstenite::client::IntoClientRequest;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::transport::{Connection, Connector, EventSink, TransportEvent};

/// Read timeout used to interleave reads with outbound frames.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(50);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Frames queued for the I/O thread.
enum Outbound {
    Text(String),
    Close,
}

/// Opens `ws://` and `wss://` connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl WsConnector {
    /// Connector for `ws://` and `wss://` URLs.
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn open(&mut self, url: &str, events: EventSink) -> Result<Box<dyn Connection>> {
        let (outbound_tx, outbound_rx) = unbounded::<Outbound>();
        let url = String::from(url);
        thread::Builder::new()
            .name(String::from("ws-io"))
            .spawn(move || run_io(&url, events, outbound_rx))?;
        Ok(Box::new(WsConnection { outbound_tx }))
    }
}

/// Handle for queuing frames onto a connection's I/O thread.
///
/// Dropping it closes the connection.
pub struct WsConnection {
    outbound_tx: Sender<Outbound>,
}

impl Connection for WsConnection {
    fn send_text(&mut self, text: String) -> Result<()> {
        self.outbound_tx
            .send(Outbound::Text(text))
            .map_err(|e| TransitError::ChannelSend(e.to_string()))
    }

    fn close(&mut self) {
        let _ = self.outbound_tx.send(Outbound::Close);
    }
}

/// Installs the process-wide TLS crypto provider used for `wss://` URLs.
///
/// Harmless if a provider is already installed.
pub fn install_tls_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn handshake(url: &str) -> Result<Socket> {
    let request = url
        .into_client_request()
        .map_err(|e| TransitError::Transport(e.to_string()))?;
    let uri = request.uri();
    let host = uri
        .host()
        .ok_or_else(|| TransitError::Transport(format!("no host in {}", url)))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = uri
        .port_u16()
        .unwrap_or(if uri.scheme_str() == Some("wss") { 443 } else { 80 });

    let stream = TcpStream::connect((host.as_str(), port))?;
    // second handle to the same socket, kept to adjust timeouts after the handshake
    let handle = stream.try_clone()?;
    let (socket, response) = tungstenite::client_tls(request, stream)
        .map_err(|e| TransitError::Transport(e.to_string()))?;
    handle.set_read_timeout(Some(READ_POLL_INTERVAL))?;
    debug!("Handshake with {} answered {}", url, response.status());
    Ok(socket)
}

fn run_io(url: &str, events: EventSink, outbound_rx: Receiver<Outbound>) {
    let mut socket = match handshake(url) {
        Ok(socket) => socket,
        Err(e) => {
            events.emit(TransportEvent::Failed(e.to_string()));
            return;
        }
    };
    if !events.emit(TransportEvent::Opened) {
        let _ = socket.close(None);
        return;
    }

    let mut close_reason: Option<String> = None;
    loop {
        loop {
            match outbound_rx.try_recv() {
                Ok(Outbound::Text(text)) => {
                    if let Err(e) = socket.send(Message::text(text)) {
                        error!("Send data error: {}", e);
                        events.emit(TransportEvent::Failed(e.to_string()));
                        return;
                    }
                }
                Ok(Outbound::Close) | Err(TryRecvError::Disconnected) => {
                    info!("Closing connection to {}", url);
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    events.emit(TransportEvent::Closed(Some(String::from("closed locally"))));
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if !events.emit(TransportEvent::Message(text)) {
                    let _ = socket.close(None);
                    return;
                }
            }
            Ok(Message::Close(frame)) => {
                debug!("Close frame from {}: {:?}", url, frame);
                close_reason = frame.map(|f| f.reason.to_string());
                // keep reading so tungstenite can finish the closing handshake
            }
            Ok(other) => debug!("Ignoring non-text frame: {:?}", other),
            Err(tungstenite::Error::Io(e))
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                events.emit(TransportEvent::Closed(close_reason.take()));
                return;
            }
            Err(e) => {
                error!("Receive data error: {}", e);
                events.emit(TransportEvent::Failed(e.to_string()));
                return;
            }
        }
    }
}
