//! Bus tracking simulation server.
//!
//! This binary stands in for the real-time tracking service: it accepts
//! WebSocket clients and streams synthetic bus positions to those that
//! subscribed. Internally, it wires together three main building blocks:
//!
//! - `BusSimulator`: moves a fleet of simulated buses and broadcasts their
//!   positions (`BusEvent`) to all sessions via `crossbeam_channel` senders.
//! - `TrackingListener`: accepts TCP connections and hands them to the main
//!   loop.
//! - Per-client session: a thread per client that performs the WebSocket
//!   handshake (bounded by `HANDSHAKE_TIMEOUT`), then applies its
//!   `subscribe`/`unsubscribe` frames to a `SessionFilter` and forwards the
//!   matching `location_update` frames.
//!
//! Concurrency and shutdown:
//! - Crossbeam `select!` multiplexes new sessions and the Ctrl+C signal.
//! - On Ctrl+C the simulator broadcasts `BusEvent::Shutdown`; every session
//!   sends a close frame and exits, and the main thread waits for them.
//! - A failing session is logged and ends without impacting other clients.
//!
//! Wire protocol: see `transit_common::message`.
#![warn(missing_docs)]
use crate::args::Args;
use crate::listener::TrackingListener;
use crate::model::bus::SimulatedBus;
use crate::model::bus_simulator::{BusEvent, BusSimulator};
use crate::model::session::SessionFilter;
use clap::Parser;
use crossbeam_channel::{Receiver, TryRecvError, select, unbounded};
use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use transit_common::Result;
use transit_common::TransitError;
use tungstenite::{Message, WebSocket};

mod args;
mod listener;
pub mod model;

/// Read timeout used to interleave client frames with outgoing updates.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Upper bound for a client to complete the WebSocket handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
/// A client that does not drain its socket within this time is dropped.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
/// Lower bound for the simulator tick.
const MIN_TICK_MS: u64 = 10;

/// Performs the server side of the WebSocket handshake on `stream`.
///
/// Reads and writes are bounded by `HANDSHAKE_TIMEOUT` and `WRITE_TIMEOUT`, so
/// a silent peer fails here instead of holding its thread.
pub fn upgrade(stream: TcpStream, peer: SocketAddr) -> Result<WebSocket<TcpStream>, TransitError> {
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
    tungstenite::accept(stream).map_err(|e| {
        TransitError::Transport(format!("WebSocket handshake with {} failed: {}", peer, e))
    })
}

/// Session loop for a single client.
///
/// Reads control frames from `websocket` into a `SessionFilter` and forwards
/// every `BusEvent::Update` the filter accepts. The session ends when:
/// - the client closes the connection, or
/// - a `BusEvent::Shutdown` arrives from the simulator, or
/// - a send/receive error occurs.
///
/// Errors are propagated as `TransitError` so the caller can log and recover per client.
pub fn handle_session(
    mut websocket: WebSocket<TcpStream>,
    peer: SocketAddr,
    data_rx: Receiver<BusEvent>,
) -> Result<(), TransitError> {
    websocket.get_ref().set_read_timeout(Some(READ_POLL_INTERVAL))?;
    websocket.get_ref().set_write_timeout(Some(WRITE_TIMEOUT))?;
    let mut filter = SessionFilter::new(peer);

    loop {
        match websocket.read() {
            Ok(Message::Text(text)) => {
                if let Err(e) = filter.handle_frame(&text) {
                    warn!("Ignoring bad control frame from {}: {}", peer, e);
                }
            }
            Ok(Message::Close(frame)) => {
                debug!("{} closed the session: {:?}", peer, frame);
                let _ = websocket.flush();
                return Ok(());
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                return Ok(());
            }
            Err(e) => return Err(TransitError::Transport(e.to_string())),
        }

        loop {
            match data_rx.try_recv() {
                Ok(BusEvent::Update(message)) => {
                    if filter.wants(&message) {
                        websocket
                            .send(Message::text(message.to_json()?))
                            .map_err(|e| TransitError::Transport(e.to_string()))?;
                    }
                }
                Ok(BusEvent::Shutdown) | Err(TryRecvError::Disconnected) => {
                    let _ = websocket.close(None);
                    let _ = websocket.flush();
                    return Ok(());
                }
                Err(TryRecvError::Empty) => break,
            }
        }
    }
}

fn main() -> Result<(), TransitError> {
    init_logger();
    let args = Args::parse();

    let shutdown = Arc::new(AtomicBool::new(false));
    let (stop_tx, stop_rx) = unbounded::<()>();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down server...");
            shutdown.store(true, Ordering::SeqCst);
            let _ = stop_tx.send(());
        })
        .map_err(|e| TransitError::Transport(format!("Error setting Ctrl+C handler: {}", e)))?;
    }

    let mut rng = rand::rng();
    let fleet = SimulatedBus::fleet(args.center, args.buses, &mut rng);
    let ids: Vec<&str> = fleet.iter().map(|bus| bus.id.as_str()).collect();
    info!("Simulating buses: {}", ids.join(", "));
    let tick = Duration::from_millis(args.tick_ms.max(MIN_TICK_MS));
    let subscription_tx = BusSimulator::start(fleet, tick, shutdown.clone());

    let listener = TrackingListener::new(&args.bind)?;
    info!("Clients connect to ws://{}/tracking", listener.local_addr()?);
    let (session_tx, session_rx) = unbounded::<(TcpStream, SocketAddr)>();
    thread::spawn(move || {
        if let Err(e) = listener.accept_loop(session_tx) {
            error!("Listener loop failed: {:?}", e);
        }
    });

    let mut sessions: Vec<thread::JoinHandle<()>> = Vec::new();
    loop {
        select! {
            recv(session_rx) -> msg => if let Ok((stream, peer)) = msg {
                let (client_data_tx, client_data_rx) = unbounded::<BusEvent>();
                if let Err(e) = subscription_tx.send(client_data_tx) {
                    error!("Failed to register session for {}: {}", peer, e);
                    continue;
                }
                sessions.retain(|session| !session.is_finished());
                sessions.push(thread::spawn(move || {
                    let session = upgrade(stream, peer)
                        .and_then(|websocket| handle_session(websocket, peer, client_data_rx));
                    if let Err(e) = session {
                        error!("Client session error for {}: {:?}", peer, e);
                    }
                    info!("Session for {} closed", peer);
                }));
                info!("A session has been created for client {}", peer);
            },
            recv(stop_rx) -> _ => break,
        }
    }

    info!("Waiting for {} session(s) to close...", sessions.len());
    for session in sessions {
        let _ = session.join();
    }
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
