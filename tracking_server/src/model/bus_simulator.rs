//! Bus position generator and event broadcasting.
//!
//! The `BusSimulator` runs a background thread that advances a fleet of
//! `SimulatedBus`es every tick and broadcasts one `location_update` per bus to
//! all registered sessions using `crossbeam_channel`. New sessions register by
//! sending a `Sender<BusEvent>` to the subscription channel returned by
//! `BusSimulator::start`.
//!
//! Event model:
//! - `BusEvent::Update(TrackingMessage)`: a position update for one bus.
//! - `BusEvent::Shutdown`: signal for consumers to terminate gracefully.
//!
//! Broadcast is best-effort: if sending to a session fails, that session is removed.

use crate::model::bus::SimulatedBus;
use crossbeam_channel::Sender;
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use transit_common::TrackingMessage;

/// Message sent by the simulator to its subscribers.
#[derive(Debug, Clone)]
pub enum BusEvent {
    /// New position for a particular bus.
    Update(TrackingMessage),
    /// Global shutdown notification for all consumers.
    Shutdown,
}

/// Background fleet simulator that broadcasts to subscribers.
pub struct BusSimulator;

impl BusSimulator {
    /// Start the simulator thread and return a channel for registering subscribers.
    ///
    /// The thread stops after `shutdown` is set, sending `BusEvent::Shutdown`
    /// to everyone still registered.
    pub fn start(
        mut fleet: Vec<SimulatedBus>,
        tick: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> Sender<Sender<BusEvent>> {
        let (subscribe_tx, subscribe_rx) = crossbeam_channel::unbounded::<Sender<BusEvent>>();

        thread::spawn(move || {
            let mut clients: Vec<Sender<BusEvent>> = Vec::new();
            let mut rng = rand::rng();

            info!(
                "Bus simulator started with {} buses (Thread ID: {:?})",
                fleet.len(),
                thread::current().id()
            );

            while !shutdown.load(Ordering::Relaxed) {
                while let Ok(new_client_tx) = subscribe_rx.try_recv() {
                    clients.push(new_client_tx);
                    debug!("Simulator: new session added. Total sessions: {}", clients.len());
                }

                for bus in fleet.iter_mut() {
                    let payload = bus.advance(tick, &mut rng);
                    let event = BusEvent::Update(TrackingMessage::location_update(&bus.id, payload));
                    clients.retain(|client_tx| client_tx.send(event.clone()).is_ok());
                }

                thread::sleep(tick);
            }

            while let Ok(late_client_tx) = subscribe_rx.try_recv() {
                clients.push(late_client_tx);
            }
            for client_tx in &clients {
                let _ = client_tx.send(BusEvent::Shutdown);
            }
            info!("Bus simulator stopping...");
        });
        subscribe_tx
    }
}
