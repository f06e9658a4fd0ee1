//! Bus id -> callback registry and inbound message dispatch.
use std::collections::HashMap;

use transit_common::{LocationPayload, TrackingMessage};

/// Callback for position updates of one bus.
pub type BusCallback = Box<dyn FnMut(&LocationPayload)>;
/// Callback receiving every decoded inbound frame.
pub type AllCallback = Box<dyn FnMut(&TrackingMessage)>;

/// At most one callback per bus plus one optional catch-all listener.
#[derive(Default)]
pub struct Subscriptions {
    buses: HashMap<String, BusCallback>,
    all: Option<AllCallback>,
}

impl Subscriptions {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `bus_id`. Returns `true` if it replaced one.
    pub fn insert(&mut self, bus_id: &str, callback: BusCallback) -> bool {
        self.buses.insert(String::from(bus_id), callback).is_some()
    }

    /// Drop the callback for `bus_id`. Returns `true` if one was registered.
    pub fn remove(&mut self, bus_id: &str) -> bool {
        self.buses.remove(bus_id).is_some()
    }

    /// Register the catch-all listener, replacing any previous one.
    pub fn set_all(&mut self, callback: AllCallback) {
        self.all = Some(callback);
    }

    /// Subscribed bus ids, in no particular order.
    pub fn bus_ids(&self) -> Vec<String> {
        self.buses.keys().cloned().collect()
    }

    /// Whether a catch-all listener is registered.
    pub fn has_all_listener(&self) -> bool {
        self.all.is_some()
    }

    /// No bus callbacks and no catch-all listener.
    pub fn is_empty(&self) -> bool {
        self.buses.is_empty() && self.all.is_none()
    }

    /// Drop every callback.
    pub fn clear(&mut self) {
        self.buses.clear();
        self.all = None;
    }

    /// Hand `message` to the matching bus callback (location updates only) and
    /// to the catch-all listener. Returns how many callbacks ran.
    pub fn dispatch(&mut self, message: &TrackingMessage) -> usize {
        let mut invoked = 0;
        if let TrackingMessage::LocationUpdate { bus_id, payload, .. } = message {
            if let Some(callback) = self.buses.get_mut(bus_id) {
                callback(payload);
                invoked += 1;
            }
        }
        if let Some(callback) = self.all.as_mut() {
            callback(message);
            invoked += 1;
        }
        invoked
    }
}
