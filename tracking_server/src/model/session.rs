//! Subscription state of one client session.
use log::info;
use std::collections::HashSet;
use std::net::SocketAddr;
use transit_common::{ControlMessage, Result, TrackingMessage};

/// Bus ids a connected client asked for.
#[derive(Debug)]
pub struct SessionFilter {
    peer: SocketAddr,
    subscribed: HashSet<String>,
}

impl SessionFilter {
    /// Empty filter for the client at `peer`.
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            subscribed: HashSet::new(),
        }
    }

    /// Decode a control frame from the client and apply it.
    pub fn handle_frame(&mut self, text: &str) -> Result<ControlMessage> {
        let control: ControlMessage = serde_json::from_str(text)?;
        self.apply(&control);
        Ok(control)
    }

    /// Apply a control message. Returns `true` if the subscription set changed.
    pub fn apply(&mut self, control: &ControlMessage) -> bool {
        let changed = match control {
            ControlMessage::Subscribe { bus_id } => self.subscribed.insert(bus_id.clone()),
            ControlMessage::Unsubscribe { bus_id } => self.subscribed.remove(bus_id),
        };
        if changed {
            info!(
                "{} now follows {} bus(es) after {:?}",
                self.peer,
                self.subscribed.len(),
                control
            );
        }
        changed
    }

    /// Whether `message` should be forwarded to this client.
    pub fn wants(&self, message: &TrackingMessage) -> bool {
        message
            .bus_id()
            .is_some_and(|bus_id| self.subscribed.contains(bus_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transit_common::LocationPayload;

    fn update(bus_id: &str) -> TrackingMessage {
        TrackingMessage::location_update(
            bus_id,
            LocationPayload {
                latitude: 13.0,
                longitude: 80.0,
                speed_kmh: None,
                heading: None,
                next_stop: None,
                estimated_arrival: None,
                timestamp: None,
            },
        )
    }

    fn filter() -> SessionFilter {
        SessionFilter::new("127.0.0.1:50000".parse().unwrap())
    }

    #[test]
    fn forwards_only_subscribed_buses() {
        let mut filter = filter();
        assert!(!filter.wants(&update("21G")));

        filter.handle_frame(r#"{"type":"subscribe","busId":"21G"}"#).unwrap();
        assert!(filter.wants(&update("21G")));
        assert!(!filter.wants(&update("5C")));

        filter.handle_frame(r#"{"type":"unsubscribe","busId":"21G"}"#).unwrap();
        assert!(!filter.wants(&update("21G")));
    }

    #[test]
    fn duplicate_subscriptions_are_a_no_op() {
        let mut filter = filter();
        let subscribe = ControlMessage::Subscribe {
            bus_id: String::from("21G"),
        };
        assert!(filter.apply(&subscribe));
        assert!(!filter.apply(&subscribe));
        assert!(!filter.apply(&ControlMessage::Unsubscribe {
            bus_id: String::from("5C")
        }));
    }

    #[test]
    fn malformed_frames_leave_the_filter_alone() {
        let mut filter = filter();
        filter.handle_frame(r#"{"type":"subscribe","busId":"21G"}"#).unwrap();
        assert!(filter.handle_frame("not json").is_err());
        assert!(filter.handle_frame(r#"{"type":"teleport","busId":"21G"}"#).is_err());
        assert!(filter.wants(&update("21G")));
    }

    #[test]
    fn frames_without_a_bus_are_not_forwarded() {
        let mut filter = filter();
        filter.handle_frame(r#"{"type":"subscribe","busId":"21G"}"#).unwrap();
        let alert = TrackingMessage::parse(r#"{"type":"service_alert"}"#).unwrap();
        assert!(!filter.wants(&alert));
    }
}
