//! Wire messages exchanged with the real-time tracking service.
//!
//! Every frame is a JSON text frame. Clients send `ControlMessage`s
//! (`{"type":"subscribe","busId":"21G"}`); the service pushes
//! `{"type": ..., "busId": ..., "payload": ...}` objects which are decoded into
//! the tagged `TrackingMessage`, so known shapes are typed and anything else is
//! still delivered as `Unknown`.
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::result::Result;

/// `type` value of a bus position update.
pub const LOCATION_UPDATE: &str = "location_update";

/// Subscription control frame sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Start receiving updates for a bus.
    Subscribe {
        /// Bus identifier.
        #[serde(rename = "busId")]
        bus_id: String,
    },
    /// Stop receiving updates for a bus.
    Unsubscribe {
        /// Bus identifier.
        #[serde(rename = "busId")]
        bus_id: String,
    },
}

impl ControlMessage {
    /// Bus the control frame refers to.
    pub fn bus_id(&self) -> &str {
        match self {
            ControlMessage::Subscribe { bus_id } | ControlMessage::Unsubscribe { bus_id } => bus_id,
        }
    }

    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Position of a bus as reported by the tracking service.
///
/// Only the coordinates are required. An optional field holding a value of the
/// wrong type reads as absent instead of rejecting the whole update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Ground speed, if reported.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,
    /// Heading in degrees clockwise from north, if reported.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Name of the next stop.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub next_stop: Option<String>,
    /// Minutes until the next stop.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<u32>,
    /// UTC timestamp in milliseconds since Unix epoch.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Inbound frame as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "busId", default, skip_serializing_if = "Option::is_none")]
    bus_id: Option<String>,
    #[serde(default)]
    payload: Value,
}

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingMessage {
    /// New position for `bus_id`.
    LocationUpdate {
        /// Bus identifier.
        bus_id: String,
        /// Reported position.
        payload: LocationPayload,
        /// The frame exactly as received, `None` for locally built updates.
        raw: Option<Value>,
    },
    /// Any other frame, kept verbatim.
    Unknown {
        /// The frame's `type` field.
        kind: String,
        /// The frame's `busId` field, if any.
        bus_id: Option<String>,
        /// The frame's `payload`, `Null` when absent.
        payload: Value,
    },
}

impl TrackingMessage {
    /// Builds a location update frame.
    pub fn location_update(bus_id: &str, payload: LocationPayload) -> Self {
        TrackingMessage::LocationUpdate {
            bus_id: String::from(bus_id),
            payload,
            raw: None,
        }
    }

    /// Decodes a text frame.
    ///
    /// Fails only if the text is not JSON or lacks a `type`. A `location_update`
    /// without usable coordinates becomes `Unknown`.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)?;
        let envelope: Envelope = serde_json::from_value(raw.clone())?;
        Ok(Self::from_envelope(envelope, raw))
    }

    fn from_envelope(envelope: Envelope, raw: Value) -> Self {
        if envelope.kind == LOCATION_UPDATE {
            if let Some(bus_id) = envelope.bus_id.as_deref() {
                match serde_json::from_value::<LocationPayload>(envelope.payload.clone()) {
                    Ok(payload) => {
                        return TrackingMessage::LocationUpdate {
                            bus_id: String::from(bus_id),
                            payload,
                            raw: Some(raw),
                        };
                    }
                    Err(e) => warn!("Location update for bus {} has a bad payload: {}", bus_id, e),
                }
            }
        }
        TrackingMessage::Unknown {
            kind: envelope.kind,
            bus_id: envelope.bus_id,
            payload: envelope.payload,
        }
    }

    /// Bus the frame refers to, if any.
    pub fn bus_id(&self) -> Option<&str> {
        match self {
            TrackingMessage::LocationUpdate { bus_id, .. } => Some(bus_id),
            TrackingMessage::Unknown { bus_id, .. } => bus_id.as_deref(),
        }
    }

    /// The frame's `type` field.
    pub fn kind(&self) -> &str {
        match self {
            TrackingMessage::LocationUpdate { .. } => LOCATION_UPDATE,
            TrackingMessage::Unknown { kind, .. } => kind,
        }
    }

    /// Encode as a JSON text frame. Received updates are re-encoded verbatim.
    pub fn to_json(&self) -> Result<String> {
        let envelope = match self {
            TrackingMessage::LocationUpdate { raw: Some(raw), .. } => {
                return Ok(serde_json::to_string(raw)?);
            }
            TrackingMessage::LocationUpdate {
                bus_id,
                payload,
                raw: None,
            } => Envelope {
                kind: String::from(LOCATION_UPDATE),
                bus_id: Some(bus_id.clone()),
                payload: serde_json::to_value(payload)?,
            },
            TrackingMessage::Unknown {
                kind,
                bus_id,
                payload,
            } => Envelope {
                kind: kind.clone(),
                bus_id: bus_id.clone(),
                payload: payload.clone(),
            },
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}
