use std::cell::RefCell;
use std::net::TcpListener;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use tracking_client::{ClientConfig, ConnectionState, ReconnectPolicy, TrackingClient, WsConnector};
use transit_common::net::local_tracking_url;
use transit_common::{ControlMessage, LocationPayload, TrackingMessage};
use tungstenite::Message;

fn payload(latitude: f64) -> LocationPayload {
    LocationPayload {
        latitude,
        longitude: 80.25,
        speed_kmh: Some(24.0),
        heading: None,
        next_stop: Some(String::from("Guindy")),
        estimated_arrival: Some(3),
        timestamp: None,
    }
}

fn config(port: u16) -> ClientConfig {
    ClientConfig {
        reconnect: ReconnectPolicy::fixed(Duration::from_secs(60)),
        ..ClientConfig::new(&local_tracking_url("127.0.0.1", port))
    }
}

#[test]
fn follows_a_bus_over_a_real_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut ws = tungstenite::accept(stream).unwrap();

        let first = ws.read().unwrap();
        let control: ControlMessage = serde_json::from_str(first.to_text().unwrap()).unwrap();

        for frame in [
            TrackingMessage::location_update("21G", payload(13.01)).to_json().unwrap(),
            String::from("{garbage"),
            TrackingMessage::location_update("5C", payload(12.90)).to_json().unwrap(),
            TrackingMessage::location_update("21G", payload(13.02)).to_json().unwrap(),
        ] {
            ws.send(Message::text(frame)).unwrap();
        }
        ws.close(None).unwrap();
        while ws.read().is_ok() {}
        control
    });

    let mut client = TrackingClient::new(config(port), WsConnector::new());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    client.subscribe("21G", move |update| sink.borrow_mut().push(update.latitude));
    client.connect();

    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        client.poll(Duration::from_millis(50));
        if seen.borrow().len() == 2 && client.state() == ConnectionState::Disconnected {
            break;
        }
    }

    assert_eq!(*seen.borrow(), vec![13.01, 13.02]);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.pending_reconnect().is_some());

    let control = server.join().unwrap();
    assert_eq!(
        control,
        ControlMessage::Subscribe {
            bus_id: String::from("21G")
        }
    );

    client.disconnect();
    assert_eq!(client.pending_reconnect(), None);
}

#[test]
fn unreachable_service_schedules_a_reconnect() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut client = TrackingClient::new(config(port), WsConnector::new());
    client.connect();
    assert_eq!(client.state(), ConnectionState::Connecting);

    let deadline = Instant::now() + Duration::from_secs(10);
    while client.pending_reconnect().is_none() && Instant::now() < deadline {
        client.poll(Duration::from_millis(50));
    }
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.pending_reconnect().is_some());
}
