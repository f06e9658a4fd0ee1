use crossbeam_channel::Sender;
use log::{debug, error, info, warn};
use std::net::{SocketAddr, TcpListener, TcpStream};
use transit_common::{Result, TransitError};

/// TCP listener that accepts tracking clients.
///
/// Accepted connections are emitted together with the peer address into a
/// provided channel. The WebSocket handshake happens later on the session
/// thread, so a peer that connects and then stays silent only holds up itself.
pub struct TrackingListener {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
}

impl TrackingListener {
    /// Bind a new listener to the provided `bind_addr` (e.g., `0.0.0.0:9001`).
    pub fn new(bind_addr: &str) -> Result<Self> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self { socket })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocking loop that accepts connections and forwards them to `tx`.
    /// Returns an error once `tx` has no receiver left.
    pub(crate) fn accept_loop(self, tx: Sender<(TcpStream, SocketAddr)>) -> Result<()> {
        info!("Tracking WebSocket server is started on {}", self.socket.local_addr()?);

        for stream in self.socket.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    error!("TCP connection error: {}", e);
                    continue;
                }
            };
            let peer = match stream.peer_addr() {
                Ok(peer) => peer,
                Err(e) => {
                    warn!("Dropping connection without peer address: {}", e);
                    continue;
                }
            };
            debug!("client_tcp_addr: {:?}", &peer);

            tx.send((stream, peer))
                .map_err(|e| TransitError::ChannelSend(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn a_silent_peer_does_not_hold_up_the_next_one() {
        let listener = TrackingListener::new("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = unbounded();
        thread::spawn(move || listener.accept_loop(tx));

        let _silent = TcpStream::connect(addr).unwrap();
        let second = TcpStream::connect(addr).unwrap();

        let (_, first_peer) = rx.recv_timeout(Duration::from_secs(3)).unwrap();
        let (_, second_peer) = rx.recv_timeout(Duration::from_secs(3)).unwrap();
        assert_ne!(first_peer, second_peer);
        assert!([first_peer, second_peer].contains(&second.local_addr().unwrap()));
    }
}
