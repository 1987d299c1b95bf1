use std::io::{self, ErrorKind};
use std::net::{TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, info, warn};
use tungstenite::client::{IntoClientRequest, uri_mode};
use tungstenite::error::UrlError;
use tungstenite::stream::{MaybeTlsStream, Mode};
use tungstenite::{HandshakeError, Message, WebSocket};

use super::protocol::{self, Inbound, Outbound};
use super::RelayError;

// how long a blocking read waits before we go check the outbound queue
const READ_POLL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub enum TransportEvent {
    Opened,
    Message(Inbound),
    Closed(RelayError),
}

/// One connection attempt. Dropping it hangs up.
pub struct Connection {
    events: Receiver<TransportEvent>,
    out: Sender<Outbound>,
}

impl Connection {
    pub fn send(&self, msg: Outbound) {
        if let Err(e) = self.out.try_send(msg) {
            let reason = if e.is_full() { "queue full" } else { "socket thread gone" };
            warn!("dropping {:?} for the relay: {reason}", e.into_inner());
        }
    }

    pub fn poll_event(&self) -> Option<TransportEvent> {
        self.events.try_recv().ok()
    }

    #[cfg(test)]
    fn wait_event(&self, timeout: Duration) -> Option<TransportEvent> {
        self.events.recv_timeout(timeout).ok()
    }
}

/// Spawns the socket thread for one attempt at `url`. The attempt gives up
/// with a close if the relay hasn't finished the handshake within `timeout`.
pub fn connect(url: &str, timeout: Duration) -> Connection {
    let (event_tx, events) = crossbeam_channel::unbounded::<TransportEvent>();
    let (out, out_rx) = crossbeam_channel::bounded::<Outbound>(64);
    let url = url.to_string();
    let failed_tx = event_tx.clone();

    let spawned = thread::Builder::new()
        .name("relay".into())
        .spawn(move || {
            let reason = run_socket(&url, timeout, &event_tx, &out_rx);
            if let Some(reason) = reason {
                let _ = event_tx.send(TransportEvent::Closed(reason));
            }
        });
    if let Err(e) = spawned {
        // still report a close so the retry timer runs
        let _ = failed_tx.send(TransportEvent::Closed(RelayError::Spawn(e)));
    }

    Connection { events, out }
}

// Returns why the socket went away, or None when we hung up ourselves.
fn run_socket(
    url: &str,
    timeout: Duration,
    events: &Sender<TransportEvent>,
    out_rx: &Receiver<Outbound>,
) -> Option<RelayError> {
    info!("connecting to relay at {url}");
    let mut ws = match open_socket(url, timeout) {
        Ok(ws) => ws,
        Err(e) => return Some(e),
    };
    if events.send(TransportEvent::Opened).is_err() {
        return None;
    }

    loop {
        // outbound first, so a page move never waits behind a quiet socket
        loop {
            match out_rx.try_recv() {
                Ok(msg) => {
                    let text = match protocol::encode(&msg) {
                        Ok(t) => t,
                        Err(e) => {
                            warn!("{e}");
                            continue;
                        }
                    };
                    if let Err(e) = ws.send(Message::text(text)) {
                        return Some(e.into());
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let _ = ws.close(None);
                    let _ = ws.flush();
                    return None;
                }
            }
        }

        match ws.read() {
            Ok(Message::Text(text)) => match protocol::decode(text.as_str()) {
                Ok(Inbound::Unknown) => {}
                Ok(msg) => {
                    if events.send(TransportEvent::Message(msg)).is_err() {
                        return None;
                    }
                }
                Err(e) => debug!("dropping relay frame: {e}"),
            },
            Ok(Message::Close(_)) => return Some(RelayError::ClosedByPeer),
            Ok(_) => {} // ping/pong/binary
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return Some(RelayError::ClosedByPeer);
            }
            Err(e) => return Some(e.into()),
        }
    }
}

// The socket carries its timeouts from the start, so neither the TCP connect
// nor the upgrade handshake can block past `timeout`.
fn open_socket(
    url: &str,
    timeout: Duration,
) -> Result<WebSocket<MaybeTlsStream<TcpStream>>, RelayError> {
    let deadline = Instant::now() + timeout;
    let connect_err = |source: tungstenite::Error| RelayError::Connect { url: url.to_string(), source };

    let request = url.into_client_request().map_err(connect_err)?;
    let mode = uri_mode(request.uri()).map_err(connect_err)?;
    let host = request
        .uri()
        .host()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
        .ok_or_else(|| connect_err(UrlError::NoHostName.into()))?;
    let port = request.uri().port_u16().unwrap_or(match mode {
        Mode::Plain => 80,
        Mode::Tls => 443,
    });

    let stream = tcp_connect(&host, port, timeout).map_err(|e| connect_err(e.into()))?;
    // a blocked read wakes every READ_POLL so the handshake and the send queue both get a look in
    stream
        .set_read_timeout(Some(READ_POLL))
        .and_then(|()| stream.set_write_timeout(Some(timeout)))
        .and_then(|()| stream.set_nodelay(true))
        .map_err(|e| connect_err(e.into()))?;

    let mut attempt = tungstenite::client_tls_with_config(request, stream, None, None);
    loop {
        match attempt {
            Ok((ws, _response)) => return Ok(ws),
            Err(HandshakeError::Interrupted(mid)) => {
                if Instant::now() >= deadline {
                    return Err(RelayError::HandshakeTimeout { url: url.to_string(), timeout });
                }
                attempt = mid.handshake();
            }
            Err(HandshakeError::Failure(source)) => return Err(connect_err(source)),
        }
    }
}

fn tcp_connect(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(ErrorKind::NotFound, format!("{host} did not resolve"))
    }))
}
