//! The room relay: a JSON-over-WebSocket link that hands us an identity and
//! bounces everyone's page moves around.

mod link;
mod protocol;
mod transport;

pub use link::RelayLink;
pub use protocol::{Inbound, Outbound};
pub use transport::{Connection, TransportEvent, connect};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("could not reach relay at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
    #[error("relay socket failed: {0}")]
    Socket(#[from] tungstenite::Error),
    #[error("relay at {url} never finished the handshake (waited {timeout:?})")]
    HandshakeTimeout { url: String, timeout: std::time::Duration },
    #[error("could not spawn relay thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("relay closed the connection")]
    ClosedByPeer,
    #[error("malformed relay message: {0}")]
    Protocol(#[from] serde_json::Error),
}
