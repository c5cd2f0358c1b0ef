//! Cross-process bridge for the bus: an axum WebSocket handler on the
//! server side, a `tokio-tungstenite` client on the client side. Grounded
//! on the teacher's `ws_forwarder_handler` / `UplinkSession::connect` pair,
//! stripped of the auth handshake: the bus-out bridge is unauthenticated
//! and read-only (public, read-only message bus, no uploader auth).

use crate::{Bus, Frame, RecvOutcome};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Upgrade an inbound WS connection into a subscriber of `bus`, optionally
/// filtered to `topic_prefix`. Every frame published on `bus` after the
/// upgrade is forwarded as a binary WS message until the peer disconnects.
pub async fn serve(ws: WebSocketUpgrade, bus: Bus, topic_prefix: Option<String>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_to_socket(socket, bus, topic_prefix))
}

async fn forward_to_socket(mut socket: WebSocket, bus: Bus, topic_prefix: Option<String>) {
    let mut sub = bus.subscribe(topic_prefix);
    loop {
        tokio::select! {
            outcome = sub.recv() => {
                match outcome {
                    RecvOutcome::Frame(frame) => {
                        if socket.send(Message::Binary(frame)).await.is_err() {
                            break;
                        }
                    }
                    RecvOutcome::Lagged(n) => {
                        debug!(skipped = n, "bus subscriber lagged, frames dropped");
                    }
                    RecvOutcome::Closed => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "bus subscriber WS error");
                        break;
                    }
                }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
}

/// Connect to an upstream bus-out endpoint and stream received frames.
/// Read-only: never sends anything but Pong replies to keep the connection
/// alive. The stream ends when the peer closes or the connection errors.
pub async fn connect(url: &str) -> Result<ReceiverStream<Frame>, ConnectError> {
    let (ws, _response) =
        tokio_tungstenite::connect_async(url)
            .await
            .map_err(|source| ConnectError::Connect {
                url: url.to_owned(),
                source,
            })?;

    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(pump(ws, tx));
    Ok(ReceiverStream::new(rx))
}

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn pump(mut ws: WsStream, tx: mpsc::Sender<Frame>) {
    use tokio_tungstenite::tungstenite::Message as TMessage;

    while let Some(msg) = ws.next().await {
        match msg {
            Ok(TMessage::Binary(bytes)) => {
                if tx.send(Frame::from(bytes)).await.is_err() {
                    break;
                }
            }
            Ok(TMessage::Ping(data)) => {
                let _ = ws.send(TMessage::Pong(data)).await;
            }
            Ok(TMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "bus upstream connection error");
                break;
            }
        }
    }
    debug!("bus upstream connection closed");
}
