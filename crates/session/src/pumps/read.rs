//! WebSocket read pump. Settles the handshake, then dispatches messages.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use sessvault_protocol::constants::WS_MAX_MESSAGE_SIZE;
use sessvault_protocol::{Heartbeat, Message, MessageName};

use crate::error::SessionError;
use crate::transport::{HandshakeResult, Shared};
use crate::types::{CloseReason, ConnectionState};

/// Reads messages from the WebSocket until it closes or `cancel` fires.
///
/// The first text message must be `Session Entered`; its payload settles
/// `handshake`. Anything else settles it with an error and ends the pump.
pub(crate) async fn read_pump<S>(
    mut read: S,
    shared: Arc<Shared>,
    handshake: oneshot::Sender<HandshakeResult>,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let mut handshake = Some(handshake);

    let reason = loop {
        tokio::select! {
            _ = cancel.cancelled() => break CloseReason::Requested,

            msg = read.next() => {
                match msg {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        let Some(ack) = handshake.take() else {
                            handle_text_message(&text, &shared, &write_tx).await;
                            continue;
                        };
                        match accept_handshake(&text) {
                            Ok(payload) => {
                                if shared.advance(ConnectionState::Connected).is_none() {
                                    let _ = ack.send(Err(SessionError::Closed(
                                        "closed during handshake".into(),
                                    )));
                                    return;
                                }
                                let _ = ack.send(Ok(payload));
                            }
                            Err(e) => {
                                warn!("handshake rejected: {e}");
                                shared.shut_down(CloseReason::Error(e.to_string())).await;
                                let _ = ack.send(Err(e));
                                return;
                            }
                        }
                    }
                    Some(Ok(tungstenite::Message::Binary(data))) => {
                        if let Some(ack) = handshake.take() {
                            let e = SessionError::Protocol("binary frame before handshake".into());
                            shared.shut_down(CloseReason::Error(e.to_string())).await;
                            let _ = ack.send(Err(e));
                            return;
                        }
                        trace!(len = data.len(), "ignoring binary frame");
                    }
                    Some(Ok(tungstenite::Message::Ping(data))) => {
                        trace!("received ping, sending pong");
                        let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                    }
                    Some(Ok(tungstenite::Message::Close(_))) => {
                        debug!("received close frame");
                        break CloseReason::Remote;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        break CloseReason::Error(e.to_string());
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break CloseReason::Remote;
                    }
                }
            }
        }
    };

    shared.shut_down(reason.clone()).await;
    if let Some(ack) = handshake {
        let _ = ack.send(Err(SessionError::Closed(reason.to_string())));
    }
}

/// Validates the first message and extracts the session state.
fn accept_handshake(text: &str) -> HandshakeResult {
    let msg: Message = serde_json::from_str(text)
        .map_err(|e| SessionError::Protocol(format!("malformed handshake: {e}")))?;

    if msg.kind() != Some(MessageName::SessionEntered) {
        return Err(SessionError::Protocol(format!(
            "expected {:?} first, got {:?}",
            MessageName::SessionEntered.as_str(),
            msg.name
        )));
    }

    msg.payload_value()
        .map_err(|e| SessionError::Protocol(format!("malformed handshake payload: {e}")))
}

/// Dispatches a text message received after the handshake.
async fn handle_text_message(
    text: &str,
    shared: &Shared,
    write_tx: &mpsc::Sender<tungstenite::Message>,
) {
    if text.len() > WS_MAX_MESSAGE_SIZE {
        warn!("message too large ({} bytes), dropping", text.len());
        return;
    }

    let msg: Message = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!("failed to parse message: {e}");
            return;
        }
    };

    match msg.kind() {
        Some(MessageName::SessionChanged) => {
            let payload = match msg.payload_value() {
                Ok(p) => p,
                Err(e) => {
                    warn!("failed to parse state push: {e}");
                    return;
                }
            };
            if !shared.notify_state_changed(payload).await {
                trace!("no state listener set, dropping push");
            }
        }
        Some(MessageName::Heartbeat) => respond_heartbeat(&msg, write_tx).await,
        _ => trace!(name = %msg.name, "ignoring message"),
    }
}

/// Echoes a heartbeat back with the local receive time.
async fn respond_heartbeat(msg: &Message, write_tx: &mpsc::Sender<tungstenite::Message>) {
    let beat = match msg.parse_payload::<Heartbeat>() {
        Ok(Some(beat)) => beat,
        Ok(None) | Err(_) => {
            debug!("ignoring malformed heartbeat");
            return;
        }
    };

    let reply = beat.reply(unix_millis());
    let json = match Message::new(MessageName::Heartbeat, Some(&reply))
        .and_then(|m| serde_json::to_string(&m))
    {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to encode heartbeat reply: {e}");
            return;
        }
    };

    if write_tx
        .send(tungstenite::Message::Text(json.into()))
        .await
        .is_err()
    {
        debug!("write queue closed, heartbeat reply dropped");
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
