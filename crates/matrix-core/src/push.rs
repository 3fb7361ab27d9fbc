//! Push channel: a listening Socket.IO client over a WebSocket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::PushError;
use crate::events::PushEvent;
use crate::socketio::{EnginePacket, SocketPacket};

/// Silence allowed before the server's handshake arrives, the Engine.IO
/// default ping interval plus ping timeout.
const HANDSHAKE_DEADLINE: Duration = Duration::from_secs(45);

/// Derive the Socket.IO WebSocket endpoint from the REST base url.
pub fn socket_url(server_url: &str) -> Result<Url, PushError> {
    let mut url = Url::parse(server_url).map_err(|e| PushError::Url(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(PushError::Url(format!("unsupported scheme: {}", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| PushError::Url(format!("cannot switch {} to {}", server_url, scheme)))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

/// What the channel should do with one decoded frame.
#[derive(Debug, PartialEq)]
pub(crate) enum Step {
    Reply(String),
    Emit(PushEvent),
    Close,
    Ignore,
}

pub(crate) fn step(packet: EnginePacket, namespace: &str) -> Step {
    match packet {
        EnginePacket::Open(handshake) => {
            debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "engine.io open");
            Step::Reply(EnginePacket::Message(SocketPacket::connect(namespace)).encode())
        }
        EnginePacket::Ping(data) => Step::Reply(EnginePacket::Pong(data).encode()),
        EnginePacket::Close => Step::Close,
        EnginePacket::Message(SocketPacket::Connect { .. }) => Step::Emit(PushEvent::Connected),
        EnginePacket::Message(SocketPacket::Disconnect { .. }) => Step::Close,
        EnginePacket::Message(SocketPacket::ConnectError { payload, .. }) => {
            warn!(?payload, "socket.io connect refused");
            Step::Close
        }
        EnginePacket::Message(SocketPacket::Event { name, args, .. }) => {
            match PushEvent::from_named(&name, args.first()) {
                Some(event) => Step::Emit(event),
                None => {
                    debug!(event = %name, "ignoring push event");
                    Step::Ignore
                }
            }
        }
        EnginePacket::Message(SocketPacket::Ack { .. })
        | EnginePacket::Pong(_)
        | EnginePacket::Upgrade
        | EnginePacket::Noop => Step::Ignore,
    }
}

/// Connect to the push channel and forward events until it closes.
///
/// Sends [`PushEvent::Disconnected`] when the connection ends for any reason
/// after it was established, including a server that stops sending heartbeats
/// within the deadline from its handshake. Does not reconnect.
pub async fn run(server_url: &str, tx: UnboundedSender<PushEvent>) -> Result<(), PushError> {
    let url = socket_url(server_url)?;
    info!(url = %url, "connecting push channel");

    let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let mut deadline = HANDSHAKE_DEADLINE;
    let result = loop {
        // Any frame from the server counts as a sign of life.
        let next = match tokio::time::timeout(deadline, ws_stream.next()).await {
            Ok(next) => next,
            Err(_) => {
                warn!(deadline_ms = deadline.as_millis() as u64, "push channel heartbeat missed");
                break Ok(());
            }
        };
        let frame = match next {
            Some(Ok(WsMessage::Text(text))) => text,
            Some(Ok(WsMessage::Close(_))) | None => break Ok(()),
            Some(Ok(_)) => continue,
            Some(Err(e)) => break Err(PushError::from(e)),
        };

        let packet = match EnginePacket::decode(&frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, frame = %frame, "dropping malformed push frame");
                continue;
            }
        };

        if let EnginePacket::Open(handshake) = &packet {
            if let Some(heartbeat) = handshake.heartbeat_deadline() {
                deadline = heartbeat;
            }
        }

        match step(packet, "/") {
            Step::Reply(reply) => {
                if let Err(e) = ws_sink.send(WsMessage::Text(reply)).await {
                    break Err(PushError::from(e));
                }
            }
            Step::Emit(event) => {
                if tx.send(event).is_err() {
                    // Receiver gone, nobody left to notify.
                    return Ok(());
                }
            }
            Step::Close => break Ok(()),
            Step::Ignore => {}
        }
    };

    info!("push channel closed");
    let _ = tx.send(PushEvent::Disconnected);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn socket_url_from_http_base() {
        assert_eq!(
            socket_url("http://localhost:5000").unwrap().as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_url("https://example.com/app").unwrap().as_str(),
            "wss://example.com/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn socket_url_rejects_other_schemes() {
        assert!(matches!(socket_url("ftp://host"), Err(PushError::Url(_))));
        assert!(matches!(socket_url("::"), Err(PushError::Url(_))));
    }

    #[test]
    fn open_is_answered_with_namespace_connect() {
        let packet = EnginePacket::decode(r#"0{"sid":"s1","pingInterval":25000,"pingTimeout":5000}"#).unwrap();
        assert_eq!(step(packet, "/"), Step::Reply("40".to_string()));
    }

    #[test]
    fn ping_is_answered_with_pong() {
        assert_eq!(step(EnginePacket::Ping(String::new()), "/"), Step::Reply("3".to_string()));
    }

    #[test]
    fn events_are_emitted() {
        let packet = EnginePacket::decode(r#"42["voice_status",{"status":"listening"}]"#).unwrap();
        assert_eq!(
            step(packet, "/"),
            Step::Emit(PushEvent::VoiceStatus {
                status: "listening".to_string()
            })
        );

        let connect = EnginePacket::Message(SocketPacket::Connect {
            namespace: "/".to_string(),
            payload: Some(json!({ "sid": "x" })),
        });
        assert_eq!(step(connect, "/"), Step::Emit(PushEvent::Connected));
    }

    #[test]
    fn disconnect_and_unknown_events() {
        assert_eq!(step(EnginePacket::Close, "/"), Step::Close);
        assert_eq!(
            step(
                EnginePacket::Message(SocketPacket::Disconnect {
                    namespace: "/".to_string()
                }),
                "/"
            ),
            Step::Close
        );
        let unknown = EnginePacket::decode(r#"42["typing",{}]"#).unwrap();
        assert_eq!(step(unknown, "/"), Step::Ignore);
    }
}
