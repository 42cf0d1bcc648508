//! WebSocket transport implementation over tokio-tungstenite.
//!
//! Each established connection is split into two pump tasks: a writer that
//! encodes outbound frames to JSON text messages, and a reader that decodes
//! inbound text messages and surfaces close/error conditions as a single
//! [`TransportEvent::Closed`]. Undecodable inbound frames are logged and
//! skipped rather than tearing the connection down.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::domain::RealtimeMessage;
use crate::ports::transport::{Transport, TransportError, TransportEvent, TransportLink};

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// [`Transport`] over a WebSocket connection.
pub struct WebSocketTransport {
    channel_capacity: usize,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Override the per-direction frame buffer size.
    pub fn with_channel_capacity(channel_capacity: usize) -> Self {
        Self { channel_capacity }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(
        &self,
        url: &str,
        token: Option<String>,
    ) -> Result<TransportLink, TransportError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::ConnectFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if let Some(token) = token {
            let value = format!("Bearer {token}")
                .parse()
                .map_err(|_| TransportError::Auth("token is not a valid header value".into()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (stream, _response) =
            connect_async(request)
                .await
                .map_err(|e| TransportError::ConnectFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        debug!(url = %url, "websocket established");

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) =
            mpsc::channel::<RealtimeMessage>(self.channel_capacity);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(self.channel_capacity);

        // writer: encode frames and push them onto the socket in order
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, kind = frame.kind(), "dropping unencodable frame");
                        continue;
                    }
                };
                if let Err(err) = sink.send(Message::Text(text)).await {
                    debug!(error = %err, "websocket send failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // reader: decode frames, surface close and socket errors
        tokio::spawn(async move {
            while let Some(next) = source.next().await {
                match next {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<RealtimeMessage>(&text) {
                            Ok(message) => {
                                if event_tx
                                    .send(TransportEvent::Message(message))
                                    .await
                                    .is_err()
                                {
                                    return;
                                }
                            }
                            Err(err) => {
                                warn!(error = %err, "dropping undecodable frame");
                            }
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        let reason = frame.map(|f| f.reason.into_owned());
                        let _ = event_tx.send(TransportEvent::Closed { reason }).await;
                        return;
                    }
                    // binary frames and protocol-level ping/pong are not
                    // part of this protocol
                    Ok(_) => {}
                    Err(err) => {
                        let _ = event_tx
                            .send(TransportEvent::Closed {
                                reason: Some(err.to_string()),
                            })
                            .await;
                        return;
                    }
                }
            }
            let _ = event_tx.send(TransportEvent::Closed { reason: None }).await;
        });

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: event_rx,
        })
    }
}
