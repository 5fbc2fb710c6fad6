use crate::error::{RemoteError, Result};
use crate::protocol::{Event, CONNECT_EVENT, UNAUTHORIZED_EVENT};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, connect_async_tls_with_config, tungstenite::Message, Connector};

/// WebSocket connection state
struct ConnectionState {
    /// Requests waiting for an event with a given name, oldest first
    pending_events: HashMap<String, VecDeque<oneshot::Sender<Event>>>,
    /// Channel for sending outgoing messages
    ws_tx: mpsc::UnboundedSender<Message>,
}

/// Low-level WebSocket connection to a TV's remote-control channel
///
/// The TV answers requests with named events rather than request ids, so
/// waiters are queued by the event name they expect and served in order.
pub(crate) struct Connection {
    state: Arc<Mutex<ConnectionState>>,
    reader: JoinHandle<()>,
    request_timeout: Duration,
    handshake: Event,
}

impl Connection {
    /// Connect and wait for the channel handshake
    ///
    /// With `secure`, the TV's self-signed certificate is accepted.
    pub async fn connect(url: &str, secure: bool, request_timeout: Duration) -> Result<Self> {
        // The query string may carry the pairing token.
        let endpoint = url.split('?').next().unwrap_or(url);
        tracing::info!("Connecting to {}", endpoint);

        let (ws_stream, _) = if secure {
            let tls = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()?;
            connect_async_tls_with_config(url, None, false, Some(Connector::NativeTls(tls))).await?
        } else {
            connect_async(url).await?
        };
        let (mut write, mut read) = ws_stream.split();

        let (ws_tx, mut ws_rx) = mpsc::unbounded_channel::<Message>();
        let (connected_tx, connected_rx) = oneshot::channel();

        // Registered before the reader starts so the handshake cannot be missed
        let mut pending_events = HashMap::new();
        pending_events.insert(CONNECT_EVENT.to_string(), VecDeque::from([connected_tx]));

        let state = Arc::new(Mutex::new(ConnectionState {
            pending_events,
            ws_tx,
        }));

        // Spawn task to forward outgoing messages to WebSocket
        let write_handle = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    tracing::error!("Failed to send message: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        // Spawn task to receive and dispatch incoming events
        let state_clone = state.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if let Err(e) = Self::handle_message(&state_clone, &text).await {
                            tracing::error!("Error handling message: {}", e);
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("WebSocket connection closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            // Connection closed, cancel all pending requests
            let mut state = state_clone.lock().await;
            state.pending_events.clear();
            write_handle.abort();
        });

        let handshake = match timeout(request_timeout, connected_rx).await {
            Ok(Ok(event)) => event,
            Ok(Err(_)) => {
                reader.abort();
                return Err(RemoteError::ConnectionClosed);
            }
            Err(_) => {
                reader.abort();
                return Err(RemoteError::Timeout);
            }
        };

        if handshake.event == UNAUTHORIZED_EVENT {
            reader.abort();
            return Err(RemoteError::Unauthorized);
        }

        tracing::debug!("Channel ready at {}", endpoint);
        Ok(Self {
            state,
            reader,
            request_timeout,
            handshake,
        })
    }

    /// Route an incoming event to whoever is waiting for it
    async fn handle_message(state: &Arc<Mutex<ConnectionState>>, text: &str) -> Result<()> {
        tracing::debug!("Received: {}", text);

        let event: Event = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("Ignoring message without event: {}", e);
                return Ok(());
            }
        };

        // A refusal answers the pending handshake
        let key = if event.event == UNAUTHORIZED_EVENT {
            CONNECT_EVENT.to_string()
        } else {
            event.event.clone()
        };

        let mut state = state.lock().await;
        let Some(waiters) = state.pending_events.get_mut(&key) else {
            tracing::debug!("Unsolicited event {}", event.event);
            return Ok(());
        };

        // Skip waiters that already timed out
        let mut event = event;
        while let Some(tx) = waiters.pop_front() {
            match tx.send(event) {
                Ok(()) => break,
                Err(returned) => event = returned,
            }
        }
        if waiters.is_empty() {
            state.pending_events.remove(&key);
        }

        Ok(())
    }

    /// Whether the TV side of the channel is still up
    pub fn is_connected(&self) -> bool {
        !self.reader.is_finished()
    }

    /// Handshake event the TV sent when the channel opened
    pub fn handshake(&self) -> &Event {
        &self.handshake
    }

    /// Send a request and wait for the event named `reply_event`
    pub async fn request<T: Serialize>(&self, request: &T, reply_event: &str) -> Result<Event> {
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.state.lock().await;
            state
                .pending_events
                .entry(reply_event.to_string())
                .or_default()
                .push_back(tx);

            let json = serde_json::to_string(request)?;
            tracing::debug!("Sending: {}", json);

            state
                .ws_tx
                .send(Message::Text(json))
                .map_err(|_| RemoteError::ConnectionClosed)?;
        }

        let reply = timeout(self.request_timeout, rx).await;
        match reply {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(_)) => Err(RemoteError::ConnectionClosed),
            Err(_) => {
                // The receiver is gone, so this request's sender reports closed
                let mut state = self.state.lock().await;
                if let Some(waiters) = state.pending_events.get_mut(reply_event) {
                    waiters.retain(|tx| !tx.is_closed());
                    if waiters.is_empty() {
                        state.pending_events.remove(reply_event);
                    }
                }
                Err(RemoteError::Timeout)
            }
        }
    }

    /// Send a request without waiting for a reply
    pub async fn send_only<T: Serialize>(&self, request: &T) -> Result<()> {
        let state = self.state.lock().await;
        let json = serde_json::to_string(request)?;
        tracing::debug!("Sending (no response): {}", json);

        state
            .ws_tx
            .send(Message::Text(json))
            .map_err(|_| RemoteError::ConnectionClosed)?;

        Ok(())
    }

    /// Ask the TV to close the channel
    pub async fn close(&self) {
        let state = self.state.lock().await;
        if state.ws_tx.send(Message::Close(None)).is_err() {
            tracing::debug!("Connection already closed");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
