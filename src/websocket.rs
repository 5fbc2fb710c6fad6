use crate::backend::ProtocolBackend;
use crate::config::{Config, Method};
use crate::connection::Connection;
use crate::error::{RemoteError, Result};
use crate::protocol::{Request, REMOTE_CONTROL_CHANNEL};
use crate::types::App;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Engine for the `Websocket` and `WebsocketSsl` methods
///
/// Talks JSON over the TV's remote-control channel. The TLS variant presents
/// the pairing token from the config and picks up a fresh one if the TV
/// hands it out during the handshake.
pub struct WebsocketBackend {
    method: Method,
    host: String,
    port: u16,
    name: String,
    timeout: Duration,
    token: parking_lot::Mutex<Option<String>>,
    connection: Mutex<Option<Arc<Connection>>>,
}

impl WebsocketBackend {
    /// Build an engine from a config whose method has already been resolved
    pub fn new(config: &Config) -> Result<Self> {
        let method = match config.method {
            Some(method @ (Method::Websocket | Method::WebsocketSsl)) => method,
            other => {
                return Err(RemoteError::InvalidConfig(format!(
                    "websocket backend cannot serve method {:?}",
                    other
                )))
            }
        };

        let host = config
            .host
            .clone()
            .ok_or_else(|| RemoteError::InvalidConfig("host is required".to_string()))?;

        Ok(Self {
            method,
            host,
            port: config.port.unwrap_or_else(|| method.transport().0),
            name: config.name.clone(),
            timeout: config.timeout.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT),
            token: parking_lot::Mutex::new(config.token.clone().filter(|t| !t.is_empty())),
            connection: Mutex::new(None),
        })
    }

    /// URL of the remote-control channel
    pub fn url(&self) -> String {
        let scheme = if self.method == Method::WebsocketSsl { "wss" } else { "ws" };
        let mut url = format!(
            "{}://{}:{}{}?name={}",
            scheme,
            self.host,
            self.port,
            REMOTE_CONTROL_CHANNEL,
            STANDARD.encode(&self.name)
        );

        if self.method == Method::WebsocketSsl {
            if let Some(token) = self.token.lock().as_deref() {
                url.push_str("&token=");
                url.push_str(token);
            }
        }
        url
    }

    async fn connection(&self) -> Result<Arc<Connection>> {
        self.connection
            .lock()
            .await
            .clone()
            .ok_or(RemoteError::NotConnected)
    }
}

#[async_trait]
impl ProtocolBackend for WebsocketBackend {
    fn method(&self) -> Method {
        self.method
    }

    async fn open(&self) -> Result<()> {
        let mut slot = self.connection.lock().await;
        match slot.as_ref() {
            Some(connection) if connection.is_connected() => return Ok(()),
            Some(_) => tracing::info!("Connection to {} was dropped, reconnecting", self.host),
            None => {}
        }

        let secure = self.method == Method::WebsocketSsl;
        let connection = Connection::connect(&self.url(), secure, self.timeout).await?;

        if let Some(token) = connection.handshake().token() {
            tracing::info!("Received pairing token from {}", self.host);
            *self.token.lock() = Some(token);
        }

        *slot = Some(Arc::new(connection));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let connection = self.connection.lock().await.take();
        match connection {
            Some(connection) => {
                connection.close().await;
                tracing::info!("Closed connection to {}", self.host);
            }
            None => tracing::debug!("Connection to {} already closed", self.host),
        }
        Ok(())
    }

    async fn send(&self, command: Value) -> Result<()> {
        self.connection().await?.send_only(&command).await
    }

    async fn control(&self, key: &str) -> Result<Value> {
        self.connection()
            .await?
            .send_only(&Request::key_click(key))
            .await?;
        Ok(Value::Bool(true))
    }

    async fn get_apps(&self, query: &str) -> Result<Vec<App>> {
        let event = self
            .connection()
            .await?
            .request(&Request::emit(query), query)
            .await?;

        let entries = event
            .app_entries()
            .ok_or_else(|| RemoteError::InvalidResponse(format!("No app list in {} reply", query)))?;

        let mut apps = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<App>(entry.clone()) {
                Ok(app) => apps.push(app),
                Err(e) => tracing::warn!("Failed to parse app entry: {}", e),
            }
        }
        Ok(apps)
    }

    fn token(&self) -> Option<String> {
        self.token.lock().clone()
    }
}
