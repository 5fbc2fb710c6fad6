use crate::config::{Config, Method};
use crate::error::{RemoteError, Result};
use crate::types::App;
use crate::websocket::WebsocketBackend;
use async_trait::async_trait;
use serde_json::Value;

/// Session engine for one remote-control protocol
///
/// Engines are shared behind `&self`, so connection state lives behind
/// interior mutability.
#[async_trait]
pub trait ProtocolBackend: Send + Sync {
    /// Protocol this engine speaks
    fn method(&self) -> Method;

    /// Open the control connection
    async fn open(&self) -> Result<()>;

    /// Close the control connection; closing a closed engine is `Ok`
    async fn close(&self) -> Result<()>;

    /// Send a raw protocol command
    async fn send(&self, command: Value) -> Result<()>;

    /// Press a remote key
    async fn control(&self, key: &str) -> Result<Value>;

    /// Query one app namespace (e.g. `ed.installedApp.get`)
    async fn get_apps(&self, query: &str) -> Result<Vec<App>>;

    /// Acquire the connection for a scoped block
    async fn enter_scope(&self) -> Result<()> {
        self.open().await
    }

    /// Release the connection at the end of a scoped block
    ///
    /// `error` is the failure that ended the block, if any.
    async fn exit_scope(&self, error: Option<&RemoteError>) -> Result<()> {
        if let Some(error) = error {
            tracing::debug!("Leaving scope after error: {}", error);
        }
        self.close().await
    }

    /// Pairing token obtained from the TV, if this protocol uses one
    fn token(&self) -> Option<String> {
        None
    }
}

/// Builds the engine for a resolved method
pub trait BackendFactory: Send + Sync {
    /// Construct an engine; fails if `config` is unusable for `method`
    fn create(&self, method: Method, config: &Config) -> Result<Box<dyn ProtocolBackend>>;
}

/// Stock engines shipped with the crate
///
/// Only the websocket methods have a built-in engine. Legacy and encrypted
/// TVs need a caller-supplied [`BackendFactory`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackends;

impl BackendFactory for DefaultBackends {
    fn create(&self, method: Method, config: &Config) -> Result<Box<dyn ProtocolBackend>> {
        match method {
            Method::Websocket | Method::WebsocketSsl => Ok(Box::new(WebsocketBackend::new(config)?)),
            Method::Legacy | Method::WebsocketEncrypted => Err(RemoteError::UnsupportedMethod(method)),
        }
    }
}
