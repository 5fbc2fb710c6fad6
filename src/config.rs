use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Client name shown on the TV when none is configured
pub const DEFAULT_NAME: &str = "samsung-remote";

/// Remote-control wire protocol spoken by a TV
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Pre-2014 TCP protocol on port 55000
    Legacy,
    /// Plain websocket API (2016+ without token auth)
    Websocket,
    /// TLS websocket API with token pairing
    WebsocketSsl,
    /// 2014/2015 encrypted websocket API with PIN pairing
    WebsocketEncrypted,
}

impl Method {
    /// Control port and secondary http port used by this method
    pub fn transport(self) -> (u16, Option<u16>) {
        match self {
            Method::Websocket => (8001, Some(8001)),
            Method::WebsocketSsl => (8002, Some(8001)),
            Method::WebsocketEncrypted => (8000, Some(8080)),
            Method::Legacy => (55000, None),
        }
    }

    /// Method whose control port is `port`, if it is one of the well-known ones
    pub fn from_port(port: u16) -> Option<Self> {
        match port {
            55000 => Some(Method::Legacy),
            8000 => Some(Method::WebsocketEncrypted),
            8001 => Some(Method::Websocket),
            8002 => Some(Method::WebsocketSsl),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Legacy => "legacy",
            Method::Websocket => "websocket",
            Method::WebsocketSsl => "websocket_ssl",
            Method::WebsocketEncrypted => "websocket_encrypted",
        };
        f.write_str(name)
    }
}

/// Connection settings for one TV
///
/// Two configs with identical field values describe the same device; see
/// [`Config::identity`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub http_port: Option<u16>,

    /// Pairing token: empty for open websocket TVs, digits for a PIN
    pub token: Option<String>,

    /// Resolved protocol, absent until selection runs
    pub method: Option<Method>,

    /// Session identifier
    pub id: Option<String>,

    /// Device identifier; when set, discovery is attempted
    pub device_id: Option<String>,

    /// Client name announced to the TV
    pub name: String,
    pub description: Option<String>,

    /// Backend request timeout in seconds
    pub timeout: Option<u64>,

    /// Device-specific fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            http_port: None,
            token: None,
            method: None,
            id: None,
            device_id: None,
            name: DEFAULT_NAME.to_string(),
            description: None,
            timeout: None,
            extra: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Create a config for a TV at a known host
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Self::default()
        }
    }

    /// Create a config that locates the TV through discovery
    pub fn for_device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Canonical string identity used to deduplicate sessions
    ///
    /// Field order is fixed by the struct and `extra` is key-sorted, so equal
    /// configs always produce equal identities.
    pub fn identity(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a config from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize the config as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loaded config from {}", path.as_ref().display());
        Self::from_json(&text)
    }

    /// Write the config to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        tracing::debug!("Saved config to {}", path.as_ref().display());
        Ok(())
    }
}
