//! Rust library for controlling networked Samsung televisions
//!
//! Samsung TVs speak one of several incompatible remote-control protocols
//! depending on their generation. This library works out which one a TV
//! speaks and hands back a single session type regardless. It supports:
//!
//! - Protocol selection from discovery results or from configuration alone
//! - One cached session per TV configuration
//! - Key presses, raw commands and app listing
//! - Access to discovered device metadata through the session
//! - Power-on via wake-on-LAN broadcast
//!
//! # Quick Start
//!
//! ```no_run
//! use samsung_remote::{Config, SessionRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = SessionRegistry::new();
//!
//!     // An empty token selects the plain websocket API
//!     let tv = registry.get_or_create(Config::new("192.168.1.100").with_token("")).await?;
//!     println!("Speaking {}", tv.method());
//!
//!     tv.open().await?;
//!     tv.control("KEY_VOLUP").await?;
//!     tv.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Discovery
//!
//! Sessions for a config with a `device_id` consult the registry's
//! [`Discovery`]. The descriptor it returns drives protocol selection and
//! stays attached to the session:
//!
//! ```no_run
//! use samsung_remote::{Config, DeviceDescriptor, SessionRegistry, StaticDiscovery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let discovery = StaticDiscovery::new();
//!     discovery.insert(DeviceDescriptor {
//!         device_id: Some("uuid:living-room".to_string()),
//!         host: Some("192.168.1.100".to_string()),
//!         year: 2019,
//!         new_generation: true,
//!         token_auth_supported: true,
//!         apps_list_available: true,
//!         mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
//!         ..Default::default()
//!     });
//!
//!     let registry = SessionRegistry::new().with_discovery(discovery);
//!     let tv = registry.get_or_create(Config::for_device("uuid:living-room")).await?;
//!
//!     tv.set_power(true).await?;
//!     tv.open().await?;
//!     for app in tv.list_apps().await? {
//!         println!("{} ({})", app.name, app.app_id);
//!     }
//!     println!("Model year: {:?}", tv.get_extra("year")?);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Registry**: one session per configuration identity
//! - **Selector**: picks the protocol and rewrites the transport ports
//! - **Session**: uniform control API over the bound engine
//! - **Backend**: engine trait and factory; built-in websocket engine
//! - **Connection**: low-level websocket event handling
//! - **Wake**: wake-on-LAN magic packet broadcast

mod backend;
mod config;
mod connection;
mod descriptor;
mod discovery;
mod error;
mod protocol;
mod registry;
pub mod selector;
mod session;
mod types;
pub mod wake;
mod websocket;

#[cfg(test)]
mod testing;

// Public exports
pub use backend::{BackendFactory, DefaultBackends, ProtocolBackend};
pub use config::{Config, Method, DEFAULT_NAME};
pub use descriptor::{DeviceDescriptor, SharedDescriptor};
pub use discovery::{Discovery, NoDiscovery, StaticDiscovery};
pub use error::{RemoteError, Result};
pub use protocol::{EDEN_APPS_EVENT, INSTALLED_APPS_EVENT};
pub use registry::SessionRegistry;
pub use session::RemoteSession;
pub use types::App;
pub use websocket::WebsocketBackend;
