use crate::backend::{BackendFactory, ProtocolBackend};
use crate::config::{Config, Method};
use crate::descriptor::SharedDescriptor;
use crate::discovery::Discovery;
use crate::error::{RemoteError, Result};
use crate::protocol::{EDEN_APPS_EVENT, INSTALLED_APPS_EVENT};
use crate::selector;
use crate::types::App;
use crate::wake;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Names owned by the session itself; never forwarded to the descriptor
const RESERVED_ATTRIBUTES: [&str; 4] = ["backend", "descriptor", "config", "power"];

/// First model year that wakes on a magic packet
const WAKE_MIN_YEAR: u16 = 2014;

/// Engine bound to a session, tagged with the method it was built for
struct BoundBackend {
    method: Method,
    engine: Box<dyn ProtocolBackend>,
}

/// Uniform control session for one TV
///
/// Wraps whichever protocol engine the TV needs and, when discovery found the
/// TV, its [`DeviceDescriptor`](crate::DeviceDescriptor). Descriptor metadata
/// is reachable through [`get_extra`](Self::get_extra) and
/// [`set_extra`](Self::set_extra).
///
/// Sessions are usually obtained from a [`SessionRegistry`](crate::SessionRegistry),
/// which keeps one session per configuration.
pub struct RemoteSession {
    config: Config,
    backend: BoundBackend,
    descriptor: Option<SharedDescriptor>,
    power: AtomicBool,
}

impl RemoteSession {
    /// Resolve the protocol for `config` and bind its engine
    ///
    /// Runs discovery when `config.device_id` is set and no descriptor was
    /// supplied, then protocol selection, then asks `backends` for the engine.
    /// No connection is opened.
    pub async fn create(
        mut config: Config,
        descriptor: Option<SharedDescriptor>,
        discovery: &dyn Discovery,
        backends: &dyn BackendFactory,
    ) -> Result<Self> {
        if config.id.is_none() {
            config.id = Some(Uuid::new_v4().to_string());
        }

        let descriptor = match descriptor {
            Some(descriptor) => Some(descriptor),
            None if config.device_id.is_some() => match discovery.discover(&config).await {
                Ok(found) => found.into_iter().next().map(|tv| tv.shared()),
                Err(e) => {
                    tracing::warn!("Discovery failed: {}", e);
                    None
                }
            },
            None => None,
        };

        let (method, config) = {
            let tv = descriptor.as_ref().map(|d| d.read());
            selector::select(config, tv.as_deref())?
        };

        let engine = backends.create(method, &config)?;
        tracing::info!(
            "Bound {} backend for {}",
            method,
            config.host.as_deref().unwrap_or("unknown host")
        );

        Self::with_backend(config, engine, descriptor)
    }

    /// Wrap an already constructed engine
    ///
    /// `config.method` must name the engine's method.
    pub fn with_backend(
        config: Config,
        engine: Box<dyn ProtocolBackend>,
        descriptor: Option<SharedDescriptor>,
    ) -> Result<Self> {
        let method = engine.method();
        if config.method != Some(method) {
            return Err(RemoteError::Internal(format!(
                "backend speaks {} but config names {:?}",
                method, config.method
            )));
        }

        Ok(Self {
            config,
            backend: BoundBackend { method, engine },
            descriptor,
            power: AtomicBool::new(true),
        })
    }

    /// Protocol this session speaks
    pub fn method(&self) -> Method {
        self.backend.method
    }

    /// Configuration after protocol selection
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Descriptor found by discovery, if any
    pub fn descriptor(&self) -> Option<SharedDescriptor> {
        self.descriptor.clone()
    }

    /// Pairing token held by the engine
    pub fn token(&self) -> Option<String> {
        self.backend.engine.token()
    }

    pub async fn open(&self) -> Result<()> {
        self.backend.engine.open().await
    }

    /// Close the connection; safe to call on a closed session
    pub async fn close(&self) -> Result<()> {
        self.backend.engine.close().await
    }

    pub async fn send(&self, command: Value) -> Result<()> {
        self.backend.engine.send(command).await
    }

    /// Press a remote key (e.g. `KEY_VOLUP`)
    pub async fn control(&self, key: &str) -> Result<Value> {
        self.backend.engine.control(key).await
    }

    /// Run `f` with the connection acquired, releasing it afterwards
    ///
    /// The release runs whether or not `f` fails. If both fail, the error
    /// from `f` is returned.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use samsung_remote::{Config, SessionRegistry};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let registry = SessionRegistry::new();
    /// let session = registry.get_or_create(Config::new("192.168.1.20").with_token("")).await?;
    ///
    /// session
    ///     .scoped(|tv| async move {
    ///         tv.control("KEY_VOLUP").await?;
    ///         tv.control("KEY_VOLUP").await
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scoped<'a, F, Fut, T>(&'a self, f: F) -> Result<T>
    where
        F: FnOnce(&'a RemoteSession) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.backend.engine.enter_scope().await?;

        let result = f(self).await;
        let released = self.backend.engine.exit_scope(result.as_ref().err()).await;

        match (result, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_error)) => {
                tracing::warn!("Failed to release connection: {}", release_error);
                Err(e)
            }
        }
    }

    /// Last known power state; not polled from the TV
    pub fn power(&self) -> bool {
        self.power.load(Ordering::SeqCst)
    }

    /// Record the power state, waking the TV when turning it on
    ///
    /// The wake packet only goes out for TVs from 2014 on with a known
    /// descriptor. The flag is updated even if the broadcast fails.
    pub async fn set_power(&self, on: bool) -> Result<()> {
        self.power.store(on, Ordering::SeqCst);
        if !on {
            return Ok(());
        }

        match self.wake_target() {
            Some(mac) => wake::wake(&mac).await,
            None => Ok(()),
        }
    }

    fn wake_target(&self) -> Option<String> {
        let tv = self.descriptor.as_ref()?.read();
        (tv.year >= WAKE_MIN_YEAR).then(|| tv.mac_address.clone())
    }

    /// Read a descriptor attribute
    ///
    /// Fails with [`RemoteError::NoDescriptor`] when the session has no
    /// descriptor, and with [`RemoteError::ReservedAttribute`] for names the
    /// session owns. `Ok(None)` means the descriptor holds no value under
    /// that name.
    pub fn get_extra(&self, name: &str) -> Result<Option<Value>> {
        check_not_reserved(name)?;
        let descriptor = self.descriptor.as_ref().ok_or(RemoteError::NoDescriptor)?;
        let tv = descriptor.read();
        tv.get(name)
    }

    /// Assign a descriptor attribute
    ///
    /// Returns `Ok(false)` when no descriptor is attached and the value was
    /// dropped.
    pub fn set_extra(&self, name: &str, value: Value) -> Result<bool> {
        check_not_reserved(name)?;
        let Some(descriptor) = &self.descriptor else {
            tracing::debug!("No descriptor attached, dropping attribute {}", name);
            return Ok(false);
        };

        descriptor.write().set(name, value)?;
        Ok(true)
    }

    /// List apps installed on the TV
    ///
    /// Queries the installed-app and eden namespaces the descriptor says are
    /// available. Without a descriptor the list is empty.
    pub async fn list_apps(&self) -> Result<Vec<App>> {
        let Some((installed, eden)) = self.app_namespaces() else {
            return Ok(Vec::new());
        };

        let mut apps = Vec::new();
        if installed {
            apps.extend(self.backend.engine.get_apps(INSTALLED_APPS_EVENT).await?);
        }
        if eden {
            apps.extend(self.backend.engine.get_apps(EDEN_APPS_EVENT).await?);
        }
        Ok(apps)
    }

    fn app_namespaces(&self) -> Option<(bool, bool)> {
        let tv = self.descriptor.as_ref()?.read();
        Some((tv.apps_list_available, tv.eden_available))
    }
}

fn check_not_reserved(name: &str) -> Result<()> {
    if RESERVED_ATTRIBUTES.contains(&name) {
        return Err(RemoteError::ReservedAttribute(name.to_string()));
    }
    Ok(())
}
