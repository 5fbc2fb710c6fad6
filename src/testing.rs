use crate::backend::{BackendFactory, ProtocolBackend};
use crate::config::{Config, Method};
use crate::descriptor::DeviceDescriptor;
use crate::discovery::Discovery;
use crate::error::{RemoteError, Result};
use crate::types::App;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters shared by every engine a [`MockBackends`] creates
#[derive(Default)]
pub(crate) struct MockCalls {
    pub created: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub enters: AtomicUsize,
    pub exits: AtomicUsize,
    pub exit_errors: AtomicUsize,
    pub commands: Mutex<Vec<Value>>,
    pub app_queries: Mutex<Vec<String>>,
}

pub(crate) struct MockBackend {
    method: Method,
    open: AtomicBool,
    calls: Arc<MockCalls>,
}

#[async_trait]
impl ProtocolBackend for MockBackend {
    fn method(&self) -> Method {
        self.method
    }

    async fn open(&self) -> Result<()> {
        if !self.open.swap(true, Ordering::SeqCst) {
            self.calls.opens.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.open.swap(false, Ordering::SeqCst) {
            self.calls.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn send(&self, command: Value) -> Result<()> {
        if command == Value::from("reject") {
            return Err(RemoteError::Backend("rejected".to_string()));
        }
        self.calls.commands.lock().push(command);
        Ok(())
    }

    async fn control(&self, key: &str) -> Result<Value> {
        Ok(Value::from(key))
    }

    async fn get_apps(&self, query: &str) -> Result<Vec<App>> {
        self.calls.app_queries.lock().push(query.to_string());
        Ok(vec![App::new(query, query)])
    }

    async fn enter_scope(&self) -> Result<()> {
        self.calls.enters.fetch_add(1, Ordering::SeqCst);
        self.open().await
    }

    async fn exit_scope(&self, error: Option<&RemoteError>) -> Result<()> {
        self.calls.exits.fetch_add(1, Ordering::SeqCst);
        if error.is_some() {
            self.calls.exit_errors.fetch_add(1, Ordering::SeqCst);
        }
        self.close().await
    }
}

/// Factory that serves every method with a [`MockBackend`]
#[derive(Default)]
pub(crate) struct MockBackends {
    pub calls: Arc<MockCalls>,
}

impl BackendFactory for MockBackends {
    fn create(&self, method: Method, _config: &Config) -> Result<Box<dyn ProtocolBackend>> {
        self.calls.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockBackend {
            method,
            open: AtomicBool::new(false),
            calls: self.calls.clone(),
        }))
    }
}

/// Discovery that counts lookups and takes a moment to answer
pub(crate) struct SlowDiscovery {
    pub lookups: AtomicUsize,
    pub devices: Vec<DeviceDescriptor>,
}

impl SlowDiscovery {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            lookups: AtomicUsize::new(0),
            devices,
        }
    }
}

#[async_trait]
impl Discovery for SlowDiscovery {
    async fn discover(&self, _config: &Config) -> Result<Vec<DeviceDescriptor>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(self.devices.clone())
    }
}
