use crate::config::Config;
use crate::descriptor::DeviceDescriptor;
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

/// Network lookup of TVs
///
/// Implementations are best-effort: finding nothing within their own timeout
/// is `Ok(vec![])`, not an error. The session uses the first result.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Look up the TV(s) matching `config`
    async fn discover(&self, config: &Config) -> Result<Vec<DeviceDescriptor>>;
}

/// Discovery that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscovery;

#[async_trait]
impl Discovery for NoDiscovery {
    async fn discover(&self, _config: &Config) -> Result<Vec<DeviceDescriptor>> {
        Ok(Vec::new())
    }
}

/// Discovery over a fixed set of descriptors
///
/// For callers that run their own lookup (SSDP, a saved inventory, ...) and
/// want sessions to pick the results up by `device_id`.
///
/// # Example
///
/// ```
/// use samsung_remote::{Config, DeviceDescriptor, Discovery, StaticDiscovery};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let discovery = StaticDiscovery::new();
/// discovery.insert(DeviceDescriptor {
///     device_id: Some("uuid:living-room".to_string()),
///     host: Some("192.168.1.20".to_string()),
///     year: 2019,
///     new_generation: true,
///     ..Default::default()
/// });
///
/// let found = discovery.discover(&Config::for_device("uuid:living-room")).await?;
/// assert_eq!(found.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    devices: RwLock<Vec<DeviceDescriptor>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor; an existing entry with the same `device_id` is replaced
    pub fn insert(&self, descriptor: DeviceDescriptor) {
        let mut devices = self.devices.write();
        match devices
            .iter_mut()
            .find(|d| d.device_id.is_some() && d.device_id == descriptor.device_id)
        {
            Some(existing) => *existing = descriptor,
            None => devices.push(descriptor),
        }
    }

    /// Number of known descriptors
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}

impl FromIterator<DeviceDescriptor> for StaticDiscovery {
    fn from_iter<I: IntoIterator<Item = DeviceDescriptor>>(iter: I) -> Self {
        let discovery = Self::new();
        for descriptor in iter {
            discovery.insert(descriptor);
        }
        discovery
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn discover(&self, config: &Config) -> Result<Vec<DeviceDescriptor>> {
        let devices = self.devices.read();
        let found: Vec<DeviceDescriptor> = match &config.device_id {
            Some(device_id) => devices
                .iter()
                .filter(|d| d.device_id.as_deref() == Some(device_id.as_str()))
                .cloned()
                .collect(),
            None => devices.clone(),
        };

        tracing::debug!("Static discovery matched {} device(s)", found.len());
        Ok(found)
    }
}
