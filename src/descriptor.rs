use crate::error::{RemoteError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Descriptor shared between a session and whoever discovered it
pub type SharedDescriptor = Arc<RwLock<DeviceDescriptor>>;

/// Capability flags and metadata for one discovered TV
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DeviceDescriptor {
    /// Discovery identifier, matched against `Config::device_id`
    pub device_id: Option<String>,
    pub host: Option<String>,
    pub name: Option<String>,
    pub model: Option<String>,

    /// Model year (e.g. 2015)
    pub year: u16,

    /// Tizen-era TV with the websocket API
    pub new_generation: bool,

    /// Websocket API requires a pairing token over TLS
    pub token_auth_supported: bool,

    /// Installed-app listing is available
    pub apps_list_available: bool,

    /// Eden (smart hub) app listing is available
    pub eden_available: bool,

    /// Hardware address used for wake-on-LAN
    pub mac_address: String,

    /// Any other metadata reported by discovery or set through a session
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DeviceDescriptor {
    /// Wrap the descriptor for sharing with a session
    pub fn shared(self) -> SharedDescriptor {
        Arc::new(RwLock::new(self))
    }

    /// Read an attribute by name
    ///
    /// Known fields and `extra` entries share one namespace. Returns `None`
    /// when nothing is stored under `name`, including unset optional fields.
    pub fn get(&self, name: &str) -> Result<Option<Value>> {
        let value = serde_json::to_value(self)?;
        Ok(value.get(name).filter(|v| !v.is_null()).cloned())
    }

    /// Assign an attribute by name
    ///
    /// Known fields must receive a value of their own type; any other name is
    /// stored in `extra`.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let mut current = serde_json::to_value(&*self)?;
        let Value::Object(fields) = &mut current else {
            return Err(RemoteError::Internal(
                "descriptor did not serialize to an object".to_string(),
            ));
        };
        fields.insert(name.to_string(), value);

        *self = serde_json::from_value(current).map_err(|e| RemoteError::InvalidAttribute {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame_tv() -> DeviceDescriptor {
        DeviceDescriptor {
            host: Some("192.168.1.40".to_string()),
            model: Some("QN55LS03".to_string()),
            year: 2018,
            new_generation: true,
            token_auth_supported: true,
            mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_get_known_field() {
        let tv = frame_tv();
        assert_eq!(tv.get("year").unwrap(), Some(json!(2018)));
        assert_eq!(tv.get("mac_address").unwrap(), Some(json!("AA:BB:CC:DD:EE:FF")));
        assert_eq!(tv.get("frame_tv_support").unwrap(), None);
    }

    #[test]
    fn test_unset_optional_field_reads_as_none() {
        let tv = DeviceDescriptor {
            year: 2016,
            ..Default::default()
        };
        assert_eq!(tv.get("host").unwrap(), None);
        assert_eq!(tv.get("model").unwrap(), None);
        assert_eq!(tv.get("year").unwrap(), Some(json!(2016)));
    }

    #[test]
    fn test_set_known_field() {
        let mut tv = frame_tv();
        tv.set("eden_available", json!(true)).unwrap();
        assert!(tv.eden_available);
        assert!(tv.extra.is_empty());
    }

    #[test]
    fn test_set_unknown_field_lands_in_extra() {
        let mut tv = frame_tv();
        tv.set("frame_tv_support", json!("true")).unwrap();

        assert_eq!(tv.extra.get("frame_tv_support"), Some(&json!("true")));
        assert_eq!(tv.get("frame_tv_support").unwrap(), Some(json!("true")));
    }

    #[test]
    fn test_set_wrong_type_is_rejected() {
        let mut tv = frame_tv();
        let err = tv.set("year", json!("twenty-eighteen")).unwrap_err();

        assert!(matches!(err, RemoteError::InvalidAttribute { ref name, .. } if name == "year"));
        assert_eq!(tv.year, 2018);
    }
}
