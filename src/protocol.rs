use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Channel path of the remote-control websocket API
pub const REMOTE_CONTROL_CHANNEL: &str = "/api/v2/channels/samsung.remote.control";

/// Event sent by the TV once the channel is ready
pub const CONNECT_EVENT: &str = "ms.channel.connect";

/// Event sent by the TV when the pairing request was refused
pub const UNAUTHORIZED_EVENT: &str = "ms.channel.unauthorized";

/// App-list query for the installed-app namespace
pub const INSTALLED_APPS_EVENT: &str = "ed.installedApp.get";

/// App-list query for the eden (smart hub) namespace
pub const EDEN_APPS_EVENT: &str = "ed.edenApp.get";

/// Outgoing websocket request
#[derive(Debug, Clone, Serialize)]
pub struct Request<P> {
    pub method: &'static str,
    pub params: P,
}

/// Parameters of a `ms.remote.control` request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteControlParams {
    pub cmd: String,
    pub data_of_cmd: String,
    pub option: String,
    pub type_of_remote: String,
}

/// Parameters of a `ms.channel.emit` request
#[derive(Debug, Clone, Serialize)]
pub struct EmitParams {
    pub event: String,
    pub to: String,
}

/// Incoming channel event
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub event: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Request<RemoteControlParams> {
    /// Single press of a remote key (e.g. `KEY_VOLUP`)
    pub fn key_click(key: impl Into<String>) -> Self {
        Self {
            method: "ms.remote.control",
            params: RemoteControlParams {
                cmd: "Click".to_string(),
                data_of_cmd: key.into(),
                option: "false".to_string(),
                type_of_remote: "SendRemoteKey".to_string(),
            },
        }
    }
}

impl Request<EmitParams> {
    /// Ask the TV host to answer with `event`
    pub fn emit(event: impl Into<String>) -> Self {
        Self {
            method: "ms.channel.emit",
            params: EmitParams {
                event: event.into(),
                to: "host".to_string(),
            },
        }
    }
}

impl Event {
    /// Pairing token handed out in the connect event, if any
    pub fn token(&self) -> Option<String> {
        self.data
            .as_ref()?
            .get("token")?
            .as_str()
            .map(str::to_string)
    }

    /// Entries of an app-list answer
    ///
    /// The TV nests the list as `data.data`; a bare `data` array is accepted too.
    pub fn app_entries(&self) -> Option<&Vec<Value>> {
        let data = self.data.as_ref()?;
        data.get("data")
            .and_then(Value::as_array)
            .or_else(|| data.as_array())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_click_wire_format() {
        let value = serde_json::to_value(Request::key_click("KEY_POWER")).unwrap();
        assert_eq!(
            value,
            json!({
                "method": "ms.remote.control",
                "params": {
                    "Cmd": "Click",
                    "DataOfCmd": "KEY_POWER",
                    "Option": "false",
                    "TypeOfRemote": "SendRemoteKey"
                }
            })
        );
    }

    #[test]
    fn test_emit_wire_format() {
        let value = serde_json::to_value(Request::emit(INSTALLED_APPS_EVENT)).unwrap();
        assert_eq!(
            value,
            json!({"method": "ms.channel.emit", "params": {"event": "ed.installedApp.get", "to": "host"}})
        );
    }

    #[test]
    fn test_connect_event_token() {
        let event: Event = serde_json::from_value(json!({
            "event": "ms.channel.connect",
            "data": {"clients": [], "id": "abc", "token": "15913424"}
        }))
        .unwrap();
        assert_eq!(event.token().as_deref(), Some("15913424"));

        let event: Event = serde_json::from_value(json!({"event": "ms.channel.connect"})).unwrap();
        assert_eq!(event.token(), None);
    }

    #[test]
    fn test_app_entries_nested_and_flat() {
        let nested: Event = serde_json::from_value(json!({
            "event": "ed.installedApp.get",
            "data": {"data": [{"appId": "1", "name": "Netflix"}]}
        }))
        .unwrap();
        assert_eq!(nested.app_entries().map(Vec::len), Some(1));

        let flat: Event = serde_json::from_value(json!({
            "event": "ed.edenApp.get",
            "data": [{"id": "2", "name": "Plex"}, {"id": "3", "name": "Spotify"}]
        }))
        .unwrap();
        assert_eq!(flat.app_entries().map(Vec::len), Some(2));
    }
}
