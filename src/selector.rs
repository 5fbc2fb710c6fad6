use crate::config::{Config, Method};
use crate::descriptor::DeviceDescriptor;
use crate::error::{RemoteError, Result};

/// Resolve the method for `config` and return it with the rewritten config
pub fn select(mut config: Config, descriptor: Option<&DeviceDescriptor>) -> Result<(Method, Config)> {
    let method = match descriptor {
        Some(tv) => {
            if config.host.is_none() {
                config.host = tv.host.clone();
            }
            Some(select_by_descriptor(tv))
        }
        None => {
            tracing::warn!("Discovery disabled, selecting method from configuration");
            select_by_config(&config)
        }
    };

    let Some(method) = method else {
        return Err(unresolved(&config, descriptor.is_some()));
    };

    let (port, http_port) = method.transport();
    config.method = Some(method);
    config.port = Some(port);
    config.http_port = http_port;

    tracing::debug!("Selected method {} (port {}, http port {:?})", method, port, http_port);
    Ok((method, config))
}

fn select_by_descriptor(tv: &DeviceDescriptor) -> Method {
    if tv.new_generation {
        if tv.token_auth_supported {
            Method::WebsocketSsl
        } else {
            Method::Websocket
        }
    } else if matches!(tv.year, 2014 | 2015) {
        Method::WebsocketEncrypted
    } else {
        Method::Legacy
    }
}

fn select_by_config(config: &Config) -> Option<Method> {
    // Discovery was requested and failed; without a host there is nothing to reach.
    if config.device_id.is_some() && config.host.is_none() {
        return None;
    }

    // A well-known port pins the method. A preset method must agree with it.
    if let Some(port_method) = config.port.and_then(Method::from_port) {
        return match config.method {
            None => Some(port_method),
            Some(method) if method == port_method => Some(method),
            Some(method) => {
                tracing::warn!(
                    "Configured method {} does not match port {:?}",
                    method,
                    config.port
                );
                None
            }
        };
    }

    match config.token.as_deref() {
        Some(token) if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) => {
            Some(Method::WebsocketEncrypted)
        }
        Some(token) if !token.is_empty() => Some(Method::WebsocketSsl),
        Some(_) => Some(Method::Websocket),
        None => Some(Method::Legacy),
    }
}

fn unresolved(config: &Config, had_descriptor: bool) -> RemoteError {
    match (had_descriptor, config.host.is_some()) {
        (false, false) => RemoteError::NoTvFound,
        (_, true) => RemoteError::ConfigUnknownMethod,
        (true, false) => {
            RemoteError::Internal("descriptor present but no method was selected".to_string())
        }
    }
}
