//! Service configuration.
//!
//! Everything is read from environment variables (after `.env` is loaded by
//! `main`). Parsing goes through a lookup function so tests never touch the
//! process environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `API_BIND_ADDRESS` | `127.0.0.1` |
//! | `API_PORT` | `20035` |
//! | `API_ENABLE_CORS` | `false` |
//! | `NOTIFY_HISTORY_CAPACITY` | `100` |
//! | `NOTIFY_DISPATCH_CAPACITY` | `10` |
//! | `NOTIFY_RECENT_DEFAULT` | `10` |
//! | `NOTIFY_NOTIFIERS` | `console` |
//! | `NOTIFY_SEND_PATH` | `notify-send` |
//! | `NOTIFY_DEFAULT_ICON` | unset |
//! | `NOTIFY_APP_NAME` | `notify-service` |
//! | `NOTIFY_LOG_DIR` | unset |
//! | `NOTIFY_SHUTDOWN_TIMEOUT_SECS` | `15` |

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api::server::ApiServerConfig;
use crate::events::DEFAULT_HISTORY_CAPACITY;
use crate::notification::{DEFAULT_DISPATCH_CAPACITY, NotifierConfig};
use crate::{Error, Result};

/// Default number of events returned by "recent" queries.
pub const DEFAULT_RECENT_COUNT: usize = 10;

/// Default time allowed for draining the dispatch queue on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub api: ApiServerConfig,
    /// Maximum number of events kept in history.
    pub history_capacity: usize,
    /// Maximum number of events waiting for delivery.
    pub dispatch_capacity: usize,
    /// Count used by "recent" queries when the client gives none.
    pub recent_default: usize,
    /// Delivery backends, in delivery order.
    pub notifiers: Vec<NotifierConfig>,
    /// Directory for rotated log files; console only when unset.
    pub log_dir: Option<PathBuf>,
    pub shutdown_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api: ApiServerConfig::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            dispatch_capacity: DEFAULT_DISPATCH_CAPACITY,
            recent_default: DEFAULT_RECENT_COUNT,
            notifiers: vec![NotifierConfig::Console],
            log_dir: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let mut api = defaults.api;
        if let Some(bind_address) = get("API_BIND_ADDRESS") {
            api.bind_address = bind_address.trim().to_string();
        }
        api.port = parse_or(&get, "API_PORT", api.port)?;
        api.enable_cors = parse_bool_or(&get, "API_ENABLE_CORS", api.enable_cors)?;

        let history_capacity =
            parse_or(&get, "NOTIFY_HISTORY_CAPACITY", defaults.history_capacity)?;
        if history_capacity == 0 {
            return Err(Error::config("NOTIFY_HISTORY_CAPACITY must be at least 1"));
        }

        let dispatch_capacity =
            parse_or(&get, "NOTIFY_DISPATCH_CAPACITY", defaults.dispatch_capacity)?;
        if dispatch_capacity == 0 {
            return Err(Error::config("NOTIFY_DISPATCH_CAPACITY must be at least 1"));
        }

        let recent_default = parse_or(&get, "NOTIFY_RECENT_DEFAULT", defaults.recent_default)?;

        let mut notifiers = match get("NOTIFY_NOTIFIERS") {
            Some(raw) => raw
                .split(',')
                .filter(|name| !name.trim().is_empty())
                .map(NotifierConfig::from_str)
                .collect::<Result<Vec<_>>>()?,
            None => defaults.notifiers,
        };
        if notifiers.is_empty() {
            return Err(Error::config("NOTIFY_NOTIFIERS must name at least one notifier"));
        }

        let send_path = get("NOTIFY_SEND_PATH");
        let default_icon = get("NOTIFY_DEFAULT_ICON");
        let app_name = get("NOTIFY_APP_NAME");
        for notifier in &mut notifiers {
            match notifier {
                NotifierConfig::Console => {}
                NotifierConfig::Desktop(c) => {
                    if let Some(app_name) = &app_name {
                        c.app_name = app_name.clone();
                    }
                    c.default_icon = default_icon.clone();
                }
                NotifierConfig::NotifySend(c) => {
                    if let Some(path) = &send_path {
                        c.program = path.clone();
                    }
                    if app_name.is_some() {
                        c.app_name = app_name.clone();
                    }
                    c.default_icon = default_icon.clone();
                }
            }
        }

        let shutdown_timeout = Duration::from_secs(parse_or(
            &get,
            "NOTIFY_SHUTDOWN_TIMEOUT_SECS",
            defaults.shutdown_timeout.as_secs(),
        )?);

        Ok(Self {
            api,
            history_capacity,
            dispatch_capacity,
            recent_default,
            notifiers,
            log_dir: get("NOTIFY_LOG_DIR").map(PathBuf::from),
            shutdown_timeout,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("invalid {}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(Error::config(format!("invalid {}={:?}", key, v))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api.bind_address, "127.0.0.1");
        assert_eq!(config.api.port, 20035);
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.dispatch_capacity, 10);
        assert_eq!(config.recent_default, 10);
        assert_eq!(config.notifiers, vec![NotifierConfig::Console]);
        assert!(config.log_dir.is_none());
        assert_eq!(config.shutdown_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("API_PORT", "8080"),
            ("API_ENABLE_CORS", "yes"),
            ("NOTIFY_HISTORY_CAPACITY", "5"),
            ("NOTIFY_DISPATCH_CAPACITY", "3"),
            ("NOTIFY_NOTIFIERS", "console, notify-send"),
            ("NOTIFY_SEND_PATH", "/opt/bin/notify-send"),
            ("NOTIFY_DEFAULT_ICON", "dialog-information"),
            ("NOTIFY_LOG_DIR", "/var/log/notify"),
        ])
        .unwrap();

        assert_eq!(config.api.port, 8080);
        assert!(config.api.enable_cors);
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.dispatch_capacity, 3);
        assert_eq!(config.notifiers.len(), 2);
        match &config.notifiers[1] {
            NotifierConfig::NotifySend(c) => {
                assert_eq!(c.program, "/opt/bin/notify-send");
                assert_eq!(c.default_icon.as_deref(), Some("dialog-information"));
            }
            other => panic!("unexpected notifier: {:?}", other),
        }
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/notify")));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("API_PORT", "  "), ("NOTIFY_NOTIFIERS", "")]).unwrap();
        assert_eq!(config.api.port, 20035);
        assert_eq!(config.notifiers, vec![NotifierConfig::Console]);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(matches!(
            load(&[("API_PORT", "seventy")]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            load(&[("NOTIFY_HISTORY_CAPACITY", "0")]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            load(&[("NOTIFY_DISPATCH_CAPACITY", "-1")]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            load(&[("NOTIFY_NOTIFIERS", "console,pager")]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            load(&[("NOTIFY_NOTIFIERS", " , ")]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            load(&[("API_ENABLE_CORS", "maybe")]),
            Err(Error::Configuration(_))
        ));
    }
}
