//! Notifiers.
//!
//! This module provides the different ways an event can be delivered:
//! - Console (standard output)
//! - Desktop popups through the platform notification service
//! - An external `notify-send` compatible binary

mod console;
mod desktop;
mod notify_send;

pub use console::ConsoleNotifier;
pub use desktop::{DesktopConfig, DesktopNotifier, DesktopStyle};
pub use notify_send::{NotifySendConfig, NotifySendNotifier, urgency_for};

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::{Error, Result};

/// Trait for delivery backends.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Get the notifier type name.
    fn notifier_type(&self) -> &'static str;

    /// Present `event` to this notifier's destination.
    async fn deliver(&self, event: &Event) -> Result<()>;
}

/// Notifier configuration wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NotifierConfig {
    /// Print events to standard output.
    Console,
    /// Desktop popup.
    Desktop(DesktopConfig),
    /// External notify-send binary.
    NotifySend(NotifySendConfig),
}

impl NotifierConfig {
    /// Get the notifier type name.
    pub fn notifier_type(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Desktop(_) => "desktop",
            Self::NotifySend(_) => "notify-send",
        }
    }

    /// Construct the notifier this configuration describes.
    pub fn build(&self) -> Arc<dyn Notifier> {
        match self {
            Self::Console => Arc::new(ConsoleNotifier::new()),
            Self::Desktop(c) => Arc::new(DesktopNotifier::new(c.clone())),
            Self::NotifySend(c) => Arc::new(NotifySendNotifier::new(c.clone())),
        }
    }
}

impl FromStr for NotifierConfig {
    type Err = Error;

    /// Parse a notifier name with default options.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "console" | "stdout" => Ok(Self::Console),
            "desktop" => Ok(Self::Desktop(DesktopConfig::default())),
            "notify-send" | "notifysend" => Ok(Self::NotifySend(NotifySendConfig::default())),
            other => Err(Error::config(format!("unknown notifier: {}", other))),
        }
    }
}
