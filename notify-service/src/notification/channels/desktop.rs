//! Desktop popup notifier.
//!
//! Uses the platform notification service (D-Bus on Linux/BSD, Notification
//! Center on macOS, toast notifications on Windows) through `notify-rust`.

use async_trait::async_trait;
use notify_rust::{Notification, Timeout};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Notifier;
use crate::events::{Event, Severity};
use crate::{Error, Result};

/// Desktop notifier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopConfig {
    /// Application name shown by the notification daemon.
    pub app_name: String,
    /// Icon used when the event carries none.
    pub default_icon: Option<String>,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            app_name: crate::APP_NAME.to_string(),
            default_icon: None,
        }
    }
}

/// How a popup is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopStyle {
    /// Critical urgency; stays on screen until dismissed.
    Alert,
    /// Regular popup with the daemon's default timeout.
    Notify,
}

impl DesktopStyle {
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Alert,
            Severity::Warning | Severity::Information => Self::Notify,
        }
    }

    fn timeout(self) -> Timeout {
        match self {
            Self::Alert => Timeout::Never,
            Self::Notify => Timeout::Default,
        }
    }
}

/// Desktop popup notifier.
pub struct DesktopNotifier {
    config: DesktopConfig,
}

impl DesktopNotifier {
    pub fn new(config: DesktopConfig) -> Self {
        Self { config }
    }

    fn build_notification(&self, event: &Event) -> Notification {
        let style = DesktopStyle::for_severity(event.severity());

        let mut notification = Notification::new();
        notification
            .appname(&self.config.app_name)
            .summary(event.title())
            .body(event.message())
            .timeout(style.timeout());

        if let Some(icon) = event.icon().or(self.config.default_icon.as_deref()) {
            notification.icon(icon);
        }

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            use notify_rust::Urgency;
            notification.urgency(match event.severity() {
                Severity::Error => Urgency::Critical,
                Severity::Warning => Urgency::Normal,
                Severity::Information => Urgency::Low,
            });
        }

        notification
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn notifier_type(&self) -> &'static str {
        "desktop"
    }

    async fn deliver(&self, event: &Event) -> Result<()> {
        let notification = self.build_notification(event);
        let event_id = event.id();

        // The platform call talks to a session bus / OS service and may block.
        tokio::task::spawn_blocking(move || notification.show().map(|_| ()))
            .await
            .map_err(|e| Error::delivery("desktop", format!("notification task failed: {}", e)))?
            .map_err(|e| Error::delivery("desktop", e.to_string()))?;

        debug!(event_id = %event_id, "Desktop notification shown");
        Ok(())
    }
}
