//! `notify-send` notifier.
//!
//! Spawns an external libnotify-style binary per event. Delivery only waits
//! for the process to start; its exit status is reaped in the background.

use std::io::ErrorKind;

use async_trait::async_trait;
use process_utils::{find_program, spawn_detached, tokio_command};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Notifier;
use crate::events::{Event, Severity};
use crate::{Error, Result};

/// Default binary name looked up on `PATH`.
pub const DEFAULT_NOTIFY_SEND_PROGRAM: &str = "notify-send";

/// notify-send notifier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySendConfig {
    /// Binary name or path.
    pub program: String,
    /// Value passed as `--app-name`.
    pub app_name: Option<String>,
    /// Icon used when the event carries none.
    pub default_icon: Option<String>,
}

impl Default for NotifySendConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_NOTIFY_SEND_PROGRAM.to_string(),
            app_name: Some(crate::APP_NAME.to_string()),
            default_icon: None,
        }
    }
}

/// Urgency level passed to `--urgency`.
pub fn urgency_for(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "critical",
        Severity::Warning => "normal",
        Severity::Information => "low",
    }
}

/// Notifier backed by an external `notify-send` binary.
pub struct NotifySendNotifier {
    config: NotifySendConfig,
}

impl NotifySendNotifier {
    pub fn new(config: NotifySendConfig) -> Self {
        match find_program(&config.program) {
            Some(path) => debug!(program = %path.display(), "Using notify-send binary"),
            None => warn!(
                program = %config.program,
                "notify-send binary not found; deliveries will fail until it is installed"
            ),
        }
        Self { config }
    }

    /// Command-line arguments for `event`.
    pub fn build_args(&self, event: &Event) -> Vec<String> {
        let mut args = vec![format!("--urgency={}", urgency_for(event.severity()))];

        if let Some(app_name) = &self.config.app_name {
            args.push(format!("--app-name={}", app_name));
        }

        if let Some(category) = event.category() {
            args.push(format!("--category={}", category));
        }

        if let Some(icon) = event.icon().or(self.config.default_icon.as_deref()) {
            args.push(format!("--icon={}", icon));
        }

        // Stop option parsing so titles starting with '-' are not flags.
        args.push("--".to_string());
        args.push(event.title().to_string());
        if !event.message().is_empty() {
            args.push(event.message().to_string());
        }
        args
    }
}

#[async_trait]
impl Notifier for NotifySendNotifier {
    fn notifier_type(&self) -> &'static str {
        "notify-send"
    }

    async fn deliver(&self, event: &Event) -> Result<()> {
        let mut cmd = tokio_command(&self.config.program);
        cmd.args(self.build_args(event));

        let event_id = event.id();
        let program = self.config.program.clone();
        let pid = spawn_detached(&mut cmd, move |status| match status {
            Ok(status) if status.success() => {
                debug!(event_id = %event_id, "notify-send exited successfully")
            }
            Ok(status) => warn!(event_id = %event_id, %status, "notify-send exited with failure"),
            Err(e) => warn!(event_id = %event_id, error = %e, "Failed to wait for notify-send"),
        })
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                Error::delivery("notify-send", format!("binary not found: {}", program))
            }
            _ => Error::delivery("notify-send", format!("failed to start {}: {}", program, e)),
        })?;

        debug!(event_id = %event_id, pid = ?pid, "Spawned notify-send");
        Ok(())
    }
}
