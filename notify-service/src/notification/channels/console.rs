//! Console notifier.

use std::io::Write;

use async_trait::async_trait;

use super::Notifier;
use crate::Result;
use crate::events::Event;

/// Writes one line per event to standard output.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }

    /// Render the line printed for `event`.
    pub fn format_line(event: &Event) -> String {
        let mut line = format!("*** NEW EVENT: [{}] ", event.severity());
        let title = event.title().trim();
        let message = event.message().trim();
        match (title.is_empty(), message.is_empty()) {
            (true, _) => line.push_str(message),
            (false, true) => line.push_str(title),
            (false, false) => line.push_str(&format!("{}: {}", title, message)),
        }

        match (event.category(), event.subcategory()) {
            (Some(category), Some(subcategory)) => {
                line.push_str(&format!(" <{}/{}>", category, subcategory))
            }
            (Some(category), None) => line.push_str(&format!(" <{}>", category)),
            _ => {}
        }

        if let Some(host) = event.origin_host() {
            line.push_str(&format!(" (host={})", host));
        }
        line.push_str(" ***");
        line
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn notifier_type(&self) -> &'static str {
        "console"
    }

    async fn deliver(&self, event: &Event) -> Result<()> {
        let line = Self::format_line(event);
        // A closed stdout is not a delivery failure for this notifier.
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
        Ok(())
    }
}
