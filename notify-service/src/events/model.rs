//! Event data model.
//!
//! An [`EventDraft`] is what a client submits; an [`Event`] is what the store
//! hands back once it has assigned an identity. Events are only ever built by
//! the store, so their identity cannot be chosen or changed by a caller.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{Error, Result};

/// Opaque event identity.
pub type EventId = Uuid;

/// Alert level of an event.
///
/// On the wire this is the integer code (`ERROR=0`, `WARNING=1`,
/// `INFORMATION=2`). The level names are accepted as input too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    Error,
    Warning,
    #[default]
    Information,
}

impl Severity {
    /// Wire code of this level.
    pub fn code(self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warning => 1,
            Self::Information => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Error),
            1 => Some(Self::Warning),
            2 => Some(Self::Information),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Information => "INFORMATION",
        }
    }

    pub fn is_error(self) -> bool {
        self == Self::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return Self::from_code(code)
                .ok_or_else(|| Error::validation(format!("unknown severity code: {}", code)));
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "information" | "info" => Ok(Self::Information),
            _ => Err(Error::validation(format!("unknown severity: {}", trimmed))),
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

struct SeverityVisitor;

impl Visitor<'_> for SeverityVisitor {
    type Value = Severity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a severity code (0, 1, 2) or name (ERROR, WARNING, INFORMATION)")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Severity, E> {
        Severity::from_code(v).ok_or_else(|| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Severity, E> {
        i64::try_from(v)
            .ok()
            .and_then(Severity::from_code)
            .ok_or_else(|| E::invalid_value(Unexpected::Unsigned(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Severity, E> {
        v.parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(SeverityVisitor)
    }
}

/// Treat blank strings the same as a missing field.
fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// A client-submitted event, before the store assigns it an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Host the event originated from.
    #[serde(rename = "host", default, deserialize_with = "blank_as_none")]
    pub origin_host: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// Icon reference (path or theme icon name).
    #[serde(default, deserialize_with = "blank_as_none")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub subcategory: Option<String>,
    #[serde(rename = "level", alias = "severity", default)]
    pub severity: Severity,
}

impl EventDraft {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
            ..Default::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.origin_host = Some(host.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_category(
        mut self,
        category: impl Into<String>,
        subcategory: Option<String>,
    ) -> Self {
        self.category = Some(category.into());
        self.subcategory = subcategory;
        self
    }

    /// Parse and validate a JSON request body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let draft: Self = serde_json::from_slice(body)
            .map_err(|e| Error::validation(format!("invalid event payload: {}", e)))?;
        draft.validate()?;
        Ok(draft)
    }

    /// An event has to carry something to show.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() && self.message.trim().is_empty() {
            return Err(Error::validation(
                "event must have a non-empty title or message",
            ));
        }
        Ok(())
    }
}

/// A stored notification event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    id: EventId,
    #[serde(rename = "host", skip_serializing_if = "Option::is_none")]
    origin_host: Option<String>,
    title: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subcategory: Option<String>,
    #[serde(rename = "level")]
    severity: Severity,
    created_at: DateTime<Utc>,
}

impl Event {
    pub(crate) fn from_draft(id: EventId, draft: EventDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            origin_host: draft.origin_host,
            title: draft.title,
            message: draft.message,
            icon: draft.icon,
            category: draft.category,
            subcategory: draft.subcategory,
            severity: draft.severity,
            created_at,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn origin_host(&self) -> Option<&str> {
        self.origin_host.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn subcategory(&self) -> Option<&str> {
        self.subcategory.as_deref()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", Severity::Error)]
    #[case("1", Severity::Warning)]
    #[case("2", Severity::Information)]
    #[case("\"ERROR\"", Severity::Error)]
    #[case("\"warning\"", Severity::Warning)]
    #[case("\"Information\"", Severity::Information)]
    #[case("\"info\"", Severity::Information)]
    fn test_severity_deserialize(#[case] raw: &str, #[case] expected: Severity) {
        let severity: Severity = serde_json::from_str(raw).unwrap();
        assert_eq!(severity, expected);
    }

    #[rstest]
    #[case("3")]
    #[case("-1")]
    #[case("1.5")]
    #[case("\"fatal\"")]
    #[case("\"\"")]
    #[case("null")]
    #[case("true")]
    fn test_severity_rejects_unknown(#[case] raw: &str) {
        assert!(serde_json::from_str::<Severity>(raw).is_err());
    }

    #[test]
    fn test_severity_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Severity::Error).unwrap(), "0");
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Severity::Information).unwrap(), "2");
    }

    #[test]
    fn test_draft_from_json() {
        let body = br#"{
            "host": "build-01",
            "title": "Build failed",
            "message": "exit status 2",
            "icon": "",
            "category": "ci",
            "level": 0
        }"#;

        let draft = EventDraft::from_json(body).unwrap();
        assert_eq!(draft.origin_host.as_deref(), Some("build-01"));
        assert_eq!(draft.title, "Build failed");
        assert_eq!(draft.icon, None);
        assert_eq!(draft.category.as_deref(), Some("ci"));
        assert_eq!(draft.subcategory, None);
        assert_eq!(draft.severity, Severity::Error);
    }

    #[test]
    fn test_draft_accepts_severity_alias_and_defaults() {
        let draft = EventDraft::from_json(br#"{"title": "t", "severity": "warning"}"#).unwrap();
        assert_eq!(draft.severity, Severity::Warning);

        let draft = EventDraft::from_json(br#"{"message": "m"}"#).unwrap();
        assert_eq!(draft.severity, Severity::Information);
    }

    #[test]
    fn test_draft_rejects_invalid_level() {
        let err = EventDraft::from_json(br#"{"title": "t", "level": 7}"#).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_draft_rejects_malformed_json() {
        let err = EventDraft::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_draft_requires_content() {
        let err = EventDraft::from_json(br#"{"title": "  ", "level": 1}"#).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_event_serialization() {
        let draft = EventDraft::new("Disk", "95% full", Severity::Warning).with_host("nas");
        let event = Event::from_draft(Uuid::new_v4(), draft, Utc::now());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["id"], event.id().to_string());
        assert_eq!(json["host"], "nas");
        assert_eq!(json["level"], 1);
        assert!(json.get("icon").is_none());
        assert!(json.get("created_at").is_some());
    }
}
