//! notify-service library crate.
//!
//! Receives events over HTTP, keeps a bounded history of them and forwards
//! each one to the configured notifiers from a background worker.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod notification;
pub mod services;

pub use error::{Error, Result};

/// Application name used in notifications and logs.
pub const APP_NAME: &str = "notify-service";
