//! Notification delivery.
//!
//! Stored events are handed to a bounded dispatch queue and delivered by a
//! single background worker to one or more notifiers.
//!
//! # Example
//!
//! ```ignore
//! use notify_service::notification::{NotifierConfig, dispatch_channel};
//!
//! let notifiers = vec![NotifierConfig::Console.build()];
//! let (queue, worker) = dispatch_channel(10, notifiers);
//! let handle = worker.spawn();
//!
//! queue.submit(event).await?;
//! queue.close();
//! handle.await?;
//! ```

pub mod channels;
pub mod dispatcher;

pub use channels::{
    ConsoleNotifier, DesktopConfig, DesktopNotifier, Notifier, NotifierConfig, NotifySendConfig,
    NotifySendNotifier,
};
pub use dispatcher::{
    DEFAULT_DISPATCH_CAPACITY, DeliveryFailure, DispatchPermit, DispatchQueue,
    DispatchStatsSnapshot, DispatchWorker, dispatch_channel,
};
