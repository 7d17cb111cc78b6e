//! Wayfarer analytics events.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ImportEvent`] — the event envelope published by import runs.
//! - [`EventRecorder`] — background task that logs every event.
//!
//! Publishing is fire-and-forget: it never fails and never blocks the
//! import that emits it.

pub mod bus;
pub mod recorder;

pub use bus::{EventBus, ImportEvent};
pub use recorder::EventRecorder;
