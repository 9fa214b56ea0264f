//! Notification delivery for Greenlight.
//!
//! The chain commits first; dispatch happens strictly afterwards and never
//! fails the operation that triggered it.

pub mod dispatcher;
pub mod messages;
pub mod notifier;
pub mod telegram;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use notifier::{Notifier, NotifyError, RecordingNotifier};
pub use telegram::TelegramNotifier;
