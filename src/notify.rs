//! Notification collaborator: fire-and-forget messages after state changes.
//!
//! The store calls `notify` after every successful mutation and on surfaced
//! failures, but never depends on the outcome. The default sink writes
//! through `tracing`; the CLI prints, tests record.

use tracing::{error, info};

/// Kind of user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Success,
    Error,
}

/// Fire-and-forget notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotifyKind, message: &str);
}

/// Notifier that logs through `tracing`
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NotifyKind, message: &str) {
        match kind {
            NotifyKind::Success => info!(target: "taskhub::notify", "{message}"),
            NotifyKind::Error => error!(target: "taskhub::notify", "{message}"),
        }
    }
}

/// Notifier that discards everything
#[derive(Debug, Default, Clone)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _kind: NotifyKind, _message: &str) {}
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn notify(&self, kind: NotifyKind, message: &str) {
        (**self).notify(kind, message)
    }
}
