//! Time-boxed notification queue. Toasts expire on their own deadline and
//! are swept lazily; removal is idempotent so a manual dismiss racing the
//! expiry sweep is harmless.

use tokio::time::{Duration, Instant};

use super::generate_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

impl ToastKind {
    pub fn label(&self) -> &'static str {
        match self {
            ToastKind::Success => "ok",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
            ToastKind::Warning => "warn",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: String,
    pub message: String,
    pub kind: ToastKind,
    deadline: Instant,
}

impl Toast {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

#[derive(Debug)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    default_duration: Duration,
}

impl ToastQueue {
    pub fn new(default_duration: Duration) -> Self {
        Self {
            toasts: Vec::new(),
            default_duration,
        }
    }

    /// Append a toast with the default lifetime. Duplicate messages are
    /// allowed; each show is its own entry with its own id.
    pub fn show(&mut self, message: impl Into<String>, kind: ToastKind) -> String {
        self.show_for(message, kind, self.default_duration)
    }

    /// Append a toast with an explicit lifetime
    pub fn show_for(
        &mut self,
        message: impl Into<String>,
        kind: ToastKind,
        duration: Duration,
    ) -> String {
        let id = generate_id();
        self.toasts.push(Toast {
            id: id.clone(),
            message: message.into(),
            kind,
            deadline: Instant::now() + duration,
        });
        id
    }

    /// Remove by id. Removing an id that already expired or was never
    /// shown is a no-op.
    pub fn remove(&mut self, id: &str) {
        self.toasts.retain(|t| t.id != id);
    }

    /// Drop expired toasts, then return the live ones in show order
    pub fn active(&mut self) -> &[Toast] {
        self.sweep();
        &self.toasts
    }

    /// Drop every toast whose deadline has passed
    pub fn sweep(&mut self) {
        let now = Instant::now();
        self.toasts.retain(|t| !t.is_expired(now));
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
