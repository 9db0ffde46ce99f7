use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub shown_at: DateTime<Local>,
    expires_at: Instant,
}

impl Toast {
    pub fn stamp(&self) -> String {
        self.shown_at.format("%H:%M").to_string()
    }
}

/// A single timed notification slot; a new toast replaces the old one.
#[derive(Debug)]
pub struct Toasts {
    current: Option<Toast>,
    lifetime: Duration,
}

impl Toasts {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            current: None,
            lifetime,
        }
    }

    pub fn show(&mut self, message: impl Into<String>, kind: ToastKind, now: Instant) {
        let message = message.into();
        match kind {
            ToastKind::Error => tracing::warn!(%message, "toast"),
            _ => tracing::info!(%message, "toast"),
        }
        self.current = Some(Toast {
            message,
            kind,
            shown_at: Local::now(),
            expires_at: now + self.lifetime,
        });
    }

    /// Drop the toast once its time is up. Returns whether one was removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.current.as_ref().is_some_and(|t| now >= t.expires_at) {
            self.current = None;
            return true;
        }
        false
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }
}
