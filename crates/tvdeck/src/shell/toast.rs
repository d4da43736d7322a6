use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::sync::notify::NotificationEvent;

/// How long a notification stays on screen.
pub const TOAST_TTL: Duration = Duration::from_secs(10);
const FADE: Duration = Duration::from_secs(1);
/// Older toasts beyond this are dropped rather than stacked off-screen.
pub const MAX_TOASTS: usize = 4;

#[derive(Debug, Clone)]
pub struct Toast {
    pub headline: String,
    pub message: String,
    start: Instant,
}

impl Toast {
    pub fn new(headline: impl Into<String>, message: impl Into<String>, now: Instant) -> Self {
        Self {
            headline: headline.into(),
            message: message.into(),
            start: now,
        }
    }

    pub fn from_event(event: &NotificationEvent, now: Instant) -> Self {
        Self::new(event.headline(), event.message(), now)
    }

    pub fn expires_at(&self) -> Instant {
        self.start + TOAST_TTL
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }

    /// Full opacity until the last second, then a linear fade.
    pub fn opacity(&self, now: Instant) -> f32 {
        let remaining = self.expires_at().saturating_duration_since(now);
        if remaining >= FADE {
            1.0
        } else {
            remaining.as_secs_f32() / FADE.as_secs_f32()
        }
    }
}

#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
}

impl ToastQueue {
    pub fn push(&mut self, toast: Toast) {
        self.toasts.push_back(toast);
        while self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
    }

    /// Drop expired toasts. Returns true if any were removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| !t.is_expired(now));
        self.toasts.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter().rev()
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.toasts.iter().map(Toast::expires_at).min()
    }
}
