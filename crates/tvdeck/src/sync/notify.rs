//! Push notifications from the operations backend.
//!
//! A small supervisor owns the connection: connect, read until the link
//! drops, wait a fixed backoff, repeat. Recognised events become toasts and
//! nudge the refresh controller through a debounce; nothing here can stop
//! the slides from rotating.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::error::PresentationError;

use super::Notifier;
use super::refresh::RefreshTrigger;
use super::resilient::FixedBackoff;

/// Events within this window after the first one share a single refresh.
pub const REFRESH_DEBOUNCE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NotificationEvent {
    ItemExecuted {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        actor: Option<String>,
    },
    ItemCreated {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        actor: Option<String>,
    },
}

impl NotificationEvent {
    /// Parse one frame. Malformed JSON and unknown types yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!("ignoring notification frame: {e}");
                None
            }
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Self::ItemExecuted { .. } => "Task executed",
            Self::ItemCreated { .. } => "Task created",
        }
    }

    pub fn message(&self) -> String {
        let (Self::ItemExecuted { title, actor } | Self::ItemCreated { title, actor }) = self;
        match (title.as_deref(), actor.as_deref()) {
            (Some(title), Some(actor)) => format!("{title} ({actor})"),
            (Some(title), None) => title.to_string(),
            (None, Some(actor)) => format!("by {actor}"),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelState {
    #[default]
    Connecting,
    Connected,
    /// Waiting out the backoff after the `attempt`-th consecutive failure.
    Backoff { attempt: u32 },
    Stopped,
}

/// One push connection. `next_message` yields text frames until the link
/// drops, which is reported as an error.
#[async_trait]
pub trait NotificationSource: Send {
    async fn connect(&mut self) -> Result<(), PresentationError>;
    async fn next_message(&mut self) -> Result<String, PresentationError>;
}

pub struct WebSocketSource {
    url: String,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WebSocketSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
        }
    }
}

#[async_trait]
impl NotificationSource for WebSocketSource {
    async fn connect(&mut self) -> Result<(), PresentationError> {
        self.stream = None;
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| PresentationError::ConnectionDropped(format!("connect: {e}")))?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn next_message(&mut self) -> Result<String, PresentationError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(PresentationError::ConnectionDropped("not connected".into()));
        };
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Close(_))) | None => {
                    self.stream = None;
                    return Err(PresentationError::ConnectionDropped(
                        "closed by server".into(),
                    ));
                }
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(PresentationError::ConnectionDropped(e.to_string()));
                }
                // Ping/pong are answered by tungstenite.
                Some(Ok(_)) => {}
            }
        }
    }
}

pub struct NotificationChannel<S> {
    source: S,
    backoff: FixedBackoff,
    debounce: Duration,
    events: mpsc::UnboundedSender<NotificationEvent>,
    refresh: mpsc::UnboundedSender<RefreshTrigger>,
    state: watch::Sender<ChannelState>,
    shutdown: CancellationToken,
    notifier: Option<Notifier>,
}

impl<S: NotificationSource> NotificationChannel<S> {
    pub fn new(
        source: S,
        events: mpsc::UnboundedSender<NotificationEvent>,
        refresh: mpsc::UnboundedSender<RefreshTrigger>,
        shutdown: CancellationToken,
    ) -> (Self, watch::Receiver<ChannelState>) {
        let (state, state_rx) = watch::channel(ChannelState::Connecting);
        let channel = Self {
            source,
            backoff: FixedBackoff::default(),
            debounce: REFRESH_DEBOUNCE,
            events,
            refresh,
            state,
            shutdown,
            notifier: None,
        };
        (channel, state_rx)
    }

    pub fn with_backoff(mut self, backoff: FixedBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn run(mut self) {
        let (poke_tx, poke_rx) = mpsc::unbounded_channel();
        let debouncer = debounce_refresh(poke_rx, self.refresh.clone(), self.debounce);
        tokio::select! {
            _ = debouncer => {}
            _ = self.supervise(poke_tx) => {}
        }
        self.set_state(ChannelState::Stopped);
    }

    async fn supervise(&mut self, poke: mpsc::UnboundedSender<()>) {
        let mut failures: u32 = 0;
        loop {
            self.set_state(ChannelState::Connecting);
            let connected = tokio::select! {
                _ = self.shutdown.cancelled() => return,
                result = self.source.connect() => result,
            };

            let dropped = match connected {
                Ok(()) => {
                    tracing::info!("notification channel connected");
                    failures = 0;
                    self.set_state(ChannelState::Connected);
                    match self.read_until_dropped(&poke).await {
                        Some(err) => err,
                        None => return,
                    }
                }
                Err(err) => err,
            };

            failures += 1;
            tracing::warn!(
                "notification channel down (attempt {failures}): {dropped}; retrying in {}s",
                self.backoff.delay().as_secs()
            );
            self.set_state(ChannelState::Backoff { attempt: failures });
            if !self.backoff.wait(&self.shutdown).await {
                return;
            }
        }
    }

    /// Returns the error that ended the connection, or `None` on shutdown.
    async fn read_until_dropped(
        &mut self,
        poke: &mpsc::UnboundedSender<()>,
    ) -> Option<PresentationError> {
        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                frame = self.source.next_message() => frame,
            };
            let text = match frame {
                Ok(text) => text,
                Err(err) => return Some(err),
            };
            let Some(event) = NotificationEvent::parse(&text) else {
                continue;
            };
            tracing::debug!("notification: {event:?}");
            let _ = self.events.send(event);
            let _ = poke.send(());
            if let Some(notify) = &self.notifier {
                notify();
            }
        }
    }

    fn set_state(&self, state: ChannelState) {
        self.state.send_replace(state);
    }
}

/// The first poke starts a window; pokes inside it are absorbed; one
/// refresh fires when it closes.
async fn debounce_refresh(
    mut pokes: mpsc::UnboundedReceiver<()>,
    refresh: mpsc::UnboundedSender<RefreshTrigger>,
    window: Duration,
) {
    while pokes.recv().await.is_some() {
        tokio::time::sleep(window).await;
        while pokes.try_recv().is_ok() {}
        if refresh.send(RefreshTrigger::Notification).is_err() {
            return;
        }
    }
}
