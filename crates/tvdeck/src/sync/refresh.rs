//! Keeps the current deck fresh.
//!
//! The controller runs as one task on the background runtime. It polls the
//! provider on the cadence of the last good deck, accepts out-of-band
//! triggers, and publishes each accepted deck whole through a watch channel
//! so readers only ever see a complete deck.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::deck::{MIN_REFRESH_INTERVAL, SlideDeck};
use crate::error::PresentationError;

use super::Notifier;
use super::provider::DataProvider;
use super::resilient::{self, Attempt, Outcome, SingleFlight};

/// Polling cadence until the first deck has arrived.
pub const BOOTSTRAP_INTERVAL: Duration = Duration::from_secs(30);

/// Why a fetch was requested outside the regular cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Notification,
    Retry,
    SourceChanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPhase {
    #[default]
    Idle,
    Fetching,
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshStatus {
    pub phase: RefreshPhase,
    /// Error of the most recent completed attempt, cleared on success.
    pub last_error: Option<PresentationError>,
    pub has_deck: bool,
    pub source: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RefreshOptions {
    pub fetch_timeout: Duration,
    pub bootstrap_interval: Duration,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: resilient::DEFAULT_FETCH_TIMEOUT,
            bootstrap_interval: BOOTSTRAP_INTERVAL,
        }
    }
}

/// The shell's side of the controller.
#[derive(Clone)]
pub struct RefreshHandle {
    pub deck: watch::Receiver<Option<Arc<SlideDeck>>>,
    pub status: watch::Receiver<RefreshStatus>,
    triggers: mpsc::UnboundedSender<RefreshTrigger>,
}

impl RefreshHandle {
    pub fn trigger(&self, reason: RefreshTrigger) {
        if self.triggers.send(reason).is_err() {
            tracing::debug!("refresh controller is gone, dropping {reason:?}");
        }
    }

    pub fn trigger_sender(&self) -> mpsc::UnboundedSender<RefreshTrigger> {
        self.triggers.clone()
    }
}

type Finished = (Attempt, Outcome<SlideDeck>);

pub struct RefreshController {
    provider: Arc<dyn DataProvider>,
    options: RefreshOptions,
    deck_tx: watch::Sender<Option<Arc<SlideDeck>>>,
    status_tx: watch::Sender<RefreshStatus>,
    triggers: mpsc::UnboundedReceiver<RefreshTrigger>,
    flight: SingleFlight,
    shutdown: CancellationToken,
    notifier: Option<Notifier>,
}

impl RefreshController {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        options: RefreshOptions,
        shutdown: CancellationToken,
    ) -> (Self, RefreshHandle) {
        let (deck_tx, deck_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(RefreshStatus {
            source: provider.describe(),
            ..Default::default()
        });
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let controller = Self {
            provider,
            options,
            deck_tx,
            status_tx,
            triggers: trigger_rx,
            flight: SingleFlight::new(),
            shutdown,
            notifier: None,
        };
        let handle = RefreshHandle {
            deck: deck_rx,
            status: status_rx,
            triggers: trigger_tx,
        };
        (controller, handle)
    }

    /// Called after every published change, e.g. to wake the UI.
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Poll interval from the last good settings, or the bootstrap cadence.
    fn interval(&self) -> Duration {
        self.deck_tx
            .borrow()
            .as_ref()
            .map(|d| d.settings.refresh_interval())
            .unwrap_or(self.options.bootstrap_interval)
            .max(MIN_REFRESH_INTERVAL)
    }

    pub async fn run(mut self) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Finished>();
        self.start_fetch(&done_tx);
        let mut next_poll = Instant::now() + self.interval();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    self.flight.cancel();
                    self.update_status(|s| s.phase = RefreshPhase::Cancelled);
                    tracing::debug!("refresh controller stopped");
                    return;
                }
                Some((attempt, outcome)) = done_rx.recv() => {
                    if self.apply(&attempt, outcome) {
                        next_poll = Instant::now() + self.interval();
                    }
                }
                Some(reason) = self.triggers.recv() => {
                    tracing::debug!("refresh requested: {reason:?}");
                    self.start_fetch(&done_tx);
                }
                _ = tokio::time::sleep_until(next_poll) => {
                    if self.flight.in_flight() {
                        tracing::debug!("previous fetch still running, skipping poll");
                    } else {
                        self.start_fetch(&done_tx);
                    }
                    next_poll = Instant::now() + self.interval();
                }
            }
        }
    }

    fn start_fetch(&mut self, done: &mpsc::UnboundedSender<Finished>) {
        let attempt = self.flight.begin();
        tracing::debug!(
            "fetching deck from {} (attempt {})",
            self.provider.describe(),
            attempt.generation()
        );
        self.update_status(|s| s.phase = RefreshPhase::Fetching);

        let provider = Arc::clone(&self.provider);
        let timeout = self.options.fetch_timeout;
        let done = done.clone();
        let guard = attempt.clone();
        let fetch = tokio::spawn(async move {
            resilient::run_guarded(&guard, timeout, async {
                let text = provider.fetch().await?;
                SlideDeck::from_json(&text)
            })
            .await
        });
        // Report every attempt, including one whose task panicked.
        tokio::spawn(async move {
            let outcome = fetch.await.unwrap_or_else(|err| {
                tracing::error!("fetch task failed: {err}");
                Outcome::Failed(PresentationError::FetchNetwork(format!(
                    "fetch task failed: {err}"
                )))
            });
            // The receiver only disappears on shutdown.
            let _ = done.send((attempt, outcome));
        });
    }

    /// Returns true when the attempt was current and its result applied.
    fn apply(&mut self, attempt: &Attempt, outcome: Outcome<SlideDeck>) -> bool {
        let result = match outcome {
            Outcome::Succeeded(deck) => Ok(deck),
            Outcome::Failed(err) => Err(err),
            Outcome::Cancelled => {
                tracing::debug!("fetch {} was superseded", attempt.generation());
                return false;
            }
        };
        if !self.flight.finish(attempt) {
            tracing::debug!("discarding stale fetch {}", attempt.generation());
            return false;
        }
        match result {
            Ok(deck) => {
                if deck.is_empty() {
                    tracing::info!("{}", PresentationError::EmptyDeck);
                }
                for tag in deck.unknown_tags() {
                    tracing::warn!("{}", PresentationError::UnknownSlideType(tag.to_string()));
                }
                self.deck_tx.send_replace(Some(Arc::new(deck)));
                self.update_status(|s| {
                    s.phase = RefreshPhase::Succeeded;
                    s.last_error = None;
                    s.has_deck = true;
                });
            }
            Err(err) => {
                tracing::warn!("keeping previous deck: {err}");
                self.update_status(|s| {
                    s.phase = RefreshPhase::Failed;
                    s.last_error = Some(err);
                });
            }
        }
        true
    }

    fn update_status(&self, change: impl FnOnce(&mut RefreshStatus)) {
        self.status_tx.send_modify(change);
        if let Some(notify) = &self.notifier {
            notify();
        }
    }
}
