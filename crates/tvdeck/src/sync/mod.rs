//! Everything that talks to the outside world. It runs on a dedicated
//! thread with its own single-threaded tokio runtime so the render loop
//! never waits on the network.

pub mod notify;
pub mod provider;
pub mod refresh;
pub mod resilient;
pub mod watch;

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use notify_debouncer_mini::Debouncer;
use notify_debouncer_mini::notify::RecommendedWatcher;
use tokio::sync::{mpsc, watch as channel};
use tokio_util::sync::CancellationToken;

use self::notify::{ChannelState, NotificationChannel, NotificationEvent, WebSocketSource};
use self::refresh::{RefreshController, RefreshHandle, RefreshOptions};
use self::resilient::FixedBackoff;

/// Wakes whoever is consuming published state, e.g. the UI.
pub type Notifier = Arc<dyn Fn() + Send + Sync>;

/// Grace period for blocking fetches when the runtime shuts down.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub source: String,
    pub notify_url: Option<String>,
    pub fetch_timeout: Duration,
    pub reconnect_backoff: Duration,
    pub bootstrap_interval: Duration,
}

/// The running background side: refresh controller, notification channel
/// and (for local files) a change watcher. Dropping it tears all of them
/// down and joins the thread.
pub struct Background {
    pub refresh: RefreshHandle,
    pub events: mpsc::UnboundedReceiver<NotificationEvent>,
    pub channel: Option<channel::Receiver<ChannelState>>,
    shutdown: CancellationToken,
    thread: Option<JoinHandle<()>>,
    _watcher: Option<Debouncer<RecommendedWatcher>>,
}

impl Background {
    pub fn start(options: SyncOptions, notifier: Notifier) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build background runtime")?;

        let shutdown = CancellationToken::new();
        let provider = provider::provider_for(&options.source, options.fetch_timeout);
        let (controller, refresh) = RefreshController::new(
            Arc::clone(&provider),
            RefreshOptions {
                fetch_timeout: options.fetch_timeout,
                bootstrap_interval: options.bootstrap_interval,
            },
            shutdown.child_token(),
        );
        let controller = controller.with_notifier(Arc::clone(&notifier));

        let (events_tx, events) = mpsc::unbounded_channel();
        let (channel, channel_state) = match options.notify_url {
            Some(url) => {
                let (channel, state) = NotificationChannel::new(
                    WebSocketSource::new(url),
                    events_tx,
                    refresh.trigger_sender(),
                    shutdown.child_token(),
                );
                let channel = channel
                    .with_backoff(FixedBackoff::new(options.reconnect_backoff))
                    .with_notifier(notifier);
                (Some(channel), Some(state))
            }
            None => (None, None),
        };

        let watcher = provider.local_path().and_then(|path| {
            watch::watch_deck_file(path, refresh.trigger_sender())
                .inspect_err(|e| tracing::warn!("not watching deck file: {e:#}"))
                .ok()
        });

        let stopped = shutdown.clone();
        let thread = std::thread::Builder::new()
            .name("tvdeck-sync".into())
            .spawn(move || {
                runtime.block_on(async move {
                    let refresh_task = tokio::spawn(controller.run());
                    let channel_task = channel.map(|c| tokio::spawn(c.run()));
                    stopped.cancelled().await;
                    let _ = refresh_task.await;
                    if let Some(task) = channel_task {
                        let _ = task.await;
                    }
                });
                runtime.shutdown_timeout(SHUTDOWN_GRACE);
                tracing::debug!("background runtime stopped");
            })
            .context("Failed to spawn background thread")?;

        Ok(Self {
            refresh,
            events,
            channel: channel_state,
            shutdown,
            thread: Some(thread),
            _watcher: watcher,
        })
    }
}

impl Drop for Background {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("background thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn test_background_loads_local_deck_and_tears_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        std::fs::write(&path, r#"{"slides": [{"typeTag": "opening"}]}"#).unwrap();

        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        let background = Background::start(
            SyncOptions {
                source: path.display().to_string(),
                notify_url: None,
                fetch_timeout: Duration::from_secs(30),
                reconnect_backoff: Duration::from_secs(5),
                bootstrap_interval: Duration::from_secs(30),
            },
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while background.refresh.deck.borrow().is_none() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        let deck = background.refresh.deck.borrow().clone().unwrap();
        assert_eq!(deck.slides[0].type_tag, "opening");
        assert!(wakes.load(Ordering::SeqCst) > 0);
        assert!(background.channel.is_none());

        let started = Instant::now();
        drop(background);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
