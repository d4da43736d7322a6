//! Timeout, single-flight cancellation and fixed backoff, shared by the deck
//! fetcher and the notification supervisor.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::PresentationError;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_FETCH_TIMEOUT: Duration = Duration::from_secs(60);
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Keep a configured fetch timeout inside the supported window.
pub fn clamp_fetch_timeout(timeout: Duration) -> Duration {
    timeout.clamp(DEFAULT_FETCH_TIMEOUT, MAX_FETCH_TIMEOUT)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Succeeded(T),
    Failed(PresentationError),
    Cancelled,
}

/// One guarded attempt. Cloning shares the same cancellation.
#[derive(Debug, Clone)]
pub struct Attempt {
    generation: u64,
    token: CancellationToken,
}

impl Attempt {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Safe to call any number of times, including after completion.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// At most one attempt is current. Beginning a new one cancels the last, and
/// only the current attempt may report back.
#[derive(Debug, Default)]
pub struct SingleFlight {
    current: Option<Attempt>,
    generation: u64,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> Attempt {
        if let Some(previous) = self.current.take() {
            tracing::debug!("superseding attempt {}", previous.generation);
            previous.cancel();
        }
        self.generation += 1;
        let attempt = Attempt {
            generation: self.generation,
            token: CancellationToken::new(),
        };
        self.current = Some(attempt.clone());
        attempt
    }

    pub fn in_flight(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_current(&self, attempt: &Attempt) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| c.generation == attempt.generation)
    }

    /// Claim the result of `attempt`. False means it was superseded or
    /// cancelled and its result must be dropped.
    pub fn finish(&mut self, attempt: &Attempt) -> bool {
        if !self.is_current(attempt) || attempt.is_cancelled() {
            return false;
        }
        self.current = None;
        true
    }

    pub fn cancel(&mut self) {
        if let Some(attempt) = self.current.take() {
            attempt.cancel();
        }
    }
}

/// Run `work` under `attempt`'s cancellation and a hard timeout.
pub async fn run_guarded<T, F>(attempt: &Attempt, timeout: Duration, work: F) -> Outcome<T>
where
    F: Future<Output = Result<T, PresentationError>>,
{
    tokio::select! {
        biased;
        _ = attempt.token.cancelled() => Outcome::Cancelled,
        result = tokio::time::timeout(timeout, work) => match result {
            Ok(Ok(value)) => Outcome::Succeeded(value),
            Ok(Err(e)) => Outcome::Failed(e),
            Err(_) => Outcome::Failed(PresentationError::FetchTimeout { after: timeout }),
        },
    }
}

/// Constant delay between reconnect attempts.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    delay: Duration,
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::new(RECONNECT_BACKOFF)
    }
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for one backoff period. Returns false if `shutdown` fired first.
    pub async fn wait(&self, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            _ = shutdown.cancelled() => false,
            _ = tokio::time::sleep(self.delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_timeout_window() {
        assert_eq!(clamp_fetch_timeout(Duration::from_secs(1)), DEFAULT_FETCH_TIMEOUT);
        assert_eq!(
            clamp_fetch_timeout(Duration::from_secs(45)),
            Duration::from_secs(45)
        );
        assert_eq!(clamp_fetch_timeout(Duration::from_secs(600)), MAX_FETCH_TIMEOUT);
    }

    #[test]
    fn test_newer_attempt_supersedes_older() {
        let mut flight = SingleFlight::new();
        let a = flight.begin();
        let b = flight.begin();
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(flight.finish(&b));
        // A resolving late must not be accepted.
        assert!(!flight.finish(&a));
        assert!(!flight.in_flight());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut flight = SingleFlight::new();
        let a = flight.begin();
        flight.cancel();
        flight.cancel();
        a.cancel();
        assert!(a.is_cancelled());
        assert!(!flight.finish(&a));

        let b = flight.begin();
        assert!(flight.finish(&b));
        b.cancel();
        flight.cancel();
        assert!(!flight.in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_success_and_failure() {
        let mut flight = SingleFlight::new();
        let attempt = flight.begin();
        let ok = run_guarded(&attempt, Duration::from_secs(30), async { Ok(7) }).await;
        assert_eq!(ok, Outcome::Succeeded(7));

        let err: Outcome<()> = run_guarded(&attempt, Duration::from_secs(30), async {
            Err(PresentationError::FetchNetwork("refused".into()))
        })
        .await;
        assert_eq!(
            err,
            Outcome::Failed(PresentationError::FetchNetwork("refused".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_times_out() {
        let attempt = SingleFlight::new().begin();
        let start = Instant::now();
        let outcome: Outcome<()> = run_guarded(&attempt, Duration::from_secs(30), async {
            std::future::pending::<()>().await;
            Ok(())
        })
        .await;
        assert_eq!(
            outcome,
            Outcome::Failed(PresentationError::FetchTimeout {
                after: Duration::from_secs(30)
            })
        );
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_observes_cancellation() {
        let mut flight = SingleFlight::new();
        let attempt = flight.begin();
        let guarded = run_guarded(&attempt, Duration::from_secs(30), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late")
        });
        let canceller = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            flight.begin();
        };
        let (outcome, ()) = tokio::join!(guarded, canceller);
        assert_eq!(outcome, Outcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_or_stops() {
        let shutdown = CancellationToken::new();
        let backoff = FixedBackoff::default();
        let start = Instant::now();
        assert!(backoff.wait(&shutdown).await);
        assert_eq!(start.elapsed(), RECONNECT_BACKOFF);

        shutdown.cancel();
        assert!(!backoff.wait(&shutdown).await);
    }
}
