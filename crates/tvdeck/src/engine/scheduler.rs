use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::deck::{Slide, SlideDeck};

use super::rotation::RotationState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    /// Slides advance on their own when their duration runs out.
    Unattended,
    /// Someone at the screen picks slides; no advance timer runs.
    Supervised,
}

/// What a deck replacement did to the active slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckApplied {
    /// Same slide still active; sub-state untouched.
    Kept,
    /// A different slide (or different content at the same index) is now active.
    Restarted(usize),
    /// The new deck has no slides; rotation is off.
    Emptied,
}

/// Top-level slide rotation: holds the current deck and decides when the
/// active slide changes.
pub struct SlideDeckScheduler {
    deck: Option<Arc<SlideDeck>>,
    state: RotationState,
    mode: RotationMode,
    slide_started_at: Option<Instant>,
    deadline: Option<Instant>,
}

impl SlideDeckScheduler {
    pub fn new(mode: RotationMode) -> Self {
        Self {
            deck: None,
            state: RotationState::default(),
            mode,
            slide_started_at: None,
            deadline: None,
        }
    }

    pub fn mode(&self) -> RotationMode {
        self.mode
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    pub fn deck(&self) -> Option<&Arc<SlideDeck>> {
        self.deck.as_ref()
    }

    pub fn slide_count(&self) -> usize {
        self.deck.as_ref().map_or(0, |d| d.len())
    }

    pub fn is_empty(&self) -> bool {
        self.slide_count() == 0
    }

    pub fn active_slide(&self) -> Option<&Slide> {
        self.deck
            .as_ref()
            .and_then(|d| d.slides.get(self.state.active_slide_index()))
    }

    /// Resolved display time of the active slide.
    pub fn active_duration(&self) -> Option<Duration> {
        let deck = self.deck.as_ref()?;
        let slide = deck.slides.get(self.state.active_slide_index())?;
        Some(deck.settings.duration_for(&slide.type_tag))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Swap in a freshly fetched deck.
    ///
    /// The active slide survives when the same type sits at the same index;
    /// otherwise the index is clamped and the slide starts over.
    pub fn replace_deck(&mut self, deck: Arc<SlideDeck>, now: Instant) -> DeckApplied {
        let previous_tag = self.active_slide().map(|s| s.type_tag.clone());
        let count = deck.len();
        self.deck = Some(deck);

        if count == 0 {
            self.state.clamp_to(0);
            self.slide_started_at = None;
            self.deadline = None;
            tracing::info!("deck is empty, rotation paused");
            return DeckApplied::Emptied;
        }

        let clamped = self.state.clamp_to(count);
        let current_tag = self.active_slide().map(|s| s.type_tag.as_str());
        let kept = !clamped && previous_tag.is_some() && previous_tag.as_deref() == current_tag;

        if kept {
            // Duration may have changed under us; keep the slide's start time.
            let started = self.slide_started_at.unwrap_or(now);
            self.slide_started_at = Some(started);
            self.deadline = self.schedule_from(started);
            return DeckApplied::Kept;
        }

        let index = self.state.active_slide_index();
        self.state.reset_for_slide(index);
        self.start_slide(now);
        DeckApplied::Restarted(index)
    }

    /// Advance if the active slide's time is up. Returns the new index.
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        let deadline = self.deadline?;
        if now < deadline || self.is_empty() {
            return None;
        }
        self.state.advance_slide(self.slide_count());
        let duration = self.active_duration()?;
        // Chain off the old deadline so rounding in frame timing doesn't
        // accumulate; after a long stall, start fresh from now.
        let start = if deadline + duration > now { deadline } else { now };
        self.slide_started_at = Some(start);
        self.deadline = (self.mode == RotationMode::Unattended).then_some(start + duration);
        tracing::debug!(
            "slide {} -> {:?} for {}s",
            self.state.active_slide_index(),
            self.active_slide().map(|s| s.type_tag.as_str()),
            duration.as_secs()
        );
        Some(self.state.active_slide_index())
    }

    /// Move to the next slide right away (wrapping).
    pub fn advance(&mut self, now: Instant) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        self.state.advance_slide(self.slide_count());
        self.start_slide(now);
        Some(self.state.active_slide_index())
    }

    pub fn retreat(&mut self, now: Instant) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        self.state.retreat_slide(self.slide_count());
        self.start_slide(now);
        Some(self.state.active_slide_index())
    }

    /// Supervised jump to a specific slide.
    pub fn select(&mut self, index: usize, now: Instant) -> bool {
        if !self.state.select_slide(index, self.slide_count()) {
            return false;
        }
        self.start_slide(now);
        true
    }

    pub fn advance_page(&mut self, page_count: usize) {
        self.state.advance_page(page_count);
    }

    pub fn reset_page(&mut self) {
        self.state.reset_page();
    }

    pub fn advance_reveal(&mut self, step_count: usize) {
        self.state.advance_reveal(step_count);
    }

    pub fn cap_reveal(&mut self, step_count: usize) {
        self.state.cap_reveal(step_count);
    }

    /// Keep the active slide on screen until its nominal end or `min_end`,
    /// whichever is later. Does nothing in supervised mode.
    pub fn extend_deadline(&mut self, min_end: Option<Instant>) {
        let Some(started) = self.slide_started_at else {
            return;
        };
        let Some(nominal) = self.schedule_from(started) else {
            return;
        };
        let deadline = match min_end {
            Some(end) if end > nominal => {
                tracing::debug!(
                    "slide {} held {}ms past its duration to finish its pages",
                    self.state.active_slide_index(),
                    (end - nominal).as_millis()
                );
                end
            }
            _ => nominal,
        };
        self.deadline = Some(deadline);
    }

    fn start_slide(&mut self, now: Instant) {
        self.slide_started_at = Some(now);
        self.deadline = self.schedule_from(now);
    }

    fn schedule_from(&self, started: Instant) -> Option<Instant> {
        if self.mode != RotationMode::Unattended {
            return None;
        }
        self.active_duration().map(|d| started + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::PresentationSettings;

    fn deck(tags: &[&str]) -> Arc<SlideDeck> {
        let settings = PresentationSettings::new(Duration::from_secs(10), Duration::from_secs(60))
            .with_type_duration("overview", Duration::from_secs(20));
        Arc::new(SlideDeck::new(
            settings,
            tags.iter().map(|t| Slide::new(t, vec![])).collect(),
        ))
    }

    fn active_tag(s: &SlideDeckScheduler) -> &str {
        s.active_slide().map(|s| s.type_tag.as_str()).unwrap_or("")
    }

    #[test]
    fn test_durations_follow_type_table() {
        let t0 = Instant::now();
        let mut s = SlideDeckScheduler::new(RotationMode::Unattended);
        s.replace_deck(deck(&["opening", "overview", "attendance"]), t0);

        let at = |ms: u64| t0 + Duration::from_millis(ms);
        let mut timeline = Vec::new();
        for ms in (0..=45_000).step_by(100) {
            s.poll(at(ms));
            timeline.push((ms, active_tag(&s).to_string()));
        }
        let tag_at = |ms: u64| {
            timeline
                .iter()
                .find(|(t, _)| *t == ms)
                .map(|(_, tag)| tag.as_str())
                .unwrap_or("")
        };
        assert_eq!(tag_at(9_900), "opening");
        assert_eq!(tag_at(10_100), "overview");
        assert_eq!(tag_at(29_900), "overview");
        assert_eq!(tag_at(30_000), "attendance");
        assert_eq!(tag_at(39_900), "attendance");
        assert_eq!(tag_at(40_000), "opening");
    }

    #[test]
    fn test_advance_resets_sub_state() {
        let t0 = Instant::now();
        let mut s = SlideDeckScheduler::new(RotationMode::Unattended);
        s.replace_deck(deck(&["opening", "overview"]), t0);
        s.advance_reveal(5);
        s.advance_page(3);
        assert_eq!(s.poll(t0 + Duration::from_millis(10_100)), Some(1));
        assert_eq!(s.state().reveal_step(), 0);
        assert_eq!(s.state().active_page_index(), 0);
    }

    #[test]
    fn test_empty_deck_schedules_nothing() {
        let t0 = Instant::now();
        let mut s = SlideDeckScheduler::new(RotationMode::Unattended);
        assert_eq!(s.replace_deck(deck(&[]), t0), DeckApplied::Emptied);
        assert_eq!(s.deadline(), None);
        assert_eq!(s.poll(t0 + Duration::from_secs(3600)), None);
        assert_eq!(s.advance(t0), None);
        assert!(s.active_slide().is_none());
    }

    #[test]
    fn test_no_deck_yet_is_idle() {
        let mut s = SlideDeckScheduler::new(RotationMode::Unattended);
        assert_eq!(s.poll(Instant::now()), None);
        assert!(s.is_empty());
    }

    #[test]
    fn test_refresh_keeps_same_slide() {
        let t0 = Instant::now();
        let mut s = SlideDeckScheduler::new(RotationMode::Unattended);
        s.replace_deck(deck(&["opening", "overview", "attendance"]), t0);
        s.poll(t0 + Duration::from_secs(10));
        s.advance_reveal(4);

        let applied = s.replace_deck(
            deck(&["opening", "overview", "attendance", "closing"]),
            t0 + Duration::from_secs(15),
        );
        assert_eq!(applied, DeckApplied::Kept);
        assert_eq!(s.state().active_slide_index(), 1);
        assert_eq!(s.state().reveal_step(), 1);
        // Still leaves overview 20s after it started, not 20s after the refresh.
        assert_eq!(s.deadline(), Some(t0 + Duration::from_secs(30)));
    }

    #[test]
    fn test_refresh_that_shrinks_deck_clamps() {
        let t0 = Instant::now();
        let mut s = SlideDeckScheduler::new(RotationMode::Unattended);
        s.replace_deck(deck(&["opening", "overview", "attendance", "closing"]), t0);
        s.select(3, t0);
        let applied = s.replace_deck(deck(&["opening", "overview"]), t0);
        assert_eq!(applied, DeckApplied::Restarted(1));
        assert_eq!(active_tag(&s), "overview");
    }

    #[test]
    fn test_refresh_with_different_slide_at_index_restarts() {
        let t0 = Instant::now();
        let mut s = SlideDeckScheduler::new(RotationMode::Unattended);
        s.replace_deck(deck(&["opening", "overview"]), t0);
        s.advance_reveal(1);
        let applied = s.replace_deck(deck(&["ranking", "overview"]), t0 + Duration::from_secs(2));
        assert_eq!(applied, DeckApplied::Restarted(0));
        assert_eq!(s.state().reveal_step(), 0);
        assert_eq!(s.deadline(), Some(t0 + Duration::from_secs(12)));
    }

    #[test]
    fn test_emptied_then_refilled_starts_at_zero() {
        let t0 = Instant::now();
        let mut s = SlideDeckScheduler::new(RotationMode::Unattended);
        s.replace_deck(deck(&["opening", "overview"]), t0);
        s.select(1, t0);
        s.replace_deck(deck(&[]), t0);
        let applied = s.replace_deck(deck(&["opening", "overview"]), t0);
        assert_eq!(applied, DeckApplied::Restarted(0));
        assert!(s.deadline().is_some());
    }

    #[test]
    fn test_supervised_mode_never_auto_advances() {
        let t0 = Instant::now();
        let mut s = SlideDeckScheduler::new(RotationMode::Supervised);
        s.replace_deck(deck(&["opening", "overview", "attendance"]), t0);
        assert_eq!(s.deadline(), None);
        assert_eq!(s.poll(t0 + Duration::from_secs(600)), None);
        assert!(s.select(2, t0));
        assert!(!s.select(3, t0));
        assert_eq!(s.advance(t0), Some(0));
        assert_eq!(s.retreat(t0), Some(2));
    }

    #[test]
    fn test_stalled_poll_advances_once() {
        let t0 = Instant::now();
        let mut s = SlideDeckScheduler::new(RotationMode::Unattended);
        s.replace_deck(deck(&["opening", "attendance", "closing"]), t0);
        let late = t0 + Duration::from_secs(95);
        assert_eq!(s.poll(late), Some(1));
        assert_eq!(s.poll(late), None);
        assert_eq!(s.deadline(), Some(late + Duration::from_secs(10)));
    }

    #[test]
    fn test_extend_deadline_never_cuts_nominal_duration() {
        let t0 = Instant::now();
        let mut s = SlideDeckScheduler::new(RotationMode::Unattended);
        s.replace_deck(deck(&["opening", "closing"]), t0);
        s.extend_deadline(Some(t0 + Duration::from_secs(5)));
        assert_eq!(s.deadline(), Some(t0 + Duration::from_secs(10)));
        s.extend_deadline(Some(t0 + Duration::from_secs(30)));
        assert_eq!(s.deadline(), Some(t0 + Duration::from_secs(30)));
        s.extend_deadline(None);
        assert_eq!(s.deadline(), Some(t0 + Duration::from_secs(10)));
        s.extend_deadline(Some(t0 + Duration::from_secs(24)));
        assert_eq!(s.poll(t0 + Duration::from_secs(23)), None);
        assert_eq!(s.poll(t0 + Duration::from_secs(24)), Some(1));
        assert_eq!(s.deadline(), Some(t0 + Duration::from_secs(34)));

        let mut supervised = SlideDeckScheduler::new(RotationMode::Supervised);
        supervised.replace_deck(deck(&["opening"]), t0);
        supervised.extend_deadline(Some(t0 + Duration::from_secs(24)));
        assert_eq!(supervised.deadline(), None);
    }
}
