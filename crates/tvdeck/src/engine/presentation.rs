use std::sync::Arc;
use std::time::Instant;

use eframe::egui;
use serde_json::Value;

use crate::deck::{Slide, SlideDeck, kind::ITEM_GAP};

use super::capacity::{CapacityMeasurer, Grid};
use super::pager::{PagePlan, PageRotator};
use super::reveal::{self, RevealSequencer};
use super::rotation::RotationState;
use super::scheduler::{DeckApplied, RotationMode, SlideDeckScheduler};

/// Timers local to the slide currently on screen. Rebuilt from scratch on
/// every slide change, which is what resets reveal and paging.
struct SlideSession {
    step_count: usize,
    reveal: RevealSequencer,
    measurer: Option<CapacityMeasurer>,
    pager: PageRotator,
}

/// Everything the renderer needs for the active slide.
pub struct SlideView<'a> {
    pub slide: &'a Slide,
    pub index: usize,
    pub slide_count: usize,
    pub reveal_step: usize,
    pub step_count: usize,
    pub page: usize,
    pub plan: PagePlan,
    /// Items on the current page only.
    pub items: &'a [Value],
    pub grid: Option<Grid>,
}

impl SlideView<'_> {
    pub fn is_revealed(&self, min_step: usize) -> bool {
        reveal::is_revealed(self.reveal_step, min_step)
    }
}

pub enum Screen<'a> {
    /// No deck has arrived yet.
    Loading,
    /// A deck arrived but it has no slides.
    Empty,
    Slide(SlideView<'a>),
}

/// The headless presentation: slide rotation plus the active slide's
/// reveal, capacity and paging timers, all driven by [`poll`](Self::poll).
pub struct Presentation {
    scheduler: SlideDeckScheduler,
    session: Option<SlideSession>,
}

impl Presentation {
    pub fn new(mode: RotationMode) -> Self {
        Self {
            scheduler: SlideDeckScheduler::new(mode),
            session: None,
        }
    }

    pub fn mode(&self) -> RotationMode {
        self.scheduler.mode()
    }

    pub fn state(&self) -> RotationState {
        self.scheduler.state()
    }

    pub fn deck(&self) -> Option<&Arc<SlideDeck>> {
        self.scheduler.deck()
    }

    pub fn replace_deck(&mut self, deck: Arc<SlideDeck>, now: Instant) {
        tracing::info!(
            "deck replaced: {} slide(s), {} unknown",
            deck.len(),
            deck.unknown_tags().len()
        );
        match self.scheduler.replace_deck(deck, now) {
            DeckApplied::Kept => self.refresh_session(now),
            DeckApplied::Restarted(_) => self.start_session(now),
            DeckApplied::Emptied => self.session = None,
        }
    }

    /// Drive every timer up to `now`. Returns true if anything visible changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if self.scheduler.poll(now).is_some() {
            self.start_session(now);
            changed = true;
        }

        let Self { scheduler, session } = self;
        let Some(session) = session.as_mut() else {
            return changed;
        };

        let count = scheduler.active_slide().map_or(0, |s| s.items.len());
        if session.measurer.as_mut().is_some_and(|m| m.poll(now)) {
            changed |= reconfigure_pages(session, scheduler, count, now);
        }

        if session.pager.poll(now) {
            scheduler.advance_page(session.pager.plan().page_count);
            changed = true;
        }

        let target = session.reveal.step(now);
        while scheduler.state().reveal_step() < target {
            scheduler.advance_reveal(session.step_count);
            changed = true;
        }
        changed
    }

    /// Report the measured body container of the active slide, in
    /// reference pixels.
    pub fn observe_container(&mut self, size: egui::Vec2, now: Instant) -> bool {
        let Self { scheduler, session } = self;
        let Some(session) = session.as_mut() else {
            return false;
        };
        let Some(measurer) = session.measurer.as_mut() else {
            return false;
        };
        if !measurer.observe(size, now) {
            return false;
        }
        let count = scheduler.active_slide().map_or(0, |s| s.items.len());
        reconfigure_pages(session, scheduler, count, now)
    }

    pub fn advance(&mut self, now: Instant) {
        if self.scheduler.advance(now).is_some() {
            self.start_session(now);
        }
    }

    pub fn retreat(&mut self, now: Instant) {
        if self.scheduler.retreat(now).is_some() {
            self.start_session(now);
        }
    }

    pub fn select(&mut self, index: usize, now: Instant) -> bool {
        if !self.scheduler.select(index, now) {
            return false;
        }
        self.start_session(now);
        true
    }

    pub fn screen(&self) -> Screen<'_> {
        let Some(deck) = self.scheduler.deck() else {
            return Screen::Loading;
        };
        let (Some(slide), Some(session)) = (self.scheduler.active_slide(), self.session.as_ref())
        else {
            return Screen::Empty;
        };
        let state = self.scheduler.state();
        let plan = session.pager.plan();
        let range = plan.range(state.active_page_index());
        Screen::Slide(SlideView {
            slide,
            index: state.active_slide_index(),
            slide_count: deck.len(),
            reveal_step: state.reveal_step(),
            step_count: session.step_count,
            page: state.active_page_index(),
            plan,
            items: slide.items.get(range).unwrap_or(&[]),
            grid: session.measurer.as_ref().and_then(|m| m.grid()),
        })
    }

    /// Earliest moment any timer wants to run again.
    pub fn next_wakeup(&self, now: Instant) -> Option<Instant> {
        let session = self.session.as_ref();
        [
            self.scheduler.deadline(),
            session.and_then(|s| s.reveal.next_step_at(now)),
            session.and_then(|s| s.pager.next_tick()),
            session
                .and_then(|s| s.measurer.as_ref())
                .and_then(|m| m.settles_at()),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn start_session(&mut self, now: Instant) {
        let (Some(slide), Some(duration)) =
            (self.scheduler.active_slide(), self.scheduler.active_duration())
        else {
            self.session = None;
            return;
        };
        let step_count = steps_for(slide);
        let count = slide.items.len();
        let measurer = slide
            .kind
            .and_then(|k| k.item_footprint())
            .map(|footprint| {
                let mut m = CapacityMeasurer::new(footprint, ITEM_GAP);
                m.set_item_count(count);
                m
            });
        let mut session = SlideSession {
            step_count,
            reveal: RevealSequencer::new(step_count, now),
            measurer,
            pager: PageRotator::new(duration),
        };
        reconfigure_pages(&mut session, &mut self.scheduler, count, now);
        self.session = Some(session);
    }

    /// Carry the active slide's timers over to its refreshed content. The
    /// reveal keeps its cadence; paging restarts only if the plan changed.
    fn refresh_session(&mut self, now: Instant) {
        let Self { scheduler, session } = self;
        let (Some(slide), Some(duration), Some(session)) = (
            scheduler.active_slide(),
            scheduler.active_duration(),
            session.as_mut(),
        ) else {
            return;
        };
        let step_count = steps_for(slide);
        let count = slide.items.len();

        if step_count != session.step_count {
            tracing::debug!("slide steps {} -> {step_count}", session.step_count);
            session.step_count = step_count;
            session.reveal.set_step_count(step_count);
            scheduler.cap_reveal(step_count);
        }
        if let Some(m) = session.measurer.as_mut() {
            m.set_item_count(count);
        }
        session.pager.set_slide_duration(duration);
        reconfigure_pages(session, scheduler, count, now);
    }
}

fn steps_for(slide: &Slide) -> usize {
    if slide.is_known() {
        slide.step_count()
    } else {
        0
    }
}

fn reconfigure_pages(
    session: &mut SlideSession,
    scheduler: &mut SlideDeckScheduler,
    item_count: usize,
    now: Instant,
) -> bool {
    let per_page = match session.measurer.as_ref() {
        Some(m) => m.items_per_page(),
        None => item_count.max(1),
    };
    let changed = session.pager.configure(item_count, per_page, now);
    if changed {
        scheduler.reset_page();
    }
    // A list longer than the slide holds the slide until its last page has had its turn.
    scheduler.extend_deadline(session.pager.cycle_end());
    changed
}
