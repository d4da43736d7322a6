use std::ops::Range;
use std::time::{Duration, Instant};

/// Shortest time a page stays up. Wins over fitting every page into the
/// slide's duration, so a long list may outlast its slide.
pub const PAGE_FLOOR: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    pub item_count: usize,
    pub items_per_page: usize,
    pub page_count: usize,
    /// `None` when everything fits on one page.
    pub interval: Option<Duration>,
}

impl PagePlan {
    pub fn new(item_count: usize, items_per_page: usize, slide_duration: Duration) -> Self {
        let items_per_page = items_per_page.max(1);
        let page_count = item_count.div_ceil(items_per_page).max(1);
        let interval =
            (page_count > 1).then(|| (slide_duration / page_count as u32).max(PAGE_FLOOR));
        Self {
            item_count,
            items_per_page,
            page_count,
            interval,
        }
    }

    /// Item indices shown on `page`. Empty for pages past the end.
    pub fn range(&self, page: usize) -> Range<usize> {
        let start = (page * self.items_per_page).min(self.item_count);
        let end = (start + self.items_per_page).min(self.item_count);
        start..end
    }

    /// Time to show every page once.
    pub fn cycle_duration(&self) -> Option<Duration> {
        self.interval.map(|i| i * self.page_count as u32)
    }
}

/// Page cadence for one slide. The page index itself lives in
/// [`RotationState`](super::rotation::RotationState); this only decides when
/// it moves and when it must go back to zero.
#[derive(Debug, Clone)]
pub struct PageRotator {
    slide_duration: Duration,
    plan: PagePlan,
    next_at: Option<Instant>,
    cycle_end: Option<Instant>,
}

impl PageRotator {
    pub fn new(slide_duration: Duration) -> Self {
        Self {
            slide_duration,
            plan: PagePlan::new(0, 1, slide_duration),
            next_at: None,
            cycle_end: None,
        }
    }

    pub fn plan(&self) -> PagePlan {
        self.plan
    }

    /// Takes effect on the next [`configure`](Self::configure).
    pub fn set_slide_duration(&mut self, slide_duration: Duration) {
        self.slide_duration = slide_duration;
    }

    /// When the last page of the current plan finishes its first showing.
    pub fn cycle_end(&self) -> Option<Instant> {
        self.cycle_end
    }

    /// Apply a new item count or page size. Returns true when the plan
    /// changed, in which case the caller must go back to page 0.
    pub fn configure(&mut self, item_count: usize, items_per_page: usize, now: Instant) -> bool {
        let plan = PagePlan::new(item_count, items_per_page, self.slide_duration);
        if plan == self.plan {
            return false;
        }
        tracing::debug!(
            "paging {} items, {} per page, {} pages",
            plan.item_count,
            plan.items_per_page,
            plan.page_count
        );
        self.plan = plan;
        self.next_at = plan.interval.map(|i| now + i);
        self.cycle_end = plan.cycle_duration().map(|c| now + c);
        true
    }

    /// True when the page should advance now.
    pub fn poll(&mut self, now: Instant) -> bool {
        let (Some(due), Some(interval)) = (self.next_at, self.plan.interval) else {
            return false;
        };
        if now < due {
            return false;
        }
        let mut next = due + interval;
        if next <= now {
            next = now + interval;
        }
        self.next_at = Some(next);
        true
    }

    pub fn next_tick(&self) -> Option<Instant> {
        self.next_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rotation::RotationState;

    #[test]
    fn test_page_count() {
        let d = Duration::from_secs(30);
        assert_eq!(PagePlan::new(0, 10, d).page_count, 1);
        assert_eq!(PagePlan::new(10, 10, d).page_count, 1);
        assert_eq!(PagePlan::new(11, 10, d).page_count, 2);
        assert_eq!(PagePlan::new(7, 0, d).page_count, 7);
    }

    #[test]
    fn test_single_page_has_no_timer() {
        let t0 = Instant::now();
        let mut r = PageRotator::new(Duration::from_secs(30));
        r.configure(5, 10, t0);
        assert_eq!(r.plan().interval, None);
        assert!(!r.poll(t0 + Duration::from_secs(600)));
        assert_eq!(r.next_tick(), None);
    }

    #[test]
    fn test_interval_divides_slide_duration() {
        let plan = PagePlan::new(30, 10, Duration::from_secs(30));
        assert_eq!(plan.interval, Some(Duration::from_secs(10)));
        assert_eq!(plan.cycle_duration(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_floor_guard_wins() {
        for items in [11, 50, 200, 1000] {
            for secs in [3, 10, 20, 60] {
                let plan = PagePlan::new(items, 10, Duration::from_secs(secs));
                assert!(plan.interval.unwrap() >= PAGE_FLOOR);
            }
        }
        // 10 pages in 20s would be 2s each; the floor stretches the cycle.
        let plan = PagePlan::new(100, 10, Duration::from_secs(20));
        assert_eq!(plan.interval, Some(PAGE_FLOOR));
        assert!(plan.cycle_duration().unwrap() > Duration::from_secs(20));
    }

    #[test]
    fn test_pages_cover_every_item_once() {
        for count in 0..60 {
            for per_page in 1..13 {
                let plan = PagePlan::new(count, per_page, Duration::from_secs(20));
                let mut seen = Vec::new();
                for page in 0..plan.page_count {
                    let range = plan.range(page);
                    assert!(range.len() <= per_page);
                    seen.extend(range);
                }
                assert_eq!(seen, (0..count).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_ticks_cycle_through_pages() {
        let t0 = Instant::now();
        let mut r = PageRotator::new(Duration::from_secs(30));
        let mut state = RotationState::default();
        r.configure(25, 10, t0);
        let plan = r.plan();
        assert_eq!(plan.page_count, 3);
        let mut pages = vec![state.active_page_index()];
        for s in 1..=6 {
            if r.poll(t0 + Duration::from_secs(s * 10)) {
                state.advance_page(plan.page_count);
            }
            pages.push(state.active_page_index());
        }
        assert_eq!(pages, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_reconfigure_restarts_cadence() {
        let t0 = Instant::now();
        let mut r = PageRotator::new(Duration::from_secs(30));
        assert!(r.configure(40, 10, t0));
        assert!(!r.configure(40, 10, t0 + Duration::from_secs(3)));
        assert!(r.configure(40, 20, t0 + Duration::from_secs(5)));
        // New plan: 2 pages, 15s each, counted from the reconfigure.
        assert!(!r.poll(t0 + Duration::from_secs(19)));
        assert!(r.poll(t0 + Duration::from_secs(20)));
    }

    #[test]
    fn test_stalled_poll_does_not_burst() {
        let t0 = Instant::now();
        let mut r = PageRotator::new(Duration::from_secs(20));
        r.configure(20, 10, t0);
        let late = t0 + Duration::from_secs(95);
        assert!(r.poll(late));
        assert!(!r.poll(late));
        assert_eq!(r.next_tick(), Some(late + Duration::from_secs(10)));
    }

    #[test]
    fn test_cycle_end_counts_from_configure() {
        let t0 = Instant::now();
        let mut r = PageRotator::new(Duration::from_secs(20));
        assert_eq!(r.cycle_end(), None);
        // 9 pages under the 6s floor outlast the 20s slide.
        r.configure(100, 12, t0);
        assert_eq!(r.cycle_end(), Some(t0 + Duration::from_secs(54)));
        r.configure(5, 12, t0 + Duration::from_secs(1));
        assert_eq!(r.cycle_end(), None);
    }

    #[test]
    fn test_new_slide_duration_changes_interval() {
        let t0 = Instant::now();
        let mut r = PageRotator::new(Duration::from_secs(30));
        r.configure(30, 10, t0);
        assert_eq!(r.plan().interval, Some(Duration::from_secs(10)));
        r.set_slide_duration(Duration::from_secs(60));
        assert!(r.configure(30, 10, t0 + Duration::from_secs(4)));
        assert_eq!(r.plan().interval, Some(Duration::from_secs(20)));
        assert_eq!(r.next_tick(), Some(t0 + Duration::from_secs(24)));
    }
}
