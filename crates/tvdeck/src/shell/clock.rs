use std::time::{Duration, Instant};

use eframe::egui::{Pos2, Rect};

/// How often the clock re-checks what is drawn under it.
pub const HIT_TEST_INTERVAL: Duration = Duration::from_millis(400);

/// Decides whether the decorative clock may be drawn.
///
/// Slide content moves underneath the clock all the time (reveals, page
/// flips, toasts), so visibility is re-evaluated on a fixed cadence against
/// the rects that were actually painted, not decided once.
#[derive(Debug)]
pub struct ClockGuard {
    visible: bool,
    next_check: Option<Instant>,
}

impl Default for ClockGuard {
    fn default() -> Self {
        Self {
            visible: true,
            next_check: None,
        }
    }
}

impl ClockGuard {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Re-run the hit test if one is due. Returns true if visibility changed.
    pub fn poll(&mut self, now: Instant, anchor: Pos2, occupied: &[Rect]) -> bool {
        if self.next_check.is_some_and(|due| now < due) {
            return false;
        }
        self.next_check = Some(now + HIT_TEST_INTERVAL);
        let visible = !is_obscured(anchor, occupied);
        let changed = visible != self.visible;
        self.visible = visible;
        changed
    }

    pub fn next_check(&self) -> Option<Instant> {
        self.next_check
    }
}

pub fn is_obscured(anchor: Pos2, occupied: &[Rect]) -> bool {
    occupied.iter().any(|r| r.contains(anchor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, vec2};

    fn anchor() -> Pos2 {
        pos2(1800.0, 50.0)
    }

    #[test]
    fn test_clear_anchor_shows_clock() {
        let mut clock = ClockGuard::default();
        let header = Rect::from_min_size(pos2(80.0, 40.0), vec2(900.0, 80.0));
        assert!(!clock.poll(Instant::now(), anchor(), &[header]));
        assert!(clock.is_visible());
    }

    #[test]
    fn test_overlap_hides_until_next_check() {
        let t0 = Instant::now();
        let mut clock = ClockGuard::default();
        let toast = Rect::from_min_size(pos2(1500.0, 20.0), vec2(400.0, 90.0));
        assert!(clock.poll(t0, anchor(), &[toast]));
        assert!(!clock.is_visible());

        // Toast gone, but the check isn't due yet.
        assert!(!clock.poll(t0 + Duration::from_millis(200), anchor(), &[]));
        assert!(!clock.is_visible());

        assert!(clock.poll(t0 + HIT_TEST_INTERVAL, anchor(), &[]));
        assert!(clock.is_visible());
        assert_eq!(clock.next_check(), Some(t0 + HIT_TEST_INTERVAL * 2));
    }

    #[test]
    fn test_any_rect_can_obscure() {
        let wide_row = Rect::from_min_size(pos2(80.0, 30.0), vec2(1760.0, 60.0));
        let far = Rect::from_min_size(pos2(0.0, 800.0), vec2(100.0, 100.0));
        assert!(is_obscured(anchor(), &[far, wide_row]));
        assert!(!is_obscured(anchor(), &[far]));
    }
}
