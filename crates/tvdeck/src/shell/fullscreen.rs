use std::time::{Duration, Instant};

use eframe::egui::ViewportCommand;

/// Time the platform gets to honour a fullscreen request before we stop
/// waiting for it.
const SETTLE: Duration = Duration::from_secs(2);

/// Tracks what fullscreen state we asked for and what the window manager
/// actually reports. Failing to go fullscreen is logged, never fatal.
#[derive(Debug)]
pub struct FullscreenTracker {
    wanted: bool,
    reported: Option<bool>,
    requested_at: Option<Instant>,
    gave_up: bool,
}

impl FullscreenTracker {
    pub fn new(wanted: bool) -> Self {
        Self {
            wanted,
            reported: None,
            requested_at: None,
            gave_up: false,
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.reported.unwrap_or(false)
    }

    /// Command to send on the first frame, if fullscreen is wanted.
    pub fn startup(&mut self, now: Instant) -> Option<ViewportCommand> {
        if !self.wanted || self.requested_at.is_some() {
            return None;
        }
        self.requested_at = Some(now);
        Some(ViewportCommand::Fullscreen(true))
    }

    pub fn toggle(&mut self, now: Instant) -> ViewportCommand {
        self.wanted = !self.is_fullscreen();
        self.requested_at = Some(now);
        self.gave_up = false;
        ViewportCommand::Fullscreen(self.wanted)
    }

    /// Feed the state reported by the environment. Returns true when it changed.
    pub fn observe(&mut self, reported: Option<bool>, now: Instant) -> bool {
        let changed = reported.is_some() && reported != self.reported;
        if changed {
            tracing::info!("fullscreen: {}", reported.unwrap_or(false));
            if reported == Some(self.wanted) {
                self.requested_at = None;
            } else if self.requested_at.is_none() {
                // Left or entered fullscreen from outside; follow it.
                self.wanted = reported.unwrap_or(false);
            }
            self.reported = reported;
        }

        let overdue = self
            .requested_at
            .is_some_and(|at| now.saturating_duration_since(at) >= SETTLE);
        if overdue && self.wanted && !self.is_fullscreen() && !self.gave_up {
            tracing::warn!("fullscreen request was not honoured, staying windowed");
            self.gave_up = true;
            self.requested_at = None;
        }
        changed
    }

    pub fn gave_up(&self) -> bool {
        self.gave_up
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_requests_once() {
        let t0 = Instant::now();
        let mut fs = FullscreenTracker::new(true);
        assert!(matches!(
            fs.startup(t0),
            Some(ViewportCommand::Fullscreen(true))
        ));
        assert!(fs.startup(t0).is_none());
        assert!(FullscreenTracker::new(false).startup(t0).is_none());
    }

    #[test]
    fn test_observe_tracks_environment() {
        let t0 = Instant::now();
        let mut fs = FullscreenTracker::new(true);
        fs.startup(t0);
        assert!(fs.observe(Some(true), t0));
        assert!(fs.is_fullscreen());
        assert!(!fs.observe(Some(true), t0));
        // User leaves fullscreen through the window manager.
        assert!(fs.observe(Some(false), t0 + Duration::from_secs(60)));
        assert!(!fs.is_fullscreen());
        assert!(!fs.gave_up());
    }

    #[test]
    fn test_unhonoured_request_is_not_fatal() {
        let t0 = Instant::now();
        let mut fs = FullscreenTracker::new(true);
        fs.startup(t0);
        fs.observe(Some(false), t0);
        assert!(!fs.gave_up());
        fs.observe(Some(false), t0 + Duration::from_secs(3));
        assert!(fs.gave_up());
        assert!(!fs.is_fullscreen());
    }

    #[test]
    fn test_toggle_flips_wanted_state() {
        let t0 = Instant::now();
        let mut fs = FullscreenTracker::new(false);
        fs.observe(Some(false), t0);
        assert!(matches!(fs.toggle(t0), ViewportCommand::Fullscreen(true)));
        fs.observe(Some(true), t0);
        assert!(matches!(fs.toggle(t0), ViewportCommand::Fullscreen(false)));
    }
}
