/// Where the screen is in its rotation: which slide, which page of that
/// slide's items, and how far its sections have been revealed.
///
/// All mutation goes through the transitions below, so a slide change can
/// never leave page or reveal state behind from the previous slide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationState {
    active_slide_index: usize,
    active_page_index: usize,
    reveal_step: usize,
}

impl RotationState {
    pub fn active_slide_index(&self) -> usize {
        self.active_slide_index
    }

    pub fn active_page_index(&self) -> usize {
        self.active_page_index
    }

    pub fn reveal_step(&self) -> usize {
        self.reveal_step
    }

    /// Move to the next slide, wrapping. A no-op on an empty deck.
    pub fn advance_slide(&mut self, slide_count: usize) {
        if slide_count == 0 {
            *self = Self::default();
            return;
        }
        self.reset_for_slide((self.active_slide_index + 1) % slide_count);
    }

    /// Move to the previous slide, wrapping.
    pub fn retreat_slide(&mut self, slide_count: usize) {
        if slide_count == 0 {
            *self = Self::default();
            return;
        }
        let index = (self.active_slide_index + slide_count - 1) % slide_count;
        self.reset_for_slide(index);
    }

    /// Jump to `index`. Out-of-range indices are refused.
    pub fn select_slide(&mut self, index: usize, slide_count: usize) -> bool {
        if index >= slide_count {
            return false;
        }
        self.reset_for_slide(index);
        true
    }

    pub fn reset_for_slide(&mut self, index: usize) {
        self.active_slide_index = index;
        self.active_page_index = 0;
        self.reveal_step = 0;
    }

    pub fn advance_page(&mut self, page_count: usize) {
        self.active_page_index = if page_count <= 1 {
            0
        } else {
            (self.active_page_index + 1) % page_count
        };
    }

    pub fn reset_page(&mut self) {
        self.active_page_index = 0;
    }

    /// One step further, never past `step_count`.
    pub fn advance_reveal(&mut self, step_count: usize) {
        if self.reveal_step < step_count {
            self.reveal_step += 1;
        }
    }

    /// Pull the reveal back when the active slide lost sections.
    pub fn cap_reveal(&mut self, step_count: usize) {
        self.reveal_step = self.reveal_step.min(step_count);
    }

    /// Pull the slide index back inside a deck that shrank.
    /// Returns true when the index had to move.
    pub fn clamp_to(&mut self, slide_count: usize) -> bool {
        if slide_count == 0 {
            let moved = *self != Self::default();
            *self = Self::default();
            return moved;
        }
        if self.active_slide_index >= slide_count {
            self.reset_for_slide(slide_count - 1);
            return true;
        }
        false
    }
}
