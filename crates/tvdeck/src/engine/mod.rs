//! Headless presentation engine. Nothing here touches a window or a clock;
//! every time-driven operation takes the current `Instant`.

pub mod capacity;
pub mod pager;
pub mod presentation;
pub mod reveal;
pub mod rotation;
pub mod scheduler;

pub use presentation::{Presentation, Screen, SlideView};
pub use scheduler::RotationMode;
