//! The window: draws whatever the engine says is on screen and feeds it
//! the clock, the keyboard and the measured layout.

mod app;
pub mod clock;
pub mod fullscreen;
pub mod slides;
pub mod toast;

pub use app::{LaunchOptions, run};
