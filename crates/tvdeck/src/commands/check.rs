use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;
use eframe::egui;

use crate::config::Config;
use crate::deck::kind::ITEM_GAP;
use crate::deck::{Slide, SlideDeck};
use crate::engine::capacity::CapacityMeasurer;
use crate::engine::pager::PagePlan;
use crate::error::PresentationError;
use crate::shell::slides;
use crate::sync::provider::{DataProvider, provider_for};
use crate::sync::resilient::{Outcome, SingleFlight, clamp_fetch_timeout, run_guarded};

pub fn run(source: &str, width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        anyhow::bail!("Invalid screen size {width}x{height}.");
    }

    let timeout = clamp_fetch_timeout(Config::load_or_default().fetch_timeout());
    let provider = provider_for(source, timeout);
    let deck = fetch_once(provider.as_ref(), timeout)
        .with_context(|| format!("Failed to load deck from {}", provider.describe()))?;
    if deck.is_empty() {
        return Err(PresentationError::EmptyDeck.into());
    }

    let canvas = slides::canvas_size(egui::vec2(width as f32, height as f32));
    println!(
        "{} slides from {} at {width}x{height}",
        deck.len().to_string().bold(),
        provider.describe()
    );
    println!();

    for (index, slide) in deck.slides.iter().enumerate() {
        let duration = deck.settings.duration_for(&slide.type_tag);
        let head = format!("{:>3}  {:<18} {:>6}", index + 1, slide.type_tag, secs(duration));
        match slide.kind {
            None => println!("{head}  {}", "unknown type, shown as placeholder".yellow()),
            Some(_) => println!("{head}  {}", describe_paging(slide, duration, canvas)),
        }
    }

    println!();
    println!("Full cycle:  {}", secs(deck.cycle_duration()).bold());
    println!("Refresh:     every {}", secs(deck.settings.refresh_interval()));

    let unknown = deck.unknown_tags();
    if !unknown.is_empty() {
        println!(
            "{}",
            format!("{} slide(s) of unknown type: {}", unknown.len(), unknown.join(", ")).yellow()
        );
    }
    Ok(())
}

fn fetch_once(provider: &dyn DataProvider, timeout: Duration) -> Result<SlideDeck> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    let attempt = SingleFlight::new().begin();
    let outcome = runtime.block_on(run_guarded(&attempt, timeout, async {
        let text = provider.fetch().await?;
        SlideDeck::from_json(&text)
    }));
    match outcome {
        Outcome::Succeeded(deck) => Ok(deck),
        Outcome::Failed(e) => Err(e.into()),
        Outcome::Cancelled => anyhow::bail!("Fetch was cancelled"),
    }
}

/// Paging summary for one slide, measured the way the screen measures it.
fn describe_paging(slide: &Slide, duration: Duration, canvas: egui::Vec2) -> String {
    let items = slide.items.len();
    let Some(footprint) = slide.kind.and_then(|k| k.item_footprint()) else {
        return format!("{items} items, {} steps", slide.step_count());
    };

    let body = slides::body_area(canvas, !slide.kpis().is_empty()).size();
    let mut measurer = CapacityMeasurer::new(footprint, ITEM_GAP);
    measurer.set_item_count(items);
    measurer.observe(body, Instant::now());
    let plan = PagePlan::new(items, measurer.items_per_page(), duration);

    match plan.interval {
        Some(interval) => format!(
            "{items} items, {} per page, {} pages every {}",
            plan.items_per_page,
            plan.page_count,
            secs(interval)
        ),
        None => format!("{items} items, one page"),
    }
}

fn secs(duration: Duration) -> String {
    let s = duration.as_secs_f64();
    if s.fract() == 0.0 {
        format!("{s:.0}s")
    } else {
        format!("{s:.1}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slide(tag: &str, count: usize) -> Slide {
        Slide::new(tag, (0..count).map(|i| json!({ "name": i })).collect())
    }

    #[test]
    fn test_secs_formatting() {
        assert_eq!(secs(Duration::from_secs(15)), "15s");
        assert_eq!(secs(Duration::from_millis(7_500)), "7.5s");
    }

    #[test]
    fn test_text_slides_do_not_page() {
        let summary = describe_paging(
            &slide("announcement", 0),
            Duration::from_secs(15),
            slides::REFERENCE,
        );
        assert_eq!(summary, "0 items, 1 steps");
    }

    #[test]
    fn test_long_lists_page_with_floor() {
        // 60 task rows at 1920x1080: 810 / (60 + 16) fits 10 rows, so 6 pages.
        let summary = describe_paging(
            &slide("task-board", 60),
            Duration::from_secs(15),
            slides::REFERENCE,
        );
        assert_eq!(summary, "60 items, 10 per page, 6 pages every 6s");
    }

    #[test]
    fn test_taller_screen_fits_more_rows() {
        let tall = slides::canvas_size(egui::vec2(1080.0, 1920.0));
        let summary = describe_paging(&slide("task-board", 12), Duration::from_secs(15), tall);
        assert_eq!(summary, "12 items, one page");
    }

    #[test]
    fn test_fetch_once_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        std::fs::write(&path, r#"{"slides": [{"typeTag": "ranking", "items": [1, 2]}]}"#)
            .unwrap();
        let provider = provider_for(&path.display().to_string(), Duration::from_secs(30));
        let deck = fetch_once(provider.as_ref(), Duration::from_secs(30)).unwrap();
        assert_eq!(deck.slides[0].items.len(), 2);

        std::fs::write(&path, "{ not json").unwrap();
        let err = fetch_once(provider.as_ref(), Duration::from_secs(30)).unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }
}
