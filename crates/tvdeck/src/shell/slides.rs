//! Painting of individual slides.
//!
//! Layout is computed in 1920x1080 reference pixels and scaled to the
//! window. Sections that are not yet revealed are laid out exactly as if
//! they were visible and simply not painted, so the body container keeps
//! the same size from the first frame of a slide to the last.

use eframe::egui::{self, Color32, FontId, Pos2, Rect, Vec2};
use serde_json::Value;

use crate::deck::kind::ITEM_GAP;
use crate::deck::{Kpi, SlideKind};
use crate::engine::SlideView;
use crate::engine::capacity::{CapacityProvider, GridCapacity};
use crate::theme::Theme;

pub const REFERENCE: Vec2 = Vec2::new(1920.0, 1080.0);
const MARGIN_X: f32 = 80.0;
const HEADER_TOP: f32 = 40.0;
const KPI_TOP: f32 = 190.0;
const KPI_HEIGHT: f32 = 140.0;
const KPI_MAX_WIDTH: f32 = 380.0;
const BODY_TOP_WITH_KPIS: f32 = 360.0;
const FOOTER_HEIGHT: f32 = 80.0;
const MAX_DETAIL_LINES: usize = 3;

/// What a painted slide reports back to the shell.
pub struct Painted {
    /// Body container size in reference pixels, for capacity measurement.
    pub body_container: Option<Vec2>,
    /// Screen rects of everything drawn in the foreground.
    pub occupied: Vec<Rect>,
}

/// Scale from reference pixels to the screen.
pub fn compute_scale(rect: Rect) -> f32 {
    (rect.width() / REFERENCE.x).min(rect.height() / REFERENCE.y)
}

/// Size of a screen in reference pixels. The shorter side maps to the
/// reference; the longer one gains room instead of letterboxing.
pub fn canvas_size(screen: Vec2) -> Vec2 {
    let scale = compute_scale(Rect::from_min_size(Pos2::ZERO, screen));
    if scale > 0.0 { screen / scale } else { REFERENCE }
}

/// Where the item body goes on a canvas, in reference pixels.
pub fn body_area(canvas: Vec2, with_kpis: bool) -> Rect {
    let top = if with_kpis { BODY_TOP_WITH_KPIS } else { KPI_TOP };
    Rect::from_min_max(
        egui::pos2(MARGIN_X, top),
        egui::pos2(canvas.x - MARGIN_X, (canvas.y - FOOTER_HEIGHT).max(top)),
    )
}

struct Canvas<'a> {
    painter: &'a egui::Painter,
    origin: Pos2,
    scale: f32,
    occupied: Vec<Rect>,
}

impl Canvas<'_> {
    fn rect(&self, min: Pos2, size: Vec2) -> Rect {
        Rect::from_min_size(self.origin + min.to_vec2() * self.scale, size * self.scale)
    }

    fn text(
        &mut self,
        text: String,
        at: Pos2,
        size: f32,
        color: Color32,
        wrap: Option<f32>,
    ) -> Rect {
        let font = FontId::proportional(size * self.scale);
        let galley = match wrap {
            Some(width) => self.painter.layout(text, font, color, width * self.scale),
            None => self.painter.layout_no_wrap(text, font, color),
        };
        let pos = self.origin + at.to_vec2() * self.scale;
        let rect = Rect::from_min_size(pos, galley.rect.size());
        self.painter.galley(pos, galley, color);
        self.occupied.push(rect);
        rect
    }

    fn card(&mut self, rect: Rect, color: Color32) {
        self.painter.rect_filled(rect, 10.0 * self.scale, color);
        self.occupied.push(rect);
    }
}

pub fn draw_slide(ui: &egui::Ui, view: &SlideView<'_>, theme: &Theme, rect: Rect) -> Painted {
    let scale = compute_scale(rect);
    if scale <= 0.0 {
        return Painted {
            body_container: None,
            occupied: Vec::new(),
        };
    }
    let size = rect.size() / scale;
    let mut canvas = Canvas {
        painter: ui.painter(),
        origin: rect.min,
        scale,
        occupied: Vec::new(),
    };

    let Some(kind) = view.slide.kind else {
        draw_unknown(&mut canvas, theme, size, &view.slide.type_tag);
        return Painted {
            body_container: None,
            occupied: canvas.occupied,
        };
    };

    draw_header(&mut canvas, theme, view, kind);

    let kpis = view.slide.kpis();
    for (i, kpi) in kpis.iter().enumerate() {
        if view.is_revealed(i + 1) {
            draw_kpi(&mut canvas, theme, size, kpi, i, kpis.len());
        }
    }

    let body = body_area(size, !kpis.is_empty());
    let (body_min, body_size) = (body.min, body.size());

    if view.is_revealed(view.slide.body_step()) {
        match kind.item_footprint() {
            Some(footprint) => {
                draw_items(&mut canvas, theme, view, kind, body_min, body_size, footprint)
            }
            None => draw_text_body(&mut canvas, theme, view, body_min, body_size),
        }
    }

    Painted {
        body_container: kind.item_footprint().map(|_| body_size),
        occupied: canvas.occupied,
    }
}

fn draw_header(canvas: &mut Canvas<'_>, theme: &Theme, view: &SlideView<'_>, kind: SlideKind) {
    let title = view
        .slide
        .title()
        .map(str::to_string)
        .unwrap_or_else(|| kind.display_name().to_string());
    canvas.text(
        title,
        egui::pos2(MARGIN_X, HEADER_TOP),
        theme.title_size,
        theme.heading_color,
        None,
    );
    if let Some(subtitle) = view.slide.subtitle() {
        canvas.text(
            subtitle.to_string(),
            egui::pos2(MARGIN_X, HEADER_TOP + 82.0),
            theme.subtitle_size,
            Theme::with_opacity(theme.foreground, 0.7),
            None,
        );
    }
}

fn draw_kpi(
    canvas: &mut Canvas<'_>,
    theme: &Theme,
    size: Vec2,
    kpi: &Kpi,
    index: usize,
    count: usize,
) {
    let available = size.x - 2.0 * MARGIN_X;
    let width = ((available - ITEM_GAP * (count as f32 - 1.0)) / count as f32).min(KPI_MAX_WIDTH);
    let min = egui::pos2(MARGIN_X + index as f32 * (width + ITEM_GAP), KPI_TOP);
    let rect = canvas.rect(min, egui::vec2(width, KPI_HEIGHT));
    canvas.card(rect, theme.card_background);
    canvas.text(
        kpi.value.clone(),
        min + egui::vec2(24.0, 16.0),
        theme.kpi_value_size,
        theme.accent,
        None,
    );
    canvas.text(
        kpi.label.clone(),
        min + egui::vec2(24.0, 92.0),
        theme.small_size,
        theme.card_foreground,
        Some(width - 48.0),
    );
}

fn draw_items(
    canvas: &mut Canvas<'_>,
    theme: &Theme,
    view: &SlideView<'_>,
    kind: SlideKind,
    body_min: Pos2,
    body_size: Vec2,
    footprint: Vec2,
) {
    // Before the first measurement lands, lay out against the body itself.
    let columns = view
        .grid
        .or_else(|| GridCapacity.grid(body_size, footprint, ITEM_GAP))
        .map_or(1, |g| g.columns.max(1));
    let first_index = view.plan.range(view.page).start;

    for (i, item) in view.items.iter().enumerate() {
        let col = i % columns;
        let row = i / columns;
        let min = body_min
            + egui::vec2(
                col as f32 * (footprint.x + ITEM_GAP),
                row as f32 * (footprint.y + ITEM_GAP),
            );
        let rect = canvas.rect(min, footprint);
        canvas.card(rect, theme.card_background);

        let mut title = item_title(item);
        if kind == SlideKind::Ranking {
            title = format!("#{}  {title}", first_index + i + 1);
        }
        let row_layout = footprint.y < 100.0;
        canvas.text(
            title,
            min + egui::vec2(20.0, if row_layout { 16.0 } else { 14.0 }),
            theme.body_size,
            theme.card_foreground,
            Some(if row_layout { footprint.x * 0.45 } else { footprint.x - 40.0 }),
        );

        let details = item_details(item);
        if row_layout {
            let line = details
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join("   ");
            if !line.is_empty() {
                canvas.text(
                    line,
                    min + egui::vec2(footprint.x * 0.5, 20.0),
                    theme.small_size,
                    Theme::with_opacity(theme.card_foreground, 0.75),
                    Some(footprint.x * 0.5 - 20.0),
                );
            }
        } else {
            let lines = ((footprint.y - 56.0) / 26.0).max(0.0) as usize;
            for (line, (k, v)) in details.iter().take(lines.min(MAX_DETAIL_LINES)).enumerate() {
                canvas.text(
                    format!("{k}: {v}"),
                    min + egui::vec2(20.0, 52.0 + line as f32 * 26.0),
                    theme.small_size,
                    Theme::with_opacity(theme.card_foreground, 0.75),
                    Some(footprint.x - 40.0),
                );
            }
        }
    }

    if view.plan.page_count > 1 {
        canvas.text(
            format!("Page {} / {}", view.page + 1, view.plan.page_count),
            body_min + egui::vec2(body_size.x - 160.0, body_size.y + 16.0),
            theme.small_size,
            Theme::with_opacity(theme.foreground, 0.5),
            None,
        );
    }
}

fn draw_text_body(
    canvas: &mut Canvas<'_>,
    theme: &Theme,
    view: &SlideView<'_>,
    body_min: Pos2,
    body_size: Vec2,
) {
    let fields = &view.slide.fields;
    let text = ["message", "body", "text"]
        .iter()
        .find_map(|k| fields.get(*k).and_then(Value::as_str));
    let mut y = body_min.y;
    if let Some(text) = text {
        let rect = canvas.text(
            text.to_string(),
            egui::pos2(body_min.x, y),
            theme.subtitle_size,
            theme.foreground,
            Some(body_size.x),
        );
        y += rect.height() / canvas.scale + 24.0;
    }
    for item in view.items {
        if y > body_min.y + body_size.y {
            break;
        }
        let rect = canvas.text(
            format!("\u{2022} {}", item_title(item)),
            egui::pos2(body_min.x, y),
            theme.body_size,
            theme.foreground,
            Some(body_size.x),
        );
        y += rect.height() / canvas.scale + 12.0;
    }
}

fn draw_unknown(canvas: &mut Canvas<'_>, theme: &Theme, screen: Vec2, tag: &str) {
    let size = egui::vec2(900.0, 240.0);
    let min = (screen / 2.0 - size / 2.0).to_pos2();
    let rect = canvas.rect(min, size);
    canvas.card(rect, theme.card_background);
    canvas.text(
        "Unknown slide".to_string(),
        min + egui::vec2(40.0, 40.0),
        theme.subtitle_size,
        theme.warning,
        None,
    );
    canvas.text(
        format!("This screen does not know how to show `{tag}`."),
        min + egui::vec2(40.0, 110.0),
        theme.body_size,
        theme.card_foreground,
        Some(size.x - 80.0),
    );
}

/// Centered status message used for the loading, empty and error screens.
pub fn draw_message(
    ui: &egui::Ui,
    theme: &Theme,
    rect: Rect,
    title: &str,
    detail: Option<&str>,
    accent: Color32,
) -> Vec<Rect> {
    let scale = compute_scale(rect);
    let painter = ui.painter();
    let mut occupied = Vec::new();

    let title_galley = painter.layout_no_wrap(
        title.to_string(),
        FontId::proportional(theme.title_size * scale),
        accent,
    );
    let mut y = rect.center().y - title_galley.rect.height();
    let pos = egui::pos2(rect.center().x - title_galley.rect.width() / 2.0, y);
    occupied.push(Rect::from_min_size(pos, title_galley.rect.size()));
    y += title_galley.rect.height() + 24.0 * scale;
    painter.galley(pos, title_galley, accent);

    if let Some(detail) = detail {
        let color = Theme::with_opacity(theme.foreground, 0.8);
        let galley = painter.layout(
            detail.to_string(),
            FontId::proportional(theme.body_size * scale),
            color,
            rect.width() * 0.7,
        );
        let pos = egui::pos2(rect.center().x - galley.rect.width() / 2.0, y);
        occupied.push(Rect::from_min_size(pos, galley.rect.size()));
        painter.galley(pos, galley, color);
    }
    occupied
}

/// Best display name for an opaque item record.
pub fn item_title(item: &Value) -> String {
    match item {
        Value::Object(map) => ["name", "title", "label"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .or_else(|| map.values().find_map(Value::as_str))
            .unwrap_or("")
            .to_string(),
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Remaining scalar fields of an item, in document order.
pub fn item_details(item: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = item else {
        return Vec::new();
    };
    let title = item_title(item);
    let mut title_skipped = false;
    map.iter()
        .filter_map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => if *b { "yes" } else { "no" }.to_string(),
                _ => return None,
            };
            if !title_skipped && text == title {
                title_skipped = true;
                return None;
            }
            Some((k.clone(), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compute_scale_fits_reference() {
        let full_hd = Rect::from_min_size(Pos2::ZERO, REFERENCE);
        assert_eq!(compute_scale(full_hd), 1.0);
        let uhd = Rect::from_min_size(Pos2::ZERO, egui::vec2(3840.0, 2160.0));
        assert_eq!(compute_scale(uhd), 2.0);
        let narrow = Rect::from_min_size(Pos2::ZERO, egui::vec2(960.0, 1080.0));
        assert_eq!(compute_scale(narrow), 0.5);
    }

    #[test]
    fn test_item_title_prefers_named_fields() {
        assert_eq!(item_title(&json!({"id": 3, "name": "Nordbank"})), "Nordbank");
        assert_eq!(item_title(&json!({"code": "X1", "label": "Late"})), "Late");
        assert_eq!(item_title(&json!({"id": 3, "code": "X1"})), "X1");
        assert_eq!(item_title(&json!("plain")), "plain");
        assert_eq!(item_title(&json!(42)), "42");
    }

    #[test]
    fn test_item_details_skip_title_and_nested() {
        let item = json!({
            "name": "Nordbank",
            "open": 12,
            "late": true,
            "history": [1, 2, 3],
            "region": "EMEA"
        });
        let details = item_details(&item);
        let keys: Vec<&str> = details.iter().map(|(k, _)| k.as_str()).collect();
        assert!(!keys.contains(&"name"));
        assert!(!keys.contains(&"history"));
        assert!(details.contains(&("open".to_string(), "12".to_string())));
        assert!(details.contains(&("late".to_string(), "yes".to_string())));
        assert!(details.contains(&("region".to_string(), "EMEA".to_string())));
    }

    #[test]
    fn test_canvas_grows_along_the_longer_side() {
        assert_eq!(canvas_size(REFERENCE), REFERENCE);
        assert_eq!(canvas_size(egui::vec2(3840.0, 2160.0)), REFERENCE);
        let four_three = canvas_size(egui::vec2(1024.0, 768.0));
        assert!((four_three.x - 1920.0).abs() < 0.01);
        assert!((four_three.y - 1440.0).abs() < 0.01);
    }

    #[test]
    fn test_body_area_leaves_room_for_header_and_footer() {
        let with_kpis = body_area(REFERENCE, true);
        assert_eq!(with_kpis.size(), egui::vec2(1760.0, 640.0));
        let plain = body_area(REFERENCE, false);
        assert_eq!(plain.size(), egui::vec2(1760.0, 810.0));
        // A wide, short canvas never produces a negative body.
        let strip = body_area(egui::vec2(1920.0, 300.0), true);
        assert_eq!(strip.height(), 0.0);
    }

    #[test]
    fn test_body_area_matches_item_grid() {
        // The grid kinds must fit at least one item in the body at reference size.
        let body = body_area(REFERENCE, true).size();
        for kind in SlideKind::all() {
            if let Some(footprint) = kind.item_footprint() {
                assert!(footprint.x <= body.x, "{kind} too wide");
                assert!(footprint.y <= body.y, "{kind} too tall");
            }
        }
    }
}
