use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;

use crate::engine::{Presentation, RotationMode, Screen, SlideView};
use crate::sync::notify::ChannelState;
use crate::sync::refresh::{RefreshStatus, RefreshTrigger};
use crate::sync::{Background, Notifier, SyncOptions};
use crate::theme::Theme;

use super::clock::ClockGuard;
use super::fullscreen::FullscreenTracker;
use super::slides::{self, compute_scale};
use super::toast::{Toast, ToastQueue};

/// Upper bound on how long the UI sleeps, so the clock keeps ticking.
const MAX_IDLE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub sync: SyncOptions,
    pub windowed: bool,
    pub supervised: bool,
    pub theme: String,
}

pub struct TvApp {
    presentation: Presentation,
    background: Background,
    status: RefreshStatus,
    channel_state: Option<ChannelState>,
    toasts: ToastQueue,
    clock: ClockGuard,
    fullscreen: FullscreenTracker,
    theme: Theme,
}

impl TvApp {
    fn new(background: Background, options: &LaunchOptions) -> Self {
        let mode = if options.supervised {
            RotationMode::Supervised
        } else {
            RotationMode::Unattended
        };
        let status = background.refresh.status.borrow().clone();
        Self {
            presentation: Presentation::new(mode),
            background,
            status,
            channel_state: None,
            toasts: ToastQueue::default(),
            clock: ClockGuard::default(),
            fullscreen: FullscreenTracker::new(!options.windowed),
            theme: Theme::from_name(&options.theme),
        }
    }

    /// Pull whatever the background thread has published since last frame.
    fn sync_background(&mut self, now: Instant) {
        let refresh = &mut self.background.refresh;
        if refresh.deck.has_changed().unwrap_or(false) {
            let deck = refresh.deck.borrow_and_update().clone();
            if let Some(deck) = deck {
                tracing::debug!("applying deck with {} slides", deck.len());
                self.presentation.replace_deck(deck, now);
            }
        }
        if refresh.status.has_changed().unwrap_or(false) {
            self.status = refresh.status.borrow_and_update().clone();
        }
        if let Some(channel) = self.background.channel.as_mut() {
            if channel.has_changed().unwrap_or(false) {
                self.channel_state = Some(*channel.borrow_and_update());
            }
        }
        while let Ok(event) = self.background.events.try_recv() {
            self.toasts.push(Toast::from_event(&event, now));
        }
        self.toasts.expire(now);
    }

    fn handle_keys(&mut self, ctx: &egui::Context, now: Instant) {
        let mut viewport_cmds: Vec<egui::ViewportCommand> = Vec::new();
        if let Some(cmd) = self.fullscreen.startup(now) {
            viewport_cmds.push(cmd);
        }

        let supervised = self.presentation.mode() == RotationMode::Supervised;
        let slide_count = self.presentation.deck().map_or(0, |d| d.len());

        ctx.input(|i| {
            if i.key_pressed(egui::Key::Q) {
                viewport_cmds.push(egui::ViewportCommand::Close);
                return;
            }
            if i.key_pressed(egui::Key::F) {
                viewport_cmds.push(self.fullscreen.toggle(now));
            }
            if i.key_pressed(egui::Key::R) {
                self.background.refresh.trigger(RefreshTrigger::Retry);
            }
            self.fullscreen.observe(i.viewport().fullscreen, now);

            if !supervised {
                return;
            }
            if i.key_pressed(egui::Key::ArrowRight) || i.key_pressed(egui::Key::Space) {
                self.presentation.advance(now);
            }
            if i.key_pressed(egui::Key::ArrowLeft) {
                self.presentation.retreat(now);
            }
            if i.key_pressed(egui::Key::Home) {
                self.presentation.select(0, now);
            }
            if i.key_pressed(egui::Key::End) && slide_count > 0 {
                self.presentation.select(slide_count - 1, now);
            }
        });

        for cmd in viewport_cmds {
            ctx.send_viewport_cmd(cmd);
        }
    }

    fn next_repaint(&self, now: Instant) -> Duration {
        [
            self.presentation.next_wakeup(now),
            self.toasts.next_expiry(),
            self.clock.next_check(),
        ]
        .into_iter()
        .flatten()
        .min()
        .map_or(MAX_IDLE, |at| at.saturating_duration_since(now).min(MAX_IDLE))
    }
}

impl eframe::App for TvApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.sync_background(now);
        self.handle_keys(ctx, now);
        self.presentation.poll(now);

        let bg = self.theme.background;
        let mut body_container = None;

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(bg).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                ui.painter().rect_filled(rect, 0.0, bg);
                let scale = compute_scale(rect);

                let mut occupied = match self.presentation.screen() {
                    Screen::Loading => draw_loading(ui, &self.theme, rect, &self.status),
                    Screen::Empty => slides::draw_message(
                        ui,
                        &self.theme,
                        rect,
                        "No slides to show",
                        Some("The dashboard returned an empty deck. Checking again shortly."),
                        self.theme.heading_color,
                    ),
                    Screen::Slide(view) => {
                        let painted = slides::draw_slide(ui, &view, &self.theme, rect);
                        body_container = painted.body_container;
                        let mut occupied = painted.occupied;
                        occupied.extend(draw_footer(ui, &self.theme, rect, scale, &view));
                        occupied
                    }
                };

                if self.status.has_deck {
                    if let Some(error) = &self.status.last_error {
                        let text = format!("Showing last good data. Refresh failed: {error}");
                        occupied.push(draw_banner(ui, &self.theme, rect, scale, &text));
                    }
                }
                if matches!(self.channel_state, Some(ChannelState::Backoff { .. })) {
                    occupied.push(draw_live_indicator(ui, &self.theme, rect, scale));
                }

                occupied.extend(draw_toasts(ui, &self.theme, rect, scale, &self.toasts, now));
                if self.toasts.iter().any(|t| t.opacity(now) < 1.0) {
                    ctx.request_repaint();
                }

                let anchor = clock_anchor(rect, scale);
                self.clock.poll(now, anchor, &occupied);
                if self.clock.is_visible() {
                    draw_clock(ui, &self.theme, rect, scale);
                }
            });

        if let Some(size) = body_container {
            if self.presentation.observe_container(size, now) {
                ctx.request_repaint();
            }
        }

        ctx.request_repaint_after(self.next_repaint(now));
    }
}

fn draw_loading(
    ui: &egui::Ui,
    theme: &Theme,
    rect: egui::Rect,
    status: &RefreshStatus,
) -> Vec<egui::Rect> {
    match &status.last_error {
        Some(error) => {
            let detail = if error.is_transient() {
                format!("{error}\nRetrying automatically. Press R to retry now.")
            } else {
                format!("{error}\nChecking again on the next refresh.")
            };
            slides::draw_message(
                ui,
                theme,
                rect,
                "Cannot load slides",
                Some(&detail),
                theme.warning,
            )
        }
        None => {
            let detail = format!("Fetching {}", status.source);
            slides::draw_message(
                ui,
                theme,
                rect,
                "Loading slides\u{2026}",
                Some(&detail),
                theme.heading_color,
            )
        }
    }
}

fn draw_footer(
    ui: &egui::Ui,
    theme: &Theme,
    rect: egui::Rect,
    scale: f32,
    view: &SlideView<'_>,
) -> Option<egui::Rect> {
    if view.slide_count < 2 {
        return None;
    }
    let color = Theme::with_opacity(theme.foreground, 0.5);
    let galley = ui.painter().layout_no_wrap(
        format!("{} / {}", view.index + 1, view.slide_count),
        egui::FontId::proportional(theme.small_size * scale),
        color,
    );
    let pos = egui::pos2(
        rect.left() + 32.0 * scale,
        rect.bottom() - 32.0 * scale - galley.rect.height(),
    );
    let footer = egui::Rect::from_min_size(pos, galley.rect.size());
    ui.painter().galley(pos, galley, color);
    Some(footer)
}

fn draw_banner(
    ui: &egui::Ui,
    theme: &Theme,
    rect: egui::Rect,
    scale: f32,
    text: &str,
) -> egui::Rect {
    let color = theme.background;
    let galley = ui.painter().layout_no_wrap(
        text.to_string(),
        egui::FontId::proportional(theme.small_size * scale),
        color,
    );
    let padding = 10.0 * scale;
    let banner = egui::Rect::from_min_size(
        egui::pos2(
            rect.center().x - galley.rect.width() / 2.0 - padding,
            rect.bottom() - 40.0 * scale - galley.rect.height() - padding * 2.0,
        ),
        egui::vec2(
            galley.rect.width() + padding * 2.0,
            galley.rect.height() + padding * 2.0,
        ),
    );
    ui.painter()
        .rect_filled(banner, 6.0 * scale, Theme::with_opacity(theme.warning, 0.9));
    ui.painter().galley(
        egui::pos2(banner.left() + padding, banner.top() + padding),
        galley,
        color,
    );
    banner
}

fn draw_live_indicator(ui: &egui::Ui, theme: &Theme, rect: egui::Rect, scale: f32) -> egui::Rect {
    let color = Theme::with_opacity(theme.warning, 0.8);
    let galley = ui.painter().layout_no_wrap(
        "Live updates reconnecting".to_string(),
        egui::FontId::proportional(theme.small_size * 0.8 * scale),
        color,
    );
    let pos = egui::pos2(
        rect.right() - 32.0 * scale - galley.rect.width(),
        rect.bottom() - 32.0 * scale - galley.rect.height(),
    );
    let indicator = egui::Rect::from_min_size(pos, galley.rect.size());
    ui.painter().galley(pos, galley, color);
    indicator
}

/// Toasts stack downward from the top-right corner, newest on top.
fn draw_toasts(
    ui: &egui::Ui,
    theme: &Theme,
    rect: egui::Rect,
    scale: f32,
    toasts: &ToastQueue,
    now: Instant,
) -> Vec<egui::Rect> {
    let padding = 16.0 * scale;
    let width = 460.0 * scale;
    let mut y = rect.top() + 24.0 * scale;
    let mut rects = Vec::new();

    for toast in toasts.iter() {
        let opacity = toast.opacity(now);
        if opacity <= 0.0 {
            continue;
        }
        let heading = Theme::with_opacity(theme.accent, opacity);
        let text = Theme::with_opacity(theme.card_foreground, opacity * 0.9);
        let headline = ui.painter().layout_no_wrap(
            toast.headline.clone(),
            egui::FontId::proportional(theme.small_size * scale),
            heading,
        );
        let message = ui.painter().layout(
            toast.message.clone(),
            egui::FontId::proportional(theme.body_size * 0.85 * scale),
            text,
            width - padding * 2.0,
        );
        let height = headline.rect.height() + message.rect.height() + padding * 2.0 + 4.0 * scale;
        let toast_rect = egui::Rect::from_min_size(
            egui::pos2(rect.right() - width - 24.0 * scale, y),
            egui::vec2(width, height),
        );
        ui.painter().rect_filled(
            toast_rect,
            8.0 * scale,
            Theme::with_opacity(theme.card_background, opacity * 0.95),
        );
        let mut text_y = toast_rect.top() + padding;
        let headline_height = headline.rect.height();
        ui.painter()
            .galley(egui::pos2(toast_rect.left() + padding, text_y), headline, heading);
        text_y += headline_height + 4.0 * scale;
        ui.painter()
            .galley(egui::pos2(toast_rect.left() + padding, text_y), message, text);

        y += height + 12.0 * scale;
        rects.push(toast_rect);
    }
    rects
}

fn clock_anchor(rect: egui::Rect, scale: f32) -> egui::Pos2 {
    egui::pos2(rect.right() - 110.0 * scale, rect.top() + 60.0 * scale)
}

fn draw_clock(ui: &egui::Ui, theme: &Theme, rect: egui::Rect, scale: f32) {
    let color = Theme::with_opacity(theme.foreground, 0.6);
    let galley = ui.painter().layout_no_wrap(
        chrono::Local::now().format("%H:%M").to_string(),
        egui::FontId::proportional(theme.subtitle_size * scale),
        color,
    );
    let anchor = clock_anchor(rect, scale);
    let pos = anchor - galley.rect.size() / 2.0;
    ui.painter().galley(pos, galley, color);
}

pub fn run(options: LaunchOptions) -> anyhow::Result<()> {
    let title = "tvdeck".to_string();

    let viewport = if options.windowed {
        egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(&title)
    } else {
        egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_title(&title)
    };

    let native = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    tracing::info!(
        "presenting {} ({})",
        options.sync.source,
        if options.supervised {
            "supervised"
        } else {
            "unattended"
        }
    );

    eframe::run_native(
        &title,
        native,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            let notifier: Notifier = Arc::new(move || ctx.request_repaint());
            let background = Background::start(options.sync.clone(), notifier)?;
            Ok(Box::new(TvApp::new(background, &options)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
