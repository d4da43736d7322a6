pub mod kind;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::PresentationError;

pub use kind::SlideKind;

/// Floor for every slide duration, so a misconfigured deck still moves.
pub const MIN_SLIDE_DURATION: Duration = Duration::from_secs(3);
/// Floor for the polling cadence.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_SLIDE_DURATION: Duration = Duration::from_secs(15);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
/// Ceiling for any duration a deck can ask for.
pub const MAX_DECK_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// One fetched deck. Replaced wholesale on refresh, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideDeck {
    pub settings: PresentationSettings,
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresentationSettings {
    default_slide_duration: Duration,
    refresh_interval: Duration,
    per_type_duration: BTreeMap<String, Duration>,
    order: Vec<String>,
    disabled_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub type_tag: String,
    /// `None` when the tag is outside the known catalogue.
    pub kind: Option<SlideKind>,
    pub items: Vec<Value>,
    /// Every other field of the slide object, kept opaque.
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kpi {
    pub label: String,
    pub value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDeck {
    #[serde(default)]
    settings: RawSettings,
    slides: Vec<RawSlide>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    default_slide_duration_seconds: Option<f64>,
    refresh_interval_seconds: Option<f64>,
    #[serde(default)]
    per_slide_type_duration_seconds: BTreeMap<String, f64>,
    #[serde(default)]
    order: Vec<String>,
    #[serde(default)]
    disabled_types: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSlide {
    #[serde(alias = "type")]
    type_tag: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    items: Vec<Value>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

fn seconds(value: Option<f64>, default: Duration, floor: Duration) -> Duration {
    let resolved = match value {
        Some(secs) if secs.is_finite() && secs > 0.0 => {
            Duration::try_from_secs_f64(secs).unwrap_or(MAX_DECK_DURATION)
        }
        Some(_) => floor,
        None => default,
    };
    resolved.clamp(floor, MAX_DECK_DURATION)
}

impl Default for PresentationSettings {
    fn default() -> Self {
        Self::new(DEFAULT_SLIDE_DURATION, DEFAULT_REFRESH_INTERVAL)
    }
}

impl PresentationSettings {
    pub fn new(default_slide_duration: Duration, refresh_interval: Duration) -> Self {
        Self {
            default_slide_duration: default_slide_duration.max(MIN_SLIDE_DURATION),
            refresh_interval: refresh_interval.max(MIN_REFRESH_INTERVAL),
            per_type_duration: BTreeMap::new(),
            order: Vec::new(),
            disabled_types: Vec::new(),
        }
    }

    pub fn with_type_duration(mut self, tag: &str, duration: Duration) -> Self {
        self.per_type_duration
            .insert(tag.to_string(), duration.max(MIN_SLIDE_DURATION));
        self
    }

    /// Per-type override first, then the deck default. Never below the floor.
    pub fn duration_for(&self, type_tag: &str) -> Duration {
        self.per_type_duration
            .get(type_tag)
            .copied()
            .unwrap_or(self.default_slide_duration)
            .max(MIN_SLIDE_DURATION)
    }

    pub fn default_slide_duration(&self) -> Duration {
        self.default_slide_duration
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval.max(MIN_REFRESH_INTERVAL)
    }

    fn from_raw(raw: RawSettings) -> Self {
        let per_type_duration = raw
            .per_slide_type_duration_seconds
            .into_iter()
            .map(|(tag, secs)| {
                let d = seconds(Some(secs), DEFAULT_SLIDE_DURATION, MIN_SLIDE_DURATION);
                (tag, d)
            })
            .collect();
        Self {
            default_slide_duration: seconds(
                raw.default_slide_duration_seconds,
                DEFAULT_SLIDE_DURATION,
                MIN_SLIDE_DURATION,
            ),
            refresh_interval: seconds(
                raw.refresh_interval_seconds,
                DEFAULT_REFRESH_INTERVAL,
                MIN_REFRESH_INTERVAL,
            ),
            per_type_duration,
            order: raw.order,
            disabled_types: raw.disabled_types,
        }
    }
}

impl Slide {
    pub fn new(type_tag: &str, items: Vec<Value>) -> Self {
        Self {
            type_tag: type_tag.to_string(),
            kind: SlideKind::from_tag(type_tag),
            items,
            fields: Map::new(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.kind.is_some()
    }

    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.fields.get("subtitle").and_then(Value::as_str)
    }

    pub fn kpis(&self) -> Vec<Kpi> {
        let Some(Value::Array(entries)) = self.fields.get("kpis") else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| {
                let label = entry.get("label")?.as_str()?.to_string();
                let value = match entry.get("value")? {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some(Kpi { label, value })
            })
            .collect()
    }

    /// Number of reveal steps: header at 0, one per KPI, then the body.
    pub fn step_count(&self) -> usize {
        self.kpis().len() + 1
    }

    /// Reveal step at which the body (item grid or text) appears.
    pub fn body_step(&self) -> usize {
        self.step_count()
    }
}

impl SlideDeck {
    pub fn new(settings: PresentationSettings, slides: Vec<Slide>) -> Self {
        Self { settings, slides }
    }

    /// Parse a provider document. Anything missing a required field is
    /// rejected as a whole; unknown slide types are kept for the placeholder.
    pub fn from_json(text: &str) -> Result<Self, PresentationError> {
        let raw: RawDeck = serde_json::from_str(text)
            .map_err(|e| PresentationError::MalformedDeck(e.to_string()))?;
        let settings = PresentationSettings::from_raw(raw.settings);

        let mut slides: Vec<Slide> = raw
            .slides
            .into_iter()
            .filter(|s| s.enabled && !settings.disabled_types.contains(&s.type_tag))
            .map(|s| Slide {
                kind: SlideKind::from_tag(&s.type_tag),
                type_tag: s.type_tag,
                items: s.items,
                fields: s.fields,
            })
            .collect();

        if !settings.order.is_empty() {
            let rank = |tag: &str| {
                settings
                    .order
                    .iter()
                    .position(|t| t == tag)
                    .unwrap_or(settings.order.len())
            };
            slides.sort_by_key(|s| rank(&s.type_tag));
        }

        Ok(Self { settings, slides })
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn unknown_tags(&self) -> Vec<&str> {
        self.slides
            .iter()
            .filter(|s| !s.is_known())
            .map(|s| s.type_tag.as_str())
            .collect()
    }

    /// Sum of every slide's nominal duration.
    pub fn cycle_duration(&self) -> Duration {
        self.slides
            .iter()
            .map(|s| self.settings.duration_for(&s.type_tag))
            .sum()
    }
}
