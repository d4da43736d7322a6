use std::time::{Duration, Instant};

use eframe::egui;

/// Items per page while the container has not been laid out yet.
pub const FALLBACK_ITEMS_PER_PAGE: usize = 10;
/// How long a new container size must hold before it is measured against.
pub const RESIZE_SETTLE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub columns: usize,
    pub rows: usize,
}

impl Grid {
    pub fn capacity(&self) -> usize {
        (self.columns * self.rows).max(1)
    }
}

/// Answers "how many fixed-size items fit in this container".
///
/// The shell uses the real rendered geometry; tests hand in synthetic sizes.
pub trait CapacityProvider {
    /// `None` while the container has no usable bounds.
    fn grid(&self, container: egui::Vec2, item: egui::Vec2, gap: f32) -> Option<Grid>;
}

/// Uniform grid of `item`-sized cells separated by `gap`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridCapacity;

impl CapacityProvider for GridCapacity {
    fn grid(&self, container: egui::Vec2, item: egui::Vec2, gap: f32) -> Option<Grid> {
        if !(container.x > 0.0 && container.y > 0.0) {
            return None;
        }
        let gap = gap.max(0.0);
        let fit = |space: f32, extent: f32| -> usize {
            let stride = extent.max(1.0) + gap;
            (((space + gap) / stride).floor() as usize).max(1)
        };
        Some(Grid {
            columns: fit(container.x, item.x),
            rows: fit(container.y, item.y),
        })
    }
}

/// One-shot measurement with the fallback applied.
pub fn measure(container: egui::Vec2, item: egui::Vec2, gap: f32) -> usize {
    GridCapacity
        .grid(container, item, gap)
        .map(|g| g.capacity())
        .unwrap_or(FALLBACK_ITEMS_PER_PAGE)
}

/// Spread `item_count` evenly over the fewest pages that respect `capacity`.
///
/// 11 items with room for 10 become pages of 6 and 5 rather than 10 and 1.
pub fn balanced_page_size(item_count: usize, capacity: usize) -> usize {
    let capacity = capacity.max(1);
    if item_count <= capacity {
        return capacity;
    }
    let pages = item_count.div_ceil(capacity);
    item_count.div_ceil(pages)
}

/// Tracks a container's observed size and derives items-per-page from it.
pub struct CapacityMeasurer<P: CapacityProvider = GridCapacity> {
    provider: P,
    item: egui::Vec2,
    gap: f32,
    committed: Option<egui::Vec2>,
    pending: Option<(egui::Vec2, Instant)>,
    item_count: usize,
    grid: Option<Grid>,
    items_per_page: usize,
}

impl CapacityMeasurer<GridCapacity> {
    pub fn new(item: egui::Vec2, gap: f32) -> Self {
        Self::with_provider(GridCapacity, item, gap)
    }
}

impl<P: CapacityProvider> CapacityMeasurer<P> {
    pub fn with_provider(provider: P, item: egui::Vec2, gap: f32) -> Self {
        Self {
            provider,
            item,
            gap,
            committed: None,
            pending: None,
            item_count: 0,
            grid: None,
            items_per_page: FALLBACK_ITEMS_PER_PAGE,
        }
    }

    /// Record the container size seen this frame. The first real size is
    /// taken immediately; later changes wait for [`RESIZE_SETTLE`].
    /// Returns true when items-per-page changed.
    pub fn observe(&mut self, container: egui::Vec2, now: Instant) -> bool {
        match self.committed {
            None if container.x > 0.0 && container.y > 0.0 => {
                self.pending = None;
                self.committed = Some(container);
                self.recompute()
            }
            None => false,
            Some(current) if same_size(current, container) => {
                self.pending = None;
                false
            }
            Some(_) => {
                match self.pending {
                    Some((size, _)) if same_size(size, container) => {}
                    _ => self.pending = Some((container, now)),
                }
                false
            }
        }
    }

    /// Commit a pending size once it has settled.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some((size, since)) = self.pending else {
            return false;
        };
        if now.saturating_duration_since(since) < RESIZE_SETTLE {
            return false;
        }
        self.pending = None;
        self.committed = Some(size);
        tracing::debug!("container settled at {:.0}x{:.0}", size.x, size.y);
        self.recompute()
    }

    pub fn set_item_count(&mut self, count: usize) -> bool {
        if count == self.item_count {
            return false;
        }
        self.item_count = count;
        self.recompute()
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn grid(&self) -> Option<Grid> {
        self.grid
    }

    /// When a pending resize will be committed, if one is waiting.
    pub fn settles_at(&self) -> Option<Instant> {
        self.pending.map(|(_, since)| since + RESIZE_SETTLE)
    }

    fn recompute(&mut self) -> bool {
        self.grid = self
            .committed
            .and_then(|c| self.provider.grid(c, self.item, self.gap));
        let capacity = self
            .grid
            .map(|g| g.capacity())
            .unwrap_or(FALLBACK_ITEMS_PER_PAGE);
        let next = balanced_page_size(self.item_count, capacity).max(1);
        let changed = next != self.items_per_page;
        self.items_per_page = next;
        changed
    }
}

fn same_size(a: egui::Vec2, b: egui::Vec2) -> bool {
    (a.x - b.x).abs() < 0.5 && (a.y - b.y).abs() < 0.5
}
