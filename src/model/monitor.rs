use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout_engine::{GapValues, Gaps, LayoutKind, LayoutParams};
use crate::model::client::ClientId;
use crate::model::tags::TagMask;
use crate::sys::geometry::Rect;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct MonitorId(pub usize);

/// Initial per-monitor state, derived from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    /// Selected layout first, then the one `set_layout(None)` toggles to.
    pub layouts: [LayoutKind; 2],
    pub initial_tags: TagMask,
    pub master_fraction: f64,
    pub fraction_min: f64,
    pub fraction_max: f64,
    pub master_count: usize,
    pub gaps: GapValues,
    pub smart_gaps: bool,
    pub show_bar: bool,
    pub top_bar: bool,
    pub bar_height: i32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            layouts: [LayoutKind::Monocle, LayoutKind::Tile],
            initial_tags: TagMask::single(0),
            master_fraction: 0.55,
            fraction_min: 0.05,
            fraction_max: 0.95,
            master_count: 1,
            gaps: GapValues::ZERO,
            smart_gaps: false,
            show_bar: true,
            top_bar: true,
            bar_height: 0,
        }
    }
}

/// Gap values with on/off toggling.
///
/// `toggle` swaps between zero and the last non-zero values; `reset` returns
/// to the configured defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapState {
    current: GapValues,
    remembered: GapValues,
    defaults: GapValues,
    pub smart: bool,
}

impl GapState {
    pub fn new(defaults: GapValues, smart: bool) -> Self {
        Self {
            current: defaults,
            remembered: defaults,
            defaults,
            smart,
        }
    }

    pub fn values(&self) -> GapValues { self.current }

    pub fn enabled(&self) -> bool { !self.current.is_zero() }

    pub fn gaps(&self) -> Gaps {
        Gaps {
            values: self.current,
            smart: self.smart,
        }
    }

    fn set(&mut self, values: GapValues) {
        self.current = values;
        if !values.is_zero() {
            self.remembered = values;
        }
    }

    pub fn adjust(&mut self, delta: i32) {
        self.adjust_inner(delta);
        self.adjust_outer(delta);
    }

    pub fn adjust_inner(&mut self, delta: i32) {
        let mut v = self.current;
        v.inner_horizontal = (v.inner_horizontal + delta).max(0);
        v.inner_vertical = (v.inner_vertical + delta).max(0);
        self.set(v);
    }

    pub fn adjust_outer(&mut self, delta: i32) {
        let mut v = self.current;
        v.outer_horizontal = (v.outer_horizontal + delta).max(0);
        v.outer_vertical = (v.outer_vertical + delta).max(0);
        self.set(v);
    }

    pub fn reset(&mut self) {
        self.current = self.defaults;
        self.remembered = self.defaults;
    }

    pub fn toggle(&mut self) {
        if self.current.is_zero() {
            self.current = self.remembered;
        } else {
            self.remembered = self.current;
            self.current = GapValues::ZERO;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarState {
    pub show: bool,
    pub top: bool,
    pub height: i32,
}

#[derive(Debug, Clone)]
pub struct Monitor {
    pub id: MonitorId,
    screen: Rect,
    work_area: Rect,
    bar: BarState,
    tagset: [TagMask; 2],
    seltags: usize,
    layouts: [LayoutKind; 2],
    sellt: usize,
    master_fraction: f64,
    fraction_min: f64,
    fraction_max: f64,
    master_count: usize,
    pub gaps: GapState,
    pub selected: Option<ClientId>,
    pub layout_symbol: String,
}

impl Monitor {
    pub fn new(id: MonitorId, screen: Rect, settings: &MonitorSettings) -> Self {
        let (min, max) = if settings.fraction_min <= settings.fraction_max {
            (settings.fraction_min, settings.fraction_max)
        } else {
            (settings.fraction_max, settings.fraction_min)
        };
        let mut monitor = Monitor {
            id,
            screen,
            work_area: screen,
            bar: BarState {
                show: settings.show_bar,
                top: settings.top_bar,
                height: settings.bar_height.max(0),
            },
            tagset: [settings.initial_tags; 2],
            seltags: 0,
            layouts: settings.layouts,
            sellt: 0,
            master_fraction: settings.master_fraction.clamp(min, max),
            fraction_min: min,
            fraction_max: max,
            master_count: settings.master_count,
            gaps: GapState::new(settings.gaps, settings.smart_gaps),
            selected: None,
            layout_symbol: settings.layouts[0].default_symbol().to_string(),
        };
        monitor.update_work_area();
        monitor
    }

    pub fn screen(&self) -> Rect { self.screen }

    /// The screen minus the bar, when shown.
    pub fn work_area(&self) -> Rect { self.work_area }

    pub fn bar(&self) -> BarState { self.bar }

    /// Where the bar is drawn; empty when hidden.
    pub fn bar_rect(&self) -> Rect {
        if !self.bar.show {
            return Rect::new(self.screen.x, self.screen.y, self.screen.width, 0);
        }
        let y = if self.bar.top {
            self.screen.y
        } else {
            self.screen.max_y() - self.bar.height
        };
        Rect::new(self.screen.x, y, self.screen.width, self.bar.height)
    }

    pub fn set_screen(&mut self, screen: Rect) {
        self.screen = screen;
        self.update_work_area();
    }

    fn update_work_area(&mut self) {
        let h = if self.bar.show { self.bar.height.min(self.screen.height) } else { 0 };
        self.work_area = if self.bar.top {
            self.screen.inset(0, h, 0, 0)
        } else {
            self.screen.inset(0, 0, 0, h)
        };
    }

    pub fn toggle_bar(&mut self) {
        self.bar.show = !self.bar.show;
        self.update_work_area();
    }

    /// The viewed tags.
    pub fn tags(&self) -> TagMask { self.tagset[self.seltags] }

    pub fn previous_tags(&self) -> TagMask { self.tagset[self.seltags ^ 1] }

    /// Views `mask`, remembering the old mask. The empty mask swaps back to the
    /// previous one. Returns whether the viewed tags changed.
    pub fn view(&mut self, mask: TagMask) -> bool {
        if mask == self.tags() {
            return false;
        }
        self.seltags ^= 1;
        if !mask.is_empty() {
            self.tagset[self.seltags] = mask;
        }
        true
    }

    /// XORs `mask` into the viewed tags. Rejected when the result is empty.
    pub fn toggle_view(&mut self, mask: TagMask) -> bool {
        let new = self.tags() ^ mask;
        if new.is_empty() || mask.is_empty() {
            debug!(monitor = ?self.id, "Refusing to view no tags");
            return false;
        }
        self.tagset[self.seltags] = new;
        true
    }

    pub fn layout(&self) -> LayoutKind { self.layouts[self.sellt] }

    /// `None` toggles to the previous layout. Selecting the current layout
    /// keeps the history as it is.
    pub fn set_layout(&mut self, layout: Option<LayoutKind>) -> bool {
        let before = self.layout();
        if layout != Some(before) {
            self.sellt ^= 1;
        }
        if let Some(layout) = layout {
            self.layouts[self.sellt] = layout;
        }
        self.layout() != before
    }

    pub fn master_fraction(&self) -> f64 { self.master_fraction }

    /// Values below 1.0 are deltas; values of 1.0 and above set the fraction
    /// to `value - 1.0`. The result is clamped into the configured bounds.
    /// Ignored on the floating layout.
    pub fn set_master_fraction(&mut self, value: f64) -> bool {
        if self.layout().is_floating() || !value.is_finite() {
            return false;
        }
        let target = if value < 1.0 {
            self.master_fraction + value
        } else {
            value - 1.0
        };
        let clamped = target.clamp(self.fraction_min, self.fraction_max);
        let changed = clamped != self.master_fraction;
        self.master_fraction = clamped;
        changed
    }

    pub fn master_count(&self) -> usize { self.master_count }

    pub fn set_master_count(&mut self, delta: i32) -> bool {
        let next = (self.master_count as i64 + i64::from(delta)).max(0) as usize;
        let changed = next != self.master_count;
        self.master_count = next;
        changed
    }

    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            master_fraction: self.master_fraction,
            master_count: self.master_count,
        }
    }
}
