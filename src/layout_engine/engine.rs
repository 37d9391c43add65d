use tracing::trace;

use super::LayoutSystem;
use super::gaps::{Gaps, apply_gaps};
use crate::layout_engine::LayoutKind;
use crate::sys::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// Share of the area given to the master column or first split.
    pub master_fraction: f64,
    pub master_count: usize,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            master_fraction: 0.55,
            master_count: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutRequest<'a> {
    pub kind: LayoutKind,
    /// Usable area of the monitor (bar already removed).
    pub area: Rect,
    /// Current geometry of every arrangeable client, in tiling order.
    pub windows: &'a [Rect],
    pub params: LayoutParams,
    pub gaps: Gaps,
}

/// Maps the arrangeable clients of one monitor to outer rectangles.
///
/// The result has one rectangle per entry of `request.windows`, in the same
/// order, and depends only on the request. Callers are responsible for keeping
/// `master_fraction` inside its configured bounds.
pub fn calculate_layout(request: &LayoutRequest<'_>) -> Vec<Rect> {
    if request.windows.is_empty() {
        return Vec::new();
    }

    let system = request.kind.system();
    let mut rects = system.arrange(request.area, request.windows, &request.params);
    debug_assert_eq!(rects.len(), request.windows.len());
    if system.uses_gaps() {
        apply_gaps(request.area, &mut rects, &request.gaps);
    }
    trace!(kind = %request.kind, count = rects.len(), "calculated layout");
    rects
}
