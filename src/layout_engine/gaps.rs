use serde::{Deserialize, Serialize};

use crate::sys::geometry::Rect;

/// Gap sizes in pixels.
///
/// `*_vertical` gaps run along vertical lines: between side-by-side clients
/// (inner) and at the left/right screen edges (outer). `*_horizontal` gaps run
/// along horizontal lines: between stacked clients and at the top/bottom edges.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct GapValues {
    #[serde(default)]
    pub inner_horizontal: i32,
    #[serde(default)]
    pub inner_vertical: i32,
    #[serde(default)]
    pub outer_horizontal: i32,
    #[serde(default)]
    pub outer_vertical: i32,
}

impl GapValues {
    pub const ZERO: GapValues = GapValues {
        inner_horizontal: 0,
        inner_vertical: 0,
        outer_horizontal: 0,
        outer_vertical: 0,
    };

    pub fn is_zero(&self) -> bool { *self == Self::ZERO }

    pub fn uniform(px: i32) -> Self {
        GapValues {
            inner_horizontal: px,
            inner_vertical: px,
            outer_horizontal: px,
            outer_vertical: px,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gaps {
    pub values: GapValues,
    /// Drop the outer gaps when exactly one client is arranged.
    pub smart: bool,
}

impl Gaps {
    pub fn none() -> Self { Self::default() }
}

/// Deflates every rectangle: sides on the edge of `area` lose the outer gap,
/// interior sides lose half of the inner gap. The two halves of one seam always
/// sum to the full inner gap.
pub(crate) fn apply_gaps(area: Rect, rects: &mut [Rect], gaps: &Gaps) {
    let GapValues {
        inner_horizontal: ih,
        inner_vertical: iv,
        mut outer_horizontal,
        mut outer_vertical,
    } = gaps.values;
    if gaps.smart && rects.len() == 1 {
        outer_horizontal = 0;
        outer_vertical = 0;
    }

    for rect in rects.iter_mut() {
        let left = if rect.x == area.x { outer_vertical } else { iv - iv / 2 };
        let right = if rect.max_x() == area.max_x() { outer_vertical } else { iv / 2 };
        let top = if rect.y == area.y { outer_horizontal } else { ih - ih / 2 };
        let bottom = if rect.max_y() == area.max_y() { outer_horizontal } else { ih / 2 };
        *rect = rect.inset(left, top, right, bottom);
    }
}
