//! Fibonacci family of layouts.
//!
//! Both variants recurse over the client list, halving the remaining area at
//! every step and alternating the split axis (side by side first). The first
//! split uses the master fraction, later splits use [`HALVING_FRACTION`].
//!
//! - `Dwindle` always hands the client the left/top piece, so the rectangles
//!   shrink toward the bottom-right corner.
//! - `Spiral` rotates which piece the client takes (left, top, right, bottom)
//!   so the remainder winds inward.

use crate::layout_engine::LayoutParams;
use crate::layout_engine::systems::LayoutSystem;
use crate::sys::geometry::Rect;

const HALVING_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FibonacciMode {
    Spiral,
    Dwindle,
}

#[derive(Debug, Clone, Copy)]
pub struct FibonacciLayoutSystem {
    mode: FibonacciMode,
}

impl FibonacciLayoutSystem {
    pub fn new(mode: FibonacciMode) -> Self { Self { mode } }

    fn split(
        &self,
        area: Rect,
        depth: usize,
        remaining: usize,
        params: &LayoutParams,
        out: &mut Vec<Rect>,
    ) {
        if remaining == 1 {
            out.push(area);
            return;
        }

        let fraction = if depth == 0 {
            params.master_fraction
        } else {
            HALVING_FRACTION
        };
        let (first, second) = if depth % 2 == 0 {
            split_horizontally(area, fraction)
        } else {
            split_vertically(area, fraction)
        };
        let (client, rest) = match self.mode {
            FibonacciMode::Dwindle => (first, second),
            FibonacciMode::Spiral if depth % 4 < 2 => (first, second),
            FibonacciMode::Spiral => (second, first),
        };

        out.push(client);
        self.split(rest, depth + 1, remaining - 1, params, out);
    }
}

/// Side-by-side split; the left piece gets `fraction` of the width.
fn split_horizontally(area: Rect, fraction: f64) -> (Rect, Rect) {
    let left = (f64::from(area.width) * fraction) as i32;
    (
        Rect::new(area.x, area.y, left, area.height),
        Rect::new(area.x + left, area.y, area.width - left, area.height),
    )
}

/// Stacked split; the top piece gets `fraction` of the height.
fn split_vertically(area: Rect, fraction: f64) -> (Rect, Rect) {
    let top = (f64::from(area.height) * fraction) as i32;
    (
        Rect::new(area.x, area.y, area.width, top),
        Rect::new(area.x, area.y + top, area.width, area.height - top),
    )
}

impl LayoutSystem for FibonacciLayoutSystem {
    fn arrange(&self, area: Rect, windows: &[Rect], params: &LayoutParams) -> Vec<Rect> {
        let mut out = Vec::with_capacity(windows.len());
        if !windows.is_empty() {
            self.split(area, 0, windows.len(), params, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: LayoutParams = LayoutParams {
        master_fraction: 0.5,
        master_count: 1,
    };

    #[test]
    fn dwindle_shrinks_toward_bottom_right() {
        let area = Rect::new(0, 0, 800, 800);
        let rects = FibonacciLayoutSystem::new(FibonacciMode::Dwindle)
            .arrange(area, &[Rect::default(); 4], &PARAMS);
        assert_eq!(rects, vec![
            Rect::new(0, 0, 400, 800),
            Rect::new(400, 0, 400, 400),
            Rect::new(400, 400, 200, 400),
            Rect::new(600, 400, 200, 400),
        ]);
    }

    #[test]
    fn spiral_winds_inward() {
        let area = Rect::new(0, 0, 800, 800);
        let rects = FibonacciLayoutSystem::new(FibonacciMode::Spiral)
            .arrange(area, &[Rect::default(); 5], &PARAMS);
        assert_eq!(rects, vec![
            Rect::new(0, 0, 400, 800),
            Rect::new(400, 0, 400, 400),
            Rect::new(600, 400, 200, 400),
            Rect::new(400, 600, 200, 200),
            Rect::new(400, 400, 200, 200),
        ]);
    }

    #[test]
    fn first_split_uses_master_fraction() {
        let area = Rect::new(0, 0, 1000, 500);
        let params = LayoutParams {
            master_fraction: 0.7,
            master_count: 1,
        };
        let rects = FibonacciLayoutSystem::new(FibonacciMode::Dwindle)
            .arrange(area, &[Rect::default(); 2], &params);
        assert_eq!(rects, vec![Rect::new(0, 0, 700, 500), Rect::new(700, 0, 300, 500)]);
    }
}
