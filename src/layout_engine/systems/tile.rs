use crate::layout_engine::LayoutParams;
use crate::layout_engine::systems::LayoutSystem;
use crate::sys::geometry::Rect;

/// Master column on the left, stack column on the right.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileLayoutSystem;

impl TileLayoutSystem {
    fn master_width(area: Rect, n: usize, nmaster: usize, fraction: f64) -> i32 {
        if nmaster == 0 {
            0
        } else if n > nmaster {
            (f64::from(area.width) * fraction) as i32
        } else {
            area.width
        }
    }
}

/// Splits `column` vertically into `count` rows. Integer remainders go to the
/// lower rows so the column is always covered exactly.
fn stack_rows(column: Rect, count: usize, out: &mut Vec<Rect>) {
    let mut used = 0;
    for i in 0..count {
        let remaining = (count - i) as i32;
        let height = (column.height - used) / remaining;
        out.push(Rect::new(column.x, column.y + used, column.width, height));
        used += height;
    }
}

impl LayoutSystem for TileLayoutSystem {
    fn arrange(&self, area: Rect, windows: &[Rect], params: &LayoutParams) -> Vec<Rect> {
        let n = windows.len();
        if n == 0 {
            return Vec::new();
        }
        let nmaster = params.master_count.min(n);
        let mw = Self::master_width(area, n, nmaster, params.master_fraction);

        let mut out = Vec::with_capacity(n);
        stack_rows(Rect::new(area.x, area.y, mw, area.height), nmaster, &mut out);
        stack_rows(
            Rect::new(area.x + mw, area.y, area.width - mw, area.height),
            n - nmaster,
            &mut out,
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(master_fraction: f64, master_count: usize) -> LayoutParams {
        LayoutParams { master_fraction, master_count }
    }

    #[test]
    fn single_window_takes_full_area() {
        let area = Rect::new(0, 0, 1000, 2000);
        let rects = TileLayoutSystem.arrange(area, &[Rect::default()], &params(0.55, 1));
        assert_eq!(rects, vec![area]);
    }

    #[test]
    fn zero_master_count_uses_stack_column_at_full_width() {
        let area = Rect::new(0, 0, 1000, 900);
        let rects = TileLayoutSystem.arrange(area, &[Rect::default(); 3], &params(0.55, 0));
        assert_eq!(rects, vec![
            Rect::new(0, 0, 1000, 300),
            Rect::new(0, 300, 1000, 300),
            Rect::new(0, 600, 1000, 300),
        ]);
    }

    #[test]
    fn all_masters_use_full_width() {
        let area = Rect::new(0, 0, 1000, 1000);
        let rects = TileLayoutSystem.arrange(area, &[Rect::default(); 2], &params(0.55, 3));
        assert_eq!(rects, vec![Rect::new(0, 0, 1000, 500), Rect::new(0, 500, 1000, 500)]);
    }

    #[test]
    fn uneven_heights_cover_the_column() {
        let area = Rect::new(0, 0, 100, 1000);
        let rects = TileLayoutSystem.arrange(area, &[Rect::default(); 4], &params(0.5, 1));
        let stack: Vec<_> = rects[1..].to_vec();
        assert_eq!(stack.iter().map(|r| r.height).sum::<i32>(), 1000);
        assert_eq!(stack.last().unwrap().max_y(), 1000);
    }
}
