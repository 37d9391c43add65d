use pretty_assertions::assert_eq;

use crate::layout_engine::{
    GapValues, Gaps, LayoutKind, LayoutParams, LayoutRequest, calculate_layout,
};
use crate::sys::geometry::Rect;

const TILED_KINDS: [LayoutKind; 4] = [
    LayoutKind::Monocle,
    LayoutKind::Tile,
    LayoutKind::Spiral,
    LayoutKind::Dwindle,
];

fn screen() -> Rect { Rect::new(0, 0, 1000, 2000) }

fn params() -> LayoutParams {
    LayoutParams {
        master_fraction: 0.55,
        master_count: 1,
    }
}

fn layout(kind: LayoutKind, area: Rect, n: usize, params: LayoutParams, gaps: Gaps) -> Vec<Rect> {
    let windows = vec![Rect::new(10, 10, 300, 200); n];
    calculate_layout(&LayoutRequest {
        kind,
        area,
        windows: &windows,
        params,
        gaps,
    })
}

fn assert_well_formed(kind: LayoutKind, area: Rect, n: usize, rects: &[Rect]) {
    assert_eq!(rects.len(), n, "{kind} with {n} windows");
    for rect in rects {
        assert!(area.contains_rect(*rect), "{kind}: {rect:?} escapes {area:?}");
    }
    if kind == LayoutKind::Monocle {
        assert!(rects.windows(2).all(|w| w[0] == w[1]), "monocle rects must coincide");
        return;
    }
    for (i, a) in rects.iter().enumerate() {
        for b in &rects[i + 1..] {
            assert!(!a.overlaps(b), "{kind} with {n} windows: {a:?} overlaps {b:?}");
        }
    }
}

mod properties {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn every_layout_returns_one_rect_per_window_inside_the_area() {
        for kind in TILED_KINDS {
            for n in 1..=12 {
                let rects = layout(kind, screen(), n, params(), Gaps::none());
                assert_well_formed(kind, screen(), n, &rects);
            }
        }
    }

    #[test]
    fn properties_hold_on_offset_areas() {
        let area = Rect::new(1920, 24, 1280, 776);
        for kind in TILED_KINDS {
            for n in 1..=8 {
                for master_count in 0..=3 {
                    let params = LayoutParams {
                        master_fraction: 0.3,
                        master_count,
                    };
                    let rects = layout(kind, area, n, params, Gaps::none());
                    assert_well_formed(kind, area, n, &rects);
                }
            }
        }
    }

    #[test]
    fn properties_hold_with_gaps() {
        let gaps = Gaps {
            values: GapValues {
                inner_horizontal: 10,
                inner_vertical: 6,
                outer_horizontal: 12,
                outer_vertical: 8,
            },
            smart: true,
        };
        for kind in TILED_KINDS {
            for n in 1..=8 {
                let rects = layout(kind, screen(), n, params(), gaps);
                assert_well_formed(kind, screen(), n, &rects);
            }
        }
    }

    #[test]
    fn tiled_layouts_cover_the_area_without_gaps() {
        for kind in [LayoutKind::Tile, LayoutKind::Spiral, LayoutKind::Dwindle] {
            for n in 1..=10 {
                let rects = layout(kind, screen(), n, params(), Gaps::none());
                let covered: i64 = rects.iter().map(Rect::area).sum();
                assert_eq!(covered, screen().area(), "{kind} with {n} windows");
            }
        }
    }

    #[test]
    fn layout_is_idempotent() {
        for kind in TILED_KINDS {
            let first = layout(kind, screen(), 5, params(), Gaps::none());
            let second = layout(kind, screen(), 5, params(), Gaps::none());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn zero_windows_produce_no_rects() {
        for kind in TILED_KINDS.into_iter().chain([LayoutKind::Floating]) {
            assert!(layout(kind, screen(), 0, params(), Gaps::none()).is_empty());
        }
    }
}

mod scenarios {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn tile_with_one_master_and_two_stacked() {
        let rects = layout(LayoutKind::Tile, screen(), 3, params(), Gaps::none());
        assert_eq!(rects, vec![
            Rect::new(0, 0, 550, 2000),
            Rect::new(550, 0, 450, 1000),
            Rect::new(550, 1000, 450, 1000),
        ]);
    }

    #[test]
    fn monocle_rects_equal_the_usable_area() {
        let area = Rect::new(0, 20, 1280, 780);
        for n in 1..=6 {
            let rects = layout(LayoutKind::Monocle, area, n, params(), Gaps::none());
            assert!(rects.iter().all(|r| *r == area));
        }
    }

    #[test]
    fn floating_keeps_current_geometry_and_ignores_gaps() {
        let windows = [Rect::new(5, 5, 100, 100), Rect::new(400, 300, 50, 60)];
        let rects = calculate_layout(&LayoutRequest {
            kind: LayoutKind::Floating,
            area: screen(),
            windows: &windows,
            params: params(),
            gaps: Gaps {
                values: GapValues::uniform(20),
                smart: false,
            },
        });
        assert_eq!(rects, windows.to_vec());
    }

    #[test]
    fn tile_with_gaps_leaves_exact_spacing() {
        let gaps = Gaps {
            values: GapValues::uniform(10),
            smart: false,
        };
        let rects = layout(LayoutKind::Tile, screen(), 3, params(), gaps);
        assert_eq!(rects, vec![
            Rect::new(10, 10, 535, 1980),
            Rect::new(555, 10, 435, 985),
            Rect::new(555, 1005, 435, 985),
        ]);
    }

    #[test]
    fn smart_gaps_only_apply_to_a_single_client() {
        let gaps = Gaps {
            values: GapValues::uniform(10),
            smart: true,
        };
        let single = layout(LayoutKind::Tile, screen(), 1, params(), gaps);
        assert_eq!(single, vec![screen()]);

        let pair = layout(LayoutKind::Tile, screen(), 2, params(), gaps);
        assert_eq!(pair[0].x, 10);
    }
}
