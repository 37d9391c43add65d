use crate::layout_engine::LayoutParams;
use crate::layout_engine::systems::LayoutSystem;
use crate::sys::geometry::Rect;

/// Every client covers the whole area; only the top of the stack is seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonocleLayoutSystem;

impl LayoutSystem for MonocleLayoutSystem {
    fn arrange(&self, area: Rect, windows: &[Rect], _params: &LayoutParams) -> Vec<Rect> {
        vec![area; windows.len()]
    }
}
