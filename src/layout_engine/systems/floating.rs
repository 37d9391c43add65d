use crate::layout_engine::LayoutParams;
use crate::layout_engine::systems::LayoutSystem;
use crate::sys::geometry::Rect;

/// No arrangement: clients keep whatever geometry they already have.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatingLayoutSystem;

impl LayoutSystem for FloatingLayoutSystem {
    fn arrange(&self, _area: Rect, windows: &[Rect], _params: &LayoutParams) -> Vec<Rect> {
        windows.to_vec()
    }

    fn uses_gaps(&self) -> bool { false }
}
