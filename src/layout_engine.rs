pub mod engine;
mod gaps;
pub mod systems;

pub use engine::{LayoutParams, LayoutRequest, calculate_layout};
pub use gaps::{GapValues, Gaps};
pub use systems::{
    FibonacciLayoutSystem, FibonacciMode, FloatingLayoutSystem, LayoutKind, LayoutSystem,
    LayoutSystemKind, MonocleLayoutSystem, TileLayoutSystem,
};

#[cfg(test)]
mod tests;
