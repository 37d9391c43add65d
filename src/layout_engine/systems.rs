use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::layout_engine::LayoutParams;
use crate::sys::geometry::Rect;

/// A pure arrangement algorithm.
///
/// `windows` holds the current geometry of every arrangeable client in tiling
/// order; the result has exactly one rectangle per entry, in the same order.
/// Rectangles are outer rectangles (border included) before gaps are applied.
#[enum_dispatch]
pub trait LayoutSystem {
    fn arrange(&self, area: Rect, windows: &[Rect], params: &LayoutParams) -> Vec<Rect>;

    fn uses_gaps(&self) -> bool { true }
}

#[enum_dispatch(LayoutSystem)]
#[derive(Debug, Clone, Copy)]
pub enum LayoutSystemKind {
    Monocle(MonocleLayoutSystem),
    Tile(TileLayoutSystem),
    Fibonacci(FibonacciLayoutSystem),
    Floating(FloatingLayoutSystem),
}

#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum_macros::EnumString,
    strum_macros::Display,
    strum_macros::VariantNames
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LayoutKind {
    #[default]
    Monocle,
    Tile,
    Spiral,
    Dwindle,
    Floating,
}

impl LayoutKind {
    pub fn system(self) -> LayoutSystemKind {
        match self {
            LayoutKind::Monocle => MonocleLayoutSystem.into(),
            LayoutKind::Tile => TileLayoutSystem.into(),
            LayoutKind::Spiral => FibonacciLayoutSystem::new(FibonacciMode::Spiral).into(),
            LayoutKind::Dwindle => FibonacciLayoutSystem::new(FibonacciMode::Dwindle).into(),
            LayoutKind::Floating => FloatingLayoutSystem.into(),
        }
    }

    pub fn is_floating(self) -> bool { self == LayoutKind::Floating }

    pub fn default_symbol(self) -> &'static str {
        match self {
            LayoutKind::Monocle => "[M]",
            LayoutKind::Tile => "[]=",
            LayoutKind::Spiral => "[@]",
            LayoutKind::Dwindle => "[\\]",
            LayoutKind::Floating => "><>",
        }
    }
}

mod dwindle;
mod floating;
mod monocle;
mod tile;

pub use dwindle::{FibonacciLayoutSystem, FibonacciMode};
pub use floating::FloatingLayoutSystem;
pub use monocle::MonocleLayoutSystem;
pub use tile::TileLayoutSystem;
