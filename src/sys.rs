pub mod bridge;
pub mod geometry;
pub mod hotkey;
pub mod process;
pub mod signal;
