//! A tag-based tiling window manager core and its status-bar block scheduler.
//!
//! The window manager never talks to a display server itself: a bridge
//! process feeds it events as JSON lines and executes the requests it writes
//! back (see [`sys::bridge`]).

pub mod actor;
pub mod common;
pub mod layout_engine;
pub mod model;
pub mod sys;
