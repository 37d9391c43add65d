pub mod command;
pub mod input;
pub mod window;
