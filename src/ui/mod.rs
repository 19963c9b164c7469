//! Terminal UI utilities

pub mod menu;

pub use menu::*;
