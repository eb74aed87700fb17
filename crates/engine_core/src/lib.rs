//! Shared frame timing.

pub mod time;

pub use time::*;
