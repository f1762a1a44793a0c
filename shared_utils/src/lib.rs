//! Small helpers shared by the history loader and the analytics crate.

pub mod calendar;
pub mod clock;
pub mod env;
