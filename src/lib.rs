//! Small agent that measures how long each application window holds focus.
//! Totals and first-seen times are kept in memory and exported as tables on a fixed interval and
//! on shutdown.
//!

pub mod cli;
pub mod daemon;
pub mod utils;
pub mod window_api;
