//! Sampling of the foreground window. [resolver::WindowIdentityResolver] turns platform queries
//! into identities, [session::FocusSession] attributes elapsed time between samples and
//! [collector::FocusSampler] drives both on a fixed cadence.

pub mod collector;
pub mod resolver;
pub mod session;
