//! Supervisory daemons for a single-board home-automation appliance.
//!
//! The `boxwatch` binary runs [`engine::WatchdogEngine`]; the `boxwatch-leds`
//! workspace member reuses [`ping`] to drive status LEDs.

pub mod config;
pub mod engine;
pub mod monitors;
pub mod ping;
pub mod store;
pub mod supervisor;
