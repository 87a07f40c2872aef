//! The watchdog's three monitors.
//!
//! Each monitor owns its state and turns one observation plus the current
//! time into a decision. The engine performs the I/O; monitors never do.

pub mod internet;
pub mod version;
pub mod wifi;

pub use internet::{InternetDecision, InternetMonitor, InternetMonitorState};
pub use version::{VersionDecision, VersionMonitor, VersionMonitorState};
pub use wifi::{WifiDecision, WifiMonitor, WifiMonitorState};
