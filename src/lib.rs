//! Library crate for port-sweep: a concurrent TCP connect scan engine plus
//! the banner, liveness, reporting and web collaborators built around it.
pub mod banner;
pub mod error;
pub mod history;
pub mod ports;
pub mod probe;
pub mod progress;
pub mod report;
pub mod runner;
pub mod scanner;
pub mod server;
pub mod services;
pub mod targets;
pub mod types;

pub use error::ScanError;
pub use scanner::{scan, scan_with};
pub use types::{ProbeOutcome, ScanConfig, ScanResult, ScanStatus};
