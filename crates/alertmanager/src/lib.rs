//! Alertmanager Integration
//!
//! Outbound side of the bridge: locates the silences endpoint of the
//! Alertmanager that raised an alert and posts silences to it.

mod client;
mod error;
mod target;

pub use client::{AlertmanagerClient, SilenceSink};
pub use error::AlertmanagerError;
pub use target::{silences_endpoint, SILENCES_PATH};
