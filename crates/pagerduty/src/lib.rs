//! PagerDuty Integration
//!
//! Inbound side of the bridge: decodes signed v3 webhook deliveries and
//! looks up the alerts behind an incident through the REST API.

mod client;
mod error;
mod incident;
mod signature;
mod webhook;

pub use client::{IncidentSource, PagerDutyClient, DEFAULT_API_URL};
pub use error::PagerDutyError;
pub use incident::{AlertDetails, IncidentAlert, IncidentAlerts};
pub use signature::{sign, verify_signature, SIGNATURE_HEADER};
pub use webhook::{EventData, EventKind, WebhookEnvelope, WebhookEvent};
