//! Dispatcher Error Types

use alertmanager::AlertmanagerError;
use pagerduty::PagerDutyError;
use thiserror::Error;

/// Failure of one event; terminal for that event, never retried
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Signature missing or not matching the shared secret
    #[error("Webhook verification failed: {0}")]
    Verification(#[source] PagerDutyError),

    /// Body is not a webhook envelope
    #[error("Invalid webhook payload: {0}")]
    Decode(#[source] PagerDutyError),

    /// Incident record unavailable or incomplete
    #[error("Error fetching event details: {0}")]
    Incident(#[source] PagerDutyError),

    /// Narrative carried no `Labels:` block with usable labels
    #[error("No labels found in firing details for incident {0}")]
    NoLabels(String),

    /// `client_url` does not lead to an Alertmanager
    #[error("Error deriving Alertmanager address for incident {incident_id}: {source}")]
    Target {
        incident_id: String,
        #[source]
        source: AlertmanagerError,
    },

    /// Alertmanager refused the silence or could not be reached
    #[error("Error sending silence for incident {incident_id}: {source}")]
    Submit {
        incident_id: String,
        #[source]
        source: AlertmanagerError,
    },
}

impl PipelineError {
    /// Pipeline stage the event failed at
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Verification(_) => "verify",
            Self::Decode(_) => "decode",
            Self::Incident(_) => "details",
            Self::NoLabels(_) => "labels",
            Self::Target { .. } => "target",
            Self::Submit { .. } => "submit",
        }
    }
}

/// Reasons an event could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Event queue is full")]
    QueueFull,

    #[error("Event dispatcher has stopped")]
    Closed,
}
