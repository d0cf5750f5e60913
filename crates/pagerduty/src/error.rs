//! PagerDuty Error Types

use thiserror::Error;

/// Errors raised while handling PagerDuty webhooks and incident records
#[derive(Debug, Error)]
pub enum PagerDutyError {
    /// Signature header absent from the delivery
    #[error("Missing {0} header")]
    MissingSignature(&'static str),

    /// Signature header present but without any `v1=` entry
    #[error("Malformed signature header: {0}")]
    MalformedSignature(String),

    /// None of the signatures matched the payload
    #[error("No valid signature found for webhook payload")]
    InvalidSignature,

    /// Payload is not a v3 webhook envelope
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// Acknowledgment event without `data.id`
    #[error("Webhook event {0} carries no incident id")]
    MissingIncidentId(String),

    #[error("No alerts associated with incident {0}")]
    NoAlerts(String),

    #[error("Alert body is empty for incident {0}")]
    EmptyBody(String),

    #[error("Failed to parse details for incident {0}")]
    MissingDetails(String),

    #[error("Failed to find firing details for incident {0}")]
    MissingFiring(String),

    #[error("Failed to parse cef_details for incident {0}")]
    MissingCefDetails(String),

    #[error("Failed to find client_url for incident {0}")]
    MissingClientUrl(String),

    /// API base URL cannot carry an incident path
    #[error("Invalid PagerDuty API URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Transport failure talking to the REST API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// REST API answered with a non-success status
    #[error("PagerDuty API returned status {status}: {body}")]
    Api { status: u16, body: String },
}

impl PagerDutyError {
    /// Whether the error comes from the incident record rather than transport
    pub fn is_upstream_data(&self) -> bool {
        matches!(
            self,
            Self::MissingIncidentId(_)
                | Self::NoAlerts(_)
                | Self::EmptyBody(_)
                | Self::MissingDetails(_)
                | Self::MissingFiring(_)
                | Self::MissingCefDetails(_)
                | Self::MissingClientUrl(_)
        )
    }
}
