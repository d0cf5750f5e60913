//! Webhook Envelope

use serde::{Deserialize, Serialize};

use crate::error::PagerDutyError;

/// Kind of a webhook event
///
/// Only the kinds the bridge reacts to are named; everything else is kept
/// verbatim as `Unhandled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// `incident.acknowledged`
    IncidentAcknowledged,
    /// `pagey.ping`
    Ping,
    /// Any other event type
    Unhandled(String),
}

impl EventKind {
    /// Wire name of the event type
    pub fn as_str(&self) -> &str {
        match self {
            Self::IncidentAcknowledged => "incident.acknowledged",
            Self::Ping => "pagey.ping",
            Self::Unhandled(other) => other,
        }
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "incident.acknowledged" => Self::IncidentAcknowledged,
            "pagey.ping" => Self::Ping,
            _ => Self::Unhandled(value),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Unhandled(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource the event refers to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    /// Incident identifier for incident events
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
}

/// Single webhook event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: EventKind,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub data: EventData,
}

/// Top-level v3 webhook payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    pub event: WebhookEvent,
}

impl WebhookEnvelope {
    /// Decode a raw webhook body
    pub fn decode(body: &[u8]) -> Result<Self, PagerDutyError> {
        Ok(serde_json::from_slice(body)?)
    }
}
