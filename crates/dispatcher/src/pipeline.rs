//! Event Pipeline

use alertmanager::{silences_endpoint, SilenceSink};
use pagerduty::{verify_signature, EventKind, IncidentSource, PagerDutyError, WebhookEnvelope};
use silencing::{extract_labels, Silence};
use tracing::{debug, info};

use crate::error::PipelineError;

/// Webhook delivery as accepted by the HTTP handler
///
/// Owns its copy of the body so it can outlive the request.
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    /// Raw request body, exactly as signed
    pub body: Vec<u8>,
    /// Value of the `X-PagerDuty-Signature` header, if any
    pub signature: Option<String>,
}

impl RawEvent {
    /// Create a raw event
    pub fn new(body: impl Into<Vec<u8>>, signature: Option<String>) -> Self {
        Self {
            body: body.into(),
            signature,
        }
    }
}

/// Terminal state of a successfully processed event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A silence was created for an acknowledged incident
    Silenced {
        incident_id: String,
        endpoint: String,
        matchers: usize,
        silence_id: Option<String>,
    },
    /// `pagey.ping` test delivery
    Ping,
    /// Event type the bridge does not act on
    Unhandled(String),
}

/// Bridge pipeline over an incident source and a silence sink
pub struct Pipeline<I, S> {
    secret: String,
    incidents: I,
    sink: S,
}

impl<I: IncidentSource, S: SilenceSink> Pipeline<I, S> {
    /// Create a pipeline verifying deliveries against `secret`
    pub fn new(secret: impl Into<String>, incidents: I, sink: S) -> Self {
        Self {
            secret: secret.into(),
            incidents,
            sink,
        }
    }

    /// Process one delivery end to end
    pub async fn process(&self, event: RawEvent) -> Result<Outcome, PipelineError> {
        verify_signature(&event.body, event.signature.as_deref(), &self.secret)
            .map_err(PipelineError::Verification)?;
        debug!("Received signed webhook");

        let envelope = WebhookEnvelope::decode(&event.body).map_err(PipelineError::Decode)?;
        debug!("Decoded webhook event: {:?}", envelope.event);

        match envelope.event.event_type {
            EventKind::IncidentAcknowledged => {
                let incident_id = envelope.event.data.id.trim();
                if incident_id.is_empty() {
                    return Err(PipelineError::Incident(PagerDutyError::MissingIncidentId(
                        envelope.event.id,
                    )));
                }
                self.silence_incident(incident_id).await
            }
            EventKind::Ping => {
                info!("Received a PagerDuty ping event");
                Ok(Outcome::Ping)
            }
            EventKind::Unhandled(event_type) => {
                info!("Unhandled event type: {}", event_type);
                Ok(Outcome::Unhandled(event_type))
            }
        }
    }

    async fn silence_incident(&self, incident_id: &str) -> Result<Outcome, PipelineError> {
        info!("Incident {} acknowledged, building silence", incident_id);

        let details = self
            .incidents
            .fetch_alert_details(incident_id)
            .await
            .map_err(PipelineError::Incident)?;

        let labels = extract_labels(&details.firing);
        if labels.is_empty() {
            return Err(PipelineError::NoLabels(incident_id.to_string()));
        }
        debug!("Labels for incident {}: {:?}", incident_id, labels);

        let endpoint =
            silences_endpoint(&details.client_url).map_err(|source| PipelineError::Target {
                incident_id: incident_id.to_string(),
                source,
            })?;
        debug!("Alertmanager endpoint for incident {}: {}", incident_id, endpoint);

        let silence = Silence::from_labels(&labels);
        let silence_id = self
            .sink
            .submit(&endpoint, &silence)
            .await
            .map_err(|source| PipelineError::Submit {
                incident_id: incident_id.to_string(),
                source,
            })?;

        Ok(Outcome::Silenced {
            incident_id: incident_id.to_string(),
            endpoint,
            matchers: silence.matchers.len(),
            silence_id,
        })
    }
}
