//! PagerDuty REST Client

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Url;
use tracing::{debug, info};

use crate::error::PagerDutyError;
use crate::incident::{AlertDetails, IncidentAlert, IncidentAlerts};

/// Public PagerDuty REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.pagerduty.com";

/// Media type selecting REST API v2
const API_MEDIA_TYPE: &str = "application/vnd.pagerduty+json;version=2";

/// Source of incident alert records
pub trait IncidentSource: Send + Sync {
    /// List the alerts attached to an incident
    fn list_incident_alerts(
        &self,
        incident_id: &str,
    ) -> impl Future<Output = Result<Vec<IncidentAlert>, PagerDutyError>> + Send;

    /// Fetch the narrative and client URL of an incident's first alert
    fn fetch_alert_details(
        &self,
        incident_id: &str,
    ) -> impl Future<Output = Result<AlertDetails, PagerDutyError>> + Send {
        async move {
            let alerts = self.list_incident_alerts(incident_id).await?;
            AlertDetails::from_alerts(incident_id, &alerts)
        }
    }
}

/// REST client authenticated with an API key
#[derive(Clone)]
pub struct PagerDutyClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl PagerDutyClient {
    /// Create a client against `base_url` with a per-request timeout
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, PagerDutyError> {
        info!("Creating PagerDuty client for {}", base_url);
        let invalid = |reason: String| PagerDutyError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("cannot be a base".to_string()));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: parsed,
            api_key: api_key.to_string(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `{base}/incidents/{id}/alerts`, with the id percent-encoded as one segment
    fn alerts_url(&self, incident_id: &str) -> Result<Url, PagerDutyError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PagerDutyError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["incidents", incident_id, "alerts"]);
        Ok(url)
    }
}

impl std::fmt::Debug for PagerDutyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagerDutyClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl IncidentSource for PagerDutyClient {
    async fn list_incident_alerts(
        &self,
        incident_id: &str,
    ) -> Result<Vec<IncidentAlert>, PagerDutyError> {
        let url = self.alerts_url(incident_id)?;
        debug!("Listing alerts for incident {}", incident_id);

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Token token={}", self.api_key))
            .header(ACCEPT, API_MEDIA_TYPE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PagerDutyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let page: IncidentAlerts = response.json().await?;
        debug!("Incident {} has {} alerts", incident_id, page.alerts.len());
        Ok(page.alerts)
    }
}
