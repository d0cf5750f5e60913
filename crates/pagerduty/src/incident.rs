//! Incident Alert Records

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::PagerDutyError;

/// Alert attached to an incident, as returned by `GET /incidents/{id}/alerts`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentAlert {
    #[serde(default)]
    pub id: String,
    /// Raw event body forwarded by the monitoring integration
    #[serde(default)]
    pub body: Option<Value>,
}

/// Response page of the incident alerts endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentAlerts {
    #[serde(default)]
    pub alerts: Vec<IncidentAlert>,
}

/// The two fields of an alert body the bridge needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDetails {
    /// `details.firing`: narrative carrying the `Labels:` blocks
    pub firing: String,
    /// `cef_details.client_url`: link back to the Alertmanager that fired
    pub client_url: String,
}

impl AlertDetails {
    /// Pull the narrative and client URL out of the first alert of an incident
    pub fn from_alerts(incident_id: &str, alerts: &[IncidentAlert]) -> Result<Self, PagerDutyError> {
        let first = alerts
            .first()
            .ok_or_else(|| PagerDutyError::NoAlerts(incident_id.to_string()))?;

        let body = match &first.body {
            Some(body) if !body.is_null() => body,
            _ => return Err(PagerDutyError::EmptyBody(incident_id.to_string())),
        };

        let details = body
            .get("details")
            .and_then(Value::as_object)
            .ok_or_else(|| PagerDutyError::MissingDetails(incident_id.to_string()))?;
        debug!("Details for incident {}: {:?}", incident_id, details);

        let firing = details
            .get("firing")
            .and_then(Value::as_str)
            .filter(|firing| !firing.is_empty())
            .ok_or_else(|| PagerDutyError::MissingFiring(incident_id.to_string()))?;

        let cef_details = body
            .get("cef_details")
            .and_then(Value::as_object)
            .ok_or_else(|| PagerDutyError::MissingCefDetails(incident_id.to_string()))?;

        let client_url = cef_details
            .get("client_url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| PagerDutyError::MissingClientUrl(incident_id.to_string()))?;

        Ok(Self {
            firing: firing.to_string(),
            client_url: client_url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alert(body: Value) -> IncidentAlert {
        IncidentAlert {
            id: "Q1".to_string(),
            body: Some(body),
        }
    }

    #[test]
    fn test_extract_details() {
        let alerts = vec![
            alert(json!({
                "details": { "firing": "Labels:\n - alertname=Up\n", "num_firing": "1" },
                "cef_details": { "client_url": "http://am.example:9093/#/alerts?receiver=pd" }
            })),
            alert(json!({})),
        ];
        let details = AlertDetails::from_alerts("P1", &alerts).unwrap();

        assert_eq!(details.firing, "Labels:\n - alertname=Up\n");
        assert_eq!(details.client_url, "http://am.example:9093/#/alerts?receiver=pd");
    }

    #[test]
    fn test_no_alerts() {
        let err = AlertDetails::from_alerts("P1", &[]).unwrap_err();

        assert!(matches!(err, PagerDutyError::NoAlerts(ref id) if id == "P1"));
        assert!(err.to_string().contains("P1"));
    }

    #[test]
    fn test_empty_body() {
        let alerts = vec![IncidentAlert::default()];
        assert!(matches!(
            AlertDetails::from_alerts("P1", &alerts),
            Err(PagerDutyError::EmptyBody(_))
        ));

        let alerts = vec![alert(Value::Null)];
        assert!(matches!(
            AlertDetails::from_alerts("P1", &alerts),
            Err(PagerDutyError::EmptyBody(_))
        ));
    }

    #[test]
    fn test_missing_fields() {
        let cases = [
            (json!({ "cef_details": { "client_url": "http://am" } }), "details"),
            (json!({ "details": "text", "cef_details": {} }), "details"),
            (json!({ "details": {}, "cef_details": {} }), "firing"),
            (json!({ "details": { "firing": "" } }), "firing"),
            (json!({ "details": { "firing": "Labels:" } }), "cef_details"),
            (json!({ "details": { "firing": "Labels:" }, "cef_details": {} }), "client_url"),
            (
                json!({ "details": { "firing": "Labels:" }, "cef_details": { "client_url": 3 } }),
                "client_url",
            ),
        ];

        for (body, field) in cases {
            let err = AlertDetails::from_alerts("P9", &[alert(body)]).unwrap_err();
            assert!(err.is_upstream_data());
            let expected = match field {
                "details" => matches!(err, PagerDutyError::MissingDetails(_)),
                "firing" => matches!(err, PagerDutyError::MissingFiring(_)),
                "cef_details" => matches!(err, PagerDutyError::MissingCefDetails(_)),
                _ => matches!(err, PagerDutyError::MissingClientUrl(_)),
            };
            assert!(expected, "unexpected error for missing {}: {}", field, err);
        }
    }
}
