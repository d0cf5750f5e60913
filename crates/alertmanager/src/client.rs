//! Alertmanager Silence Client

use std::future::Future;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use silencing::Silence;
use tracing::{debug, info};

use crate::error::AlertmanagerError;

/// Destination for synthesized silences
pub trait SilenceSink: Send + Sync {
    /// Create `silence` at `endpoint`, returning the silence ID if reported
    fn submit(
        &self,
        endpoint: &str,
        silence: &Silence,
    ) -> impl Future<Output = Result<Option<String>, AlertmanagerError>> + Send;
}

/// Success body of `POST /api/v2/silences`
#[derive(Debug, Deserialize)]
struct SilenceCreated {
    #[serde(rename = "silenceID")]
    silence_id: String,
}

/// HTTP client for Alertmanager's v2 API
///
/// Cloning is cheap and clones share one connection pool, so a single
/// instance serves every concurrent event.
#[derive(Debug, Clone)]
pub struct AlertmanagerClient {
    http: reqwest::Client,
}

impl AlertmanagerClient {
    /// Create a client with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, AlertmanagerError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl SilenceSink for AlertmanagerClient {
    async fn submit(
        &self,
        endpoint: &str,
        silence: &Silence,
    ) -> Result<Option<String>, AlertmanagerError> {
        info!("Sending silence to Alertmanager at {}", endpoint);
        let data = serde_json::to_vec(silence)?;
        debug!("Silence body: {}", String::from_utf8_lossy(&data));

        let response = self
            .http
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(data)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AlertmanagerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let silence_id = serde_json::from_str::<SilenceCreated>(&body)
            .ok()
            .map(|created| created.silence_id);
        info!("Silence created at {} (id: {:?})", endpoint, silence_id);
        Ok(silence_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::silences_endpoint;
    use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use silencing::LabelSet;

    async fn create_silence(Json(body): Json<Value>) -> impl IntoResponse {
        let matchers = body["matchers"].as_array().cloned().unwrap_or_default();
        if matchers.is_empty() {
            return (StatusCode::BAD_REQUEST, "missing matchers").into_response();
        }
        if body["createdBy"] != silencing::CREATED_BY || body["endsAt"] != "2024-03-01T13:30:00Z" {
            return (StatusCode::BAD_REQUEST, "unexpected body").into_response();
        }
        Json(json!({ "silenceID": "7f1d6f3e" })).into_response()
    }

    async fn spawn_fake_alertmanager() -> String {
        let app = Router::new().route("/api/v2/silences", post(create_silence));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/#/alerts?receiver=pd", addr)
    }

    fn silence_for(labels: &LabelSet) -> Silence {
        let now = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        Silence::from_labels_at(labels, now)
    }

    #[tokio::test]
    async fn test_submit_silence() {
        let client_url = spawn_fake_alertmanager().await;
        let endpoint = silences_endpoint(&client_url).unwrap();
        let client = AlertmanagerClient::new(Duration::from_secs(5)).unwrap();

        let labels: LabelSet = [("alertname", "HighCPU")].into_iter().collect();
        let id = client.submit(&endpoint, &silence_for(&labels)).await.unwrap();

        assert_eq!(id.as_deref(), Some("7f1d6f3e"));
    }

    #[tokio::test]
    async fn test_rejected_silence() {
        let client_url = spawn_fake_alertmanager().await;
        let endpoint = silences_endpoint(&client_url).unwrap();
        let client = AlertmanagerClient::new(Duration::from_secs(5)).unwrap();

        let err = client
            .submit(&endpoint, &silence_for(&LabelSet::new()))
            .await
            .unwrap_err();

        match err {
            AlertmanagerError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "missing matchers");
            }
            other => panic!("expected rejection, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_alertmanager() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = AlertmanagerClient::new(Duration::from_secs(2)).unwrap();
        let endpoint = format!("http://{}/api/v2/silences", addr);
        let err = client
            .submit(&endpoint, &silence_for(&LabelSet::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, AlertmanagerError::Transport(_)));
    }
}
