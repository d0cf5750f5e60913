//! Webhook server tests against in-memory PagerDuty and Alertmanager fakes

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alertmanager::{AlertmanagerError, SilenceSink};
use api::rate_limit::RateLimitConfig;
use api::{create_router, serve, AppState};
use dispatcher::{Pipeline, PoolConfig, WorkerPool};
use pagerduty::{sign, IncidentAlert, IncidentSource, PagerDutyError, SIGNATURE_HEADER};
use serde_json::json;
use silencing::Silence;
use tokio::net::TcpListener;

const SECRET: &str = "integration-secret";

const FIRING: &str = "- Labels:
  - alertname=HighCPU
  - instance=node1
- Annotations:
  - summary=CPU high
- Labels:
  - alertname=HighCPU
  - instance=node2
- Annotations:
  - summary=CPU high
";

struct StaticIncidents;

impl IncidentSource for StaticIncidents {
    async fn list_incident_alerts(
        &self,
        incident_id: &str,
    ) -> Result<Vec<IncidentAlert>, PagerDutyError> {
        if incident_id != "PINC01" {
            return Ok(Vec::new());
        }
        Ok(vec![IncidentAlert {
            id: "ALERT01".to_string(),
            body: Some(json!({
                "details": { "firing": FIRING },
                "cef_details": { "client_url": "http://alertmanager:9093/#/alerts" }
            })),
        }])
    }
}

type Captured = Arc<Mutex<Vec<(String, Silence)>>>;

#[derive(Default)]
struct CapturingSink {
    silences: Captured,
}

impl SilenceSink for CapturingSink {
    async fn submit(
        &self,
        endpoint: &str,
        silence: &Silence,
    ) -> Result<Option<String>, AlertmanagerError> {
        self.silences
            .lock()
            .unwrap()
            .push((endpoint.to_string(), silence.clone()));
        Ok(None)
    }
}

async fn start(pool: WorkerPool) -> String {
    let state = Arc::new(AppState::new(pool, None));
    let app = create_router(state, &RateLimitConfig::default()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn start_with_pipeline() -> (String, Captured) {
    let sink = CapturingSink::default();
    let captured = Arc::clone(&sink.silences);
    let pipeline = Arc::new(Pipeline::new(SECRET, StaticIncidents, sink));
    let (pool, dispatcher) = WorkerPool::channel(PoolConfig::default());
    tokio::spawn(dispatcher.run(pipeline));
    (start(pool).await, captured)
}

fn event_body(event_type: &str, incident_id: &str) -> String {
    json!({
        "event": {
            "id": "01EVT",
            "event_type": event_type,
            "resource_type": "incident",
            "data": { "id": incident_id, "type": "incident", "title": "HighCPU" }
        }
    })
    .to_string()
}

async fn post_signed(base: &str, body: String, secret: &str) -> reqwest::StatusCode {
    let signature = sign(body.as_bytes(), secret).unwrap();
    reqwest::Client::new()
        .post(format!("{}/webhook", base))
        .header(SIGNATURE_HEADER, signature)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap()
        .status()
}

async fn wait_for_silences(captured: &Captured, expected: usize) -> Vec<(String, Silence)> {
    for _ in 0..100 {
        let silences = captured.lock().unwrap().clone();
        if silences.len() >= expected {
            return silences;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    captured.lock().unwrap().clone()
}

#[tokio::test]
async fn test_acknowledged_webhook_creates_silence() {
    let (base, captured) = start_with_pipeline().await;

    let status = post_signed(&base, event_body("incident.acknowledged", "PINC01"), SECRET).await;
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);

    let silences = wait_for_silences(&captured, 1).await;
    assert_eq!(silences.len(), 1);

    let (endpoint, silence) = &silences[0];
    assert_eq!(endpoint, "http://alertmanager:9093/api/v2/silences");
    assert_eq!(silence.matchers.len(), 2);

    let instance = silence
        .matchers
        .iter()
        .find(|m| m.name == "instance")
        .unwrap();
    assert_eq!(instance.value, "node1|node2");
    assert!(instance.is_regex);
}

#[tokio::test]
async fn test_failures_are_invisible_to_the_sender() {
    let (base, captured) = start_with_pipeline().await;

    // Wrong secret, unknown incident and an ignored event type all get 202
    let wrong_secret = post_signed(&base, event_body("incident.acknowledged", "PINC01"), "nope").await;
    let unknown = post_signed(&base, event_body("incident.acknowledged", "PUNKNOWN"), SECRET).await;
    let resolved = post_signed(&base, event_body("incident.resolved", "PINC01"), SECRET).await;

    assert_eq!(wrong_secret, reqwest::StatusCode::ACCEPTED);
    assert_eq!(unknown, reqwest::StatusCode::ACCEPTED);
    assert_eq!(resolved, reqwest::StatusCode::ACCEPTED);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(captured.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_full_queue_returns_unavailable() {
    let (pool, _dispatcher) = WorkerPool::channel(PoolConfig {
        max_concurrency: 1,
        queue_capacity: 1,
    });
    let base = start(pool).await;

    let first = post_signed(&base, event_body("pagey.ping", ""), SECRET).await;
    let second = post_signed(&base, event_body("pagey.ping", ""), SECRET).await;

    assert_eq!(first, reqwest::StatusCode::ACCEPTED);
    assert_eq!(second, reqwest::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let (base, _captured) = start_with_pipeline().await;

    let health: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));

    // No recorder installed in tests
    let metrics = reqwest::get(format!("{}/metrics", base)).await.unwrap();
    assert_eq!(metrics.status(), reqwest::StatusCode::NOT_FOUND);
}
