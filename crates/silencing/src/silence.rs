//! Silence Synthesis

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::labels::{LabelSet, ALTERNATION_SEPARATOR};

/// How long a silence stays active after the incident was acknowledged
pub const ACKNOWLEDGE_DURATION: Duration = Duration::from_secs(60 * 60);

/// Provenance recorded on every silence
pub const CREATED_BY: &str = "PagerDuty-AlertManager bridge";

/// Justification recorded on every silence
pub const COMMENT: &str = "Silenced by our PagerDuty-AlertManager bridge based on incident data";

/// Label matcher of a silence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    pub name: String,
    pub value: String,
    /// Set when the value is an alternation such as `node1|node2`
    pub is_regex: bool,
}

impl Matcher {
    /// Create a matcher, flagging alternation values as regular expressions
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            is_regex: value.contains(ALTERNATION_SEPARATOR),
            value,
        }
    }
}

/// Silence request in the Alertmanager v2 API shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Silence {
    pub matchers: Vec<Matcher>,
    #[serde(serialize_with = "rfc3339")]
    pub starts_at: DateTime<Utc>,
    #[serde(serialize_with = "rfc3339")]
    pub ends_at: DateTime<Utc>,
    pub created_by: String,
    pub comment: String,
}

impl Silence {
    /// Build a silence starting now
    pub fn from_labels(labels: &LabelSet) -> Self {
        Self::from_labels_at(labels, Utc::now())
    }

    /// Build a silence starting at `now`
    ///
    /// One matcher per label, in label set order. An empty label set yields
    /// an empty matcher list; rejecting it is the caller's call.
    pub fn from_labels_at(labels: &LabelSet, now: DateTime<Utc>) -> Self {
        let matchers: Vec<Matcher> = labels
            .iter()
            .map(|(name, value)| Matcher::new(name, value))
            .collect();

        // Alertmanager only keeps second precision.
        let starts_at = now.trunc_subsecs(0);
        let ends_at = starts_at + acknowledge_window();

        debug!(
            "Synthesized silence with {} matchers until {}",
            matchers.len(),
            ends_at
        );

        Self {
            matchers,
            starts_at,
            ends_at,
            created_by: CREATED_BY.to_string(),
            comment: COMMENT.to_string(),
        }
    }

    /// Length of the silence window
    pub fn duration(&self) -> chrono::Duration {
        self.ends_at - self.starts_at
    }
}

fn acknowledge_window() -> chrono::Duration {
    chrono::Duration::seconds(ACKNOWLEDGE_DURATION.as_secs() as i64)
}

fn rfc3339<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Secs, true))
}
