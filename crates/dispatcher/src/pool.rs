//! Bounded Worker Pool
//!
//! The HTTP handler hands events to a [`WorkerPool`] without waiting; a
//! single [`Dispatcher`] loop drains the queue and runs each event on its
//! own task, never more than `max_concurrency` at once.

use std::sync::Arc;

use alertmanager::SilenceSink;
use metrics::counter;
use pagerduty::IncidentSource;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

use crate::error::SubmitError;
use crate::pipeline::{Outcome, Pipeline, RawEvent};

/// Worker pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Events processed at the same time
    pub max_concurrency: usize,
    /// Events waiting for a free worker before submissions are refused
    pub queue_capacity: usize,
}

/// Largest worker or queue size a pool accepts
pub const MAX_POOL_SIZE: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            queue_capacity: 256,
        }
    }
}

/// Submission handle, cheap to clone into every request handler
#[derive(Debug, Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<RawEvent>,
}

impl WorkerPool {
    /// Create a submission handle and the dispatcher that serves it
    ///
    /// Sizes are clamped to `1..=MAX_POOL_SIZE`.
    pub fn channel(config: PoolConfig) -> (Self, Dispatcher) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.clamp(1, MAX_POOL_SIZE));
        let dispatcher = Dispatcher {
            receiver,
            max_concurrency: config.max_concurrency.clamp(1, MAX_POOL_SIZE),
        };
        (Self { sender }, dispatcher)
    }

    /// Queue an event without waiting
    pub fn try_submit(&self, event: RawEvent) -> Result<(), SubmitError> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })?;
        counter!("nullifier_events_received_total").increment(1);
        Ok(())
    }
}

/// Receiving end of the pool
pub struct Dispatcher {
    receiver: mpsc::Receiver<RawEvent>,
    max_concurrency: usize,
}

impl Dispatcher {
    /// Run until every [`WorkerPool`] handle is dropped and in-flight events finish
    pub async fn run<I, S>(mut self, pipeline: Arc<Pipeline<I, S>>)
    where
        I: IncidentSource + 'static,
        S: SilenceSink + 'static,
    {
        info!(
            "Starting event dispatcher: max_concurrency={}",
            self.max_concurrency
        );
        let permits = Arc::new(Semaphore::new(self.max_concurrency));

        while let Some(event) = self.receiver.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                handle_event(&pipeline, event).await;
                drop(permit);
            });
        }

        debug!("Event queue closed, waiting for in-flight events");
        let all = u32::try_from(self.max_concurrency).unwrap_or(u32::MAX);
        if permits.acquire_many(all).await.is_err() {
            warn!("Worker permits closed before in-flight events finished");
        }
        info!("Event dispatcher stopped");
    }
}

async fn handle_event<I: IncidentSource, S: SilenceSink>(pipeline: &Pipeline<I, S>, event: RawEvent) {
    match pipeline.process(event).await {
        Ok(Outcome::Silenced {
            incident_id,
            endpoint,
            matchers,
            silence_id,
        }) => {
            info!(
                "Silenced incident {} at {} with {} matchers (id: {:?})",
                incident_id, endpoint, matchers, silence_id
            );
            counter!("nullifier_silences_created_total").increment(1);
        }
        Ok(Outcome::Ping) => {
            counter!("nullifier_events_ignored_total", "kind" => "ping").increment(1);
        }
        Ok(Outcome::Unhandled(_)) => {
            counter!("nullifier_events_ignored_total", "kind" => "unhandled").increment(1);
        }
        Err(e) => {
            error!("Failed to process webhook: {}", e);
            counter!("nullifier_events_failed_total", "stage" => e.stage()).increment(1);
        }
    }
}
