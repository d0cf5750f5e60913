//! Event Dispatcher
//!
//! Runs every accepted webhook delivery through the bridge pipeline. A
//! delivery is verified and decoded first; acknowledgments then have their
//! alert details fetched, labels extracted and a silence sent to the
//! Alertmanager that raised the alert. Deliveries are processed at most once,
//! each on its own task, with a cap on how many run at the same time.

mod error;
mod pipeline;
mod pool;

pub use error::{PipelineError, SubmitError};
pub use pipeline::{Outcome, Pipeline, RawEvent};
pub use pool::{Dispatcher, PoolConfig, WorkerPool, MAX_POOL_SIZE};
