//! Silencing Core
//!
//! Turns the `firing` narrative of an acknowledged incident into an
//! Alertmanager silence:
//! - label extraction from `Labels:` blocks, merging repeated keys
//! - silence synthesis with a fixed acknowledgment window

mod labels;
mod silence;

pub use labels::{extract_labels, LabelSet, ALTERNATION_SEPARATOR};
pub use silence::{Matcher, Silence, ACKNOWLEDGE_DURATION, COMMENT, CREATED_BY};
