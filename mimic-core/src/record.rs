//! Types and traits for recording training metrics.
//!
//! A learning step hands back a [`Record`], a mapping from metric names to
//! values. Drivers forward records to a [`Recorder`], the metrics sink, together
//! with the index of the step they belong to.
//!
//! ```rust
//! use mimic_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("loss_critic", 0.5);
//! record.insert("alpha", RecordValue::Scalar(0.2));
//! assert_eq!(record.get_scalar("alpha").unwrap(), 0.2);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
