//! Event stream reader for `gerrit stream-events` output.

mod error;
mod reader;

pub use error::StreamError;
pub use reader::{drain_stderr, listen, parse_record, read_records, CycleEnd, EventRecord, STREAM_EVENTS_COMMAND};
