//! Line reader and JSON decoding for the live event feed.

use futures_util::StreamExt;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;

use super::StreamError;
use crate::queue::EventQueue;

/// Command that makes Gerrit emit one JSON object per line until the
/// session closes.
pub const STREAM_EVENTS_COMMAND: &str = "gerrit stream-events";

/// One decoded event. No schema is imposed beyond "JSON object".
pub type EventRecord = Map<String, Value>;

/// How a call to [`listen`] ended.
#[derive(Debug)]
pub enum CycleEnd {
    /// The cancellation token fired.
    Cancelled,
    /// The stream failed; the consume cycle must be restarted.
    Failed(StreamError),
}

/// Parse a single line of event output.
///
/// # Errors
///
/// Returns `StreamError::Malformed` if the line is not a JSON object.
pub fn parse_record(line: &str) -> Result<EventRecord, StreamError> {
    serde_json::from_str(line).map_err(|e| StreamError::Malformed {
        input: line.to_string(),
        reason: e.to_string(),
    })
}

/// Decode records from a byte stream, one per line.
///
/// The stream ends when the reader reaches EOF.
pub fn read_records<R>(
    reader: R,
) -> impl futures_core::Stream<Item = Result<EventRecord, StreamError>>
where
    R: AsyncRead + Unpin,
{
    let lines = BufReader::new(reader).lines();

    futures_util::stream::unfold(lines, |mut lines| async {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let record = parse_record(&line);
                Some((record, lines))
            }
            Ok(None) => None,
            Err(e) => Some((Err(StreamError::Io(e)), lines)),
        }
    })
}

/// Push every record read from `reader` into `queue` until the stream fails
/// or `cancel` fires.
///
/// There is no line-level recovery: the first malformed line ends the cycle
/// and nothing is delivered for it. EOF is reported as
/// [`StreamError::Hangup`].
pub async fn listen<R>(reader: R, queue: &EventQueue, cancel: &CancellationToken) -> CycleEnd
where
    R: AsyncRead + Unpin,
{
    let records = read_records(reader);
    futures_util::pin_mut!(records);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => return CycleEnd::Cancelled,
            next = records.next() => match next {
                Some(Ok(record)) => {
                    tracing::debug!(event = ?record, "Received data from Gerrit event stream");
                    queue.push(record);
                }
                Some(Err(e)) => return CycleEnd::Failed(e),
                None => return CycleEnd::Failed(StreamError::Hangup),
            },
        }
    }
}

/// Read `reader` to EOF, logging each line. Returns the number of lines.
///
/// The streaming command's stderr must be consumed, or a chatty remote
/// fills the pipe and stalls stdout along with it.
pub async fn drain_stderr<R>(reader: R) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut count = 0;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                count += 1;
                tracing::debug!(line = %line, "Gerrit event stream stderr");
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Stopped reading event stream stderr");
                break;
            }
        }
    }
    count
}
