//! Scripted session provider shared by the integration tests.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, DuplexStream};

use gerrit_ssh::ssh::{BoxedReader, RemoteCommand, Session, SessionProvider, SshTarget, TransportError};
use gerrit_ssh::stream::EventRecord;
use gerrit_ssh::watcher::WatcherStatus;
use gerrit_ssh::GerritClient;

/// Upper bound for anything a test waits on.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// What the next opened session does.
#[derive(Debug, Clone)]
pub enum Step {
    /// Refuse to open.
    FailOpen,
    /// Run one command to completion.
    Command {
        stdout: String,
        stderr: String,
        exit: Option<i32>,
    },
    /// Emit `stdout`, then keep the stream open until the session is dropped.
    Hold(String),
    /// Like `Hold`, but `stdout` is only written once `stderr_lines` lines
    /// have gone through a small stderr pipe.
    NoisyHold { stderr_lines: usize, stdout: String },
    /// Play the inner step, then fail to close the session.
    FailClose(Box<Step>),
}

impl Step {
    pub fn ok(stdout: &str) -> Self {
        Self::Command {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit: Some(0),
        }
    }

    pub fn exit(code: i32, stdout: &str, stderr: &str) -> Self {
        Self::Command {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit: Some(code),
        }
    }

    pub fn fail_close(self) -> Self {
        Self::FailClose(Box::new(self))
    }
}

#[derive(Debug, Default)]
struct Journal {
    opens: usize,
    closes: usize,
    commands: Vec<String>,
    held: Vec<DuplexStream>,
}

/// Provider that plays back a list of [`Step`]s, one per opened session.
///
/// Once the script runs out every further session holds an empty stream.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    journal: Arc<Mutex<Journal>>,
}

impl ScriptedProvider {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            journal: Arc::default(),
        })
    }

    pub fn opens(&self) -> usize {
        self.journal.lock().unwrap().opens
    }

    pub fn closes(&self) -> usize {
        self.journal.lock().unwrap().closes
    }

    pub fn commands(&self) -> Vec<String> {
        self.journal.lock().unwrap().commands.clone()
    }
}

#[async_trait]
impl SessionProvider for ScriptedProvider {
    async fn open(&self, target: &SshTarget) -> Result<Box<dyn Session>, TransportError> {
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Step::Hold(String::new()));
        self.journal.lock().unwrap().opens += 1;

        let (step, fail_close) = match step {
            Step::FailClose(inner) => (*inner, true),
            step => (step, false),
        };
        if matches!(step, Step::FailOpen) {
            return Err(TransportError::Open {
                host: target.hostname.clone(),
                port: target.port,
                code: Some(255),
                stderr: "Connection refused".to_string(),
            });
        }
        Ok(Box::new(ScriptedSession {
            step: Some(step),
            fail_close,
            journal: Arc::clone(&self.journal),
        }))
    }
}

struct ScriptedSession {
    step: Option<Step>,
    fail_close: bool,
    journal: Arc<Mutex<Journal>>,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn exec(&mut self, command: &str) -> Result<Box<dyn RemoteCommand>, TransportError> {
        self.journal.lock().unwrap().commands.push(command.to_string());
        let step = self.step.take().ok_or(TransportError::Closed)?;

        let remote = match step {
            Step::Command {
                stdout,
                stderr,
                exit,
            } => ScriptedCommand {
                stdout: Some(Box::new(Cursor::new(stdout.into_bytes()))),
                stderr: Some(Box::new(Cursor::new(stderr.into_bytes()))),
                exit,
            },
            Step::Hold(initial) => {
                let (mut writer, reader) = tokio::io::duplex(64 * 1024);
                writer.write_all(initial.as_bytes()).await?;
                self.journal.lock().unwrap().held.push(writer);
                ScriptedCommand {
                    stdout: Some(Box::new(reader)),
                    stderr: Some(Box::new(tokio::io::empty())),
                    exit: None,
                }
            }
            Step::NoisyHold { stderr_lines, stdout } => {
                let (mut out_writer, out_reader) = tokio::io::duplex(64 * 1024);
                let (mut err_writer, err_reader) = tokio::io::duplex(1024);
                let journal = Arc::clone(&self.journal);
                tokio::spawn(async move {
                    for n in 0..stderr_lines {
                        let line = format!("warning: {n}\n");
                        if err_writer.write_all(line.as_bytes()).await.is_err() {
                            return;
                        }
                    }
                    drop(err_writer);
                    if out_writer.write_all(stdout.as_bytes()).await.is_ok() {
                        journal.lock().unwrap().held.push(out_writer);
                    }
                });
                ScriptedCommand {
                    stdout: Some(Box::new(out_reader)),
                    stderr: Some(Box::new(err_reader)),
                    exit: None,
                }
            }
            Step::FailOpen | Step::FailClose(_) => unreachable!("unwrapped when the session opened"),
        };
        Ok(Box::new(remote))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.step = None;
        self.journal.lock().unwrap().closes += 1;
        if self.fail_close {
            return Err(TransportError::Close {
                source: std::io::Error::new(std::io::ErrorKind::Other, "master did not exit"),
            });
        }
        Ok(())
    }
}

struct ScriptedCommand {
    stdout: Option<BoxedReader>,
    stderr: Option<BoxedReader>,
    exit: Option<i32>,
}

#[async_trait]
impl RemoteCommand for ScriptedCommand {
    fn take_stdout(&mut self) -> Option<BoxedReader> {
        self.stdout.take()
    }

    fn take_stderr(&mut self) -> Option<BoxedReader> {
        self.stderr.take()
    }

    async fn exit_status(&mut self) -> Result<Option<i32>, TransportError> {
        Ok(self.exit)
    }
}

pub fn client(provider: &Arc<ScriptedProvider>) -> GerritClient {
    GerritClient::with_provider(
        SshTarget::new("review.example.org", "bot"),
        Arc::clone(provider) as Arc<dyn SessionProvider>,
    )
}

pub fn record(value: serde_json::Value) -> EventRecord {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// Next event, failing the test if none arrives in time.
pub async fn next_event(client: &GerritClient) -> EventRecord {
    tokio::time::timeout(TEST_TIMEOUT, client.get_event())
        .await
        .expect("Timed out waiting for an event")
}

/// Wait until the client's watcher reports `status`.
pub async fn wait_for_status(client: &GerritClient, status: WatcherStatus) {
    let mut rx = client
        .status_tracker()
        .expect("Watcher was not started")
        .subscribe();
    tokio::time::timeout(TEST_TIMEOUT, rx.wait_for(|s| *s == status))
        .await
        .expect("Timed out waiting for watcher status")
        .expect("Status sender dropped");
}
