//! Speech-input collaborator: the engine seam and its event stream.

use crate::error::{EchoError, Result};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Placeholder in a recognizer argv replaced by the language tag.
pub const LANGUAGE_PLACEHOLDER: &str = "{lang}";

/// One transcript segment of a recognition result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub transcript: String,
    #[serde(default)]
    pub is_final: bool,
}

/// A result update: the full segment list of the session so far, and the
/// index of the first segment that changed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecognitionEvent {
    #[serde(default)]
    pub result_index: usize,
    #[serde(default)]
    pub results: Vec<Segment>,
}

/// Event emitted by a recognition engine.
///
/// The command engine reads these as JSON lines tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Start,
    Result(RecognitionEvent),
    End,
    Error { message: String },
}

/// An engine event tagged with the recognition session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session: u64,
    pub event: EngineEvent,
}

/// Where one recognition session delivers its events.
#[derive(Debug, Clone)]
pub struct EventSink {
    session: u64,
    tx: Sender<SessionEvent>,
}

impl EventSink {
    pub fn new(session: u64, tx: Sender<SessionEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// Deliver `event`. False once the receiving side is gone.
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx
            .send(SessionEvent {
                session: self.session,
                event,
            })
            .is_ok()
    }
}

/// Trait for continuous, interim-enabled speech recognition engines.
///
/// Implementations deliver [`EngineEvent`]s on the sink given to `start`,
/// from any thread, until stopped.
pub trait SpeechRecognizer: Send {
    /// Check the engine can run here. Errors mean voice input is unavailable.
    fn probe(&self) -> Result<()>;

    /// Begin a session in `language`. Starting a running engine is a no-op.
    fn start(&mut self, language: &str, events: EventSink) -> Result<()>;

    /// End the session. Safe to call when not running.
    fn stop(&mut self);

    /// Name for logging/debugging.
    fn name(&self) -> &str {
        "recognizer"
    }
}

/// Engine used when no recognizer is configured.
#[derive(Debug, Clone)]
pub struct DisabledRecognizer {
    reason: String,
}

impl DisabledRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SpeechRecognizer for DisabledRecognizer {
    fn probe(&self) -> Result<()> {
        Err(EchoError::RecognizerUnavailable {
            message: self.reason.clone(),
        })
    }

    fn start(&mut self, _language: &str, _events: EventSink) -> Result<()> {
        self.probe()
    }

    fn stop(&mut self) {}

    fn name(&self) -> &str {
        "disabled"
    }
}

/// Recognizer backed by an external program writing JSON-lines events to
/// stdout. Any `{lang}` argument is replaced by the session language.
pub struct CommandRecognizer {
    argv: Vec<String>,
    session: Option<Session>,
}

struct Session {
    child: Child,
    stopped: Arc<AtomicBool>,
}

impl CommandRecognizer {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            session: None,
        }
    }

    fn is_running(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) => matches!(session.child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

impl SpeechRecognizer for CommandRecognizer {
    fn probe(&self) -> Result<()> {
        let Some(program) = self.argv.first() else {
            return Err(EchoError::RecognizerUnavailable {
                message: "recognizer command is empty".to_string(),
            });
        };
        match crate::sys::find_executable(program) {
            Some(_) => Ok(()),
            None => Err(EchoError::RecognizerUnavailable {
                message: format!("'{program}' not found or not executable"),
            }),
        }
    }

    fn start(&mut self, language: &str, events: EventSink) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        self.stop();

        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| EchoError::RecognizerUnavailable {
                message: "recognizer command is empty".to_string(),
            })?;
        let args: Vec<String> = args
            .iter()
            .map(|a| a.replace(LANGUAGE_PLACEHOLDER, language))
            .collect();

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EchoError::Recognition {
                message: format!("failed to spawn '{program}': {e}"),
            })?;
        let stdout = child.stdout.take().ok_or_else(|| EchoError::Recognition {
            message: "recognizer stdout not captured".to_string(),
        })?;

        let stopped = Arc::new(AtomicBool::new(false));
        let reader_stopped = Arc::clone(&stopped);
        let session = events.session();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                // Lines still buffered when the session was stopped are dropped.
                if reader_stopped.load(Ordering::SeqCst) {
                    return;
                }
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<EngineEvent>(line) {
                    Ok(event) => {
                        if !events.send(event) {
                            return;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, line, "ignoring malformed recognizer event"),
                }
            }
            // Stream closed without an explicit stop: report it as an end.
            if !reader_stopped.load(Ordering::SeqCst) && !events.send(EngineEvent::End) {
                tracing::trace!("recognizer listener gone before end event");
            }
        });

        tracing::debug!(program, language, session, "recognizer started");
        self.session = Some(Session { child, stopped });
        Ok(())
    }

    fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.stopped.store(true, Ordering::SeqCst);
        if let Err(e) = session.child.kill()
            && e.kind() != std::io::ErrorKind::InvalidInput
        {
            tracing::warn!(error = %e, "failed to stop recognizer");
        }
        if let Err(e) = session.child.wait() {
            tracing::debug!(error = %e, "recognizer wait failed");
        }
        tracing::debug!("recognizer stopped");
    }

    fn name(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("command")
    }
}

impl Drop for CommandRecognizer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Default)]
struct MockState {
    unavailable: bool,
    starts: Vec<String>,
    stops: usize,
    sink: Option<EventSink>,
}

/// Scripted recognizer: records start/stop calls and lets tests emit events
/// through the sink handed to the latest `start`.
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    state: Arc<Mutex<MockState>>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `probe` and `start` fail.
    pub fn unavailable(self) -> Self {
        self.lock().unavailable = true;
        self
    }

    /// Languages passed to each `start` call.
    pub fn starts(&self) -> Vec<String> {
        self.lock().starts.clone()
    }

    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    /// Deliver `event` as the latest session would. False when no session
    /// has been started.
    pub fn emit(&self, event: EngineEvent) -> bool {
        match &self.lock().sink {
            Some(sink) => sink.send(event),
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn probe(&self) -> Result<()> {
        if self.lock().unavailable {
            return Err(EchoError::RecognizerUnavailable {
                message: "mock recognizer unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn start(&mut self, language: &str, events: EventSink) -> Result<()> {
        self.probe()?;
        let mut state = self.lock();
        state.starts.push(language.to_string());
        state.sink = Some(events);
        Ok(())
    }

    fn stop(&mut self) {
        self.lock().stops += 1;
    }

    fn name(&self) -> &str {
        "mock"
    }
}
