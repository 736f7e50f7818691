//! Voice capture pipeline: listening state, live input text, send-guard.
//!
//! Recognition events may still be in flight after the user submits. Every
//! event carries the session that produced it: events from a session other
//! than the latest one are dropped, and while the send-guard is active the
//! submitted session's events are dropped too, so a trailing fragment cannot
//! refill the cleared input.

use crate::clock::{Clock, SystemClock};
use crate::defaults;
use crate::dialogue::orchestrator::{Orchestrator, TurnPermit};
use crate::error::{EchoError, Result};
use crate::voice::recognizer::{EngineEvent, EventSink, SessionEvent, SpeechRecognizer};
use crate::voice::transcript::Transcript;
use crossbeam_channel::{Receiver, Sender};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListeningState {
    #[default]
    Idle,
    Listening,
}

/// Events of `session` are discarded until `until`.
#[derive(Debug, Clone, Copy)]
struct SendGuard {
    session: u64,
    until: Instant,
}

/// Owns the recognizer session and the text of the input field.
pub struct VoiceCapture<C: Clock = SystemClock> {
    recognizer: Box<dyn SpeechRecognizer>,
    clock: C,
    language: String,
    send_guard: Duration,
    state: ListeningState,
    input: String,
    session: u64,
    engine_running: bool,
    guard: Option<SendGuard>,
    available: bool,
    shut_down: bool,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
}

impl VoiceCapture<SystemClock> {
    pub fn new(
        recognizer: Box<dyn SpeechRecognizer>,
        language: impl Into<String>,
        send_guard: Duration,
    ) -> Self {
        Self::with_clock(recognizer, language, send_guard, SystemClock)
    }
}

impl<C: Clock> VoiceCapture<C> {
    /// Build with an explicit clock. The engine is probed once here; an
    /// unavailable engine leaves typed input fully functional.
    pub fn with_clock(
        recognizer: Box<dyn SpeechRecognizer>,
        language: impl Into<String>,
        send_guard: Duration,
        clock: C,
    ) -> Self {
        let available = match recognizer.probe() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(engine = recognizer.name(), error = %e, "voice input unavailable");
                false
            }
        };
        let (events_tx, events_rx) = crossbeam_channel::bounded(defaults::RECOGNITION_EVENT_BUFFER);
        Self {
            recognizer,
            clock,
            language: language.into(),
            send_guard,
            state: ListeningState::Idle,
            input: String::new(),
            session: 0,
            engine_running: false,
            guard: None,
            available,
            shut_down: false,
            events_tx,
            events_rx,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available && !self.shut_down
    }

    pub fn state(&self) -> ListeningState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListeningState::Listening
    }

    /// Current input field text.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the input field with typed text.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Receiver the engine's events arrive on; feed them to
    /// [`VoiceCapture::handle_session_event`].
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events_rx.clone()
    }

    /// Latest recognition session, 0 before the first start.
    pub fn session(&self) -> u64 {
        self.session
    }

    /// True while trailing events of the submitted session are being discarded.
    pub fn is_send_guard_active(&self) -> bool {
        self.guard
            .is_some_and(|guard| self.clock.now() < guard.until)
    }

    /// Begin listening in a new session. A no-op when already listening or
    /// when a start is still waiting for the engine's confirmation.
    ///
    /// The state only becomes `Listening` once the engine reports its start.
    /// A running send-guard keeps running; it only covers the submitted
    /// session, so the new session is heard at once.
    pub fn start(&mut self) -> Result<()> {
        if self.shut_down {
            return Err(EchoError::RecognizerUnavailable {
                message: "voice capture has been shut down".to_string(),
            });
        }
        if !self.available {
            return Err(EchoError::RecognizerUnavailable {
                message: format!("{} cannot run here", self.recognizer.name()),
            });
        }
        if self.is_listening() || self.engine_running {
            return Ok(());
        }
        self.session += 1;
        let sink = EventSink::new(self.session, self.events_tx.clone());
        if let Err(e) = self.recognizer.start(&self.language, sink) {
            tracing::warn!(error = %e, "failed to start recognition, disabling voice input");
            self.available = false;
            return Err(e);
        }
        self.engine_running = true;
        tracing::debug!(language = %self.language, session = self.session, "recognition requested");
        Ok(())
    }

    /// Stop listening. Safe when already idle.
    pub fn stop(&mut self) {
        self.recognizer.stop();
        self.engine_running = false;
        if self.state != ListeningState::Idle {
            tracing::debug!("listening stopped");
        }
        self.state = ListeningState::Idle;
    }

    /// Start when idle, stop when listening. Returns the new listening flag.
    pub fn toggle(&mut self) -> Result<bool> {
        if self.is_listening() {
            self.stop();
            Ok(false)
        } else {
            self.start()?;
            Ok(true)
        }
    }

    /// Apply one event of the latest session. Returns the new input text
    /// when it changed.
    pub fn handle_event(&mut self, event: EngineEvent) -> Option<String> {
        self.apply(self.session, event)
    }

    /// Apply one tagged engine event. Events from an older session are dropped.
    pub fn handle_session_event(&mut self, event: SessionEvent) -> Option<String> {
        self.apply(event.session, event.event)
    }

    fn apply(&mut self, session: u64, event: EngineEvent) -> Option<String> {
        if self.shut_down {
            return None;
        }
        if session != self.session {
            tracing::trace!(
                session,
                current = self.session,
                ?event,
                "discarding event from a stale session"
            );
            return None;
        }
        if self
            .guard
            .is_some_and(|guard| guard.session == session && self.clock.now() < guard.until)
        {
            tracing::trace!(?event, "send-guard active, discarding recognition event");
            return None;
        }
        match event {
            EngineEvent::Start => {
                self.state = ListeningState::Listening;
                None
            }
            EngineEvent::Result(result) => {
                let displayed = Transcript::from_event(&result).displayed();
                if displayed == self.input {
                    return None;
                }
                self.input = displayed.clone();
                Some(displayed)
            }
            EngineEvent::End => {
                self.state = ListeningState::Idle;
                self.engine_running = false;
                None
            }
            EngineEvent::Error { message } => {
                tracing::warn!(%message, "recognition error");
                self.state = ListeningState::Idle;
                self.engine_running = false;
                None
            }
        }
    }

    /// Apply every event already queued. Returns the last input change.
    pub fn pump(&mut self) -> Option<String> {
        let mut changed = None;
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(text) = self.handle_session_event(event) {
                changed = Some(text);
            }
        }
        changed
    }

    /// Take the input for submission.
    ///
    /// Returns `None` (input kept) when the orchestrator is busy or the text
    /// is blank. Otherwise arms the send-guard, stops recognition and clears
    /// the input field.
    pub fn submit(&mut self, busy: bool) -> Option<String> {
        if busy || self.input.trim().is_empty() {
            return None;
        }
        self.guard = Some(SendGuard {
            session: self.session,
            until: self.clock.now() + self.send_guard,
        });
        self.stop();
        Some(std::mem::take(&mut self.input))
    }

    /// Take the input as the next turn of `orchestrator`, claiming its busy
    /// flag before the field is cleared. `None` (input kept) while another
    /// turn is in flight or when the input is blank.
    pub fn submit_turn(&mut self, orchestrator: &Orchestrator) -> Option<(TurnPermit, String)> {
        let permit = orchestrator.try_begin_turn();
        let text = self.submit(permit.is_none())?;
        permit.map(|permit| (permit, text))
    }

    /// Stop the engine for good. Later events and starts are no-ops.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.stop();
        self.shut_down = true;
        tracing::debug!("voice capture shut down");
    }
}

impl<C: Clock> Drop for VoiceCapture<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
