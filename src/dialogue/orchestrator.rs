//! Dialogue orchestrator: routes user turns, drives the coach, owns the log.
//!
//! A turn holds the busy flag from the moment it is accepted until its last
//! message is appended, whatever the outcome. The state lock is released
//! while the coach is working so the log and flags stay readable.

use crate::coach::Coach;
use crate::dialogue::message::{Message, MessageLog, Sender};
use crate::dialogue::mode::{Mode, SetupStep, SimulationContext};
use crate::dialogue::phrases::{Phrases, TerminationMatcher};
use crate::dialogue::state::{CoachCall, CoachReply, DialogueState, PendingRequest, Transition};
use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// What happened to a submitted turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The turn was processed (including recovered coach failures).
    Accepted,
    /// Empty or whitespace-only text; nothing was logged.
    Empty,
    /// Another turn is still in flight; nothing was logged.
    Busy,
}

struct Session {
    state: DialogueState,
    log: MessageLog,
}

/// Exclusive claim on the next turn, taken with [`Orchestrator::try_begin_turn`].
///
/// Holds the busy flag until dropped, on every exit path. A front end claims
/// it before handing the input away, so a turn can never be lost to a race
/// with another submission.
#[derive(Debug)]
#[must_use = "dropping the permit releases the busy flag"]
pub struct TurnPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for TurnPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Root of the dialogue engine.
pub struct Orchestrator {
    coach: Arc<dyn Coach>,
    session: Mutex<Session>,
    busy: Arc<AtomicBool>,
    phrases: &'static Phrases,
    termination: TerminationMatcher,
}

impl Orchestrator {
    /// Start a conversation seeded with the greeting of `phrases`.
    pub fn new(coach: Arc<dyn Coach>, phrases: &'static Phrases) -> Self {
        Self::with_log(coach, phrases, MessageLog::new())
    }

    /// Like [`Orchestrator::new`] with a pre-built log (e.g. one publishing events).
    pub fn with_log(coach: Arc<dyn Coach>, phrases: &'static Phrases, mut log: MessageLog) -> Self {
        log.push(Message::bootstrap(phrases.greeting));
        Self {
            coach,
            session: Mutex::new(Session {
                state: DialogueState::new(),
                log,
            }),
            busy: Arc::new(AtomicBool::new(false)),
            phrases,
            termination: TerminationMatcher::for_catalog(phrases, &[]),
        }
    }

    /// Replace the termination matcher (e.g. to add configured phrases).
    pub fn with_termination(mut self, termination: TerminationMatcher) -> Self {
        self.termination = termination;
        self
    }

    pub fn phrases(&self) -> &'static Phrases {
        self.phrases
    }

    /// True while a turn is being processed.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn mode(&self) -> Mode {
        self.session.lock().await.state.mode
    }

    pub async fn setup_step(&self) -> SetupStep {
        self.session.lock().await.state.step
    }

    pub async fn context(&self) -> SimulationContext {
        self.session.lock().await.state.context.clone()
    }

    pub async fn state(&self) -> DialogueState {
        self.session.lock().await.state.clone()
    }

    /// Snapshot of the whole log.
    pub async fn messages(&self) -> Vec<Message> {
        self.session.lock().await.log.messages().to_vec()
    }

    /// Messages appended after the first `offset` entries.
    pub async fn messages_since(&self, offset: usize) -> Vec<Message> {
        self.session.lock().await.log.since(offset).to_vec()
    }

    pub async fn message_count(&self) -> usize {
        self.session.lock().await.log.len()
    }

    /// Start over: Idle, empty scenario, greeting re-posted. Any in-flight
    /// coach reply will be discarded when it arrives.
    pub async fn reset(&self) {
        let mut session = self.session.lock().await;
        session.state.reset();
        session.log.push(Message::greeting(self.phrases.greeting));
        tracing::info!(generation = session.state.generation(), "conversation reset");
    }

    /// Claim the busy flag for one turn. `None` while another turn is in flight.
    pub fn try_begin_turn(&self) -> Option<TurnPermit> {
        match self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => Some(TurnPermit {
                busy: Arc::clone(&self.busy),
            }),
            Err(_) => {
                tracing::debug!("turn rejected: previous turn still in flight");
                None
            }
        }
    }

    /// Process one user utterance.
    ///
    /// Coach failures are recovered as a System notice; this never errors.
    pub async fn submit_user_turn(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Empty;
        }
        let Some(permit) = self.try_begin_turn() else {
            return SubmitOutcome::Busy;
        };
        self.run_turn(permit, text).await
    }

    /// Process one utterance under an already claimed permit, released when
    /// the turn's last message is appended.
    pub async fn run_turn(&self, permit: TurnPermit, text: &str) -> SubmitOutcome {
        let _permit = permit;
        if text.trim().is_empty() {
            return SubmitOutcome::Empty;
        }

        let request = {
            let mut session = self.session.lock().await;
            let Session { state, log } = &mut *session;
            log.append(Sender::User, text);
            let upto = log.len() - 1;
            let transition =
                state.on_user_turn(text, self.phrases, &self.termination, || {
                    log.roleplay_transcript(upto)
                });
            Self::apply(log, transition)
        };

        let Some(PendingRequest { generation, call }) = request else {
            return SubmitOutcome::Accepted;
        };

        let result = self.execute(call).await;

        let mut session = self.session.lock().await;
        let Session { state, log } = &mut *session;
        let transition = match result {
            Ok(reply) => state.on_coach_reply(generation, reply, self.phrases),
            Err(e) => {
                tracing::warn!(
                    coach = self.coach.name(),
                    error = %e,
                    retryable = e.is_retryable(),
                    "coach call failed"
                );
                state.on_coach_failure(generation, self.phrases)
            }
        };
        if let Some(transition) = transition {
            Self::apply(log, transition);
        }
        SubmitOutcome::Accepted
    }

    async fn execute(&self, call: CoachCall) -> Result<CoachReply> {
        match call {
            CoachCall::Classify { text } => {
                self.coach.classify(&text).await.map(CoachReply::Classified)
            }
            CoachCall::SimulationTurn { context, text } => self
                .coach
                .simulation_turn(&context, &text)
                .await
                .map(CoachReply::SimulationTurn),
            CoachCall::Debrief { conversation } => {
                self.coach.debrief(&conversation).await.map(CoachReply::Debrief)
            }
        }
    }

    fn apply(log: &mut MessageLog, transition: Transition) -> Option<PendingRequest> {
        for (sender, text) in transition.appends {
            log.append(sender, text);
        }
        transition.request
    }
}
