//! Dialogue state and its pure transition functions.
//!
//! Nothing here performs I/O. The orchestrator feeds user turns and coach
//! replies in, and executes the returned [`Transition`]: appending messages
//! and, when asked, calling the coach with the captured generation.

use crate::coach::{Classification, SimulationReply};
use crate::dialogue::message::Sender;
use crate::dialogue::mode::{Mode, SetupStep, SimulationContext};
use crate::dialogue::phrases::{Phrases, TerminationMatcher};

/// Mode, setup step and scenario, plus the request generation counter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DialogueState {
    pub mode: Mode,
    pub step: SetupStep,
    pub context: SimulationContext,
    generation: u64,
}

/// A collaborator operation requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoachCall {
    Classify { text: String },
    SimulationTurn {
        context: SimulationContext,
        text: String,
    },
    Debrief { conversation: String },
}

/// Successful result of a [`CoachCall`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoachReply {
    Classified(Classification),
    SimulationTurn(SimulationReply),
    Debrief(String),
}

/// Request tagged with the generation it was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub generation: u64,
    pub call: CoachCall,
}

/// Messages to append, in order, and an optional follow-up request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transition {
    pub appends: Vec<(Sender, String)>,
    pub request: Option<PendingRequest>,
}

impl Transition {
    fn append(mut self, sender: Sender, text: impl Into<String>) -> Self {
        self.appends.push((sender, text.into()));
        self
    }

    fn request(mut self, generation: u64, call: CoachCall) -> Self {
        self.request = Some(PendingRequest { generation, call });
        self
    }
}

impl DialogueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Back to Idle with an empty scenario. Outstanding requests become stale.
    pub fn reset(&mut self) {
        self.mode = Mode::Idle;
        self.clear_simulation();
        self.generation += 1;
    }

    fn clear_simulation(&mut self) {
        self.step = SetupStep::Topic;
        self.context = SimulationContext::default();
    }

    /// Decide what a user utterance means.
    ///
    /// Termination phrases are checked before the mode and win over any
    /// pending setup write. `history` is only evaluated on termination.
    pub fn on_user_turn(
        &mut self,
        text: &str,
        phrases: &Phrases,
        termination: &TerminationMatcher,
        history: impl FnOnce() -> String,
    ) -> Transition {
        if termination.matches(text) {
            tracing::info!(from = %self.mode, "termination phrase detected, starting debrief");
            self.mode = Mode::Debrief;
            self.clear_simulation();
            self.generation += 1;
            return Transition::default()
                .append(Sender::System, phrases.debrief_started)
                .request(
                    self.generation,
                    CoachCall::Debrief {
                        conversation: history(),
                    },
                );
        }

        match self.mode {
            Mode::Idle => Transition::default().request(
                self.generation,
                CoachCall::Classify {
                    text: text.to_string(),
                },
            ),
            Mode::SimulationSetup if !self.step.is_done() => self.advance_setup(text, phrases),
            Mode::SimulationSetup | Mode::Simulation => {
                // A setup that already reached Done is a simulation.
                self.mode = Mode::Simulation;
                Transition::default().request(
                    self.generation,
                    CoachCall::SimulationTurn {
                        context: self.context.clone(),
                        text: text.to_string(),
                    },
                )
            }
            Mode::Debrief => Transition::default().request(
                self.generation,
                CoachCall::Debrief {
                    conversation: text.to_string(),
                },
            ),
            Mode::Journal | Mode::MentalPrep => {
                tracing::debug!(mode = %self.mode, "module unavailable, returning to IDLE");
                self.mode = Mode::Idle;
                Transition::default().append(Sender::System, phrases.module_unavailable)
            }
        }
    }

    /// Setup step machine: store `text` in the current step's slot, move to
    /// the next step, ask its question, and start the simulation on `Done`.
    ///
    /// Accepts any input verbatim. A slot already filled during this setup
    /// is never overwritten.
    pub fn advance_setup(&mut self, text: &str, phrases: &Phrases) -> Transition {
        let current = self.step;
        if let Some(slot) = self.context.slot_mut(current)
            && slot.is_none()
        {
            *slot = Some(text.to_string());
        }

        let next = current.next();
        self.step = next;
        if next.is_done() {
            self.mode = Mode::Simulation;
        }
        tracing::debug!(?current, ?next, mode = %self.mode, "setup step advanced");

        Transition::default().append(Sender::System, phrases.setup_question(next))
    }

    /// Apply a coach reply. `None` when the reply belongs to a stale generation.
    pub fn on_coach_reply(
        &mut self,
        generation: u64,
        reply: CoachReply,
        phrases: &Phrases,
    ) -> Option<Transition> {
        if generation != self.generation {
            tracing::warn!(
                generation,
                current = self.generation,
                "discarding coach reply from a stale generation"
            );
            return None;
        }

        let transition = match reply {
            CoachReply::Classified(Classification {
                next_mode,
                response,
            }) => {
                let transition = Transition::default().append(Sender::AiPersona, response);
                if next_mode == Mode::SimulationSetup {
                    self.mode = Mode::SimulationSetup;
                    self.clear_simulation();
                    transition.append(Sender::System, phrases.setup_question(SetupStep::Topic))
                } else {
                    self.mode = next_mode;
                    transition
                }
            }
            CoachReply::SimulationTurn(SimulationReply {
                persona_response,
                coach_comment,
            }) => {
                let transition = Transition::default().append(Sender::AiPersona, persona_response);
                match coach_comment.filter(|c| !c.trim().is_empty()) {
                    Some(comment) => transition.append(Sender::AiCoach, comment),
                    None => transition,
                }
            }
            CoachReply::Debrief(text) => Transition::default().append(Sender::AiCoach, text),
        };
        Some(transition)
    }

    /// Collaborator failure: one generic notice, state untouched.
    pub fn on_coach_failure(&self, generation: u64, phrases: &Phrases) -> Option<Transition> {
        if generation != self.generation {
            return None;
        }
        Some(Transition::default().append(Sender::System, phrases.generic_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::phrases::ENGLISH;

    fn matcher() -> TerminationMatcher {
        TerminationMatcher::for_catalog(&ENGLISH, &[])
    }

    fn no_history() -> String {
        String::new()
    }

    fn in_setup() -> DialogueState {
        DialogueState {
            mode: Mode::SimulationSetup,
            ..Default::default()
        }
    }

    #[test]
    fn idle_turn_requests_classification() {
        let mut state = DialogueState::new();
        let t = state.on_user_turn("I want to train", &ENGLISH, &matcher(), no_history);
        assert!(t.appends.is_empty());
        assert_eq!(
            t.request,
            Some(PendingRequest {
                generation: 0,
                call: CoachCall::Classify {
                    text: "I want to train".to_string()
                }
            })
        );
        assert_eq!(state.mode, Mode::Idle);
    }

    #[test]
    fn classification_into_setup_asks_topic_question() {
        let mut state = DialogueState::new();
        let t = state
            .on_coach_reply(
                0,
                CoachReply::Classified(Classification {
                    next_mode: Mode::SimulationSetup,
                    response: "Let's practice!".to_string(),
                }),
                &ENGLISH,
            )
            .unwrap();
        assert_eq!(
            t.appends,
            vec![
                (Sender::AiPersona, "Let's practice!".to_string()),
                (Sender::System, ENGLISH.setup_topic.to_string()),
            ]
        );
        assert_eq!(state.mode, Mode::SimulationSetup);
        assert_eq!(state.step, SetupStep::Topic);
    }

    #[test]
    fn classification_into_other_mode_is_adopted_verbatim() {
        let mut state = DialogueState::new();
        let t = state
            .on_coach_reply(
                0,
                CoachReply::Classified(Classification {
                    next_mode: Mode::Journal,
                    response: "Open your journal".to_string(),
                }),
                &ENGLISH,
            )
            .unwrap();
        assert_eq!(t.appends.len(), 1);
        assert_eq!(state.mode, Mode::Journal);
    }

    #[test]
    fn four_setup_answers_fill_context_in_order_and_start_simulation() {
        let mut state = in_setup();
        let answers = ["Cold call", "Book a meeting", "Busy CFO", "No budget"];
        let mut questions = Vec::new();
        for answer in answers {
            assert_eq!(state.mode, Mode::SimulationSetup);
            let t = state.on_user_turn(answer, &ENGLISH, &matcher(), no_history);
            assert!(t.request.is_none());
            questions.push(t.appends[0].1.clone());
        }

        assert_eq!(state.mode, Mode::Simulation);
        assert_eq!(state.step, SetupStep::Done);
        assert_eq!(state.context.topic.as_deref(), Some("Cold call"));
        assert_eq!(state.context.objective.as_deref(), Some("Book a meeting"));
        assert_eq!(state.context.persona.as_deref(), Some("Busy CFO"));
        assert_eq!(state.context.feared_objection.as_deref(), Some("No budget"));
        assert_eq!(
            questions,
            vec![
                ENGLISH.setup_objective,
                ENGLISH.setup_persona,
                ENGLISH.setup_feared_objection,
                ENGLISH.setup_done,
            ]
        );
    }

    #[test]
    fn setup_accepts_any_text_verbatim() {
        let mut state = in_setup();
        state.advance_setup("  ?!  ", &ENGLISH);
        assert_eq!(state.context.topic.as_deref(), Some("  ?!  "));
    }

    #[test]
    fn setup_never_overwrites_a_filled_slot() {
        let mut state = in_setup();
        state.context.topic = Some("first".to_string());
        state.advance_setup("second", &ENGLISH);
        assert_eq!(state.context.topic.as_deref(), Some("first"));
        assert_eq!(state.step, SetupStep::Objective);
    }

    #[test]
    fn simulation_turn_carries_full_context() {
        let mut state = DialogueState {
            mode: Mode::Simulation,
            step: SetupStep::Done,
            context: SimulationContext {
                topic: Some("Price".to_string()),
                ..Default::default()
            },
            generation: 3,
        };
        let t = state.on_user_turn("Hello sir", &ENGLISH, &matcher(), no_history);
        assert_eq!(
            t.request,
            Some(PendingRequest {
                generation: 3,
                call: CoachCall::SimulationTurn {
                    context: state.context.clone(),
                    text: "Hello sir".to_string(),
                }
            })
        );
    }

    #[test]
    fn simulation_reply_skips_blank_coach_comment() {
        let mut state = DialogueState {
            mode: Mode::Simulation,
            ..Default::default()
        };
        let with_comment = state
            .on_coach_reply(
                0,
                CoachReply::SimulationTurn(SimulationReply {
                    persona_response: "Too expensive.".to_string(),
                    coach_comment: Some("Ask about value".to_string()),
                }),
                &ENGLISH,
            )
            .unwrap();
        assert_eq!(
            with_comment.appends,
            vec![
                (Sender::AiPersona, "Too expensive.".to_string()),
                (Sender::AiCoach, "Ask about value".to_string()),
            ]
        );

        let blank = state
            .on_coach_reply(
                0,
                CoachReply::SimulationTurn(SimulationReply {
                    persona_response: "Go on.".to_string(),
                    coach_comment: Some("  ".to_string()),
                }),
                &ENGLISH,
            )
            .unwrap();
        assert_eq!(blank.appends, vec![(Sender::AiPersona, "Go on.".to_string())]);
    }

    #[test]
    fn termination_mid_setup_discards_pending_write() {
        let mut state = in_setup();
        state.advance_setup("Cold call", &ENGLISH);
        assert_eq!(state.step, SetupStep::Objective);

        let t = state.on_user_turn(
            "actually, stop the simulation",
            &ENGLISH,
            &matcher(),
            || "USER: Cold call".to_string(),
        );

        assert_eq!(state.mode, Mode::Debrief);
        assert_eq!(state.step, SetupStep::Topic);
        assert!(state.context.is_empty());
        assert_eq!(
            t.appends,
            vec![(Sender::System, ENGLISH.debrief_started.to_string())]
        );
        assert_eq!(
            t.request.map(|r| r.call),
            Some(CoachCall::Debrief {
                conversation: "USER: Cold call".to_string()
            })
        );
    }

    #[test]
    fn termination_bumps_generation_so_old_replies_are_stale() {
        let mut state = DialogueState {
            mode: Mode::Simulation,
            ..Default::default()
        };
        let t = state.on_user_turn("End the simulation", &ENGLISH, &matcher(), no_history);
        let generation = t.request.map(|r| r.generation).unwrap();
        assert_eq!(generation, 1);

        assert!(
            state
                .on_coach_reply(0, CoachReply::Debrief("late".to_string()), &ENGLISH)
                .is_none()
        );
        assert!(
            state
                .on_coach_reply(1, CoachReply::Debrief("fresh".to_string()), &ENGLISH)
                .is_some()
        );
    }

    #[test]
    fn history_is_not_built_without_termination() {
        let mut state = DialogueState::new();
        state.on_user_turn("hello", &ENGLISH, &matcher(), || {
            panic!("history must not be evaluated")
        });
    }

    #[test]
    fn debrief_mode_forwards_raw_text() {
        let mut state = DialogueState {
            mode: Mode::Debrief,
            ..Default::default()
        };
        let t = state.on_user_turn("The client hung up", &ENGLISH, &matcher(), no_history);
        assert_eq!(
            t.request.map(|r| r.call),
            Some(CoachCall::Debrief {
                conversation: "The client hung up".to_string()
            })
        );
        assert_eq!(state.mode, Mode::Debrief);
    }

    #[test]
    fn unavailable_modules_return_to_idle() {
        for mode in [Mode::Journal, Mode::MentalPrep] {
            let mut state = DialogueState {
                mode,
                ..Default::default()
            };
            let t = state.on_user_turn("dear diary", &ENGLISH, &matcher(), no_history);
            assert_eq!(state.mode, Mode::Idle);
            assert!(t.request.is_none());
            assert_eq!(
                t.appends,
                vec![(Sender::System, ENGLISH.module_unavailable.to_string())]
            );
        }
    }

    #[test]
    fn failure_appends_generic_error_and_keeps_state() {
        let state = DialogueState {
            mode: Mode::Simulation,
            step: SetupStep::Done,
            ..Default::default()
        };
        let before = state.clone();
        let t = state.on_coach_failure(0, &ENGLISH).unwrap();
        assert_eq!(
            t.appends,
            vec![(Sender::System, ENGLISH.generic_error.to_string())]
        );
        assert_eq!(state, before);
        assert!(state.on_coach_failure(7, &ENGLISH).is_none());
    }

    #[test]
    fn reset_returns_to_initial_values_and_invalidates_requests() {
        let mut state = in_setup();
        state.advance_setup("topic", &ENGLISH);
        state.reset();
        assert_eq!(state.mode, Mode::Idle);
        assert_eq!(state.step, SetupStep::Topic);
        assert!(state.context.is_empty());
        assert_eq!(state.generation(), 1);
    }
}
