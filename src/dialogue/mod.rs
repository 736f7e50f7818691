//! Conversation engine: modes, the scenario setup, and the message log.

pub mod message;
pub mod mode;
pub mod orchestrator;
pub mod phrases;
pub mod state;

pub use message::{Message, MessageLog, Sender};
pub use mode::{Mode, SetupStep, SimulationContext};
pub use orchestrator::{Orchestrator, SubmitOutcome, TurnPermit};
pub use phrases::{Phrases, TerminationMatcher};
pub use state::{CoachCall, CoachReply, DialogueState, PendingRequest, Transition};
