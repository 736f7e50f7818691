//! The generative-AI collaborator that plays the persona and the coach.

pub mod mock;
pub mod prompt;

#[cfg(feature = "gemini")]
pub mod gemini;

use crate::dialogue::mode::{Mode, SimulationContext};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Result of routing a free-form request from Idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub next_mode: Mode,
    /// Opening line for the chosen mode
    pub response: String,
}

/// One exchange inside a running simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReply {
    pub persona_response: String,
    /// Meta feedback from the coach, absent when no intervention is needed
    pub coach_comment: Option<String>,
}

/// Trait for the coaching collaborator.
///
/// Every operation may fail; the orchestrator turns failures into a
/// user-visible notice and never propagates them.
#[async_trait]
pub trait Coach: Send + Sync {
    /// Decide which mode the user's request belongs to.
    async fn classify(&self, user_text: &str) -> Result<Classification>;

    /// Play the persona described by `context` and optionally coach.
    async fn simulation_turn(
        &self,
        context: &SimulationContext,
        user_text: &str,
    ) -> Result<SimulationReply>;

    /// Socratic debrief over a conversation transcript or a free-form account.
    async fn debrief(&self, conversation: &str) -> Result<String>;

    /// Name for logging/debugging.
    fn name(&self) -> &str {
        "coach"
    }
}

#[async_trait]
impl<T: Coach + ?Sized> Coach for Arc<T> {
    async fn classify(&self, user_text: &str) -> Result<Classification> {
        (**self).classify(user_text).await
    }

    async fn simulation_turn(
        &self,
        context: &SimulationContext,
        user_text: &str,
    ) -> Result<SimulationReply> {
        (**self).simulation_turn(context, user_text).await
    }

    async fn debrief(&self, conversation: &str) -> Result<String> {
        (**self).debrief(conversation).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

pub use mock::{MockCoach, RecordedCall};
