//! Scripted coach for tests and offline runs.

use crate::coach::{Classification, Coach, SimulationReply};
use crate::dialogue::mode::{Mode, SimulationContext};
use crate::error::{EchoError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// A call the mock received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Classify(String),
    SimulationTurn(SimulationContext, String),
    Debrief(String),
}

#[derive(Debug, Default)]
struct Script {
    classifications: VecDeque<Classification>,
    simulation_replies: VecDeque<SimulationReply>,
    debriefs: VecDeque<String>,
    calls: Vec<RecordedCall>,
}

/// Mock coach returning queued responses, then fixed defaults.
#[derive(Debug, Clone, Default)]
pub struct MockCoach {
    script: Arc<Mutex<Script>>,
    should_fail: bool,
    gate: Option<Arc<Semaphore>>,
}

impl MockCoach {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a classification result.
    pub fn with_classification(self, next_mode: Mode, response: &str) -> Self {
        self.lock().classifications.push_back(Classification {
            next_mode,
            response: response.to_string(),
        });
        self
    }

    /// Queue a simulation reply.
    pub fn with_simulation_reply(self, persona: &str, coach_comment: Option<&str>) -> Self {
        self.lock().simulation_replies.push_back(SimulationReply {
            persona_response: persona.to_string(),
            coach_comment: coach_comment.map(str::to_string),
        });
        self
    }

    /// Queue a debrief reply.
    pub fn with_debrief(self, text: &str) -> Self {
        self.lock().debriefs.push_back(text.to_string());
        self
    }

    /// Configure every operation to fail.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Hold every call until a permit is added to `gate`.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn enter(&self, call: RecordedCall) -> Result<()> {
        self.lock().calls.push(call);
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| EchoError::Other(format!("mock gate closed: {e}")))?;
            permit.forget();
        }
        if self.should_fail {
            return Err(EchoError::CollaboratorRequest {
                status: Some(503),
                message: "mock coach failure".to_string(),
                retryable: true,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Coach for MockCoach {
    async fn classify(&self, user_text: &str) -> Result<Classification> {
        self.enter(RecordedCall::Classify(user_text.to_string()))
            .await?;
        Ok(self
            .lock()
            .classifications
            .pop_front()
            .unwrap_or_else(|| Classification {
                next_mode: Mode::Idle,
                response: "mock response".to_string(),
            }))
    }

    async fn simulation_turn(
        &self,
        context: &SimulationContext,
        user_text: &str,
    ) -> Result<SimulationReply> {
        self.enter(RecordedCall::SimulationTurn(
            context.clone(),
            user_text.to_string(),
        ))
        .await?;
        Ok(self
            .lock()
            .simulation_replies
            .pop_front()
            .unwrap_or_else(|| SimulationReply {
                persona_response: "mock persona reply".to_string(),
                coach_comment: None,
            }))
    }

    async fn debrief(&self, conversation: &str) -> Result<String> {
        self.enter(RecordedCall::Debrief(conversation.to_string()))
            .await?;
        Ok(self
            .lock()
            .debriefs
            .pop_front()
            .unwrap_or_else(|| "mock debrief".to_string()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
