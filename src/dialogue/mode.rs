//! Conversational modes, guided-setup steps and the simulation scenario.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level conversational phase. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    #[default]
    Idle,
    SimulationSetup,
    Simulation,
    Debrief,
    Journal,
    MentalPrep,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Idle,
        Mode::SimulationSetup,
        Mode::Simulation,
        Mode::Debrief,
        Mode::Journal,
        Mode::MentalPrep,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            Mode::Idle => "IDLE",
            Mode::SimulationSetup => "SIMULATION_SETUP",
            Mode::Simulation => "SIMULATION",
            Mode::Debrief => "DEBRIEF",
            Mode::Journal => "JOURNAL",
            Mode::MentalPrep => "MENTAL_PREP",
        }
    }

    /// Parse a wire name, case-insensitively. `None` for anything unknown.
    pub fn from_wire(value: &str) -> Option<Mode> {
        let value = value.trim();
        Mode::ALL
            .into_iter()
            .find(|mode| mode.wire_name().eq_ignore_ascii_case(value))
    }

    /// Like [`Mode::from_wire`], but unknown values fall back to `Idle`.
    pub fn from_wire_or_idle(value: &str) -> Mode {
        Mode::from_wire(value).unwrap_or_else(|| {
            tracing::warn!(value, "unknown mode from coach, falling back to IDLE");
            Mode::Idle
        })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Ordered sub-phase of `SimulationSetup`, one scenario field per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetupStep {
    #[default]
    Topic,
    Objective,
    Persona,
    FearedObjection,
    Done,
}

impl SetupStep {
    /// The single successor in `Topic → Objective → Persona → FearedObjection → Done`.
    /// `Done` is terminal and maps to itself.
    pub fn next(self) -> SetupStep {
        match self {
            SetupStep::Topic => SetupStep::Objective,
            SetupStep::Objective => SetupStep::Persona,
            SetupStep::Persona => SetupStep::FearedObjection,
            SetupStep::FearedObjection => SetupStep::Done,
            SetupStep::Done => SetupStep::Done,
        }
    }

    pub fn is_done(self) -> bool {
        self == SetupStep::Done
    }
}

/// Scenario parameters gathered during setup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feared_objection: Option<String>,
}

impl SimulationContext {
    pub fn is_empty(&self) -> bool {
        self == &SimulationContext::default()
    }

    pub fn is_complete(&self) -> bool {
        self.topic.is_some()
            && self.objective.is_some()
            && self.persona.is_some()
            && self.feared_objection.is_some()
    }

    /// Slot owned by a setup step. `Done` owns nothing.
    pub(crate) fn slot_mut(&mut self, step: SetupStep) -> Option<&mut Option<String>> {
        match step {
            SetupStep::Topic => Some(&mut self.topic),
            SetupStep::Objective => Some(&mut self.objective),
            SetupStep::Persona => Some(&mut self.persona),
            SetupStep::FearedObjection => Some(&mut self.feared_objection),
            SetupStep::Done => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_wire_names_round_trip_through_serde() {
        for mode in Mode::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.wire_name()));
        }
    }

    #[test]
    fn mode_from_wire_is_case_insensitive() {
        assert_eq!(Mode::from_wire("simulation_setup"), Some(Mode::SimulationSetup));
        assert_eq!(Mode::from_wire(" MENTAL_PREP "), Some(Mode::MentalPrep));
        assert_eq!(Mode::from_wire("COOKING"), None);
    }

    #[test]
    fn unknown_mode_falls_back_to_idle() {
        assert_eq!(Mode::from_wire_or_idle("BOGUS"), Mode::Idle);
        assert_eq!(Mode::from_wire_or_idle("DEBRIEF"), Mode::Debrief);
    }

    #[test]
    fn setup_steps_follow_fixed_order() {
        let mut step = SetupStep::default();
        let mut visited = vec![step];
        while !step.is_done() {
            step = step.next();
            visited.push(step);
        }
        assert_eq!(
            visited,
            vec![
                SetupStep::Topic,
                SetupStep::Objective,
                SetupStep::Persona,
                SetupStep::FearedObjection,
                SetupStep::Done
            ]
        );
        assert_eq!(SetupStep::Done.next(), SetupStep::Done);
    }

    #[test]
    fn context_serializes_camel_case_and_skips_empty() {
        let ctx = SimulationContext {
            topic: Some("Cold call".to_string()),
            feared_objection: Some("Too expensive".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(
            json,
            r#"{"topic":"Cold call","fearedObjection":"Too expensive"}"#
        );
        assert_eq!(serde_json::to_string(&SimulationContext::default()).unwrap(), "{}");
    }

    #[test]
    fn context_completeness() {
        let mut ctx = SimulationContext::default();
        assert!(ctx.is_empty());
        for step in [
            SetupStep::Topic,
            SetupStep::Objective,
            SetupStep::Persona,
            SetupStep::FearedObjection,
        ] {
            assert!(!ctx.is_complete());
            if let Some(slot) = ctx.slot_mut(step) {
                *slot = Some(format!("{:?}", step));
            }
        }
        assert!(ctx.is_complete());
        assert!(ctx.slot_mut(SetupStep::Done).is_none());
    }
}
