//! echocoach - Voice-enabled sales coaching sparring partner
//!
//! A dialogue engine that routes free-form requests to coaching modes, walks
//! the user through a role-play setup, runs the simulation against a
//! generative-AI coach and debriefs it, with optional voice input and
//! spoken replies.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod coach;
pub mod config;
pub mod defaults;
#[cfg(feature = "cli")]
pub mod diagnostics;
pub mod dialogue;
pub mod error;
pub mod output;
pub mod speech;
pub mod sys;
pub mod voice;

// Composition root - needs the real coach and the CLI stack
#[cfg(all(feature = "cli", feature = "gemini"))]
pub mod app;

// Core seams (coach, recognizer, synthesizer, clock)
pub use clock::{Clock, MockClock, SystemClock};
pub use coach::{Classification, Coach, MockCoach, SimulationReply};
pub use speech::{SpeechOutputController, SpeechSynthesizer};
pub use voice::{SpeechRecognizer, VoiceCapture};

// Dialogue
pub use dialogue::{
    DialogueState, Message, MessageLog, Mode, Orchestrator, Sender, SetupStep, SimulationContext,
    SubmitOutcome, TurnPermit,
};

// Error handling
pub use error::{EchoError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
