//! Speech input: recognition engines, transcript merge and the capture pipeline.

pub mod capture;
pub mod recognizer;
pub mod transcript;

pub use capture::{ListeningState, VoiceCapture};
pub use recognizer::{
    CommandRecognizer, DisabledRecognizer, EngineEvent, EventSink, MockRecognizer,
    RecognitionEvent, Segment, SessionEvent, SpeechRecognizer,
};
pub use transcript::Transcript;

use crate::config::VoiceConfig;

/// Engine for a voice configuration: the configured command, or a disabled
/// engine explaining why voice input is off.
pub fn recognizer_from_config(config: &VoiceConfig) -> Box<dyn SpeechRecognizer> {
    if !config.enabled {
        return Box::new(DisabledRecognizer::new("voice input disabled"));
    }
    match &config.recognizer_command {
        Some(argv) if !argv.is_empty() => Box::new(CommandRecognizer::new(argv.clone())),
        _ => Box::new(DisabledRecognizer::new(
            "no recognizer command configured ([voice] recognizer_command)",
        )),
    }
}
