//! Speech output: synthesizer engines and the log observer that drives them.

pub mod controller;
pub mod synthesizer;

pub use controller::SpeechOutputController;
pub use synthesizer::{CommandSynthesizer, MockSynthesizer, SpeechSynthesizer};
