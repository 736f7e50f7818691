//! Default configuration constants for echocoach.
//!
//! Shared between the configuration types, the collaborator and the voice
//! pipeline so every layer agrees on the same values.

/// Default Gemini model used by the coach collaborator.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Base URL of the Gemini `generateContent` REST endpoint (model appended).
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Timeout for a single collaborator request, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Spoken language of the conversation (BCP-47 tag).
///
/// Drives speech recognition, speech output and the phrase catalog.
pub const DEFAULT_LANGUAGE: &str = "fr-FR";

/// Default text-to-speech command.
pub const DEFAULT_SYNTHESIZER: &str = "espeak-ng";

/// How long recognition events are ignored after a submission (milliseconds).
///
/// Long enough for an in-flight recognition event to drain, short enough
/// not to swallow the start of the next genuine utterance.
pub const SEND_GUARD_MS: u64 = 500;

/// Fixed id of the greeting message seeded into every new conversation.
pub const BOOTSTRAP_MESSAGE_ID: &str = "init-1";

/// Id prefix shared by every greeting, including those re-posted on reset.
pub const GREETING_ID_PREFIX: &str = "init-";

/// Capacity of the message event channel consumed by speech output.
pub const MESSAGE_EVENT_BUFFER: usize = 64;

/// Capacity of the recognition event channel.
pub const RECOGNITION_EVENT_BUFFER: usize = 256;

/// Extract the primary language subtag from a BCP-47 tag ("fr-FR" → "fr").
pub fn primary_subtag(language: &str) -> String {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}
