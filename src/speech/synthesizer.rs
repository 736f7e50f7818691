//! Speech-output collaborator.

use crate::defaults;
use crate::error::{EchoError, Result};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Trait for text-to-speech engines.
///
/// `speak` returns as soon as the utterance has started; the audio plays
/// in the background until it ends or [`SpeechSynthesizer::cancel_current`].
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str, language: &str) -> Result<()>;

    /// Silence the current utterance, if any. Never fails.
    fn cancel_current(&self);

    fn is_speaking(&self) -> bool;

    /// Name for logging/debugging.
    fn name(&self) -> &str {
        "synthesizer"
    }
}

impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    fn speak(&self, text: &str, language: &str) -> Result<()> {
        (**self).speak(text, language)
    }

    fn cancel_current(&self) {
        (**self).cancel_current()
    }

    fn is_speaking(&self) -> bool {
        (**self).is_speaking()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Speaks by running `<command> -v <primary subtag> <text>` (espeak-ng style).
/// The child process is the utterance; killing it cancels.
pub struct CommandSynthesizer {
    command: String,
    current: Mutex<Option<Child>>,
    missing_reported: AtomicBool,
}

impl CommandSynthesizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            current: Mutex::new(None),
            missing_reported: AtomicBool::new(false),
        }
    }

    /// True when the command can be found.
    pub fn is_available(&self) -> bool {
        crate::sys::find_executable(&self.command).is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Child>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn kill(child: &mut Child) {
        if let Err(e) = child.kill()
            && e.kind() != std::io::ErrorKind::InvalidInput
        {
            tracing::debug!(error = %e, "failed to kill synthesizer");
        }
        if let Err(e) = child.wait() {
            tracing::debug!(error = %e, "synthesizer wait failed");
        }
    }
}

impl Default for CommandSynthesizer {
    fn default() -> Self {
        Self::new(defaults::DEFAULT_SYNTHESIZER)
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&self, text: &str, language: &str) -> Result<()> {
        let mut current = self.lock();
        if let Some(mut previous) = current.take() {
            Self::kill(&mut previous);
        }

        if !self.is_available() {
            if !self.missing_reported.swap(true, Ordering::SeqCst) {
                tracing::warn!(tool = %self.command, "speech synthesizer not found, speech output unavailable");
            }
            return Err(EchoError::SynthesizerNotFound {
                tool: self.command.clone(),
            });
        }

        let child = Command::new(&self.command)
            .arg("-v")
            .arg(defaults::primary_subtag(language))
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EchoError::Synthesis {
                message: format!("failed to spawn '{}': {e}", self.command),
            })?;
        tracing::trace!(pid = child.id(), chars = text.chars().count(), "utterance started");
        *current = Some(child);
        Ok(())
    }

    fn cancel_current(&self) {
        if let Some(mut child) = self.lock().take() {
            Self::kill(&mut child);
            tracing::debug!("utterance cancelled");
        }
    }

    fn is_speaking(&self) -> bool {
        match self.lock().as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn name(&self) -> &str {
        &self.command
    }
}

impl Drop for CommandSynthesizer {
    fn drop(&mut self) {
        self.cancel_current();
    }
}

#[derive(Debug, Default)]
struct MockState {
    spoken: Vec<(String, String)>,
    cancels: usize,
    speaking: bool,
    unavailable: bool,
}

/// Synthesizer that records utterances instead of playing them.
#[derive(Debug, Clone, Default)]
pub struct MockSynthesizer {
    state: Arc<Mutex<MockState>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `speak` fail as if the engine were missing.
    pub fn unavailable(self) -> Self {
        self.lock().unavailable = true;
        self
    }

    /// `(text, language)` of each utterance started.
    pub fn spoken(&self) -> Vec<(String, String)> {
        self.lock().spoken.clone()
    }

    /// Number of `cancel_current` calls that interrupted an utterance.
    pub fn cancels(&self) -> usize {
        self.lock().cancels
    }

    /// Let the current utterance play to its end.
    pub fn finish(&self) {
        self.lock().speaking = false;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn speak(&self, text: &str, language: &str) -> Result<()> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(EchoError::SynthesizerNotFound {
                tool: "mock".to_string(),
            });
        }
        state.spoken.push((text.to_string(), language.to_string()));
        state.speaking = true;
        Ok(())
    }

    fn cancel_current(&self) {
        let mut state = self.lock();
        if state.speaking {
            state.cancels += 1;
            state.speaking = false;
        }
    }

    fn is_speaking(&self) -> bool {
        self.lock().speaking
    }

    fn name(&self) -> &str {
        "mock"
    }
}
