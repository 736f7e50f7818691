//! Speech output controller: speaks AI and system messages as they are logged.

use crate::dialogue::message::Message;
use crate::speech::synthesizer::SpeechSynthesizer;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Read-only observer of the message log.
pub struct SpeechOutputController {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    language: String,
    enabled: AtomicBool,
}

impl SpeechOutputController {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        language: impl Into<String>,
        enabled: bool,
    ) -> Self {
        Self {
            synthesizer,
            language: language.into(),
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Turning output off silences the current utterance immediately.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was && !enabled {
            self.synthesizer.cancel_current();
        }
        if was != enabled {
            tracing::debug!(enabled, "speech output toggled");
        }
    }

    /// Flip output on/off. Returns the new setting.
    pub fn toggle(&self) -> bool {
        let enabled = !self.is_enabled();
        self.set_enabled(enabled);
        enabled
    }

    /// React to a newly logged message. Returns true when it was spoken.
    ///
    /// User messages and the bootstrap greeting are never spoken. Engine
    /// failures are logged and swallowed.
    ///
    /// `set_enabled(false)` may land at any point while this runs on the
    /// observer thread. The flag is stored before the mute cancels, so it is
    /// read again after every step: an utterance started across a mute is
    /// cancelled here.
    pub fn on_message(&self, message: &Message) -> bool {
        if !self.is_enabled() || !message.sender.is_ai_authored() || message.is_bootstrap() {
            return false;
        }
        self.synthesizer.cancel_current();
        if !self.is_enabled() {
            return false;
        }
        if let Err(e) = self.synthesizer.speak(&message.text, &self.language) {
            tracing::debug!(engine = self.synthesizer.name(), error = %e, "message not spoken");
            return false;
        }
        if !self.is_enabled() {
            self.synthesizer.cancel_current();
            tracing::debug!("speech output muted while starting, utterance cancelled");
            return false;
        }
        true
    }

    /// Silence anything playing, e.g. on exit.
    pub fn cancel(&self) {
        self.synthesizer.cancel_current();
    }

    /// Consume log events on a background thread until every sender is gone.
    pub fn spawn(self: Arc<Self>, events: Receiver<Message>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("speech-output".to_string())
            .spawn(move || {
                for message in events {
                    self.on_message(&message);
                }
                self.cancel();
                tracing::trace!("speech output observer finished");
            })
    }
}
