//! Final/interim transcript merge.

use crate::voice::recognizer::RecognitionEvent;

/// Live transcript recomputed from one recognition event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    pub final_text: String,
    pub interim_text: String,
}

impl Transcript {
    /// Merge a result event.
    ///
    /// Final text is rebuilt from every final segment starting at index 0,
    /// since engines may re-flag earlier segments as final across events.
    /// Interim text only considers segments from the event's result index.
    pub fn from_event(event: &RecognitionEvent) -> Self {
        let final_text = event
            .results
            .iter()
            .filter(|s| s.is_final)
            .map(|s| s.transcript.as_str())
            .collect();
        let interim_text = event
            .results
            .iter()
            .skip(event.result_index)
            .filter(|s| !s.is_final)
            .map(|s| s.transcript.as_str())
            .collect();
        Self {
            final_text,
            interim_text,
        }
    }

    /// What the input field shows.
    pub fn displayed(&self) -> String {
        format!("{}{}", self.final_text, self.interim_text)
    }
}
