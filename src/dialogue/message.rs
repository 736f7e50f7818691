//! Messages and the append-only conversation log.

use crate::defaults;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sender {
    User,
    AiPersona,
    AiCoach,
    System,
}

impl Sender {
    /// Stable wire name, also used when serializing history for the coach.
    pub fn wire_name(self) -> &'static str {
        match self {
            Sender::User => "USER",
            Sender::AiPersona => "AI_PERSONA",
            Sender::AiCoach => "AI_COACH",
            Sender::System => "SYSTEM",
        }
    }

    /// True for messages authored by the application rather than the user.
    pub fn is_ai_authored(self) -> bool {
        !matches!(self, Sender::User)
    }
}

/// One immutable conversation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    /// ISO-8601 UTC creation time
    pub timestamp: String,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: next_message_id(now),
            sender,
            text: text.into(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// The greeting every conversation starts with.
    pub fn bootstrap(text: impl Into<String>) -> Self {
        Self {
            id: defaults::BOOTSTRAP_MESSAGE_ID.to_string(),
            ..Self::new(Sender::System, text)
        }
    }

    /// A greeting re-posted when the conversation starts over. Unique id,
    /// but still recognized by [`Message::is_bootstrap`].
    pub fn greeting(text: impl Into<String>) -> Self {
        let message = Self::new(Sender::System, text);
        Self {
            id: format!("{}{}", defaults::GREETING_ID_PREFIX, message.id),
            ..message
        }
    }

    /// True for conversation greetings, which are shown but never spoken.
    pub fn is_bootstrap(&self) -> bool {
        self.id.starts_with(defaults::GREETING_ID_PREFIX)
    }
}

static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// `msg-<millis>-<random>` where millis never goes backwards within the process.
fn next_message_id(now: DateTime<Utc>) -> String {
    let wall = now.timestamp_millis();
    let prev = LAST_MILLIS.fetch_max(wall, Ordering::SeqCst);
    let millis = prev.max(wall);
    let suffix: u64 = rand::thread_rng().r#gen();
    format!("msg-{}-{:016x}", millis, suffix)
}

/// Append-only ordered record of the conversation.
///
/// Entries are never reordered or removed. Every append is also published to
/// the optional event channel so observers (speech output) can react.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    event_tx: Option<crossbeam_channel::Sender<Message>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_sender(mut self, tx: crossbeam_channel::Sender<Message>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Create and append a message, returning a copy of it.
    pub fn append(&mut self, sender: Sender, text: impl Into<String>) -> Message {
        self.push(Message::new(sender, text))
    }

    pub(crate) fn push(&mut self, message: Message) -> Message {
        if let Some(ref tx) = self.event_tx
            && tx.try_send(message.clone()).is_err()
        {
            tracing::debug!(id = %message.id, "message observer lagging or gone; event dropped");
        }
        self.messages.push(message.clone());
        message
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Messages appended after the first `offset` entries.
    pub fn since(&self, offset: usize) -> &[Message] {
        self.messages.get(offset..).unwrap_or(&[])
    }

    /// User/persona exchange rendered one line per message as `SENDER: text`,
    /// restricted to the first `upto` entries.
    pub fn roleplay_transcript(&self, upto: usize) -> String {
        self.messages
            .iter()
            .take(upto)
            .filter(|m| matches!(m.sender, Sender::User | Sender::AiPersona))
            .map(|m| format!("{}: {}", m.sender.wire_name(), m.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_serializes_to_wire_names() {
        let json = serde_json::to_string(&Sender::AiPersona).unwrap();
        assert_eq!(json, "\"AI_PERSONA\"");
        for sender in [Sender::User, Sender::AiPersona, Sender::AiCoach, Sender::System] {
            let json = serde_json::to_string(&sender).unwrap();
            assert_eq!(json, format!("\"{}\"", sender.wire_name()));
        }
    }

    #[test]
    fn message_ids_are_unique() {
        let ids: std::collections::HashSet<String> = (0..500)
            .map(|_| Message::new(Sender::User, "hi").id)
            .collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn message_timestamp_is_iso8601() {
        let msg = Message::new(Sender::System, "hello");
        assert!(DateTime::parse_from_rfc3339(&msg.timestamp).is_ok());
        assert!(msg.timestamp.ends_with('Z'));
    }

    #[test]
    fn bootstrap_message_has_fixed_id() {
        let msg = Message::bootstrap("Bonjour");
        assert!(msg.is_bootstrap());
        assert_eq!(msg.sender, Sender::System);
        assert!(!Message::new(Sender::System, "x").is_bootstrap());
    }

    #[test]
    fn reposted_greeting_is_bootstrap_with_unique_id() {
        let first = Message::greeting("Bonjour");
        let second = Message::greeting("Bonjour");
        assert!(first.is_bootstrap());
        assert_ne!(first.id, second.id);
        assert_ne!(first.id, defaults::BOOTSTRAP_MESSAGE_ID);
    }

    #[test]
    fn log_preserves_append_order() {
        let mut log = MessageLog::new();
        log.append(Sender::User, "one");
        log.append(Sender::AiPersona, "two");
        log.append(Sender::AiCoach, "three");

        let texts: Vec<&str> = log.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(log.since(1).len(), 2);
        assert!(log.since(10).is_empty());
    }

    #[test]
    fn log_publishes_appends() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let mut log = MessageLog::new().with_event_sender(tx);
        let sent = log.append(Sender::AiCoach, "coach says");

        let received = rx.try_recv().unwrap();
        assert_eq!(received, sent);
    }

    #[test]
    fn log_append_survives_dropped_observer() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let mut log = MessageLog::new().with_event_sender(tx);
        log.append(Sender::System, "still logged");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn roleplay_transcript_keeps_only_user_and_persona() {
        let mut log = MessageLog::new();
        log.append(Sender::System, "setup question");
        log.append(Sender::User, "Hello");
        log.append(Sender::AiPersona, "Who is this?");
        log.append(Sender::AiCoach, "Smile while you talk");
        log.append(Sender::User, "stop the simulation");

        let transcript = log.roleplay_transcript(4);
        assert_eq!(transcript, "USER: Hello\nAI_PERSONA: Who is this?");
    }
}
