//! Terminal rendering for the chat session.

use crate::dialogue::message::{Message, Sender};
use crate::dialogue::mode::Mode;
use std::io::{self, Write};

const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Clear the current terminal line (replaces the live transcript).
pub fn clear_line() {
    eprint!("\r\x1b[2K");
}

fn sender_label(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "you",
        Sender::AiPersona => "echo",
        Sender::AiCoach => "coach",
        Sender::System => "echo",
    }
}

fn sender_color(sender: Sender) -> &'static str {
    match sender {
        Sender::User => BOLD,
        Sender::AiPersona => GREEN,
        Sender::AiCoach => YELLOW,
        Sender::System => DIM,
    }
}

/// One message as a block: a `label>` prefix on the first line, continuation
/// lines indented under it.
pub fn format_message(message: &Message, color: bool) -> String {
    let label = sender_label(message.sender);
    let indent = " ".repeat(label.len() + 2);
    let body = message
        .text
        .lines()
        .collect::<Vec<_>>()
        .join(&format!("\n{indent}"));
    if color {
        let c = sender_color(message.sender);
        format!("{c}{label}>{RESET} {c}{body}{RESET}")
    } else {
        format!("{label}> {body}")
    }
}

/// Print messages to stdout.
pub fn render_messages(messages: &[Message], color: bool) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for message in messages {
        if writeln!(out, "{}\n", format_message(message, color)).is_err() {
            return;
        }
    }
}

/// Live transcript line on stderr, overwritten on each update.
pub fn render_transcript(text: &str, color: bool) {
    clear_line();
    if color {
        eprint!("{CYAN}🎤 {text}{RESET}");
    } else {
        eprint!("[mic] {text}");
    }
    io::stderr().flush().ok();
}

/// Status line shown before the prompt: mode plus toggles.
pub fn format_status(mode: Mode, listening: bool, speaking_enabled: bool) -> String {
    format!(
        "[{}] voice:{} speech:{}",
        mode,
        if listening { "on" } else { "off" },
        if speaking_enabled { "on" } else { "off" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message_has_label_prefix() {
        let message = Message::new(Sender::AiCoach, "Slow down.");
        assert_eq!(format_message(&message, false), "coach> Slow down.");
    }

    #[test]
    fn multiline_message_is_indented() {
        let message = Message::new(Sender::User, "line one\nline two");
        assert_eq!(format_message(&message, false), "you> line one\n     line two");
    }

    #[test]
    fn colored_message_wraps_in_sender_color() {
        let message = Message::new(Sender::AiPersona, "Who is this?");
        let out = format_message(&message, true);
        assert!(out.starts_with(GREEN));
        assert!(out.contains("Who is this?"));
        assert!(out.ends_with(RESET));
    }

    #[test]
    fn status_line_shows_mode_and_toggles() {
        assert_eq!(
            format_status(Mode::SimulationSetup, true, false),
            "[SIMULATION_SETUP] voice:on speech:off"
        );
    }
}
