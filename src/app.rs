//! Interactive chat session entry point.
//!
//! Wires the coach, the dialogue orchestrator, voice capture and speech
//! output together and runs the terminal input loop:
//! input → orchestrator → message log → (render, speak)

use crate::coach::Coach;
use crate::coach::gemini::GeminiCoach;
use crate::config::Config;
use crate::defaults;
use crate::dialogue::{MessageLog, Orchestrator, Phrases, TerminationMatcher};
use crate::error::{EchoError, Result};
use crate::output;
use crate::speech::{CommandSynthesizer, SpeechOutputController, SpeechSynthesizer};
use crate::voice::{self, VoiceCapture};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Command-line overrides applied on top of the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub language: Option<String>,
    pub mute: bool,
    pub no_voice: bool,
    pub send_guard: Option<Duration>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.coach.model = model.clone();
        }
        if let Some(language) = &self.language {
            config.speech.language = language.clone();
        }
        if self.mute {
            config.speech.output_enabled = false;
        }
        if self.no_voice {
            config.voice.enabled = false;
        }
        if let Some(guard) = self.send_guard {
            config.voice.send_guard_ms = guard.as_millis().try_into().unwrap_or(u64::MAX);
        }
    }
}

/// One line of user input, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Text to send. Empty means "send the live voice transcript".
    Submit(String),
    ToggleVoice,
    ToggleSpeech,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

impl Input {
    pub fn parse(line: &str) -> Input {
        let trimmed = line.trim();
        match trimmed {
            "/voice" => Input::ToggleVoice,
            "/speak" => Input::ToggleSpeech,
            "/reset" => Input::Reset,
            "/help" => Input::Help,
            "/quit" | "/exit" => Input::Quit,
            cmd if cmd.starts_with('/') && !cmd.contains(char::is_whitespace) => {
                Input::Unknown(cmd.to_string())
            }
            _ => Input::Submit(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

const HELP: &str = "Commands: /voice (toggle listening), /speak (toggle speech output), \
                    /reset (new conversation), /quit. Empty line sends the voice transcript.";

fn lock_voice(voice: &Mutex<VoiceCapture>) -> MutexGuard<'_, VoiceCapture> {
    voice.lock().unwrap_or_else(|e| e.into_inner())
}

/// Run the interactive coaching session until `/quit`, EOF or Ctrl+C.
pub async fn run_chat(config: Config, quiet: bool, color: bool) -> Result<()> {
    let language = config.speech.language.clone();
    let phrases = Phrases::for_language(&language);

    let coach: Arc<dyn Coach> = Arc::new(GeminiCoach::from_config(&config.coach, &language)?);
    tracing::info!(coach = coach.name(), model = %config.coach.model, %language, "starting chat");

    // Speech output observes every log append.
    let (message_tx, message_rx) = crossbeam_channel::bounded(defaults::MESSAGE_EVENT_BUFFER);
    let synthesizer = Arc::new(CommandSynthesizer::new(
        config.speech.synthesizer_command.clone(),
    ));
    if config.speech.output_enabled && !synthesizer.is_available() && !quiet {
        eprintln!(
            "Speech output unavailable ('{}' not found). Continuing text-only.",
            synthesizer.name()
        );
    }
    let speech = Arc::new(SpeechOutputController::new(
        synthesizer as Arc<dyn SpeechSynthesizer>,
        language.clone(),
        config.speech.output_enabled,
    ));
    Arc::clone(&speech).spawn(message_rx)?;

    let log = MessageLog::new().with_event_sender(message_tx);
    let orchestrator = Arc::new(
        Orchestrator::with_log(coach, phrases, log).with_termination(
            TerminationMatcher::for_catalog(phrases, &config.dialogue.extra_termination_phrases),
        ),
    );

    let voice = Arc::new(Mutex::new(VoiceCapture::new(
        voice::recognizer_from_config(&config.voice),
        language.clone(),
        config.voice.send_guard(),
    )));
    let voice_available = lock_voice(&voice).is_available();
    if config.voice.enabled && !voice_available && !quiet {
        eprintln!("Voice input unavailable. Type your messages instead.");
    }
    spawn_transcript_listener(Arc::clone(&voice), color)?;

    let mut rendered = 0;
    render_new(&orchestrator, &mut rendered, color).await;
    if !quiet {
        eprintln!("{HELP}");
    }

    let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Input::parse(&line) {
                    Input::Quit => break,
                    Input::Help => eprintln!("{HELP}"),
                    Input::Unknown(cmd) => eprintln!("Unknown command {cmd}. {HELP}"),
                    Input::ToggleVoice => {
                        let mut capture = lock_voice(&voice);
                        match capture.toggle() {
                            Ok(true) => eprintln!("Listening... press Enter on an empty line to send."),
                            Ok(false) => {
                                output::clear_line();
                                eprintln!("Voice input off.");
                            }
                            Err(e) => eprintln!("{e}"),
                        }
                    }
                    Input::ToggleSpeech => {
                        let enabled = speech.toggle();
                        eprintln!("Speech output {}.", if enabled { "on" } else { "off" });
                    }
                    Input::Reset => {
                        orchestrator.reset().await;
                        render_new(&orchestrator, &mut rendered, color).await;
                    }
                    Input::Submit(text) => {
                        let (submitted, kept) = {
                            let mut capture = lock_voice(&voice);
                            if !text.is_empty() {
                                capture.set_input(text);
                            }
                            let submitted = capture.submit_turn(&orchestrator);
                            (submitted, !capture.input().trim().is_empty())
                        };
                        match submitted {
                            Some((permit, text)) => {
                                output::clear_line();
                                let orchestrator = Arc::clone(&orchestrator);
                                let done_tx = done_tx.clone();
                                tokio::spawn(async move {
                                    orchestrator.run_turn(permit, &text).await;
                                    if done_tx.send(()).is_err() {
                                        tracing::trace!("chat loop gone before turn completed");
                                    }
                                });
                            }
                            None if kept => eprintln!(
                                "Echo is still answering. Your message is kept; \
                                 press Enter on an empty line to send it."
                            ),
                            None => {}
                        }
                    }
                }
            }
            Some(()) = done_rx.recv() => {
                render_new(&orchestrator, &mut rendered, color).await;
                if !quiet {
                    let listening = lock_voice(&voice).is_listening();
                    eprintln!(
                        "{}",
                        output::format_status(orchestrator.mode().await, listening, speech.is_enabled())
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if !quiet {
                    eprintln!("\nShutting down...");
                }
                break;
            }
        }
    }

    lock_voice(&voice).shutdown();
    speech.set_enabled(false);
    Ok(())
}

async fn render_new(orchestrator: &Orchestrator, rendered: &mut usize, color: bool) {
    let new = orchestrator.messages_since(*rendered).await;
    *rendered += new.len();
    output::render_messages(&new, color);
}

/// Apply recognition events as they arrive and echo the live transcript.
fn spawn_transcript_listener(voice: Arc<Mutex<VoiceCapture>>, color: bool) -> Result<()> {
    let events = lock_voice(&voice).events();
    thread::Builder::new()
        .name("voice-events".to_string())
        .spawn(move || {
            for event in events {
                let changed = lock_voice(&voice).handle_session_event(event);
                if let Some(text) = changed {
                    output::render_transcript(&text, color);
                }
            }
        })
        .map_err(EchoError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slash_commands() {
        assert_eq!(Input::parse("/voice"), Input::ToggleVoice);
        assert_eq!(Input::parse(" /speak "), Input::ToggleSpeech);
        assert_eq!(Input::parse("/reset"), Input::Reset);
        assert_eq!(Input::parse("/quit"), Input::Quit);
        assert_eq!(Input::parse("/exit"), Input::Quit);
        assert_eq!(Input::parse("/nope"), Input::Unknown("/nope".to_string()));
    }

    #[test]
    fn plain_text_and_empty_lines_submit() {
        assert_eq!(
            Input::parse("Negotiating a price"),
            Input::Submit("Negotiating a price".to_string())
        );
        assert_eq!(Input::parse(""), Input::Submit(String::new()));
        assert_eq!(
            Input::parse("/ is not a command"),
            Input::Submit("/ is not a command".to_string())
        );
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = Config::default();
        Overrides {
            model: Some("gemini-2.0-flash".to_string()),
            language: Some("en-US".to_string()),
            mute: true,
            no_voice: true,
            send_guard: Some(Duration::from_millis(800)),
        }
        .apply(&mut config);

        assert_eq!(config.coach.model, "gemini-2.0-flash");
        assert_eq!(config.speech.language, "en-US");
        assert!(!config.speech.output_enabled);
        assert!(!config.voice.enabled);
        assert_eq!(config.voice.send_guard_ms, 800);
    }

    #[test]
    fn empty_overrides_keep_config() {
        let mut config = Config::default();
        Overrides::default().apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
