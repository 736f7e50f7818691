//! Environment diagnostics for the `check` command.
//!
//! Verifies the coach is configured and the speech tools can run.

use crate::config::Config;
use crate::speech::CommandSynthesizer;
use crate::voice::{self, SpeechRecognizer};

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Ready to use
    Ok,
    /// Missing; the feature is unavailable
    NotFound(String),
    /// Usable, with a caveat
    Warning(String),
}

/// The coach needs an API key; the model and endpoint always have defaults.
pub fn check_api_key(config: &Config) -> CheckResult {
    match config.coach.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => CheckResult::Ok,
        _ => CheckResult::NotFound(
            "no API key. Set ECHOCOACH_API_KEY (or GEMINI_API_KEY), or [coach] api_key".to_string(),
        ),
    }
}

pub fn check_synthesizer(config: &Config) -> CheckResult {
    let command = &config.speech.synthesizer_command;
    if CommandSynthesizer::new(command.clone()).is_available() {
        if config.speech.output_enabled {
            CheckResult::Ok
        } else {
            CheckResult::Warning(format!("'{command}' found but speech output is disabled"))
        }
    } else {
        CheckResult::NotFound(format!(
            "'{command}' not found. Install: sudo apt install espeak-ng  (Debian/Ubuntu)"
        ))
    }
}

pub fn check_recognizer(config: &Config) -> CheckResult {
    let recognizer = voice::recognizer_from_config(&config.voice);
    match recognizer.probe() {
        Ok(()) => CheckResult::Ok,
        Err(e) if config.voice.enabled => CheckResult::NotFound(e.to_string()),
        Err(_) => CheckResult::Warning("voice input disabled".to_string()),
    }
}

fn report(label: &str, result: &CheckResult, ok_note: &str) {
    match result {
        CheckResult::Ok => println!("{label}: ✓ OK{ok_note}"),
        CheckResult::NotFound(msg) => println!("{label}: ✗ {msg}"),
        CheckResult::Warning(msg) => println!("{label}: ⚠ WARNING: {msg}"),
    }
}

/// Run every check and print results. Returns true when the coach is usable.
pub fn check_dependencies(config: &Config) -> bool {
    println!("Checking echocoach {} environment...\n", crate::version_string());

    let api_key = check_api_key(config);
    report(
        "Coach API key",
        &api_key,
        &format!(" (model {})", config.coach.model),
    );
    report(
        "Speech output",
        &check_synthesizer(config),
        &format!(" ({})", config.speech.synthesizer_command),
    );
    report("Speech input", &check_recognizer(config), "");

    println!();
    if api_key == CheckResult::Ok {
        println!("Ready. Run `echocoach` to start a session.");
        true
    } else {
        println!("The coach cannot answer until an API key is configured.");
        println!("Speech tools are optional; typed input works without them.");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_missing_or_blank_is_not_found() {
        let mut config = Config::default();
        assert!(matches!(check_api_key(&config), CheckResult::NotFound(_)));
        config.coach.api_key = Some("  ".to_string());
        assert!(matches!(check_api_key(&config), CheckResult::NotFound(_)));
        config.coach.api_key = Some("key".to_string());
        assert_eq!(check_api_key(&config), CheckResult::Ok);
    }

    #[test]
    fn missing_synthesizer_is_not_found() {
        let mut config = Config::default();
        config.speech.synthesizer_command = "echocoach-missing-tts".to_string();
        assert!(matches!(check_synthesizer(&config), CheckResult::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn muted_synthesizer_is_a_warning() {
        let mut config = Config::default();
        config.speech.synthesizer_command = "sh".to_string();
        config.speech.output_enabled = false;
        assert!(matches!(check_synthesizer(&config), CheckResult::Warning(_)));
    }

    #[test]
    fn recognizer_checks_follow_voice_config() {
        let mut config = Config::default();
        assert!(matches!(check_recognizer(&config), CheckResult::NotFound(_)));

        config.voice.enabled = false;
        assert!(matches!(check_recognizer(&config), CheckResult::Warning(_)));
    }

    #[cfg(unix)]
    #[test]
    fn executable_recognizer_command_is_ok() {
        let mut config = Config::default();
        config.voice.recognizer_command = Some(vec!["sh".to_string(), "-c".to_string()]);
        assert_eq!(check_recognizer(&config), CheckResult::Ok);
    }
}
