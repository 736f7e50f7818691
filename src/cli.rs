//! Command-line interface for echocoach
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Voice-enabled sales coaching sparring partner
#[derive(Parser, Debug)]
#[command(
    name = "echocoach",
    version,
    about = "Voice-enabled sales coaching sparring partner"
)]
pub struct Cli {
    /// Subcommand to execute (default: chat)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress status output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Gemini model (default: gemini-2.5-flash)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Conversation language as a BCP-47 tag (default: fr-FR). Examples: fr-FR, en-US
    #[arg(long, value_name = "TAG")]
    pub language: Option<String>,

    /// Start with speech output disabled
    #[arg(long)]
    pub mute: bool,

    /// Disable voice input
    #[arg(long)]
    pub no_voice: bool,

    /// How long trailing recognition events are ignored after sending. Examples: 500ms, 1s
    #[arg(long, value_name = "DURATION", value_parser = parse_send_guard)]
    pub send_guard: Option<Duration>,
}

/// Parse a send-guard duration.
///
/// Bare numbers are milliseconds; anything else goes through `humantime`
/// (`500ms`, `1s`, `1s200ms`).
fn parse_send_guard(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive coaching session (default)
    Chat,

    /// Check the API key and speech engines
    Check,

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Print the default configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_command() {
        let cli = Cli::try_parse_from(["echocoach"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.model.is_none());
        assert!(cli.language.is_none());
        assert!(!cli.mute);
        assert!(!cli.no_voice);
        assert!(cli.send_guard.is_none());
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_verbose_double() {
        let cli = Cli::try_parse_from(["echocoach", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_with_options() {
        let cli = Cli::try_parse_from([
            "echocoach",
            "--model",
            "gemini-2.0-flash",
            "--language",
            "en-US",
            "--mute",
            "--no-voice",
        ])
        .unwrap();

        assert_eq!(cli.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(cli.language.as_deref(), Some("en-US"));
        assert!(cli.mute);
        assert!(cli.no_voice);
    }

    #[test]
    fn test_send_guard_formats() {
        assert_eq!(parse_send_guard("750"), Ok(Duration::from_millis(750)));
        assert_eq!(parse_send_guard("1s"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_send_guard(" 250ms "), Ok(Duration::from_millis(250)));
        assert!(parse_send_guard("soon").is_err());

        let cli = Cli::try_parse_from(["echocoach", "--send-guard", "300ms"]).unwrap();
        assert_eq!(cli.send_guard, Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_parse_chat_and_check() {
        let cli = Cli::try_parse_from(["echocoach", "chat"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Chat)));
        let cli = Cli::try_parse_from(["echocoach", "check"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Check)));
    }

    #[test]
    fn test_parse_config_actions() {
        let cli = Cli::try_parse_from(["echocoach", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Show
            })
        ));
        let cli = Cli::try_parse_from(["echocoach", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Path
            })
        ));
    }

    #[test]
    fn test_global_options_after_command() {
        let cli =
            Cli::try_parse_from(["echocoach", "check", "--config", "/tmp/config.toml", "-q"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/config.toml")));
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["echocoach", "completions", "bash"]).unwrap();
        match cli.command {
            Some(Commands::Completions { shell }) => assert_eq!(shell, Shell::Bash),
            _ => panic!("Expected Completions command"),
        }
    }

    #[test]
    fn test_invalid_command_returns_error() {
        let err = Cli::try_parse_from(["echocoach", "invalid"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["echocoach", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
