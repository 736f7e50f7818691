use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use echocoach::app::{Overrides, run_chat};
use echocoach::cli::{Cli, Commands, ConfigAction};
use echocoach::config::Config;
use echocoach::diagnostics::check_dependencies;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let overrides = Overrides {
        model: cli.model,
        language: cli.language,
        mute: cli.mute,
        no_voice: cli.no_voice,
        send_guard: cli.send_guard,
    };

    match cli.command {
        None | Some(Commands::Chat) => {
            let mut config = load_config(cli.config.as_deref())?;
            overrides.apply(&mut config);
            config.validate()?;
            let color = std::io::stdout().is_terminal();
            if let Err(e) = run_chat(config, cli.quiet, color).await {
                eprintln!("{}", format!("Error: {e}").red());
                if matches!(e, echocoach::EchoError::CollaboratorNotConfigured { .. }) {
                    eprintln!("Run `echocoach check` to see what is missing.");
                }
                std::process::exit(1);
            }
        }
        Some(Commands::Check) => {
            let mut config = load_config(cli.config.as_deref())?;
            overrides.apply(&mut config);
            if !check_dependencies(&config) {
                std::process::exit(1);
            }
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref(), &overrides)?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "echocoach",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over the flags.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "echocoach=debug,warn",
        (false, _) => "echocoach=trace,info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/echocoach/config.toml)
/// 3. Built-in defaults
///
/// Environment variable overrides are applied on top.
fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path).with_context(|| format!("loading {}", path.display()))?
    } else {
        Config::load_or_default(&Config::default_path())?
    };
    Ok(config.with_env_overrides())
}

/// Handle configuration commands.
fn handle_config_command(
    action: ConfigAction,
    custom_path: Option<&std::path::Path>,
    overrides: &Overrides,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let mut config = load_config(custom_path)?;
            overrides.apply(&mut config);
            let toml = toml::to_string_pretty(&config.redacted())
                .context("serializing configuration")?;
            print!("{toml}");
        }
        ConfigAction::Path => {
            let path = custom_path
                .map(std::path::PathBuf::from)
                .unwrap_or_else(Config::default_path);
            println!("{}", path.display());
            if !path.exists() {
                eprintln!("{}", "(file does not exist, defaults are used)".dimmed());
            }
        }
    }
    Ok(())
}
