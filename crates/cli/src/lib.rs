pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use copilot_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "copilot",
    about = "Advisor copilot operator CLI",
    long_about = "Inspect configuration, exercise the guidance parser and alert classifier, and replay transcripts through an offline conversation session.",
    after_help = "Examples:\n  copilot doctor\n  copilot config\n  copilot parse-guidance --file answer.txt\n  copilot classify \"Consider rebalancing\"\n  copilot replay --transcript call.txt"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate configuration and build the configured runtime components")]
    Doctor,
    #[command(about = "Split a raw guidance answer into completed and pending tasks")]
    ParseGuidance {
        #[arg(long, help = "Read the answer from this file instead of stdin")]
        file: Option<PathBuf>,
    },
    #[command(about = "Screen recommendation text and report its alert priority")]
    Classify {
        #[arg(help = "Recommendation text to classify")]
        text: String,
    },
    #[command(about = "Replay a transcript (one utterance per line) through an offline session")]
    Replay {
        #[arg(long, help = "Transcript file; stdin when omitted")]
        transcript: Option<PathBuf>,
        #[arg(long, help = "File holding the canned guidance answer")]
        guidance_response: Option<PathBuf>,
        #[arg(long, help = "Canned recommendation answer")]
        recommendation_response: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor => commands::doctor::run(),
        Command::ParseGuidance { file } => commands::parse_guidance::run(file.as_deref()),
        Command::Classify { text } => commands::classify::run(&text),
        Command::Replay { transcript, guidance_response, recommendation_response } => {
            commands::replay::run(commands::replay::ReplayOptions {
                transcript: transcript.as_deref(),
                guidance_response: guidance_response.as_deref(),
                recommendation_response,
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_logging() {
    use tracing::Level;

    let (level, format) = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            (config.logging.level.parse::<Level>().unwrap_or(Level::WARN), config.logging.format)
        }
        Err(_) => (Level::WARN, LogFormat::Compact),
    };

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
