use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hermes_timeline::callstack::CallStacks;
use hermes_timeline::config::Config;

mod app;

#[derive(Parser)]
#[command(name = "hermes-viewer")]
#[command(about = "live execution timeline and flame graph for hermes trace streams")]
struct Args {
    #[arg(short, long, help = "configuration file path (toml format)")]
    config: Option<PathBuf>,

    #[arg(
        short,
        long,
        help = "read JSON-lines trace events from this file instead of stdin"
    )]
    events: Option<PathBuf>,

    #[arg(
        short,
        long,
        help = "show pre-correlated call stacks (JSON array) in the flame graph"
    )]
    playback: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match args
        .config
        .as_deref()
        .map(Config::load)
        .transpose()
        .and_then(|config| config.unwrap_or_default().with_env_overrides())
    {
        Ok(config) => config,
        Err(err) => {
            log::error!("failed to load config: {err}");
            return ExitCode::FAILURE;
        }
    };

    let playback = match args.playback.as_deref().map(CallStacks::load).transpose() {
        Ok(playback) => playback,
        Err(err) => {
            log::error!("failed to load playback: {err}");
            return ExitCode::FAILURE;
        }
    };

    let source = match args.events {
        Some(path) => app::EventSource::File(path),
        None => app::EventSource::Stdin,
    };

    match app::run(config, source, playback) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("viewer exited with error: {err}");
            ExitCode::FAILURE
        }
    }
}
