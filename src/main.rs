use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use parley::protocol::{ExchangeRequest, FnSink, HttpTransport, ProtocolClient};
use parley::session::{SessionCoordinator, SessionHandle, SessionUpdate};
use parley::voice::{LanguageHeuristic, StdinEngine};
use parley::{Config, ToolEvent};

/// Parley - Streaming tool-call chat client with continuous voice capture
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/parley/config.toml)
    #[arg(short, long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message and stream the reply
    Chat {
        /// Message text
        text: String,
    },
    /// Treat stdin lines as recognized speech and submit on silence
    ///
    /// Lines starting with `~` are interim fragments, `!code` reports an
    /// engine error.
    Listen,
    /// Guess the locale of a text
    DetectLanguage {
        /// Text to score
        text: String,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,parley=info",
        1 => "info,parley=debug",
        2 => "debug",
        _ => "trace",
    };

    // stdout carries replies; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Chat { text } => chat(&config, text).await,
        Command::Listen => listen(config).await,
        Command::DetectLanguage { text } => {
            detect_language(&config, &text);
            Ok(())
        }
        Command::Config => {
            println!("{config:#?}");
            Ok(())
        }
    }
}

fn build_client(config: &Config) -> anyhow::Result<ProtocolClient> {
    let transport = HttpTransport::new(&config.backend.url)?;
    Ok(
        ProtocolClient::new(Arc::new(transport), &config.backend.provider)
            .with_deadline(config.backend.exchange_timeout),
    )
}

/// Run a single exchange, printing deltas as they arrive
async fn chat(config: &Config, text: String) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let request = ExchangeRequest {
        model: config.chat.model.clone(),
        prior_turns: Vec::new(),
        user_text: text,
        options: config.chat.options,
    };

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let mut sink = FnSink::new(
        |delta: &str| {
            print!("{delta}");
            let _ = std::io::stdout().flush();
        },
        |event: ToolEvent| match event {
            ToolEvent::Call { tool, params } => tracing::info!(%tool, %params, "tool call"),
            ToolEvent::Result { tool, .. } => tracing::info!(%tool, "tool result"),
            ToolEvent::Final => tracing::debug!("final answer begins"),
            ToolEvent::Thinking { text } => tracing::debug!(chars = text.len(), "thinking"),
        },
    );

    let reply = client.send(&request, &mut sink, &cancel).await?;
    println!();
    tracing::debug!(chars = reply.len(), "exchange complete");
    Ok(())
}

/// Run the session coordinator over stdin until ctrl-c or end of input
async fn listen(config: Config) -> anyhow::Result<()> {
    let client = build_client(&config)?;
    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
    let coordinator =
        SessionCoordinator::new(&config, client, StdinEngine::spawn).with_updates(updates_tx);

    let (handle, commands) = SessionHandle::channel(16);
    let session = tokio::spawn(coordinator.run(commands));

    handle.open_conversation("terminal", Vec::new()).await?;
    handle.enable_voice().await?;
    println!(
        "listening (silence after {} ms submits; ctrl-c to quit)",
        config.voice.silence.as_millis()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates_rx.recv() => {
                let Some(update) = update else { break };
                match update {
                    SessionUpdate::Submitted { text, .. } => println!("> {text}"),
                    SessionUpdate::ReplyCompleted { text, .. } => println!("{text}\n"),
                    SessionUpdate::ExchangeFailed { error, .. } => eprintln!("exchange failed: {error}"),
                    SessionUpdate::VoiceFault { error } => {
                        eprintln!("voice capture stopped: {error}");
                        break;
                    }
                    SessionUpdate::ActivityReset => tracing::warn!("tool activity reset"),
                }
            }
        }
    }

    let view = handle.snapshot().await?;
    tracing::info!(turns = view.turns.len(), "session ending");
    drop(handle);
    session.await??;
    Ok(())
}

fn detect_language(config: &Config, text: &str) {
    let heuristic = LanguageHeuristic::new(config.voice.confidence_floor);

    match heuristic.detect(text) {
        Some(best) => println!("{}", best.locale),
        None => println!("no confident match (floor {} hits)", heuristic.floor()),
    }
    for score in heuristic.scores(text) {
        println!("  {:<6} hits={:<3} score={}", score.locale, score.hits, score.score);
    }
}
