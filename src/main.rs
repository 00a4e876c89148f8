//! Application entry point — Manga Narrator.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Resolve the watched pages directory and make sure it exists.
//! 4. Build the vision client and speech renderer from config.
//! 5. Spawn the orchestrator as a tokio task.
//! 6. Run the interactive command loop until `quit` or Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};

use manga_narrator::{
    capture::PageFileSource,
    config::{AppConfig, AppPaths},
    orchestrator::{new_shared_state, Command, Orchestrator, StatusUpdate},
    tts::{ApiSpeechRenderer, ProsodyMapper},
    vision::ApiVisionClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Manga Narrator starting up");

    // 2. Configuration
    let first_run = AppConfig::is_first_run();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if first_run {
        // Seed the settings file so the user has something to edit.
        if let Err(e) = config.save() {
            log::warn!("Could not write default settings file: {e}");
        }
    }
    if config.api_key.as_deref().unwrap_or("").is_empty() {
        log::warn!(
            "No API key configured — set api_key in {}",
            AppPaths::new().settings_file.display()
        );
    }

    // 3. Pages directory
    let pages_dir: PathBuf = match &config.capture.pages_dir {
        Some(dir) => dir.into(),
        None => AppPaths::new().pages_dir,
    };
    std::fs::create_dir_all(&pages_dir)
        .with_context(|| format!("creating pages directory {}", pages_dir.display()))?;
    log::info!("Watching {} for page images", pages_dir.display());

    // 4. Collaborators
    let shared_state = new_shared_state(config.clone());
    let prosody =
        ProsodyMapper::new(config.tts.speech_rate).with_preferred_voice(&config.tts.voice);
    let orchestrator = Orchestrator::new(
        Arc::clone(&shared_state),
        Arc::new(PageFileSource::new(&pages_dir)),
        Arc::new(ApiVisionClient::from_config(&config)),
        Arc::new(ApiSpeechRenderer::from_config(&config)),
        prosody,
    );

    // 5. Spawn the orchestrator
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(16);
    let mut status_rx = orchestrator.subscribe_status();
    tokio::spawn(async move { orchestrator.run(cmd_rx).await });

    // Surface status transitions on the console.
    tokio::spawn(async move {
        loop {
            match status_rx.recv().await {
                Ok(StatusUpdate { status, message }) => match message {
                    Some(msg) => println!("[{}] {msg}", status.label()),
                    None => println!("[{}]", status.label()),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    log::debug!("status stream lagged by {n} updates");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    if config.auto_start {
        cmd_tx.send(Command::Start).await.ok();
    }

    // 6. Command loop
    println!("Commands: start, pause, resume, stop, status, quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match line.trim() {
                    "start" => { cmd_tx.send(Command::Start).await.ok(); }
                    "pause" => { cmd_tx.send(Command::Pause).await.ok(); }
                    "resume" => { cmd_tx.send(Command::Resume).await.ok(); }
                    "stop" => { cmd_tx.send(Command::Stop).await.ok(); }
                    "status" => {
                        let (tx, rx) = oneshot::channel();
                        if cmd_tx.send(Command::GetStatus(tx)).await.is_ok() {
                            if let Ok(report) = rx.await {
                                let uptime = report
                                    .uptime
                                    .map(|d| format!("{}s", d.as_secs()))
                                    .unwrap_or_else(|| "-".to_string());
                                println!(
                                    "{} | captures: {} | uptime: {uptime}",
                                    report.status.label(),
                                    report.capture_count
                                );
                                if let Some(err) = report.error_message {
                                    println!("last error: {err}");
                                }
                            }
                        }
                    }
                    "quit" | "exit" => break,
                    "" => {}
                    other => println!("Unknown command: {other}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    cmd_tx.send(Command::Stop).await.ok();
    log::info!("Manga Narrator exiting");
    Ok(())
}
