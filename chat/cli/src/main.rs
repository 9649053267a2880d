//! Chat CLI - Line-Oriented Front End
//!
//! Reads one message per line from stdin, streams the reply to stdout as it
//! arrives. Logs go to stderr so stdout carries only transcript text.
//!
//! # Usage
//!
//! ```bash
//! # Interactive session against the configured endpoint
//! chat-cli
//!
//! # One-shot message with an explicit endpoint and token
//! chat-cli --endpoint https://chat.example.com/chat --token "$TOKEN" --once "Hello"
//!
//! # Fail fast on a slow backend (exits non-zero if the exchange fails)
//! chat-cli --timeout 30 --once "Hello"
//!
//! # Check that the backend is reachable
//! chat-cli --check
//!
//! # Verbose logging
//! RUST_LOG=chat_core=debug chat-cli
//! ```
//!
//! # Commands
//!
//! - `/reset`: start a new conversation
//! - `/quit`: exit (as does EOF or Ctrl-C)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::mpsc;
use tracing::{debug, info};

use chat_core::{
    default_config_path, load_config_with_overrides, ChatClient, ChatError, ChatUpdate,
    ConfigOverrides,
};

/// Chat CLI - stream replies from a chat endpoint
#[derive(Parser, Debug)]
#[command(name = "chat-cli")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Chat endpoint URL
    #[arg(short = 'e', long, value_name = "URL")]
    endpoint: Option<String>,

    /// Bearer token for the Authorization header
    #[arg(short = 't', long, value_name = "TOKEN")]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "CHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Check backend health and exit
    #[arg(long)]
    check: bool,

    /// Send a single message and exit
    #[arg(long, value_name = "TEXT")]
    once: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "CHAT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("chat_core={level},chat_cli={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Write one update to the terminal
async fn render(out: &mut Stdout, update: ChatUpdate) -> Result<()> {
    match update {
        ChatUpdate::Token { text, .. } => {
            out.write_all(text.as_bytes()).await?;
            out.flush().await?;
        }
        ChatUpdate::MessageFinalized { .. } | ChatUpdate::MessageFailed { .. } => {
            out.write_all(b"\n").await?;
        }
        ChatUpdate::SessionBound { session_id } => {
            debug!(session_id = %session_id, "Session bound");
        }
        _ => {}
    }
    Ok(())
}

/// Send one message, rendering updates while the reply streams in
///
/// Returns the exchange's own outcome; `Err` is reserved for terminal I/O.
async fn exchange(
    client: &ChatClient,
    updates: &mut mpsc::Receiver<ChatUpdate>,
    out: &mut Stdout,
    text: &str,
) -> Result<Result<(), ChatError>> {
    let send = client.send_message(text);
    tokio::pin!(send);

    let result = loop {
        tokio::select! {
            result = &mut send => break result,
            Some(update) = updates.recv() => render(out, update).await?,
        }
    };

    while let Ok(update) = updates.try_recv() {
        render(out, update).await?;
    }

    if let Some(message) = failure_message(client, &result) {
        out.write_all(format!("[error] {message}\n").as_bytes())
            .await?;
    }
    out.flush().await?;
    Ok(result)
}

/// Text to show for a failed exchange; superseded exchanges are not failures
fn failure_message(client: &ChatClient, result: &Result<(), ChatError>) -> Option<String> {
    match result {
        Ok(()) | Err(ChatError::Cancelled) => None,
        Err(e) => Some(client.snapshot().error.unwrap_or_else(|| e.user_message())),
    }
}

/// Turn a one-shot exchange into the process outcome
fn once_outcome(result: Result<(), ChatError>) -> Result<()> {
    match result {
        Ok(()) | Err(ChatError::Cancelled) => Ok(()),
        Err(e) => Err(anyhow::Error::new(e).context("Exchange failed")),
    }
}

/// Read lines from stdin until EOF or `/quit`
async fn interactive(
    client: &ChatClient,
    updates: &mut mpsc::Receiver<ChatUpdate>,
    out: &mut Stdout,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        out.write_all(b"> ").await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                client.reset();
                out.write_all(b"(new conversation)\n").await?;
            }
            text => {
                // Failures are already shown; keep the session going
                let _ = exchange(client, updates, out, text).await?;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let mut overrides = ConfigOverrides::new();
    if let Some(endpoint) = args.endpoint {
        overrides = overrides.with_endpoint(endpoint);
    }
    if let Some(token) = args.token {
        overrides = overrides.with_auth_token(token);
    }
    if let Some(secs) = args.timeout {
        overrides = overrides.with_request_timeout_secs(secs);
    }

    let config_path = args.config.clone().or_else(default_config_path);
    let config = load_config_with_overrides(config_path, &overrides)
        .context("Failed to load configuration")?;

    info!(endpoint = %config.endpoint, source = %config.source(), "Configuration loaded");

    let client = ChatClient::from_config(&config).context("Failed to create chat client")?;

    if args.check {
        if client.health_check().await {
            println!("ok");
            return Ok(());
        }
        anyhow::bail!("Backend at {} is unreachable", config.endpoint);
    }

    let mut updates = client.subscribe();
    let mut out = tokio::io::stdout();

    let session = async {
        match args.once.as_deref() {
            Some(text) => once_outcome(exchange(&client, &mut updates, &mut out, text).await?),
            None => interactive(&client, &mut updates, &mut out).await,
        }
    };

    tokio::select! {
        result = session => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, exiting");
        }
    }

    Ok(())
}
