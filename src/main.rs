use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hume_evi_client::core::evi::{
    DisconnectReason, EviResponse, OutboundFrame, SessionHandler,
};
use hume_evi_client::utils::pcm_to_wav;
use hume_evi_client::{ClientConfig, HumeClient};

/// Bytes per millisecond of 16 kHz mono 16-bit PCM.
const PCM_BYTES_PER_MS: usize = 32;

/// Hume EVI command-line client
#[derive(Parser, Debug)]
#[command(name = "hume-evi")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List saved EVI configurations
    Configs {
        #[arg(long)]
        page_number: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// List chats
    Chats {
        #[arg(long)]
        page_number: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        /// `true` lists oldest first, `false` newest first; omitted uses the
        /// server default
        #[arg(long, value_name = "BOOL")]
        ascending: Option<bool>,
    },

    /// Open a voice chat, send text and/or audio, and print the replies
    Chat {
        /// EVI configuration id (defaults to `config_id` / HUME_CONFIG_ID)
        #[arg(long)]
        config_id: Option<String>,

        /// Text to send as user input
        #[arg(long)]
        text: Option<String>,

        /// Raw 16 kHz mono 16-bit PCM file to stream
        #[arg(long, value_name = "FILE.pcm")]
        audio: Option<PathBuf>,

        /// Audio chunk length in milliseconds
        #[arg(long, default_value_t = 100)]
        chunk_ms: u64,

        /// Seconds to wait for the assistant to finish
        #[arg(long, default_value_t = 30)]
        wait_secs: u64,
    },

    /// Wrap raw 16 kHz mono 16-bit PCM in a WAV header
    Wav {
        input: PathBuf,
        output: PathBuf,
    },
}

/// Prints every response and signals when the assistant is done.
struct PrintingHandler {
    done: mpsc::UnboundedSender<()>,
}

#[async_trait]
impl SessionHandler for PrintingHandler {
    async fn on_connect(&self) {
        println!("connected");
    }

    async fn on_disconnect(&self, reason: DisconnectReason) {
        println!("disconnected: {reason}");
        let _ = self.done.send(());
    }

    async fn on_response(&self, response: EviResponse) {
        match response {
            EviResponse::ChatMetadata(meta) => {
                println!("chat {} (group {})", meta.chat_id, meta.chat_group_id);
            }
            EviResponse::UserMessage(msg) if !msg.interim => {
                println!("user: {}", msg.message.content);
            }
            EviResponse::AssistantMessage(msg) => {
                println!("assistant: {}", msg.message.content);
            }
            EviResponse::AudioOutput(output) => {
                println!("audio chunk {} ({} base64 chars)", output.index, output.data.len());
            }
            EviResponse::AssistantEnd(_) => {
                println!("assistant finished");
                let _ = self.done.send(());
            }
            EviResponse::Error(err) => {
                println!("error {}: {}", err.code, err.message);
            }
            other => {
                println!("{}", other.message_type());
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A TLS crypto provider was already installed");
    }

    let cli = Cli::parse();

    if let Commands::Wav { input, output } = &cli.command {
        let pcm = std::fs::read(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        std::fs::write(output, pcm_to_wav(&pcm))
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Wrote {} ({} bytes of audio)", output.display(), pcm.len());
        return Ok(());
    }

    // Load configuration from file or environment
    let config = if let Some(config_path) = &cli.config {
        info!("Loading configuration from {}", config_path.display());
        ClientConfig::from_file(config_path)?
    } else {
        ClientConfig::from_env()?
    };

    let default_config_id = config.config_id.clone();
    let client = HumeClient::from_config(config)?;

    match cli.command {
        Commands::Configs {
            page_number,
            page_size,
        } => {
            let page = client.list_configs(page_number, page_size).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::Chats {
            page_number,
            page_size,
            ascending,
        } => {
            let page = client
                .list_chats(page_number, page_size, ascending)
                .await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::Chat {
            config_id,
            text,
            audio,
            chunk_ms,
            wait_secs,
        } => {
            let config_id = config_id
                .or(default_config_id)
                .ok_or_else(|| anyhow!("--config-id is required (or set HUME_CONFIG_ID)"))?;
            run_chat(&client, &config_id, text, audio, chunk_ms, wait_secs).await?;
        }
        Commands::Wav { .. } => {}
    }

    Ok(())
}

async fn run_chat(
    client: &HumeClient,
    config_id: &str,
    text: Option<String>,
    audio: Option<PathBuf>,
    chunk_ms: u64,
    wait_secs: u64,
) -> anyhow::Result<()> {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let handler = Arc::new(PrintingHandler { done: done_tx });

    client.start_voice_chat(config_id, Some(handler)).await?;

    if let Some(text) = text {
        client.send(OutboundFrame::user_input(text)?).await?;
    }

    if let Some(path) = audio {
        let pcm = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let chunk_len = (chunk_ms.max(1) as usize) * PCM_BYTES_PER_MS;
        info!("Streaming {} bytes of audio in {chunk_ms}ms chunks", pcm.len());

        for chunk in pcm.chunks(chunk_len) {
            client.send(OutboundFrame::audio_input(chunk)?).await?;
            tokio::time::sleep(Duration::from_millis(chunk_ms)).await;
        }
    }

    if tokio::time::timeout(Duration::from_secs(wait_secs), done_rx.recv())
        .await
        .is_err()
    {
        warn!("No assistant_end within {wait_secs}s");
    }

    client.stop_voice_chat().await?;
    Ok(())
}
