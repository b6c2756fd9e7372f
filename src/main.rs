use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use storefront_voice::core::prompt::PromptContext;
use storefront_voice::core::tools::{Catalog, ToolDispatcher, tool_declarations};
use storefront_voice::{
    AssistantConfig, GeminiLive, JsonLinesStore, SessionComponents, SessionController,
    SessionEvent, WavFileInput, WavRecorderOutput,
};

/// Storefront Voice - realtime voice assistant for the storefront
#[derive(Parser, Debug)]
#[command(name = "storefront-voice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one call, streaming a WAV file as the microphone
    Session {
        /// Mono or stereo WAV file played as user audio
        #[arg(short = 'i', long = "input", value_name = "WAV")]
        input: PathBuf,

        /// Where to write the agent's audio as heard
        #[arg(short = 'o', long = "output", value_name = "WAV")]
        output: Option<PathBuf>,
    },

    /// Look up a product in the catalog
    Lookup {
        /// Name, brand or SKU
        query: String,

        /// Catalog YAML (defaults to the embedded catalog)
        #[arg(long = "catalog", value_name = "FILE")]
        catalog: Option<PathBuf>,
    },

    /// Print the tool declarations sent at setup
    Tools,

    /// Print the system instruction
    Prompt,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Session { input, output } => {
            let config = load_config(cli.config)?;
            run_session(config, input, output).await
        }
        Commands::Lookup { query, catalog } => {
            let catalog = match catalog {
                Some(path) => Catalog::from_file(&path)?,
                None => Catalog::embedded()?,
            };
            println!("{}", serde_json::to_string_pretty(&catalog.check_stock(&query))?);
            Ok(())
        }
        Commands::Tools => {
            println!("{}", serde_json::to_string_pretty(&tool_declarations())?);
            Ok(())
        }
        Commands::Prompt => {
            let config = cli
                .config
                .map(|path| AssistantConfig::from_file(&path))
                .transpose()
                .map_err(|e| anyhow!(e.to_string()))?
                .unwrap_or_default();
            let catalog = config.load_catalog()?;
            let prompt = PromptContext::new(&config.agent_name, &catalog, today()).build()?;
            println!("{prompt}");
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AssistantConfig> {
    match path {
        Some(config_path) => {
            println!("Loading configuration from {}", config_path.display());
            AssistantConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))
        }
        None => AssistantConfig::from_env().map_err(|e| anyhow!(e.to_string())),
    }
}

fn today() -> time::Date {
    time::OffsetDateTime::now_utc().date()
}

async fn run_session(
    config: AssistantConfig,
    input: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let catalog = config.load_catalog().context("Failed to load catalog")?;
    let instructions = PromptContext::new(&config.agent_name, &catalog, today()).build()?;

    let orders = Arc::new(JsonLinesStore::new(config.order_path.clone()));
    let mut dispatcher = ToolDispatcher::new(Arc::clone(&catalog), orders);
    match config.webhook_client() {
        Some(webhook) => dispatcher = dispatcher.with_webhook(webhook),
        None => warn!("WEBHOOK_URL not set, reports will not be delivered"),
    }

    let recorder = WavRecorderOutput::new(config.output_sample_rate);
    let components = SessionComponents {
        transport: Arc::new(GeminiLive::new().with_setup_timeout(config.setup_timeout())),
        input: Arc::new(WavFileInput::new(input).with_buffer_size(config.capture_buffer_size)),
        output: Arc::new(recorder.clone()),
        dispatcher,
        call_log: Arc::new(JsonLinesStore::new(config.call_log_path.clone())),
    };

    let (controller, mut events) = SessionController::new(
        config.session_config(),
        config.realtime_config(instructions),
        components,
    );
    let handle = controller.handle();
    info!(session_id = %controller.id(), relay = config.uses_relay(), "Starting call");
    let session = controller.spawn();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Transcript(t)) => println!("[{}] {}", t.direction, t.text),
                Some(SessionEvent::FormUpdated(form)) => println!("[form] {}", serde_json::to_string(&form)?),
                Some(SessionEvent::ReportConfirmed(summary)) => {
                    println!("[confirmed] {}", serde_json::to_string(&summary)?)
                }
                Some(SessionEvent::StateChanged(state)) => println!("[state] {state}"),
                Some(SessionEvent::Nudged) => println!("[watchdog] nudged agent"),
                Some(SessionEvent::BargeIn { .. }) => {}
                Some(SessionEvent::Failed(reason)) => eprintln!("[failed] {reason}"),
                Some(SessionEvent::Ended(_)) | None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("Stopping call");
                handle.stop();
            }
        }
    }

    let outcome = session.await??;

    if let Some(path) = output {
        recorder.write_wav(&path)?;
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
