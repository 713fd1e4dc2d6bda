//! Stagelink - Voice-driven Avatar Bridge
//!
//! Composition root: selects the avatar model, announces it to the
//! front-end, then loops capture → transcribe → display.

use anyhow::Result;
use clap::Parser;
use stagelink::asr::RemoteAsr;
use stagelink::audio::{self, EnergyGate};
use stagelink::avatar::AvatarBridge;
use stagelink::config::Config;
use stagelink::session::Session;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Avatar model name (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Front-end base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Capture from the local microphone instead of the front-end socket
    #[arg(long)]
    local_mic: bool,

    /// Audio input device index (with --local-mic)
    #[arg(short, long)]
    device: Option<usize>,

    /// Run a single turn and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🎭 stagelink v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load()?;
    if let Some(model) = args.model {
        config.avatar_model = model;
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }

    // Initialize the transcription adapter
    let asr = RemoteAsr::new(&config);
    if !asr.health_check().await {
        warn!(
            "Inference service not reachable at {}:{}; transcription will fail until it is up",
            config.asr_host, config.asr_port
        );
    }

    // Select the model and announce it. A missing model is fatal: the
    // rest of the session is meaningless without one.
    let bridge = match AvatarBridge::connect(&config).await {
        Ok(bridge) => bridge,
        Err(e) if e.is_fatal() => {
            error!("{}. Exiting.", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    info!(
        "✅ Model '{}' announced to the front-end at {}",
        bridge.model().name,
        config.base_url
    );

    let session = Session::new(
        bridge,
        Box::new(asr),
        Duration::from_secs_f64(config.expression_delay_secs),
    );

    if args.local_mic {
        let mut chunks = audio::start_capture(config.sample_rate, args.device)?;
        let gate = EnergyGate::from_config(&config);
        info!("🎙️ Listening on the local microphone");
        loop {
            let text = session.run_local_turn(&mut chunks, &gate).await?;
            info!("📝 Heard: '{}'", text);
            if args.once {
                break;
            }
        }
    } else {
        info!("🎙️ Waiting for front-end microphone sessions");
        loop {
            match session.run_turn().await? {
                Some(text) => info!("📝 Heard: '{}'", text),
                None => info!("Front-end sent no audio this session"),
            }
            if args.once {
                break;
            }
        }
    }

    Ok(())
}
