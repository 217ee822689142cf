use anyhow::{bail, Context, Result};
use clap::Parser;
use loqa_interview::{
    create_router, AppState, AudioBackendFactory, Config, HttpTransport, InterviewSession,
    Playback, RemoteTransport, SessionStatus, SilentPlayback, SpeakerPlayback, TurnState,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Time left for the end notice to reach the server before exiting
const END_NOTICE_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(name = "loqa-interview", version, about = "Voice-only interview client")]
struct Cli {
    /// Config file (default: config/loqa-interview.{toml,yaml,json} if present)
    #[arg(long)]
    config: Option<String>,

    /// Interview server base URL
    #[arg(long)]
    server: Option<String>,

    /// `microphone` or a WAV file to answer from
    #[arg(long)]
    input: Option<String>,

    /// Decode replies but do not play them
    #[arg(long)]
    no_playback: bool,

    /// Port for the local control API
    #[arg(long)]
    control_port: Option<u16>,

    /// Keep a copy of each uploaded answer in this directory
    #[arg(long)]
    recordings: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, cfg: &mut Config) {
        if let Some(server) = &self.server {
            cfg.remote.base_url = server.clone();
        }
        if let Some(input) = &self.input {
            cfg.audio.input = input.clone();
        }
        if self.no_playback {
            cfg.audio.playback = false;
        }
        if let Some(port) = self.control_port {
            cfg.control.port = port;
        }
        if let Some(dir) = &self.recordings {
            cfg.audio.recordings_path = Some(dir.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::load(cli.config.as_deref())?;
    cli.apply(&mut cfg);

    info!("Loqa Interview v{}", env!("CARGO_PKG_VERSION"));
    info!("Interview server: {}", cfg.remote.base_url);

    let backend = AudioBackendFactory::create(cfg.audio_source(), cfg.backend_config())
        .context("Failed to create audio backend")?;

    let transport: Arc<dyn RemoteTransport> = Arc::new(
        HttpTransport::new(cfg.remote.base_url.clone(), cfg.remote_timeout())
            .context("Failed to create HTTP client")?,
    );

    let playback: Arc<dyn Playback> = if cfg.audio.playback {
        Arc::new(SpeakerPlayback::new())
    } else {
        Arc::new(SilentPlayback::paced())
    };

    let session = InterviewSession::new(cfg.turn_config(), backend, transport, playback);
    let cancel = session.cancellation_token();
    let status = session.subscribe();

    if cfg.control.enabled {
        let addr = format!("{}:{}", cfg.control.bind, cfg.control.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind control API on {}", addr))?;
        let app = create_router(AppState::new(status.clone(), cancel.clone()));

        info!("Control API listening on http://{}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Control API stopped: {}", e);
            }
        });
    }

    tokio::spawn(report_status(status));

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, ending interview");
            interrupt.cancel();
        }
    });

    let outcome = session.run().await;

    if outcome.final_state == TurnState::EndedByUser {
        tokio::time::sleep(END_NOTICE_GRACE).await;
    }

    info!(
        "Session {}: {} after {} transitions, {} answers uploaded",
        outcome.session_id,
        outcome.final_state,
        outcome.transitions.len(),
        outcome.answers_uploaded
    );
    for path in &outcome.archived {
        info!("Answer kept at {}", path.display());
    }

    if outcome.final_state.is_error() {
        bail!("{}", outcome.final_state.status_text(None));
    }

    Ok(())
}

/// Log the status line whenever its text changes
async fn report_status(mut status: watch::Receiver<SessionStatus>) {
    let mut last = String::new();

    while status.changed().await.is_ok() {
        let text = status.borrow_and_update().status_text.clone();
        if text != last {
            info!("{}", text);
            last = text;
        }
    }
}
