use chrono::Utc;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::TurnConfig;
use super::meter::spawn_meter;
use super::state::TurnState;
use super::status::{SessionOutcome, SessionStatus, Speaker, TranscriptEntry, Transition};
use crate::audio::{AmbientCalibrator, AudioBackend, AudioStream};
use crate::error::{EngineError, EngineResult};
use crate::playback::Playback;
use crate::recording::{CaptureSession, RecordingArtifact, SilenceWatchdog};
use crate::remote::{AgentReply, RemoteTransport};

/// Why a recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopTrigger {
    Silence,
    Ceiling,
}

/// Marker for "the user ended the interview while we were waiting"
struct Cancelled;

/// One voice interview, from microphone acquisition to a terminal state
///
/// Owns the audio stream, the capture session and the transition log. Status
/// updates go out over a watch channel; the cancellation token ends the
/// interview from outside.
pub struct InterviewSession {
    config: TurnConfig,
    backend: Option<Box<dyn AudioBackend>>,
    transport: Arc<dyn RemoteTransport>,
    playback: Arc<dyn Playback>,
    calibrator: AmbientCalibrator,
    capture: CaptureSession,
    cancel: CancellationToken,
    status: Arc<watch::Sender<SessionStatus>>,

    state: TurnState,
    started: Instant,
    transitions: Vec<Transition>,
    transcript: Vec<TranscriptEntry>,
    thresholds: Vec<f32>,
    answers_uploaded: usize,
    archived: Vec<PathBuf>,
}

impl InterviewSession {
    pub fn new(
        config: TurnConfig,
        backend: Box<dyn AudioBackend>,
        transport: Arc<dyn RemoteTransport>,
        playback: Arc<dyn Playback>,
    ) -> Self {
        let (status, _) = watch::channel(SessionStatus::new(config.session_id.clone()));
        let calibrator = AmbientCalibrator::new(config.calibration.clone());

        Self {
            config,
            backend: Some(backend),
            transport,
            playback,
            calibrator,
            capture: CaptureSession::new(),
            cancel: CancellationToken::new(),
            status: Arc::new(status),
            state: TurnState::Idle,
            started: Instant::now(),
            transitions: Vec::new(),
            transcript: Vec::new(),
            thresholds: Vec::new(),
            answers_uploaded: 0,
            archived: Vec::new(),
        }
    }

    /// Cancelling this token ends the interview by user request
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// Drive the interview until it reaches a terminal state
    pub async fn run(mut self) -> SessionOutcome {
        info!(
            "Starting interview {} (transport={}, playback={})",
            self.config.session_id,
            self.transport.name(),
            self.playback.name()
        );
        self.started = Instant::now();

        let Some(backend) = self.backend.take() else {
            error!("Interview has no audio backend");
            self.enter(TurnState::ErrorPermissionDenied);
            return self.into_outcome();
        };

        let stream = match AudioStream::open(backend).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to acquire microphone: {}", e);
                self.enter(TurnState::ErrorPermissionDenied);
                return self.into_outcome();
            }
        };

        let meter = spawn_meter(
            &stream,
            self.config.meter_window,
            self.config.poll_interval,
            Arc::clone(&self.status),
        );

        if self.drive(&stream).await.is_err() {
            self.end_by_user().await;
        }

        meter.abort();
        self.capture.discard().await;
        stream.close().await;

        info!(
            "Interview {} finished: {} ({} answers uploaded)",
            self.config.session_id, self.state, self.answers_uploaded
        );

        self.into_outcome()
    }

    /// The turn loop. Returns `Err(Cancelled)` when the user ended the interview
    /// mid-flight; every other exit leaves `self.state` terminal.
    async fn drive(&mut self, stream: &AudioStream) -> Result<(), Cancelled> {
        self.pause(self.config.start_delay).await?;

        self.enter(TurnState::ContactingServer);
        let mut reply = match self.remote(|t| async move { t.session_start().await }).await? {
            Ok(reply) => reply,
            Err(e) => {
                error!("Failed to start interview: {}", e);
                self.enter(TurnState::ErrorUnreachable);
                return Ok(());
            }
        };

        loop {
            self.record_transcript(&reply);

            self.enter(TurnState::AgentSpeaking);
            self.speak(std::mem::take(&mut reply.audio)).await?;

            if !reply.expect_more {
                self.enter(TurnState::Complete);
                return Ok(());
            }

            self.enter(TurnState::Thinking);
            self.think().await?;

            self.enter(TurnState::Calibrating);
            let threshold = self.calibrate(stream).await?;
            self.thresholds.push(threshold);

            if let Err(e) = self.capture.start(stream) {
                error!("Could not start recording: {}", e);
                self.enter(TurnState::ErrorEmptyCapture);
                return Ok(());
            }
            self.enter(TurnState::Recording);

            let trigger = self.await_end_of_answer(stream, threshold).await?;
            info!("Answer ended by {:?}", trigger);

            let artifact = match self.capture.stop().await {
                Ok(Some(artifact)) => artifact,
                Ok(None) => {
                    error!("Recording vanished before it could be stopped");
                    self.enter(TurnState::ErrorEmptyCapture);
                    return Ok(());
                }
                Err(e) => {
                    error!("Answer not uploaded: {}", e);
                    self.enter(TurnState::ErrorEmptyCapture);
                    return Ok(());
                }
            };

            // The user may have ended the interview while the capture was finalizing
            if self.cancel.is_cancelled() {
                debug!("Dropping answer finalized after the interview ended");
                return Err(Cancelled);
            }

            self.enter(TurnState::Uploading);
            self.archive(&artifact);

            reply = match self
                .remote(move |t| async move { t.send_answer(artifact).await })
                .await?
            {
                Ok(reply) => {
                    self.answers_uploaded += 1;
                    let answers = self.answers_uploaded;
                    self.status.send_modify(|s| s.turns_completed = answers);
                    reply
                }
                Err(e) => {
                    error!("Upload failed: {}", e);
                    self.enter(TurnState::ErrorUploadFailed);
                    return Ok(());
                }
            };
        }
    }

    async fn pause(&self, duration: Duration) -> Result<(), Cancelled> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            _ = sleep(duration) => Ok(()),
        }
    }

    /// Run a transport call on its own task. On cancellation the call is left to
    /// finish in the background and its result is ignored.
    async fn remote<F, Fut>(&self, call: F) -> Result<EngineResult<AgentReply>, Cancelled>
    where
        F: FnOnce(Arc<dyn RemoteTransport>) -> Fut,
        Fut: Future<Output = EngineResult<AgentReply>> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return Err(Cancelled);
        }

        let task = tokio::spawn(call(Arc::clone(&self.transport)));

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Abandoning in-flight request");
                Err(Cancelled)
            }
            joined = task => Ok(joined.unwrap_or_else(|e| {
                Err(EngineError::Unreachable(format!("request task failed: {}", e)))
            })),
        }
    }

    async fn speak(&mut self, audio: Vec<u8>) -> Result<(), Cancelled> {
        self.status.send_modify(|s| s.agent_speaking = true);

        let playback = Arc::clone(&self.playback);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = playback.play(audio) => Some(result),
        };

        self.status.send_modify(|s| s.agent_speaking = false);

        match result {
            None => Err(Cancelled),
            Some(Ok(duration)) => {
                debug!("Reply played for {:.1}s", duration.as_secs_f64());
                Ok(())
            }
            Some(Err(e)) => {
                warn!("{}; continuing without the reply audio", e);
                Ok(())
            }
        }
    }

    /// Count down the thinking time, one status update per second
    async fn think(&mut self) -> Result<(), Cancelled> {
        let one_second = Duration::from_secs(1);
        let mut ticker = interval_at(Instant::now() + one_second, one_second);

        for remaining in (1..=self.config.think_secs).rev() {
            self.publish_countdown(Some(remaining));

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Cancelled),
                _ = ticker.tick() => {}
            }
        }

        self.publish_countdown(None);
        Ok(())
    }

    async fn calibrate(&self, stream: &AudioStream) -> Result<f32, Cancelled> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            threshold = self.calibrator.calibrate(Some(stream)) => Ok(threshold),
        }
    }

    /// Race sustained silence against the answer ceiling
    async fn await_end_of_answer(
        &self,
        stream: &AudioStream,
        threshold: f32,
    ) -> Result<StopTrigger, Cancelled> {
        let started = self.capture.started_at().unwrap_or_else(Instant::now);
        let deadline = started + self.config.max_answer;
        let watchdog = SilenceWatchdog::new(threshold, self.config.watchdog.clone());
        let analyser = stream.analyser(self.config.watchdog.analysis_window);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            _ = watchdog.run(analyser) => Ok(StopTrigger::Silence),
            _ = sleep_until(deadline) => Ok(StopTrigger::Ceiling),
        }
    }

    fn archive(&mut self, artifact: &RecordingArtifact) {
        let Some(dir) = self.config.recordings_path.as_deref() else {
            return;
        };

        match artifact.save(dir, self.answers_uploaded + 1) {
            Ok(path) => self.archived.push(path),
            Err(e) => warn!("Failed to archive answer: {:#}", e),
        }
    }

    async fn end_by_user(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        self.capture.discard().await;
        self.enter(TurnState::EndedByUser);

        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            if let Err(e) = transport.session_end().await {
                warn!("End notice not delivered: {}", e);
            }
        });
    }

    fn record_transcript(&mut self, reply: &AgentReply) {
        if let Some(text) = reply.user_text.as_deref().filter(|t| !t.trim().is_empty()) {
            info!("Candidate: {}", text);
            self.push_transcript(Speaker::Candidate, text);
        }
        if let Some(text) = reply.ai_text.as_deref().filter(|t| !t.trim().is_empty()) {
            info!("Interviewer: {}", text);
            self.push_transcript(Speaker::Interviewer, text);
        }
    }

    fn push_transcript(&mut self, speaker: Speaker, text: &str) {
        self.transcript.push(TranscriptEntry {
            speaker,
            text: text.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn publish_countdown(&self, countdown: Option<u32>) {
        let state = self.state;
        self.status.send_modify(|s| {
            s.countdown_secs = countdown;
            s.status_text = state.status_text(countdown);
        });
    }

    /// Move to `next` if the transition table allows it. Returns whether the
    /// state changed.
    fn enter(&mut self, next: TurnState) -> bool {
        let from = self.state;
        if !from.can_transition_to(next) {
            error!("Refusing invalid transition {} -> {}", from, next);
            return false;
        }

        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.transitions.push(Transition {
            from,
            to: next,
            at: Utc::now(),
            elapsed_ms,
        });
        self.state = next;

        if next.is_error() {
            warn!("{} -> {} at {}ms", from, next, elapsed_ms);
        } else {
            info!("{} -> {} at {}ms", from, next, elapsed_ms);
        }

        self.status.send_modify(|s| {
            s.state = next;
            s.status_text = next.status_text(None);
            s.countdown_secs = None;
        });

        true
    }

    fn into_outcome(self) -> SessionOutcome {
        SessionOutcome {
            session_id: self.config.session_id,
            final_state: self.state,
            transitions: self.transitions,
            answers_uploaded: self.answers_uploaded,
            thresholds: self.thresholds,
            transcript: self.transcript,
            archived: self.archived,
        }
    }
}
