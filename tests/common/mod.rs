// Shared fakes for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use loqa_interview::audio::{AudioBackendConfig, ScriptedBackend};
use loqa_interview::playback::Playback;
use loqa_interview::recording::RecordingArtifact;
use loqa_interview::remote::{AgentReply, RemoteTransport};
use loqa_interview::session::TurnConfig;
use loqa_interview::EngineResult;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Backend time at which the first recording begins with default timing:
/// start delay (350ms) + thinking (15s) + calibration (700ms)
pub const FIRST_RECORDING_MS: u64 = 16_050;

pub fn question(text: &str) -> AgentReply {
    AgentReply {
        audio: Vec::new(),
        expect_more: true,
        user_text: None,
        ai_text: Some(text.to_string()),
    }
}

pub fn follow_up(heard: &str, text: &str) -> AgentReply {
    AgentReply {
        user_text: Some(heard.to_string()),
        ..question(text)
    }
}

/// Last reply of the interview, after hearing the final answer
pub fn closing(heard: &str, text: &str) -> AgentReply {
    AgentReply {
        expect_more: false,
        ..follow_up(heard, text)
    }
}

pub fn final_reply() -> AgentReply {
    AgentReply {
        audio: Vec::new(),
        expect_more: false,
        user_text: None,
        ai_text: Some("Thanks, that's all.".to_string()),
    }
}

/// Remote agent with scripted replies
///
/// Answers are served from a queue; once it runs dry every answer gets the
/// final reply.
pub struct MockTransport {
    start_reply: Mutex<Option<EngineResult<AgentReply>>>,
    answer_replies: Mutex<VecDeque<EngineResult<AgentReply>>>,
    latency: Duration,
    pub starts: AtomicUsize,
    pub uploads: AtomicUsize,
    pub ends: AtomicUsize,
    pub uploaded: Mutex<Vec<RecordingArtifact>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            start_reply: Mutex::new(Some(Ok(question("Tell me about yourself.")))),
            answer_replies: Mutex::new(VecDeque::new()),
            latency: Duration::ZERO,
            starts: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
            ends: AtomicUsize::new(0),
            uploaded: Mutex::new(Vec::new()),
        }
    }

    pub fn on_start(self, reply: EngineResult<AgentReply>) -> Self {
        *self.start_reply.lock().unwrap() = Some(reply);
        self
    }

    pub fn then_answer(self, reply: EngineResult<AgentReply>) -> Self {
        self.answer_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn ends(&self) -> usize {
        self.ends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteTransport for MockTransport {
    async fn session_start(&self) -> EngineResult<AgentReply> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.start_reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(final_reply()))
    }

    async fn send_answer(&self, artifact: RecordingArtifact) -> EngineResult<AgentReply> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.uploaded.lock().unwrap().push(artifact);
        tokio::time::sleep(self.latency).await;
        self.answer_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(final_reply()))
    }

    async fn session_end(&self) -> EngineResult<()> {
        self.ends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Playback that takes `clip` for any non-empty reply
pub struct MockPlayback {
    pub plays: AtomicUsize,
    clip: Duration,
    fail: bool,
}

impl MockPlayback {
    pub fn new() -> Self {
        Self {
            plays: AtomicUsize::new(0),
            clip: Duration::from_secs(2),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Playback for MockPlayback {
    async fn play(&self, audio: Vec<u8>) -> EngineResult<Duration> {
        self.plays.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(loqa_interview::EngineError::PlaybackFailure(
                "no output device".to_string(),
            ));
        }
        if audio.is_empty() {
            return Ok(Duration::ZERO);
        }

        tokio::time::sleep(self.clip).await;
        Ok(self.clip)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn backend_config() -> AudioBackendConfig {
    AudioBackendConfig::default()
}

/// Room noise only
pub fn quiet_room() -> Box<ScriptedBackend> {
    Box::new(ScriptedBackend::constant(backend_config(), 0.0))
}

/// Quiet room, then the candidate talks without pause from `from_ms` on
pub fn talks_from(from_ms: u64) -> Box<ScriptedBackend> {
    Box::new(ScriptedBackend::new(backend_config(), move |t| {
        if t < from_ms {
            0.001
        } else {
            0.5
        }
    }))
}

pub fn turn_config() -> TurnConfig {
    TurnConfig::default()
}

/// Write a 16-bit PCM WAV file
pub fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}
