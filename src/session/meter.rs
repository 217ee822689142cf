use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use super::status::SessionStatus;
use crate::audio::level::meter_display;
use crate::audio::{AudioStream, LevelEstimator};

/// Smallest change worth waking status watchers for
const LEVEL_EPSILON: f32 = 0.005;

/// Spawn the live meter loop. Abort the handle at teardown.
pub fn spawn_meter(
    stream: &AudioStream,
    window: usize,
    poll_interval: Duration,
    status: Arc<watch::Sender<SessionStatus>>,
) -> JoinHandle<()> {
    let mut analyser = stream.analyser(window);

    tokio::spawn(async move {
        let mut estimator = LevelEstimator::meter();
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!("Level meter started");

        loop {
            ticker.tick().await;

            let level = meter_display(estimator.update(analyser.read()));
            status.send_if_modified(|s| {
                if (s.level - level).abs() < LEVEL_EPSILON {
                    return false;
                }
                s.level = level;
                true
            });
        }
    })
}
