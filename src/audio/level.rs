//! RMS loudness estimation with exponential smoothing

/// Smoothing factor for the live meter
pub const METER_SMOOTHING: f32 = 0.85;

/// Smoothing factor for silence detection
pub const SILENCE_SMOOTHING: f32 = 0.8;

/// Display gain applied to the smoothed meter level
pub const METER_GAIN: f32 = 4.0;

/// Map a 16-bit sample onto [-1, 1]
pub fn normalize(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Unsmoothed root-mean-square of a buffer, in [0, 1]
///
/// An empty buffer has no energy.
pub fn instant_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f64 = samples
        .iter()
        .map(|&s| {
            let v = normalize(s) as f64;
            v * v
        })
        .sum();

    ((sum / samples.len() as f64).sqrt() as f32).min(1.0)
}

/// Meter level for display, `smoothed * gain` capped at 1
pub fn meter_display(smoothed: f32) -> f32 {
    (smoothed * METER_GAIN).min(1.0)
}

/// One smoothing accumulator. The meter and the silence detector each own one.
#[derive(Debug, Clone)]
pub struct LevelEstimator {
    alpha: f32,
    smoothed: f32,
}

impl LevelEstimator {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            smoothed: 0.0,
        }
    }

    pub fn meter() -> Self {
        Self::new(METER_SMOOTHING)
    }

    pub fn silence() -> Self {
        Self::new(SILENCE_SMOOTHING)
    }

    /// Fold one buffer into the estimate and return the new smoothed level
    pub fn update(&mut self, samples: &[i16]) -> f32 {
        self.update_instant(instant_rms(samples))
    }

    pub fn update_instant(&mut self, instant: f32) -> f32 {
        self.smoothed = self.smoothed * self.alpha + instant * (1.0 - self.alpha);
        self.smoothed = self.smoothed.clamp(0.0, 1.0);
        self.smoothed
    }

    pub fn level(&self) -> f32 {
        self.smoothed
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn reset(&mut self) {
        self.smoothed = 0.0;
    }
}
