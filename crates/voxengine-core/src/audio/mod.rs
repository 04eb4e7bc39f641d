//! Audio buffers, WAV I/O and resampling.

pub mod resampler;
pub mod wav;

pub use resampler::Resampler;

/// Backend output: mono samples at the backend's native rate
#[derive(Debug, Clone, PartialEq)]
pub struct RawWave {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
}

impl RawWave {
    /// Create a raw wave
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}

/// Finished, sample-rate-tagged pipeline output
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Samples, interleaved when `channels > 1`
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
}

impl Waveform {
    /// Number of frames (samples per channel)
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Duration in seconds
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Whether the waveform holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
