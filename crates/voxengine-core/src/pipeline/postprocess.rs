//! Conversion of backend output into the requested output waveform.

use super::prosody::{UPSPEAK_LENGTH, UPSPEAK_PITCH_ADD};
use crate::audio::{RawWave, Resampler, Waveform};
use crate::error::{EngineError, EngineResult};
use crate::query::{AudioQuery, MAX_PHONEME_SILENCE, SPEED_SCALE_RANGE};
use tracing::debug;

/// Adjustments a backend could not make itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcessOptions {
    /// Apply the query's speed scale by varispeed playback
    pub varispeed: bool,
    /// Raise the pitch over the final [`UPSPEAK_LENGTH`] seconds
    pub terminal_rise: bool,
}

impl PostProcessOptions {
    /// Options for a backend that consumed the adjusted moras
    #[must_use]
    pub const fn prosody_applied() -> Self {
        Self {
            varispeed: false,
            terminal_rise: false,
        }
    }

    /// Options for a backend that only saw text
    #[must_use]
    pub const fn text_only(upspeak: bool) -> Self {
        Self {
            varispeed: true,
            terminal_rise: upspeak,
        }
    }
}

/// Turn a backend's raw output into the query's output format.
///
/// Steps, in order: varispeed and terminal rise (when requested), volume,
/// resampling to `output_sampling_rate`, pre/post silence, stereo
/// duplication.
///
/// # Errors
///
/// Returns [`EngineError::InvalidInput`] if the query fails
/// [`AudioQuery::validate`], and [`EngineError::AudioProcessing`] if the raw
/// wave has no sample rate or resampling fails.
pub fn raw_wave_to_output_wave(
    query: &AudioQuery,
    raw: RawWave,
    options: PostProcessOptions,
) -> EngineResult<Waveform> {
    query.validate()?;
    if raw.sample_rate == 0 {
        return Err(EngineError::audio_processing(
            "Backend returned a wave without a sample rate",
        ));
    }

    let RawWave {
        mut samples,
        sample_rate,
    } = raw;

    if options.varispeed {
        let ignored = ignored_by_text_backend(query);
        if !ignored.is_empty() {
            debug!(
                "Text-only backend: {} not applied to the waveform",
                ignored.join(", ")
            );
        }
        samples = varispeed(&samples, query.speed_scale)?;
    }
    if options.terminal_rise {
        terminal_rise(&mut samples, sample_rate);
    }

    if (query.volume_scale - 1.0).abs() > f32::EPSILON {
        for sample in &mut samples {
            *sample *= query.volume_scale;
        }
    }

    let output_rate = query.output_sampling_rate;
    let voiced = Resampler::resample(&samples, sample_rate, output_rate)?;

    let pre = silence_len(query.pre_phoneme_length, output_rate)?;
    let post = silence_len(query.post_phoneme_length, output_rate)?;
    let total = pre
        .checked_add(voiced.len())
        .and_then(|len| len.checked_add(post))
        .ok_or_else(|| EngineError::audio_processing("Output waveform is too long"))?;
    let mut mono = Vec::with_capacity(total);
    mono.resize(pre, 0.0);
    mono.extend_from_slice(&voiced);
    mono.resize(total, 0.0);

    debug!(
        "Post-processed {} Hz -> {} Hz: {} frames ({} pre, {} post)",
        sample_rate,
        output_rate,
        mono.len(),
        pre,
        post
    );

    if query.output_stereo {
        let stereo = mono.iter().flat_map(|&s| [s, s]).collect();
        Ok(Waveform {
            samples: stereo,
            sample_rate: output_rate,
            channels: 2,
        })
    } else {
        Ok(Waveform {
            samples: mono,
            sample_rate: output_rate,
            channels: 1,
        })
    }
}

/// Query scales a text-only backend's output cannot reflect
#[must_use]
pub fn ignored_by_text_backend(query: &AudioQuery) -> Vec<&'static str> {
    let mut ignored = Vec::new();
    if query.pitch_scale.abs() > f32::EPSILON {
        ignored.push("pitchScale");
    }
    if (query.intonation_scale - 1.0).abs() > f32::EPSILON {
        ignored.push("intonationScale");
    }
    ignored
}

fn silence_len(seconds: f32, sample_rate: u32) -> EngineResult<usize> {
    let frames = (f64::from(seconds) * f64::from(sample_rate)).round();
    if !(0.0..=f64::from(MAX_PHONEME_SILENCE) * f64::from(sample_rate)).contains(&frames) {
        return Err(EngineError::invalid_input(format!(
            "Silence of {seconds} s is out of range"
        )));
    }
    Ok(frames as usize)
}

/// Linear interpolation at a fractional position
fn sample_at(samples: &[f32], position: f64) -> f32 {
    let index = position.floor() as usize;
    let frac = (position - position.floor()) as f32;
    match (samples.get(index), samples.get(index + 1)) {
        (Some(&a), Some(&b)) => a + (b - a) * frac,
        (Some(&a), None) => a,
        _ => 0.0,
    }
}

/// Play `samples` back `speed` times faster, shifting pitch with it.
///
/// The result holds `ceil(len / speed)` samples.
///
/// # Errors
///
/// Returns [`EngineError::InvalidInput`] for a speed outside
/// [`SPEED_SCALE_RANGE`].
pub fn varispeed(samples: &[f32], speed: f32) -> EngineResult<Vec<f32>> {
    if !SPEED_SCALE_RANGE.contains(&speed) {
        return Err(EngineError::invalid_input(format!(
            "Cannot play back at speed {speed}"
        )));
    }
    if samples.is_empty() || (speed - 1.0).abs() < f32::EPSILON {
        return Ok(samples.to_vec());
    }
    let step = f64::from(speed);
    let out_len = (samples.len() as f64 / step).ceil() as usize;
    Ok((0..out_len)
        .map(|i| sample_at(samples, i as f64 * step))
        .collect())
}

/// Raise pitch over the last [`UPSPEAK_LENGTH`] seconds.
///
/// The read rate ramps from 1 to `e^0.3`, so the tail ends up shorter than
/// it started; everything before the tail is untouched.
pub fn terminal_rise(samples: &mut Vec<f32>, sample_rate: u32) {
    let tail_len =
        ((f64::from(UPSPEAK_LENGTH) * f64::from(sample_rate)) as usize).min(samples.len());
    if tail_len < 2 {
        return;
    }
    let start = samples.len() - tail_len;
    let tail = samples.split_off(start);

    let end_ratio = f64::from(UPSPEAK_PITCH_ADD).exp();
    let last = (tail_len - 1) as f64;
    let mut position = 0.0_f64;
    while position <= last {
        samples.push(sample_at(&tail, position));
        position += 1.0 + (end_ratio - 1.0) * position / last;
    }
}
