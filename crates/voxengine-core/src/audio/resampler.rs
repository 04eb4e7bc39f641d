//! Sample rate conversion using rubato's sinc interpolation.

use crate::error::{EngineError, EngineResult};
use rubato::{
    calculate_cutoff, Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

const SINC_LEN: usize = 256;
const MAX_FLUSH_CHUNKS: usize = 16;

/// Mono sinc resampler
pub struct Resampler;

impl Resampler {
    /// Resample mono audio from `from_sr` to `to_sr`.
    ///
    /// The filter delay is flushed out and trimmed, so the result is aligned
    /// with the input and holds exactly [`Resampler::output_len`] samples.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AudioProcessing`] if either rate is zero or the
    /// resampler rejects the input.
    pub fn resample(samples: &[f32], from_sr: u32, to_sr: u32) -> EngineResult<Vec<f32>> {
        if from_sr == 0 || to_sr == 0 {
            return Err(EngineError::audio_processing(format!(
                "Cannot resample between {from_sr} Hz and {to_sr} Hz"
            )));
        }
        if from_sr == to_sr || samples.is_empty() {
            return Ok(samples.to_vec());
        }

        let window = WindowFunction::BlackmanHarris2;
        let params = SincInterpolationParameters {
            sinc_len: SINC_LEN,
            f_cutoff: calculate_cutoff(SINC_LEN, window),
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window,
        };

        let ratio = f64::from(to_sr) / f64::from(from_sr);
        let chunk_size = samples.len().max(SINC_LEN);
        let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, chunk_size, 1)
            .map_err(|e| {
                EngineError::audio_processing(format!("Failed to create resampler: {e}"))
            })?;

        let expected = Self::output_len(samples.len(), from_sr, to_sr);
        let delay = resampler.output_delay();
        let needed = delay + expected;

        let mut output = Vec::with_capacity(needed + chunk_size);
        let input = [samples];
        let first = resampler
            .process_partial(Some(&input[..]), None)
            .map_err(|e| EngineError::audio_processing(format!("Resampling failed: {e}")))?;
        output.extend(first.into_iter().flatten());

        // Push silence through until the delayed tail has come out
        for _ in 0..MAX_FLUSH_CHUNKS {
            if output.len() >= needed {
                break;
            }
            let flushed = resampler
                .process_partial::<&[f32]>(None, None)
                .map_err(|e| EngineError::audio_processing(format!("Resampling failed: {e}")))?;
            output.extend(flushed.into_iter().flatten());
        }

        output.drain(..delay.min(output.len()));
        output.resize(expected, 0.0);
        Ok(output)
    }

    /// Number of output samples a buffer of `len` samples maps to
    #[must_use]
    pub fn output_len(len: usize, from_sr: u32, to_sr: u32) -> usize {
        if from_sr == 0 {
            return 0;
        }
        let scaled = len as u128 * u128::from(to_sr);
        scaled.div_ceil(u128::from(from_sr)) as usize
    }
}
