//! WAV reading and writing with hound.

use super::{RawWave, Waveform};
use crate::error::{EngineError, EngineResult};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tracing::debug;

/// Decode a WAV file into mono float samples.
///
/// Integer PCM is normalized to [-1.0, 1.0]; multi-channel audio is
/// downmixed by averaging each frame.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded.
pub fn read_wav(path: &Path) -> EngineResult<RawWave> {
    let reader = hound::WavReader::open(path)?;
    decode(reader)
}

/// Decode WAV bytes into mono float samples.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid WAV stream.
pub fn read_wav_bytes(bytes: &[u8]) -> EngineResult<RawWave> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    decode(reader)
}

fn decode<R: Read>(reader: hound::WavReader<R>) -> EngineResult<RawWave> {
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(EngineError::audio_processing("WAV stream has no channels"));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<_, _>>()?
        }
    };

    let mono = if spec.channels > 1 {
        samples
            .chunks(usize::from(spec.channels))
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    } else {
        samples
    };

    debug!(
        "Decoded WAV: {} frames at {} Hz ({} channel(s))",
        mono.len(),
        spec.sample_rate,
        spec.channels
    );
    Ok(RawWave::new(mono, spec.sample_rate))
}

fn encode<W: Write + Seek>(wave: &Waveform, writer: W) -> EngineResult<()> {
    let spec = hound::WavSpec {
        channels: wave.channels.max(1),
        sample_rate: wave.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(writer, spec)?;
    for &sample in &wave.samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Encode a waveform as 16-bit PCM WAV bytes
///
/// # Errors
///
/// Returns an error if the waveform cannot be encoded.
pub fn to_wav_bytes(wave: &Waveform) -> EngineResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    encode(wave, &mut cursor)?;
    Ok(cursor.into_inner())
}

/// Write a waveform to a 16-bit PCM WAV file
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_wav(wave: &Waveform, path: &Path) -> EngineResult<()> {
    let file = std::fs::File::create(path).map_err(|e| {
        EngineError::file(format!("Failed to create WAV file {}: {e}", path.display()))
    })?;
    encode(wave, std::io::BufWriter::new(file))
}
