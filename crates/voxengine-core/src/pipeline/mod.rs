//! Query-to-waveform synthesis over a single core.

pub mod postprocess;
pub mod prosody;

use crate::audio::Waveform;
use crate::core::{CoreAdapter, PhoneticUnits};
use crate::error::EngineResult;
use crate::query::{to_flatten_moras, to_kana_text, AudioQuery, StyleId};
use postprocess::{raw_wave_to_output_wave, PostProcessOptions};
use prosody::{apply_interrogative_upspeak, apply_intonation, apply_pitch, apply_speed};
use tracing::debug;

/// Synthesis engine bound to one core
#[derive(Debug, Clone, Copy)]
pub struct TtsEngine<'a> {
    core: &'a CoreAdapter,
}

impl<'a> TtsEngine<'a> {
    /// Bind an engine to `core`
    #[must_use]
    pub const fn new(core: &'a CoreAdapter) -> Self {
        Self { core }
    }

    /// The core this engine drives
    #[must_use]
    pub const fn core(&self) -> &'a CoreAdapter {
        self.core
    }

    /// Synthesize `query` with `style_id`.
    ///
    /// Works on a private copy of the query; the caller's query is left as
    /// it was. Prosody-aware cores receive the adjusted moras, text-only
    /// cores receive the kana text and get speed and upspeak applied to
    /// their output instead.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::InvalidInput`] for an invalid query, and
    /// any core or post-processing failure.
    pub fn synthesize_wave(
        &self,
        query: &AudioQuery,
        style_id: StyleId,
        enable_interrogative_upspeak: bool,
    ) -> EngineResult<Waveform> {
        query.validate()?;
        let mut query = query.clone();

        let text = to_kana_text(&to_flatten_moras(&query.accent_phrases));

        let upspeak =
            enable_interrogative_upspeak && apply_interrogative_upspeak(&mut query.accent_phrases);
        let mut moras = to_flatten_moras(&query.accent_phrases);
        apply_speed(&mut moras, query.speed_scale);
        apply_pitch(&mut moras, query.pitch_scale);
        apply_intonation(&mut moras, query.intonation_scale);

        let (units, options) = if self.core.accepts_prosody() {
            (PhoneticUnits::Moras(&moras), PostProcessOptions::prosody_applied())
        } else {
            (PhoneticUnits::Text(&text), PostProcessOptions::text_only(upspeak))
        };

        debug!(
            "Synthesizing {} moras with style {} (upspeak: {})",
            moras.len(),
            style_id,
            upspeak
        );
        let raw = self.core.synthesize(&units, style_id)?;
        raw_wave_to_output_wave(&query, raw, options)
    }
}
