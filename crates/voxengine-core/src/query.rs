//! Phonetic query model consumed by the synthesis pipeline.
//!
//! The JSON field names match the audio query documents exchanged by the
//! engine's HTTP layer, so queries can be loaded straight from disk or from a
//! request body with `serde_json`.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Accepted `speedScale` values
pub const SPEED_SCALE_RANGE: RangeInclusive<f32> = 0.1..=3.0;

/// Longest accepted pre/post silence, in seconds
pub const MAX_PHONEME_SILENCE: f32 = 60.0;

/// Highest accepted output sample rate in Hz
pub const MAX_OUTPUT_SAMPLING_RATE: u32 = 192_000;

/// Speaker/voice variant selector within a core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleId(pub u32);

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StyleId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Smallest phonetic unit: text plus prosody
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mora {
    /// Kana text of the mora
    pub text: String,
    /// Consonant phoneme, if any
    #[serde(default)]
    pub consonant: Option<String>,
    /// Consonant length in seconds
    #[serde(default)]
    pub consonant_length: Option<f32>,
    /// Vowel phoneme
    pub vowel: String,
    /// Vowel length in seconds
    pub vowel_length: f32,
    /// Pitch in log-Hz; 0 for unvoiced moras
    pub pitch: f32,
}

impl Mora {
    /// Create a vowel-only mora
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        vowel: impl Into<String>,
        vowel_length: f32,
        pitch: f32,
    ) -> Self {
        Self {
            text: text.into(),
            consonant: None,
            consonant_length: None,
            vowel: vowel.into(),
            vowel_length,
            pitch,
        }
    }

    /// Attach a consonant to this mora
    #[must_use]
    pub fn with_consonant(mut self, consonant: impl Into<String>, length: f32) -> Self {
        self.consonant = Some(consonant.into());
        self.consonant_length = Some(length);
        self
    }

    /// Whether the mora carries pitch
    #[must_use]
    pub fn is_voiced(&self) -> bool {
        self.pitch > 0.0
    }
}

/// Ordered group of moras forming one prosodic unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccentPhrase {
    /// Moras of the phrase
    pub moras: Vec<Mora>,
    /// Accent nucleus position (1-based)
    pub accent: usize,
    /// Trailing pause, if any
    #[serde(default)]
    pub pause_mora: Option<Mora>,
    /// Whether the phrase ends a question
    #[serde(default)]
    pub is_interrogative: bool,
}

impl AccentPhrase {
    /// Create an accent phrase without a pause
    #[must_use]
    pub fn new(moras: Vec<Mora>, accent: usize) -> Self {
        Self {
            moras,
            accent,
            pause_mora: None,
            is_interrogative: false,
        }
    }

    /// Mark the phrase as interrogative
    #[must_use]
    pub fn interrogative(mut self) -> Self {
        self.is_interrogative = true;
        self
    }

    /// Attach a trailing pause
    #[must_use]
    pub fn with_pause(mut self, pause: Mora) -> Self {
        self.pause_mora = Some(pause);
        self
    }
}

/// Structured synthesis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioQuery {
    /// Accent phrases in utterance order
    #[serde(rename = "accent_phrases")]
    pub accent_phrases: Vec<AccentPhrase>,
    /// Global speech rate multiplier
    pub speed_scale: f32,
    /// Global pitch shift in octaves
    pub pitch_scale: f32,
    /// Intonation strength multiplier
    pub intonation_scale: f32,
    /// Output gain multiplier
    pub volume_scale: f32,
    /// Leading silence in seconds
    pub pre_phoneme_length: f32,
    /// Trailing silence in seconds
    pub post_phoneme_length: f32,
    /// Output sample rate in Hz
    pub output_sampling_rate: u32,
    /// Duplicate the output into two channels
    #[serde(default)]
    pub output_stereo: bool,
    /// AquesTalk-style kana reading, informational only
    #[serde(default)]
    pub kana: Option<String>,
}

impl AudioQuery {
    /// Create a query with neutral global parameters
    #[must_use]
    pub fn new(accent_phrases: Vec<AccentPhrase>) -> Self {
        Self {
            accent_phrases,
            speed_scale: 1.0,
            pitch_scale: 0.0,
            intonation_scale: 1.0,
            volume_scale: 1.0,
            pre_phoneme_length: 0.1,
            post_phoneme_length: 0.1,
            output_sampling_rate: crate::DEFAULT_SAMPLE_RATE,
            output_stereo: false,
            kana: None,
        }
    }

    /// Parse a query from its JSON form
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a query.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the global parameters
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidInput`] for a speed outside
    /// [`SPEED_SCALE_RANGE`], a negative or non-finite volume, non-finite
    /// pitch or intonation, silence outside [`MAX_PHONEME_SILENCE`] seconds,
    /// or an output rate outside `1..=`[`MAX_OUTPUT_SAMPLING_RATE`].
    pub fn validate(&self) -> EngineResult<()> {
        if !SPEED_SCALE_RANGE.contains(&self.speed_scale) {
            return Err(EngineError::invalid_input(format!(
                "speedScale must be between {} and {}, got {}",
                SPEED_SCALE_RANGE.start(),
                SPEED_SCALE_RANGE.end(),
                self.speed_scale
            )));
        }
        if !(self.volume_scale.is_finite() && self.volume_scale >= 0.0) {
            return Err(EngineError::invalid_input(format!(
                "volumeScale must not be negative, got {}",
                self.volume_scale
            )));
        }
        if !self.pitch_scale.is_finite() || !self.intonation_scale.is_finite() {
            return Err(EngineError::invalid_input(
                "pitchScale and intonationScale must be finite",
            ));
        }
        for (name, length) in [
            ("prePhonemeLength", self.pre_phoneme_length),
            ("postPhonemeLength", self.post_phoneme_length),
        ] {
            if !(0.0..=MAX_PHONEME_SILENCE).contains(&length) {
                return Err(EngineError::invalid_input(format!(
                    "{name} must be between 0 and {MAX_PHONEME_SILENCE} seconds, got {length}"
                )));
            }
        }
        if !(1..=MAX_OUTPUT_SAMPLING_RATE).contains(&self.output_sampling_rate) {
            return Err(EngineError::invalid_input(format!(
                "outputSamplingRate must be between 1 and {MAX_OUTPUT_SAMPLING_RATE}, got {}",
                self.output_sampling_rate
            )));
        }
        Ok(())
    }
}

/// Flatten accent phrases into one mora sequence.
///
/// Phrases keep their order, moras keep their order within a phrase, and a
/// phrase's pause mora follows its last mora.
#[must_use]
pub fn to_flatten_moras(accent_phrases: &[AccentPhrase]) -> Vec<Mora> {
    accent_phrases
        .iter()
        .flat_map(|phrase| phrase.moras.iter().chain(phrase.pause_mora.iter()))
        .cloned()
        .collect()
}

/// Concatenate the text of every mora
#[must_use]
pub fn to_kana_text(moras: &[Mora]) -> String {
    moras.iter().map(|mora| mora.text.as_str()).collect()
}
