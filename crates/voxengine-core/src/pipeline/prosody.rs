//! Mora-level prosody adjustments.
//!
//! Every function here edits the pipeline's private copy of a query in place.

use crate::query::{AccentPhrase, Mora};

/// Length of the mora appended by interrogative upspeak, in seconds
pub const UPSPEAK_LENGTH: f32 = 0.15;

/// Pitch added to the last mora by interrogative upspeak, in log-Hz
pub const UPSPEAK_PITCH_ADD: f32 = 0.3;

/// Ceiling for the upspeak mora's pitch, in log-Hz
pub const UPSPEAK_PITCH_MAX: f32 = 6.5;

/// Divide every consonant and vowel length by `speed_scale`
pub fn apply_speed(moras: &mut [Mora], speed_scale: f32) {
    if (speed_scale - 1.0).abs() < f32::EPSILON {
        return;
    }
    for mora in moras {
        mora.vowel_length /= speed_scale;
        if let Some(length) = mora.consonant_length.as_mut() {
            *length /= speed_scale;
        }
    }
}

/// Shift voiced pitch by `pitch_scale` octaves
pub fn apply_pitch(moras: &mut [Mora], pitch_scale: f32) {
    let factor = pitch_scale.exp2();
    for mora in moras.iter_mut().filter(|m| m.is_voiced()) {
        mora.pitch *= factor;
    }
}

/// Scale voiced pitch deviation from its mean by `intonation_scale`
pub fn apply_intonation(moras: &mut [Mora], intonation_scale: f32) {
    let voiced: Vec<f32> = moras.iter().filter(|m| m.is_voiced()).map(|m| m.pitch).collect();
    if voiced.is_empty() {
        return;
    }
    let mean = voiced.iter().sum::<f32>() / voiced.len() as f32;
    for mora in moras.iter_mut().filter(|m| m.is_voiced()) {
        mora.pitch = (mora.pitch - mean) * intonation_scale + mean;
    }
}

/// Append a rising mora to the final phrase when it asks a question.
///
/// Only applies when the last phrase is interrogative and ends on a voiced
/// mora. Returns whether a mora was appended.
pub fn apply_interrogative_upspeak(accent_phrases: &mut [AccentPhrase]) -> bool {
    let Some(phrase) = accent_phrases.last_mut() else {
        return false;
    };
    if !phrase.is_interrogative {
        return false;
    }
    let Some(last) = phrase.moras.last().filter(|m| m.is_voiced()) else {
        return false;
    };

    let pitch = (last.pitch + UPSPEAK_PITCH_ADD).min(UPSPEAK_PITCH_MAX);
    let upspeak = Mora::new(vowel_kana(&last.vowel), last.vowel.clone(), UPSPEAK_LENGTH, pitch);
    phrase.moras.push(upspeak);
    true
}

fn vowel_kana(vowel: &str) -> String {
    match vowel {
        "a" => "ア",
        "i" => "イ",
        "u" => "ウ",
        "e" => "エ",
        "o" => "オ",
        "N" => "ン",
        "cl" => "ッ",
        other => other,
    }
    .to_string()
}
