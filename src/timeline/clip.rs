use std::io::Cursor;
use std::sync::Arc;

use crate::foundation::core::Character;
use crate::foundation::error::{ReelError, ReelResult};

/// One synthesized line of speech.
#[derive(Clone, Debug)]
pub struct AudioClip {
    /// Encoded audio (WAV).
    pub audio: Arc<Vec<u8>>,
    /// Playback length in seconds.
    pub duration: f64,
    /// Who speaks the line.
    pub character: Character,
    /// Source text the audio was synthesized from.
    pub text: String,
    /// Index of the conversation turn the line belongs to.
    pub turn: usize,
}

impl AudioClip {
    /// Create a clip with an explicit duration.
    ///
    /// Spoken clips (non-blank text) must have a positive duration.
    pub fn new(
        audio: impl Into<Arc<Vec<u8>>>,
        duration: f64,
        character: Character,
        text: impl Into<String>,
        turn: usize,
    ) -> ReelResult<Self> {
        let text = text.into();
        if !duration.is_finite() || duration < 0.0 {
            return Err(ReelError::validation(format!(
                "clip duration must be finite and >= 0 (got {duration})"
            )));
        }
        if !text.trim().is_empty() && duration <= 0.0 {
            return Err(ReelError::validation(format!(
                "spoken clip for {character} in turn {turn} has zero duration"
            )));
        }
        Ok(Self {
            audio: audio.into(),
            duration,
            character,
            text,
            turn,
        })
    }

    /// Create a clip from WAV bytes, deriving the duration from the sample count.
    pub fn from_wav(
        wav: Vec<u8>,
        character: Character,
        text: impl Into<String>,
        turn: usize,
    ) -> ReelResult<Self> {
        let duration = wav_duration_secs(&wav)?;
        Self::new(wav, duration, character, text, turn)
    }

    /// A clip whose text is blank models a character that stays silent for the turn.
    pub fn is_silent(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Non-silent with a positive, finite duration: the clip occupies time on the timeline.
    pub fn is_spoken(&self) -> bool {
        !self.is_silent() && self.duration.is_finite() && self.duration > 0.0
    }
}

/// Duration of a WAV payload: frames / sample rate.
pub fn wav_duration_secs(wav: &[u8]) -> ReelResult<f64> {
    let reader = hound::WavReader::new(Cursor::new(wav))
        .map_err(|e| ReelError::validation(format!("invalid WAV audio: {e}")))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(ReelError::validation("WAV sample rate must be non-zero"));
    }
    // `duration()` counts frames (samples per channel).
    Ok(f64::from(reader.duration()) / f64::from(spec.sample_rate))
}

/// One word occurrence, relative to the clip that contains it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimedWord {
    /// Word text as spoken; surrounding whitespace removed, punctuation kept.
    pub text: String,
    /// Clip-relative start in seconds.
    pub start: f64,
    /// Clip-relative end in seconds, `>= start`.
    pub end: f64,
}
