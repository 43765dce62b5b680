//! Speech synthesis collaborators.
//!
//! A line is spoken in two steps: a text-to-speech engine produces a neutral voice, then the
//! character's voice-conversion model re-voices it. Both engines live outside this crate and are
//! reached through the traits here. Voice models are loaded lazily, once per character, through
//! a [`VoiceModelRegistry`].

use std::io::Cursor;
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::core::Character;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::registry::ModelRegistry;
use crate::timeline::AudioClip;

/// Text-to-speech engine.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` in a neutral voice chosen for `character`. Returns encoded audio.
    async fn synthesize(&self, text: &str, character: Character) -> ReelResult<Vec<u8>>;
}

/// Output of a voice-conversion model: mono samples in `[-1, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertedAudio {
    /// Samples per second.
    pub sample_rate: u32,
    /// Mono samples.
    pub samples: Vec<f32>,
}

impl ConvertedAudio {
    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// A loaded per-character voice-conversion model. Read-only after load.
#[async_trait::async_trait]
pub trait VoiceModel: Send + Sync {
    /// Convert encoded speech into this model's voice.
    async fn convert(&self, audio: &[u8]) -> ReelResult<ConvertedAudio>;
}

/// Lazily loaded voice models, one per character.
pub type VoiceModelRegistry = ModelRegistry<Character, dyn VoiceModel>;

/// Turns a line of dialogue into an [`AudioClip`] in the character's voice.
pub struct VoicePipeline {
    tts: Arc<dyn SpeechSynthesizer>,
    voices: Arc<VoiceModelRegistry>,
}

impl VoicePipeline {
    /// Pipeline synthesizing with `tts` and converting through `voices`.
    pub fn new(tts: Arc<dyn SpeechSynthesizer>, voices: Arc<VoiceModelRegistry>) -> Self {
        Self { tts, voices }
    }

    /// Voice model registry.
    pub fn voices(&self) -> &VoiceModelRegistry {
        &self.voices
    }

    /// Load every character's voice model now.
    pub async fn preload(&self) -> ReelResult<()> {
        self.voices
            .preload(Character::ALL)
            .await
            .map_err(|e| as_synthesis(e, "voice model load failed"))
    }

    /// Speak `text` as `character`. Any collaborator failure is fatal for the line.
    #[tracing::instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn speak(&self, text: &str, character: Character, turn: usize) -> ReelResult<AudioClip> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ReelError::validation(format!(
                "empty line for {character} in turn {turn}"
            )));
        }
        let raw = self
            .tts
            .synthesize(text, character)
            .await
            .map_err(|e| as_synthesis(e, "text-to-speech failed"))?;
        let model = self
            .voices
            .get(&character)
            .await
            .map_err(|e| as_synthesis(e, "voice model load failed"))?;
        let converted = model
            .convert(&raw)
            .await
            .map_err(|e| as_synthesis(e, "voice conversion failed"))?;
        if converted.sample_rate == 0 || converted.samples.is_empty() {
            return Err(ReelError::synthesis(format!(
                "voice conversion for {character} returned no audio"
            )));
        }

        let duration = converted.duration_secs();
        let wav = encode_wav(&converted)?;
        tracing::debug!(duration, bytes = wav.len(), "line synthesized");
        AudioClip::new(wav, duration, character, text, turn)
    }
}

fn as_synthesis(err: ReelError, context: &str) -> ReelError {
    match err {
        ReelError::Synthesis(_) => err,
        other => ReelError::synthesis(format!("{context}: {other}")),
    }
}

/// Package mono float samples as 16-bit PCM WAV. Samples are clamped to `[-1, 1]`.
pub fn encode_wav(audio: &ConvertedAudio) -> ReelResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec).context("start WAV")?;
        for &s in &audio.samples {
            let s = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
            writer
                .write_sample((s * f32::from(i16::MAX)).round() as i16)
                .context("write WAV sample")?;
        }
        writer.finalize().context("finish WAV")?;
    }
    Ok(buf.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/synth/voice.rs"]
mod tests;
