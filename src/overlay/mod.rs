//! Placement of caller-supplied media on the global timeline.
//!
//! Each overlay request names a decoded media file and is anchored either to the first spoken
//! occurrence of a trigger word, to an explicit start, or to the default start.

/// Decoding of uploaded media files.
pub mod media;

use crate::align::{normalize_spoken, normalize_trigger};
use crate::config::{OverlayConfig, TriggerMatch};
use crate::foundation::core::{MediaKind, TimeSpan};
use crate::timeline::GlobalWordEntry;

pub use media::{DecodedMedia, MediaBuffer, MediaFile, decode_media_files};

/// Caller request to show media during the composition.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySpec {
    /// Name of a decoded media file.
    pub filename: String,
    /// Spoken word that starts the overlay.
    #[serde(default)]
    pub trigger_word: Option<String>,
    /// Start used when there is no trigger word or it is never spoken.
    #[serde(default)]
    pub start_time: Option<f64>,
    /// Window length in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Free-form caption for logs.
    #[serde(default)]
    pub description: Option<String>,
}

/// Overlay with an absolute window.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedOverlay {
    /// Payload to show.
    pub media: MediaBuffer,
    /// Image or clip, from the filename extension.
    pub kind: MediaKind,
    /// Global start in seconds.
    pub start: f64,
    /// Window length in seconds. This is the authoritative length; [`Self::end`] is derived from
    /// it and can differ from `start + duration` computed elsewhere only by float rounding.
    pub duration: f64,
    /// Caller description, empty when absent.
    pub description: String,
    /// Turn that declared the overlay.
    pub turn: usize,
}

impl ResolvedOverlay {
    /// Global end in seconds: `start + duration`, rounded as an `f64` sum.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Visibility window `[start, end)`.
    pub fn window(&self) -> TimeSpan {
        TimeSpan {
            start: self.start,
            end: self.end(),
        }
    }
}

/// Resolves overlay requests against the word timeline.
#[derive(Clone, Debug, Default)]
pub struct OverlayResolver {
    cfg: OverlayConfig,
}

impl OverlayResolver {
    /// Resolver with the defaults and matching strategy from `cfg`.
    pub fn new(cfg: &OverlayConfig) -> Self {
        Self { cfg: cfg.clone() }
    }

    /// Resolve every request, in turn order then request order.
    ///
    /// `turns` yields each turn's overlay requests. Requests whose file was not decoded are
    /// dropped; everything else produces exactly one [`ResolvedOverlay`].
    #[tracing::instrument(skip_all, fields(words = words.len(), media = media.len()))]
    pub fn resolve<'a>(
        &self,
        turns: impl IntoIterator<Item = &'a [OverlaySpec]>,
        media: &DecodedMedia,
        words: &[GlobalWordEntry],
    ) -> Vec<ResolvedOverlay> {
        let spoken: Vec<String> = words.iter().map(|w| normalize_spoken(&w.text)).collect();
        let mut out = Vec::new();

        for (turn, specs) in turns.into_iter().enumerate() {
            for spec in specs {
                let Some(buffer) = media.get(&spec.filename) else {
                    tracing::warn!(filename = %spec.filename, turn, "overlay media not found, dropping");
                    continue;
                };
                let kind = MediaKind::from_filename(&spec.filename);
                let duration = self.duration_for(spec, kind);
                let fallback = self.fallback_start(spec);

                let start = match spec.trigger_word.as_deref().map(normalize_trigger) {
                    Some(trigger) if !trigger.is_empty() => {
                        match self.find_trigger(&trigger, turn, words, &spoken) {
                            Some(t) => {
                                tracing::debug!(%trigger, at = t, filename = %spec.filename, "trigger word matched");
                                t
                            }
                            None => {
                                tracing::warn!(
                                    %trigger,
                                    filename = %spec.filename,
                                    fallback,
                                    "trigger word not spoken, using fallback start"
                                );
                                fallback
                            }
                        }
                    }
                    _ => fallback,
                };

                tracing::info!(
                    filename = %spec.filename,
                    ?kind,
                    start,
                    end = start + duration,
                    "overlay placed"
                );
                out.push(ResolvedOverlay {
                    media: buffer.clone(),
                    kind,
                    start,
                    duration,
                    description: spec.description.clone().unwrap_or_default(),
                    turn,
                });
            }
        }
        out
    }

    fn duration_for(&self, spec: &OverlaySpec, kind: MediaKind) -> f64 {
        let default = match kind {
            MediaKind::Image => self.cfg.default_image_duration_sec,
            MediaKind::Clip => self.cfg.default_clip_duration_sec,
        };
        match spec.duration {
            Some(d) if d.is_finite() && d > 0.0 => d,
            Some(d) => {
                tracing::warn!(filename = %spec.filename, duration = d, "ignoring invalid overlay duration");
                default
            }
            None => default,
        }
    }

    fn fallback_start(&self, spec: &OverlaySpec) -> f64 {
        match spec.start_time {
            Some(s) if s.is_finite() && s >= 0.0 => s,
            Some(s) => {
                tracing::warn!(filename = %spec.filename, start = s, "ignoring invalid overlay start");
                self.cfg.default_start_sec
            }
            None => self.cfg.default_start_sec,
        }
    }

    fn find_trigger(
        &self,
        trigger: &str,
        turn: usize,
        words: &[GlobalWordEntry],
        spoken: &[String],
    ) -> Option<f64> {
        let first_where = |pred: &dyn Fn(&GlobalWordEntry) -> bool| {
            words
                .iter()
                .zip(spoken)
                .find(|(w, s)| s.as_str() == trigger && pred(*w))
                .map(|(w, _)| w.start)
        };
        match self.cfg.trigger_match {
            TriggerMatch::First => first_where(&|_| true),
            TriggerMatch::NearestInTurn => {
                first_where(&|w| w.turn == turn).or_else(|| first_where(&|_| true))
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/resolver.rs"]
mod tests;
