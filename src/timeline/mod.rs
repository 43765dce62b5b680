//! Sequencing of synthesized clips into one global timeline.
//!
//! Clips are laid back to back in the order given, separated by a fixed gap. Each spoken clip
//! contributes one speaking interval for its character and its aligned words, shifted by the
//! clip's position.

/// Audio clips and clip-relative word timings.
pub mod clip;

use crate::align::WordAligner;
use crate::config::TimelineConfig;
use crate::foundation::core::{Character, TimeSpan};

pub use clip::{AudioClip, TimedWord, wav_duration_secs};

/// A character's speaking window in composition time.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CharacterInterval {
    /// Who speaks.
    pub character: Character,
    /// `[start, end)` in seconds; `start < end`.
    pub span: TimeSpan,
    /// Conversation turn the line came from.
    pub turn: usize,
}

/// A word positioned in composition time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GlobalWordEntry {
    /// Word text as aligned.
    pub text: String,
    /// Global start in seconds.
    pub start: f64,
    /// Global end in seconds.
    pub end: f64,
    /// Speaker of the word.
    pub character: Character,
    /// Conversation turn the word was spoken in.
    #[serde(default)]
    pub turn: usize,
}

/// Result of [`TimelineBuilder::build`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    /// Speaking intervals in turn order.
    pub intervals: Vec<CharacterInterval>,
    /// Words in per-clip, per-turn order.
    pub words: Vec<GlobalWordEntry>,
    /// Length of the composition in seconds, including the trailing pad.
    pub total_duration: f64,
}

impl Timeline {
    /// Speaking intervals of one character.
    pub fn intervals_for(&self, character: Character) -> impl Iterator<Item = TimeSpan> + '_ {
        self.intervals
            .iter()
            .filter(move |i| i.character == character)
            .map(|i| i.span)
    }

    /// End of the last spoken line, or `0.0` when nobody spoke.
    pub fn speech_end(&self) -> f64 {
        self.intervals.last().map_or(0.0, |i| i.span.end)
    }
}

/// Lays clips out on the global timeline.
#[derive(Clone, Debug)]
pub struct TimelineBuilder {
    gap: f64,
    trailing_pad: f64,
    min_duration: f64,
}

impl Default for TimelineBuilder {
    fn default() -> Self {
        Self::new(&TimelineConfig::default())
    }
}

impl TimelineBuilder {
    /// Builder using the gap and pad from `cfg`.
    pub fn new(cfg: &TimelineConfig) -> Self {
        Self {
            gap: cfg.gap_sec,
            trailing_pad: cfg.trailing_pad_sec,
            min_duration: cfg.min_duration_sec,
        }
    }

    /// Build the timeline, aligning each spoken clip in order.
    #[tracing::instrument(skip_all, fields(clips = clips.len()))]
    pub async fn build(&self, clips: &[AudioClip], aligner: &WordAligner) -> Timeline {
        let mut cursor = TimelineCursor::new(self);
        for clip in clips {
            if !cursor.accepts(clip) {
                continue;
            }
            let words = aligner.align(clip).await;
            cursor.push(clip, words);
        }
        let timeline = cursor.finish();
        tracing::info!(
            intervals = timeline.intervals.len(),
            words = timeline.words.len(),
            total_duration = timeline.total_duration,
            "timeline built"
        );
        timeline
    }

    /// Build the timeline with word timings supplied by `words_for`.
    pub fn build_with_words(
        &self,
        clips: &[AudioClip],
        mut words_for: impl FnMut(&AudioClip) -> Vec<TimedWord>,
    ) -> Timeline {
        let mut cursor = TimelineCursor::new(self);
        for clip in clips {
            if cursor.accepts(clip) {
                let words = words_for(clip);
                cursor.push(clip, words);
            }
        }
        cursor.finish()
    }
}

struct TimelineCursor<'a> {
    builder: &'a TimelineBuilder,
    at: f64,
    placed: usize,
    timeline: Timeline,
}

impl<'a> TimelineCursor<'a> {
    fn new(builder: &'a TimelineBuilder) -> Self {
        Self {
            builder,
            at: 0.0,
            placed: 0,
            timeline: Timeline::default(),
        }
    }

    fn accepts(&self, clip: &AudioClip) -> bool {
        if clip.is_silent() {
            return false;
        }
        if !clip.is_spoken() {
            tracing::warn!(
                character = %clip.character,
                turn = clip.turn,
                duration = clip.duration,
                "skipping spoken clip without positive duration"
            );
            return false;
        }
        true
    }

    fn push(&mut self, clip: &AudioClip, words: Vec<TimedWord>) {
        let start = self.at;
        self.timeline.intervals.push(CharacterInterval {
            character: clip.character,
            span: TimeSpan {
                start,
                end: start + clip.duration,
            },
            turn: clip.turn,
        });
        self.timeline
            .words
            .extend(words.into_iter().map(|w| GlobalWordEntry {
                text: w.text,
                start: start + w.start,
                end: start + w.end,
                character: clip.character,
                turn: clip.turn,
            }));
        self.at += clip.duration + self.builder.gap;
        self.placed += 1;
    }

    fn finish(mut self) -> Timeline {
        self.timeline.total_duration = if self.placed == 0 {
            self.builder.min_duration
        } else {
            self.at - self.builder.gap + self.builder.trailing_pad
        };
        self.timeline
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/builder.rs"]
mod tests;
