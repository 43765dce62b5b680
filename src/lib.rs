//! reelcast turns a two-character dialogue into a short portrait video.
//!
//! Each line is synthesized and voice-converted, laid out on a global timeline, captioned word
//! by word, and composited over looping background footage with the speaking character's avatar
//! fading in and out. Caller-supplied images and clips can be shown when a trigger word is
//! spoken. Final encoding is delegated to an external `ffmpeg` process.
//!
//! - Build a [`DialogueRenderer`] from a [`PipelineConfig`]
//! - Plug in a [`VoicePipeline`] and optionally an [`AlignmentEngine`]
//! - Call [`DialogueRenderer::render`] with a [`DialogueRequest`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod align;
pub mod compose;
pub mod config;
pub mod expression;
pub mod foundation;
pub mod jobs;
pub mod overlay;
pub mod pipeline;
pub mod subtitle;
pub mod synth;
pub mod timeline;

pub use crate::align::{AlignmentEngine, WordAligner};
pub use crate::compose::{CompositionExecutor, CompositionPlan, CompositionPlanner};
pub use crate::config::PipelineConfig;
pub use crate::foundation::core::{Canvas, Character, Fps, MediaKind, TimeSpan};
pub use crate::foundation::error::{ReelError, ReelResult};
pub use crate::foundation::registry::{ModelLoader, ModelRegistry};
pub use crate::jobs::{JobRegistry, JobState, JobStatus};
pub use crate::overlay::{OverlayResolver, OverlaySpec, ResolvedOverlay};
pub use crate::pipeline::{DialogueRenderer, DialogueRequest, RenderManifest, RenderedVideo};
pub use crate::subtitle::SubtitleRenderer;
pub use crate::synth::{SpeechSynthesizer, VoiceModel, VoicePipeline};
pub use crate::timeline::{AudioClip, Timeline, TimelineBuilder};
