use std::path::Path;
use std::sync::Arc;

use crate::align::{AlignmentEngine, WordAligner};
use crate::compose::{CompositionExecutor, CompositionPlan, CompositionPlanner, PlanRequest};
use crate::config::PipelineConfig;
use crate::foundation::core::Character;
use crate::foundation::error::{ReelError, ReelResult};
use crate::overlay::{DecodedMedia, OverlayResolver, OverlaySpec, ResolvedOverlay, decode_media_files};
use crate::pipeline::request::DialogueRequest;
use crate::subtitle::SubtitleRenderer;
use crate::synth::VoicePipeline;
use crate::timeline::{AudioClip, TimedWord, Timeline, TimelineBuilder};

/// Short identifier for a request, used in logs and the download name.
pub fn new_request_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Encoded video for one request.
#[derive(Clone, Debug)]
pub struct RenderedVideo {
    /// Id the render was logged under.
    pub request_id: String,
    /// Encoded MP4.
    pub bytes: Vec<u8>,
    /// Suggested download name.
    pub file_name: String,
    /// Composition length in seconds, before the renderer trims to the audio.
    pub duration_sec: f64,
}

/// Readiness snapshot of the collaborators.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Health {
    /// A speech synthesizer is installed.
    pub synthesis_configured: bool,
    /// Characters whose voice model is loaded.
    pub voice_models_loaded: Vec<Character>,
    /// An alignment engine is installed.
    pub alignment_available: bool,
    /// Name of the alignment engine.
    pub alignment_engine: Option<String>,
    /// The alignment engine's model is loaded.
    pub alignment_loaded: bool,
    /// The renderer answered `-version`.
    pub renderer_available: bool,
}

/// Renders dialogue requests into videos.
///
/// Built from a validated [`PipelineConfig`]; speech synthesis and word alignment are plugged in
/// with [`with_voice`](Self::with_voice) and
/// [`with_alignment_engine`](Self::with_alignment_engine). Without an engine, captions fall back
/// to evenly split word timings.
pub struct DialogueRenderer {
    cfg: PipelineConfig,
    voice: Option<VoicePipeline>,
    aligner: WordAligner,
    timeline: TimelineBuilder,
    overlays: OverlayResolver,
    subtitles: SubtitleRenderer,
    planner: CompositionPlanner,
    executor: CompositionExecutor,
}

impl DialogueRenderer {
    /// Renderer for `cfg`, which is validated first.
    pub fn new(cfg: PipelineConfig) -> ReelResult<Self> {
        cfg.validate()?;
        Ok(Self {
            voice: None,
            aligner: WordAligner::unavailable(),
            timeline: TimelineBuilder::new(&cfg.timeline),
            overlays: OverlayResolver::new(&cfg.overlay),
            subtitles: SubtitleRenderer::new(cfg.subtitle.clone(), cfg.output.canvas),
            planner: CompositionPlanner::new(&cfg),
            executor: CompositionExecutor::from_config(&cfg),
            cfg,
        })
    }

    /// Install the speech pipeline.
    pub fn with_voice(mut self, voice: VoicePipeline) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Install an alignment engine, used with the configured alignment language.
    pub fn with_alignment_engine(mut self, engine: Arc<dyn AlignmentEngine>) -> Self {
        self.aligner = WordAligner::from_config(engine, &self.cfg.alignment);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Characters that can speak, in speaking order within a turn.
    pub fn characters(&self) -> &'static [Character] {
        &Character::ALL
    }

    /// Fail with the checked path if the background or an avatar is missing.
    pub async fn check_assets(&self) -> ReelResult<()> {
        let assets = &self.cfg.assets;
        require_asset("background video", &assets.background_video).await?;
        for character in Character::ALL {
            require_asset(&format!("{character} avatar"), assets.avatar(character)).await?;
        }
        Ok(())
    }

    /// Full request: synthesize every line in order, then compose.
    #[tracing::instrument(skip(self, req), fields(turns = req.conversation.len()))]
    pub async fn render(&self, req: &DialogueRequest, request_id: &str) -> ReelResult<RenderedVideo> {
        req.validate()?;
        self.check_assets().await?;
        let voice = self
            .voice
            .as_ref()
            .ok_or_else(|| ReelError::synthesis("no speech synthesizer is configured"))?;

        // One line at a time: voice models are not shared across concurrent conversions.
        let mut clips = Vec::with_capacity(req.spoken_line_count());
        for (turn, t) in req.conversation.iter().enumerate() {
            for (character, line) in t.spoken_lines() {
                clips.push(voice.speak(line, character, turn).await?);
            }
        }
        tracing::info!(clips = clips.len(), "speech synthesized");

        let media = decode_media_files(&req.media_files, &self.cfg.overlay);
        self.render_prepared(request_id, &clips, req.overlay_turns(), &media)
            .await
    }

    /// Compose already synthesized clips. `turns` holds the overlay specs of each turn.
    #[tracing::instrument(skip_all, fields(clips = clips.len()))]
    pub async fn render_prepared<'a>(
        &self,
        request_id: &str,
        clips: &[AudioClip],
        turns: impl IntoIterator<Item = &'a [OverlaySpec]>,
        media: &DecodedMedia,
    ) -> ReelResult<RenderedVideo> {
        if !clips.iter().any(AudioClip::is_spoken) {
            return Err(ReelError::validation("no spoken clips to render"));
        }
        self.check_assets().await?;

        let timeline = self.timeline.build(clips, &self.aligner).await;
        let overlays = self.resolve_overlays(turns, media, &timeline);

        let audio = self.executor.concat_audio(clips).await?;
        tracing::info!(bytes = audio.len(), "audio concatenated");

        let plan = self.plan(&timeline, &overlays, Arc::new(audio))?;
        let bytes = self.executor.execute(&plan).await?;
        tracing::info!(request_id, bytes = bytes.len(), "video rendered");

        Ok(RenderedVideo {
            request_id: request_id.to_string(),
            file_name: format!("dialogue_{request_id}.mp4"),
            bytes,
            duration_sec: timeline.total_duration,
        })
    }

    /// Plan the composition for a built timeline. Captions come from the timeline words.
    pub fn plan(
        &self,
        timeline: &Timeline,
        overlays: &[ResolvedOverlay],
        audio: Arc<Vec<u8>>,
    ) -> ReelResult<CompositionPlan> {
        let assets = &self.cfg.assets;
        self.planner.plan(PlanRequest {
            background: &assets.background_video,
            avatars: Character::ALL.map(|c| assets.avatar(c)),
            audio,
            subtitles: self.subtitles.render(&timeline.words),
            intervals: &timeline.intervals,
            overlays,
            total_duration: timeline.total_duration,
        })
    }

    /// Place each turn's overlays against the timeline words.
    pub fn resolve_overlays<'a>(
        &self,
        turns: impl IntoIterator<Item = &'a [OverlaySpec]>,
        media: &DecodedMedia,
        timeline: &Timeline,
    ) -> Vec<ResolvedOverlay> {
        let overlays = self.overlays.resolve(turns, media, &timeline.words);
        tracing::info!(overlays = overlays.len(), "overlays resolved");
        overlays
    }

    /// Timeline for `clips` using the configured aligner.
    pub async fn build_timeline(&self, clips: &[AudioClip]) -> Timeline {
        self.timeline.build(clips, &self.aligner).await
    }

    /// Caption-only operation: word timings for one utterance. Requires an alignment engine.
    pub async fn align_words(&self, audio: &[u8], text: &str) -> ReelResult<Vec<TimedWord>> {
        if text.trim().is_empty() {
            return Err(ReelError::validation("text is empty"));
        }
        self.aligner.align_strict(audio, text).await
    }

    /// Readiness of the installed collaborators.
    pub async fn health(&self) -> Health {
        let voice_models_loaded = match &self.voice {
            Some(v) => v.voices().loaded().await,
            None => Vec::new(),
        };
        Health {
            synthesis_configured: self.voice.is_some(),
            voice_models_loaded,
            alignment_available: self.aligner.is_available(),
            alignment_engine: self.aligner.engine_name().map(str::to_string),
            alignment_loaded: self.aligner.is_loaded().await,
            renderer_available: self.executor.is_available().await,
        }
    }
}

async fn require_asset(kind: &str, path: &Path) -> ReelResult<()> {
    match tokio::fs::try_exists(path).await {
        Ok(true) => Ok(()),
        _ => Err(ReelError::missing_asset(kind, path)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/renderer.rs"]
mod tests;
