//! Declarative render job for the external renderer.
//!
//! A [`CompositionPlan`] lists inputs in a fixed order (background, one avatar per character,
//! the combined audio, then one input per overlay), the filter chains that stack them, and the
//! output mapping. In-memory payloads (captions, audio, overlay media) are carried as
//! [`Artifact`]s that the executor writes to a scoped directory before invoking the renderer.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compose::filter::{Filter, FilterOp, StreamRef};
use crate::config::{AvatarBlend, AvatarConfig, OutputConfig, OverlayConfig, PipelineConfig};
use crate::expression::emit::fmt_num;
use crate::expression::{avatar_visibility, window_gate};
use crate::foundation::core::{Character, MediaKind};
use crate::foundation::error::{ReelError, ReelResult};
use crate::overlay::ResolvedOverlay;
use crate::timeline::CharacterInterval;

/// Index into [`CompositionPlan::artifacts`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactId(pub usize);

/// In-memory payload materialized as a file for the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    /// File name inside the request's scratch directory.
    pub file_name: String,
    /// File contents.
    pub bytes: Arc<Vec<u8>>,
}

/// Where an input file comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum InputSource {
    /// File that already exists on disk.
    Path(PathBuf),
    /// File written from an artifact.
    Artifact(ArtifactId),
}

/// What an input is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputRole {
    /// Looping background footage.
    Background,
    /// Avatar still of a character.
    Avatar(Character),
    /// Concatenated dialogue audio.
    Audio,
    /// Overlay media, indexed into the resolved overlays.
    Overlay(usize),
}

/// One `-i` declaration with its input options.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanInput {
    /// What the input is used for.
    pub role: InputRole,
    /// File backing the input.
    pub source: InputSource,
    /// Options placed before `-i`, such as looping and trimming.
    pub pre_args: Vec<String>,
}

/// Stream mapping and encoder settings.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputSpec {
    /// Label of the final video stream.
    pub video_label: String,
    /// Input whose audio stream is muxed.
    pub audio_input: usize,
    /// Encoder settings.
    pub config: OutputConfig,
    /// Stop at the end of the shortest stream.
    ///
    /// The audio track ends before the padded composition length, so anything scheduled after
    /// the last spoken word is cut.
    pub shortest: bool,
}

impl OutputSpec {
    /// Output options, excluding the output path.
    pub fn args(&self) -> Vec<String> {
        let c = &self.config;
        let mut args = vec![
            "-map".to_string(),
            format!("[{}]", self.video_label),
            "-map".to_string(),
            format!("{}:a", self.audio_input),
            "-c:v".to_string(),
            c.video_codec.clone(),
            "-preset".to_string(),
            c.preset.clone(),
            "-crf".to_string(),
            c.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            c.audio_codec.clone(),
            "-s".to_string(),
            format!("{}x{}", c.canvas.width, c.canvas.height),
            "-r".to_string(),
            c.fps.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ];
        if self.shortest {
            args.push("-shortest".to_string());
        }
        args
    }
}

/// Full render job.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionPlan {
    /// Inputs in `-i` order.
    pub inputs: Vec<PlanInput>,
    /// Files to write before invoking the renderer.
    pub artifacts: Vec<Artifact>,
    /// Filter chains in graph order.
    pub filters: Vec<FilterOp>,
    /// Stream mapping and encoding.
    pub output: OutputSpec,
    /// Padded composition length in seconds.
    pub total_duration: f64,
}

impl CompositionPlan {
    /// Check that every reference resolves and that chains only consume what was produced
    /// earlier, each intermediate exactly once.
    pub fn validate(&self) -> ReelResult<()> {
        if !(self.total_duration.is_finite() && self.total_duration > 0.0) {
            return Err(ReelError::validation(format!(
                "plan duration must be > 0 (got {})",
                self.total_duration
            )));
        }
        let artifact_ok = |id: ArtifactId| id.0 < self.artifacts.len();
        for (i, input) in self.inputs.iter().enumerate() {
            if let InputSource::Artifact(id) = input.source
                && !artifact_ok(id)
            {
                return Err(ReelError::validation(format!(
                    "input {i} references unknown artifact #{}",
                    id.0
                )));
            }
        }
        match self.inputs.get(self.output.audio_input) {
            Some(input) if input.role == InputRole::Audio => {}
            _ => {
                return Err(ReelError::validation(format!(
                    "audio is mapped from input {}, which is not the audio track",
                    self.output.audio_input
                )));
            }
        }

        let mut produced: HashSet<&str> = HashSet::new();
        let mut consumed: HashSet<&str> = HashSet::new();
        for (n, op) in self.filters.iter().enumerate() {
            for input in &op.inputs {
                match input {
                    StreamRef::InputVideo(i) if *i >= self.inputs.len() => {
                        return Err(ReelError::validation(format!(
                            "filter {n} reads undeclared input {i}"
                        )));
                    }
                    StreamRef::InputVideo(_) => {}
                    StreamRef::Label(l) => {
                        if !produced.contains(l.as_str()) {
                            return Err(ReelError::validation(format!(
                                "filter {n} reads '{l}' before it is produced"
                            )));
                        }
                        if !consumed.insert(l.as_str()) {
                            return Err(ReelError::validation(format!(
                                "filter {n} reads '{l}', which was already consumed"
                            )));
                        }
                    }
                }
            }
            for f in &op.chain {
                if let Filter::Subtitles(id) = f
                    && !artifact_ok(*id)
                {
                    return Err(ReelError::validation(format!(
                        "filter {n} burns unknown artifact #{}",
                        id.0
                    )));
                }
            }
            if op.output.is_empty() || !produced.insert(op.output.as_str()) {
                return Err(ReelError::validation(format!(
                    "filter {n} output '{}' is empty or produced twice",
                    op.output
                )));
            }
        }
        let out = self.output.video_label.as_str();
        if !produced.contains(out) || consumed.contains(out) {
            return Err(ReelError::validation(format!(
                "mapped video '{out}' is not an unconsumed filter output"
            )));
        }
        Ok(())
    }

    /// The `-filter_complex` text, given where each artifact was written.
    pub fn filter_graph(&self, artifact_paths: &[PathBuf]) -> ReelResult<String> {
        let mut out = String::new();
        for (i, op) in self.filters.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            op.render(&mut out, artifact_paths)?;
        }
        Ok(out)
    }

    /// Complete renderer argument list writing to `output`.
    pub fn to_args(&self, artifact_paths: &[PathBuf], output: &Path) -> ReelResult<Vec<OsString>> {
        let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();
        for input in &self.inputs {
            args.extend(input.pre_args.iter().map(OsString::from));
            args.push("-i".into());
            let path = match &input.source {
                InputSource::Path(p) => p.as_path(),
                InputSource::Artifact(id) => artifact_paths
                    .get(id.0)
                    .map(PathBuf::as_path)
                    .ok_or_else(|| {
                        ReelError::validation(format!("artifact #{} was not materialized", id.0))
                    })?,
            };
            args.push(path.as_os_str().to_owned());
        }
        args.push("-filter_complex".into());
        args.push(self.filter_graph(artifact_paths)?.into());
        args.extend(self.output.args().into_iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        Ok(args)
    }

    /// Artifact paths as bare file names, for printing a plan without materializing it.
    pub fn placeholder_paths(&self) -> Vec<PathBuf> {
        self.artifacts
            .iter()
            .map(|a| PathBuf::from(&a.file_name))
            .collect()
    }
}

/// Everything the planner needs for one request.
#[derive(Clone, Debug)]
pub struct PlanRequest<'a> {
    /// Background footage on disk.
    pub background: &'a Path,
    /// Avatar images in [`Character::ALL`] order.
    pub avatars: [&'a Path; 2],
    /// Combined audio track (WAV).
    pub audio: Arc<Vec<u8>>,
    /// Caption document.
    pub subtitles: String,
    /// Speaking intervals driving avatar visibility.
    pub intervals: &'a [CharacterInterval],
    /// Overlays with their windows.
    pub overlays: &'a [ResolvedOverlay],
    /// Padded composition length in seconds.
    pub total_duration: f64,
}

const AUDIO_INPUT: usize = 3;
const FIRST_OVERLAY_INPUT: usize = 4;
const AVATAR_BOTTOM_MARGIN: u32 = 30;

// Two fixed screen roles; the layout does not generalize to more speakers.
fn avatar_x(character: Character) -> i32 {
    match character {
        Character::Stewie => 400,
        Character::Peter => -300,
    }
}

/// Builds [`CompositionPlan`]s.
#[derive(Clone, Debug, Default)]
pub struct CompositionPlanner {
    avatar: AvatarConfig,
    overlay: OverlayConfig,
    output: OutputConfig,
}

impl CompositionPlanner {
    /// Planner using the avatar, overlay and output sections of `cfg`.
    pub fn new(cfg: &PipelineConfig) -> Self {
        Self {
            avatar: cfg.avatar.clone(),
            overlay: cfg.overlay.clone(),
            output: cfg.output.clone(),
        }
    }

    /// Build and validate the plan for one request.
    #[tracing::instrument(skip_all, fields(
        intervals = req.intervals.len(),
        overlays = req.overlays.len(),
        total_duration = req.total_duration
    ))]
    pub fn plan(&self, req: PlanRequest<'_>) -> ReelResult<CompositionPlan> {
        let total = fmt_num(req.total_duration);
        let fps = self.output.fps.to_string();
        let subtitles = ArtifactId(0);
        let audio = ArtifactId(1);
        let mut artifacts = vec![
            Artifact {
                file_name: "captions.ass".to_string(),
                bytes: Arc::new(req.subtitles.into_bytes()),
            },
            Artifact {
                file_name: "audio.wav".to_string(),
                bytes: req.audio,
            },
        ];

        let mut inputs = vec![PlanInput {
            role: InputRole::Background,
            source: InputSource::Path(req.background.to_path_buf()),
            pre_args: strings(["-stream_loop", "-1", "-t", total.as_str()]),
        }];
        for character in Character::ALL {
            let pre_args = match self.avatar.blend {
                AvatarBlend::Alpha => strings([
                    "-loop",
                    "1",
                    "-framerate",
                    fps.as_str(),
                    "-t",
                    total.as_str(),
                ]),
                AvatarBlend::Gate => Vec::new(),
            };
            inputs.push(PlanInput {
                role: InputRole::Avatar(character),
                source: InputSource::Path(req.avatars[character.index()].to_path_buf()),
                pre_args,
            });
        }
        inputs.push(PlanInput {
            role: InputRole::Audio,
            source: InputSource::Artifact(audio),
            pre_args: Vec::new(),
        });

        let mut filters = Vec::new();
        let mut below = StreamRef::InputVideo(0);
        for character in Character::ALL {
            let visibility = avatar_visibility(
                req.intervals
                    .iter()
                    .filter(|i| i.character == character)
                    .map(|i| i.span),
                self.avatar.fade_in_sec,
                self.avatar.fade_out_sec,
            );
            let img = format!("{character}_img");
            let mut chain = Vec::new();
            if self.avatar.blend == AvatarBlend::Alpha {
                chain.push(Filter::Format("rgba"));
            }
            chain.push(Filter::Scale {
                width: -1,
                height: self.avatar.height_px as i32,
            });
            if self.avatar.blend == AvatarBlend::Alpha && !visibility.is_zero() {
                chain.push(Filter::AlphaMask(visibility.clone()));
            }
            filters.push(FilterOp::new(
                vec![StreamRef::InputVideo(1 + character.index())],
                chain,
                img.clone(),
            ));

            let out = if character.index() + 1 == Character::ALL.len() {
                "with_characters".to_string()
            } else {
                format!("with_{character}")
            };
            filters.push(FilterOp::new(
                vec![below, StreamRef::label(img)],
                vec![Filter::Overlay {
                    x: avatar_x(character).to_string(),
                    y: format!("H-h-{AVATAR_BOTTOM_MARGIN}"),
                    enable: Some(visibility),
                }],
                out.clone(),
            ));
            below = StreamRef::label(out);
        }

        for (i, overlay) in req.overlays.iter().enumerate() {
            let artifact = ArtifactId(artifacts.len());
            artifacts.push(Artifact {
                file_name: format!("overlay_{i}.{}", overlay.media.extension()),
                bytes: overlay.media.bytes.clone(),
            });
            let index = inputs.len();
            debug_assert_eq!(index, FIRST_OVERLAY_INPUT + i);
            inputs.push(PlanInput {
                role: InputRole::Overlay(i),
                source: InputSource::Artifact(artifact),
                pre_args: Vec::new(),
            });

            let mut chain = Vec::new();
            if overlay.kind == MediaKind::Clip {
                chain.push(Filter::Retime {
                    offset: overlay.start,
                });
            }
            chain.push(Filter::Scale {
                width: self.overlay.width_px as i32,
                height: -1,
            });
            let scaled = format!("overlay_{i}");
            filters.push(FilterOp::new(
                vec![StreamRef::InputVideo(index)],
                chain,
                scaled.clone(),
            ));
            let out = if i + 1 == req.overlays.len() {
                "with_overlays".to_string()
            } else {
                format!("with_overlay_{i}")
            };
            filters.push(FilterOp::new(
                vec![below, StreamRef::label(scaled)],
                vec![Filter::Overlay {
                    x: "(W-w)/2".to_string(),
                    y: self.overlay.top_px.to_string(),
                    enable: Some(window_gate(overlay.window())),
                }],
                out.clone(),
            ));
            below = StreamRef::label(out);
        }

        filters.push(FilterOp::new(
            vec![below],
            vec![Filter::Subtitles(subtitles)],
            "final",
        ));

        let plan = CompositionPlan {
            inputs,
            artifacts,
            filters,
            output: OutputSpec {
                video_label: "final".to_string(),
                audio_input: AUDIO_INPUT,
                config: self.output.clone(),
                shortest: true,
            },
            total_duration: req.total_duration,
        };
        plan.validate()?;
        tracing::info!(
            inputs = plan.inputs.len(),
            filters = plan.filters.len(),
            "composition planned"
        );
        Ok(plan)
    }
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/compose/plan.rs"]
mod tests;
