//! Runs composition plans through the external renderer.
//!
//! Every invocation gets a private [`Workspace`]. Artifacts are written there, the renderer
//! writes its output there, and the directory is removed on every exit path: success, renderer
//! failure, an error while materializing, or the future being dropped.

use std::ffi::OsString;
use std::fmt::Write as _;
use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context as _;

use crate::compose::plan::CompositionPlan;
use crate::compose::workspace::Workspace;
use crate::config::{PipelineConfig, RendererConfig, TimelineConfig};
use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::AudioClip;

/// Lifecycle of one renderer job, logged at each transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecPhase {
    /// Workspace created.
    Prepared,
    /// Artifacts being written.
    Materializing,
    /// Renderer running.
    Invoking,
    /// Renderer exited successfully and its output was read.
    Succeeded,
    /// Any step failed.
    Failed,
    /// Workspace removed.
    Released,
}

/// Executes plans and the audio concatenation sub-step.
#[derive(Clone, Debug)]
pub struct CompositionExecutor {
    program: String,
    leading_args: Vec<String>,
    temp_root: Option<PathBuf>,
    gap_sec: f64,
    pad_gaps: bool,
}

impl CompositionExecutor {
    /// Executor for `renderer`; the gap between clips comes from `timeline`.
    pub fn new(renderer: &RendererConfig, timeline: &TimelineConfig) -> Self {
        Self {
            program: renderer.program.clone(),
            leading_args: renderer.leading_args.clone(),
            temp_root: renderer.temp_root.clone(),
            gap_sec: timeline.gap_sec,
            pad_gaps: renderer.pad_audio_gaps,
        }
    }

    /// Executor built from the renderer and timeline sections of `cfg`.
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(&cfg.renderer, &cfg.timeline)
    }

    /// Whether the renderer executable answers `-version`.
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Render `plan` and return the encoded video.
    #[tracing::instrument(skip_all, fields(inputs = plan.inputs.len(), artifacts = plan.artifacts.len()))]
    pub async fn execute(&self, plan: &CompositionPlan) -> ReelResult<Vec<u8>> {
        plan.validate()?;
        let ws = Workspace::create(self.temp_root.as_deref())?;
        log_phase(ExecPhase::Prepared, &ws);
        let result = self.execute_in(&ws, plan).await;
        finish(ws, result)
    }

    async fn execute_in(&self, ws: &Workspace, plan: &CompositionPlan) -> ReelResult<Vec<u8>> {
        log_phase(ExecPhase::Materializing, ws);
        let mut paths = Vec::with_capacity(plan.artifacts.len());
        for artifact in &plan.artifacts {
            paths.push(ws.write(&artifact.file_name, &artifact.bytes).await?);
        }
        let out = ws.file("output.mp4");
        let args = plan.to_args(&paths, &out)?;

        log_phase(ExecPhase::Invoking, ws);
        self.run(&args).await?;
        read_and_remove(&out).await
    }

    /// Concatenate the spoken clips into one WAV track.
    ///
    /// With gap padding enabled, silence of the timeline gap is inserted between clips so the
    /// audio lines up with the speaking intervals.
    #[tracing::instrument(skip_all, fields(clips = clips.len()))]
    pub async fn concat_audio(&self, clips: &[AudioClip]) -> ReelResult<Vec<u8>> {
        let spoken: Vec<&AudioClip> = clips.iter().filter(|c| c.is_spoken()).collect();
        if spoken.is_empty() {
            return Err(ReelError::validation("no spoken clips to concatenate"));
        }
        let ws = Workspace::create(self.temp_root.as_deref())?;
        log_phase(ExecPhase::Prepared, &ws);
        let result = self.concat_in(&ws, &spoken).await;
        finish(ws, result)
    }

    async fn concat_in(&self, ws: &Workspace, clips: &[&AudioClip]) -> ReelResult<Vec<u8>> {
        log_phase(ExecPhase::Materializing, ws);
        let gap = if self.pad_gaps && self.gap_sec > 0.0 && clips.len() > 1 {
            match silence_like(&clips[0].audio, self.gap_sec) {
                Ok(wav) => Some(ws.write("gap.wav", &wav).await?),
                Err(err) => {
                    tracing::warn!(error = %err, "cannot build gap silence, concatenating without gaps");
                    None
                }
            }
        } else {
            None
        };

        let mut list = String::new();
        for (i, clip) in clips.iter().enumerate() {
            if i > 0 && gap.is_some() {
                list.push_str("file 'gap.wav'\n");
            }
            let name = format!("clip_{i:03}.wav");
            ws.write(&name, &clip.audio).await?;
            let _ = writeln!(list, "file '{name}'");
        }
        let list_path = ws.write("concat.txt", list.as_bytes()).await?;
        let out = ws.file("combined.wav");

        let args: Vec<OsString> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_path.into_os_string(),
            "-c".into(),
            "copy".into(),
            out.clone().into_os_string(),
        ];
        log_phase(ExecPhase::Invoking, ws);
        self.run(&args).await?;
        read_and_remove(&out).await
    }

    async fn run(&self, args: &[OsString]) -> ReelResult<()> {
        tracing::debug!(program = %self.program, args = ?args, "invoking renderer");
        let output = tokio::process::Command::new(&self.program)
            .args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to start renderer '{}'", self.program))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ReelError::render(output.status.to_string(), stderr));
        }
        Ok(())
    }
}

fn log_phase(phase: ExecPhase, ws: &Workspace) {
    tracing::info!(?phase, workspace = %ws.path().display(), "renderer job");
}

fn finish<T>(ws: Workspace, result: ReelResult<T>) -> ReelResult<T> {
    match &result {
        Ok(_) => log_phase(ExecPhase::Succeeded, &ws),
        Err(err) => {
            log_phase(ExecPhase::Failed, &ws);
            tracing::warn!(error = %err, "renderer job failed");
        }
    }
    let path = ws.path().to_path_buf();
    if let Err(err) = ws.release() {
        tracing::warn!(error = %err, "workspace cleanup failed");
    }
    tracing::info!(phase = ?ExecPhase::Released, workspace = %path.display(), "renderer job");
    result
}

async fn read_and_remove(path: &std::path::Path) -> ReelResult<Vec<u8>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read renderer output '{}'", path.display()))?;
    tokio::fs::remove_file(path)
        .await
        .with_context(|| format!("remove renderer output '{}'", path.display()))?;
    Ok(bytes)
}

/// Silent WAV of `secs` seconds in the same format as `template`.
pub fn silence_like(template: &[u8], secs: f64) -> ReelResult<Vec<u8>> {
    let spec = hound::WavReader::new(Cursor::new(template))
        .map_err(|e| ReelError::validation(format!("invalid WAV audio: {e}")))?
        .spec();
    let frames = (secs * f64::from(spec.sample_rate)).round() as u64;
    let samples = frames * u64::from(spec.channels);

    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec).context("start silence WAV")?;
        for _ in 0..samples {
            match spec.sample_format {
                hound::SampleFormat::Float => writer.write_sample(0.0f32),
                hound::SampleFormat::Int => writer.write_sample(0i32),
            }
            .context("write silence sample")?;
        }
        writer.finalize().context("finish silence WAV")?;
    }
    Ok(buf.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/compose/executor.rs"]
mod tests;
