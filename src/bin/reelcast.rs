use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reelcast::pipeline::{DialogueRenderer, RenderManifest, new_request_id};
use reelcast::subtitle::SubtitleRenderer;
use reelcast::timeline::GlobalWordEntry;
use reelcast::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "reelcast", version)]
struct Cli {
    /// Pipeline config JSON. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an MP4 from a manifest of synthesized clips (requires `ffmpeg`).
    Render(RenderArgs),
    /// Write an ASS caption file from a word timeline JSON.
    Subtitles(SubtitlesArgs),
    /// Print the renderer argument list for a manifest without running it.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input manifest JSON.
    #[arg(long)]
    manifest: PathBuf,

    /// Output MP4 path. Defaults to `dialogue_<id>.mp4` in the current directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Request id used in logs and the default file name.
    #[arg(long)]
    request_id: Option<String>,
}

#[derive(Parser, Debug)]
struct SubtitlesArgs {
    /// JSON array of `{text, start, end, character}` entries.
    #[arg(long)]
    words: PathBuf,

    /// Output `.ass` path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Input manifest JSON.
    #[arg(long)]
    manifest: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    match cli.cmd {
        Command::Render(args) => cmd_render(cfg, args).await,
        Command::Subtitles(args) => cmd_subtitles(cfg, args),
        Command::Plan(args) => cmd_plan(cfg, args).await,
    }
}

fn manifest_base(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

async fn cmd_render(cfg: PipelineConfig, args: RenderArgs) -> anyhow::Result<()> {
    let manifest = RenderManifest::from_path(&args.manifest)?;
    let prepared = manifest
        .load(manifest_base(&args.manifest), &cfg.overlay)
        .await?;
    let renderer = DialogueRenderer::new(cfg)?;

    let request_id = args.request_id.unwrap_or_else(new_request_id);
    let video = renderer
        .render_prepared(
            &request_id,
            &prepared.clips,
            prepared.overlay_turns(),
            &prepared.media,
        )
        .await?;

    let out = args.out.unwrap_or_else(|| PathBuf::from(&video.file_name));
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&out, &video.bytes).with_context(|| format!("write video '{}'", out.display()))?;

    eprintln!("wrote {} ({:.2}s)", out.display(), video.duration_sec);
    Ok(())
}

fn cmd_subtitles(cfg: PipelineConfig, args: SubtitlesArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.words)
        .with_context(|| format!("read word timeline '{}'", args.words.display()))?;
    let words: Vec<GlobalWordEntry> = serde_json::from_str(&text)
        .with_context(|| format!("parse word timeline '{}'", args.words.display()))?;

    let ass = SubtitleRenderer::new(cfg.subtitle, cfg.output.canvas).render(&words);
    std::fs::write(&args.out, ass).with_context(|| format!("write '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

async fn cmd_plan(cfg: PipelineConfig, args: PlanArgs) -> anyhow::Result<()> {
    let manifest = RenderManifest::from_path(&args.manifest)?;
    let prepared = manifest
        .load(manifest_base(&args.manifest), &cfg.overlay)
        .await?;
    let program = cfg.renderer.program.clone();
    let renderer = DialogueRenderer::new(cfg)?;

    let timeline = renderer.build_timeline(&prepared.clips).await;
    let overlays = renderer.resolve_overlays(prepared.overlay_turns(), &prepared.media, &timeline);
    let plan = renderer.plan(&timeline, &overlays, Arc::new(Vec::new()))?;
    let argv = plan.to_args(&plan.placeholder_paths(), Path::new("output.mp4"))?;

    println!("{program}");
    for arg in argv {
        println!("  {}", arg.to_string_lossy());
    }
    Ok(())
}
