use super::*;
use crate::config::AvatarBlend;
use crate::foundation::core::TimeSpan;
use crate::overlay::MediaBuffer;

fn interval(character: Character, start: f64, end: f64) -> CharacterInterval {
    CharacterInterval {
        character,
        span: TimeSpan { start, end },
        turn: 0,
    }
}

fn hi_yo() -> Vec<CharacterInterval> {
    vec![
        interval(Character::Stewie, 0.0, 1.0),
        interval(Character::Peter, 1.2, 2.2),
    ]
}

fn overlay(name: &str, kind: MediaKind, start: f64, duration: f64) -> ResolvedOverlay {
    ResolvedOverlay {
        media: MediaBuffer {
            filename: name.to_string(),
            mime_type: None,
            bytes: Arc::new(b"payload".to_vec()),
        },
        kind,
        start,
        duration,
        description: String::new(),
        turn: 0,
    }
}

fn planner(blend: AvatarBlend) -> CompositionPlanner {
    let mut cfg = PipelineConfig::default();
    cfg.avatar.blend = blend;
    CompositionPlanner::new(&cfg)
}

fn request<'a>(
    intervals: &'a [CharacterInterval],
    overlays: &'a [ResolvedOverlay],
) -> PlanRequest<'a> {
    PlanRequest {
        background: Path::new("/assets/bg.mp4"),
        avatars: [Path::new("/assets/stewie.png"), Path::new("/assets/peter.png")],
        audio: Arc::new(b"RIFF".to_vec()),
        subtitles: "[Script Info]\n".to_string(),
        intervals,
        overlays,
        total_duration: 3.0,
    }
}

fn paths(plan: &CompositionPlan) -> Vec<PathBuf> {
    plan.artifacts
        .iter()
        .map(|a| Path::new("/work").join(&a.file_name))
        .collect()
}

#[test]
fn inputs_are_declared_in_fixed_order() {
    let plan = planner(AvatarBlend::Gate).plan(request(&hi_yo(), &[])).unwrap();
    let roles: Vec<InputRole> = plan.inputs.iter().map(|i| i.role).collect();
    assert_eq!(
        roles,
        vec![
            InputRole::Background,
            InputRole::Avatar(Character::Stewie),
            InputRole::Avatar(Character::Peter),
            InputRole::Audio,
        ]
    );
    assert_eq!(
        plan.inputs[0].pre_args,
        vec!["-stream_loop", "-1", "-t", "3"]
    );
    assert_eq!(
        plan.inputs[1].source,
        InputSource::Path(PathBuf::from("/assets/stewie.png"))
    );
    assert_eq!(plan.inputs[3].source, InputSource::Artifact(ArtifactId(1)));
    assert_eq!(plan.artifacts[0].file_name, "captions.ass");
    assert_eq!(plan.artifacts[1].bytes.as_slice(), b"RIFF");
}

#[test]
fn gate_mode_graph_without_overlays() {
    let plan = planner(AvatarBlend::Gate).plan(request(&hi_yo(), &[])).unwrap();
    let graph = plan.filter_graph(&paths(&plan)).unwrap();
    let expected = [
        "[1:v]scale=-1:700[stewie_img]",
        "[0:v][stewie_img]overlay=400:H-h-30:enable='gte(t,0)*lt(t,1)*min(1,min((t-0)/0.05,(1-t)/0.05))'[with_stewie]",
        "[2:v]scale=-1:700[peter_img]",
        "[with_stewie][peter_img]overlay=-300:H-h-30:enable='gte(t,1.2)*lt(t,2.2)*min(1,min((t-1.2)/0.05,(2.2-t)/0.05))'[with_characters]",
        "[with_characters]subtitles='/work/captions.ass'[final]",
    ]
    .join(";");
    assert_eq!(graph, expected);
}

#[test]
fn silent_character_gets_literal_zero() {
    let only_stewie = vec![interval(Character::Stewie, 0.0, 1.0)];
    let plan = planner(AvatarBlend::Gate)
        .plan(request(&only_stewie, &[]))
        .unwrap();
    let graph = plan.filter_graph(&paths(&plan)).unwrap();
    assert!(graph.contains("overlay=-300:H-h-30:enable='0'[with_characters]"));

    let alpha = planner(AvatarBlend::Alpha)
        .plan(request(&only_stewie, &[]))
        .unwrap();
    let graph = alpha.filter_graph(&paths(&alpha)).unwrap();
    assert!(graph.contains("[2:v]format=rgba,scale=-1:700[peter_img]"));
}

#[test]
fn alpha_mode_loops_avatars_and_masks_alpha() {
    let plan = planner(AvatarBlend::Alpha).plan(request(&hi_yo(), &[])).unwrap();
    assert_eq!(
        plan.inputs[1].pre_args,
        vec!["-loop", "1", "-framerate", "30", "-t", "3"]
    );
    let graph = plan.filter_graph(&paths(&plan)).unwrap();
    assert!(graph.starts_with(
        "[1:v]format=rgba,scale=-1:700,geq=r='r(X,Y)':g='g(X,Y)':b='b(X,Y)':a='alpha(X,Y)*(gte(T,0)*lt(T,1)*min(1,min((T-0)/0.05,(1-T)/0.05)))'[stewie_img]"
    ));
    assert!(graph.contains("overlay=400:H-h-30:enable='gte(t,0)*lt(t,1)"));
}

#[test]
fn overlays_stack_in_order_with_hard_gates() {
    let overlays = vec![
        overlay("cat.png", MediaKind::Image, 0.5, 3.0),
        overlay("dance.mp4", MediaKind::Clip, 1.2, 10.0),
    ];
    let plan = planner(AvatarBlend::Gate)
        .plan(request(&hi_yo(), &overlays))
        .unwrap();

    assert_eq!(plan.inputs.len(), 6);
    assert_eq!(plan.inputs[4].role, InputRole::Overlay(0));
    assert_eq!(plan.inputs[5].source, InputSource::Artifact(ArtifactId(3)));
    assert_eq!(plan.artifacts[2].file_name, "overlay_0.png");
    assert_eq!(plan.artifacts[3].file_name, "overlay_1.mp4");

    let graph = plan.filter_graph(&paths(&plan)).unwrap();
    let ops: Vec<&str> = graph.split(';').collect();
    assert_eq!(ops[4], "[4:v]scale=600:-1[overlay_0]");
    assert_eq!(
        ops[5],
        "[with_characters][overlay_0]overlay=(W-w)/2:100:enable='gte(t,0.5)*lt(t,3.5)'[with_overlay_0]"
    );
    assert_eq!(ops[6], "[5:v]setpts=PTS-STARTPTS+1.2/TB,scale=600:-1[overlay_1]");
    assert_eq!(
        ops[7],
        "[with_overlay_0][overlay_1]overlay=(W-w)/2:100:enable='gte(t,1.2)*lt(t,11.2)'[with_overlays]"
    );
    assert_eq!(ops[8], "[with_overlays]subtitles='/work/captions.ass'[final]");
}

#[test]
fn output_maps_final_video_and_audio_with_shortest() {
    let plan = planner(AvatarBlend::Gate).plan(request(&hi_yo(), &[])).unwrap();
    assert!(plan.output.shortest);
    assert_eq!(
        plan.output.args(),
        vec![
            "-map", "[final]", "-map", "3:a", "-c:v", "libx264", "-preset", "slow", "-crf", "18",
            "-pix_fmt", "yuv420p", "-c:a", "aac", "-s", "1080x1920", "-r", "30", "-movflags",
            "+faststart", "-shortest",
        ]
    );
}

#[test]
fn argv_resolves_artifacts_and_ends_with_output() {
    let overlays = vec![overlay("cat.png", MediaKind::Image, 0.5, 3.0)];
    let plan = planner(AvatarBlend::Gate)
        .plan(request(&hi_yo(), &overlays))
        .unwrap();
    let args: Vec<String> = plan
        .to_args(&paths(&plan), Path::new("/work/out.mp4"))
        .unwrap()
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    assert_eq!(&args[..4], &["-y", "-hide_banner", "-loglevel", "error"]);
    let inputs: Vec<&str> = args
        .windows(2)
        .filter(|w| w[0] == "-i")
        .map(|w| w[1].as_str())
        .collect();
    assert_eq!(
        inputs,
        vec![
            "/assets/bg.mp4",
            "/assets/stewie.png",
            "/assets/peter.png",
            "/work/audio.wav",
            "/work/overlay_0.png",
        ]
    );
    let fc = args.iter().position(|a| a == "-filter_complex").unwrap();
    assert!(args[fc + 1].ends_with("[final]"));
    assert_eq!(args.last().unwrap(), "/work/out.mp4");

    assert!(plan.to_args(&[], Path::new("/work/out.mp4")).is_err());
}

#[test]
fn validation_rejects_broken_graphs() {
    let good = planner(AvatarBlend::Gate).plan(request(&hi_yo(), &[])).unwrap();
    good.validate().unwrap();

    let mut early = good.clone();
    early.filters.swap(0, 1);
    assert!(early.validate().is_err());

    let mut reused = good.clone();
    reused.filters.insert(
        4,
        FilterOp::new(
            vec![StreamRef::label("with_stewie")],
            vec![Filter::Format("rgba")],
            "dup",
        ),
    );
    assert!(reused.validate().is_err());

    let mut undeclared = good.clone();
    undeclared.filters[0].inputs = vec![StreamRef::InputVideo(9)];
    assert!(undeclared.validate().is_err());

    let mut bad_audio = good.clone();
    bad_audio.output.audio_input = 0;
    assert!(bad_audio.validate().is_err());

    let mut bad_artifact = good.clone();
    bad_artifact.artifacts.truncate(1);
    assert!(bad_artifact.validate().is_err());

    let mut zero = good;
    zero.total_duration = 0.0;
    assert!(zero.validate().is_err());
}

#[test]
fn paths_with_quotes_cannot_enter_the_graph() {
    use crate::compose::filter::quote_filter_path;
    assert_eq!(
        quote_filter_path(Path::new("/tmp/a b,c/x.ass")).unwrap(),
        "'/tmp/a b,c/x.ass'"
    );
    assert_eq!(
        quote_filter_path(Path::new("/tmp/a:b/x.ass")).unwrap(),
        r"'/tmp/a\:b/x.ass'"
    );
    assert!(quote_filter_path(Path::new("/tmp/it's/x.ass")).is_err());
}
