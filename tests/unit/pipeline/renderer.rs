use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::{Engine as _, engine::general_purpose};

use super::*;
use crate::align::{AlignedSegment, AlignedWord};
use crate::foundation::registry::ModelLoader;
use crate::overlay::MediaFile;
use crate::pipeline::request::ConversationTurn;
use crate::synth::{ConvertedAudio, SpeechSynthesizer, VoiceModel, VoiceModelRegistry};

struct CountingTts {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl SpeechSynthesizer for CountingTts {
    async fn synthesize(&self, text: &str, _character: Character) -> ReelResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.as_bytes().to_vec())
    }
}

/// One second of audio per word.
struct WordSecondModel;

#[async_trait::async_trait]
impl VoiceModel for WordSecondModel {
    async fn convert(&self, audio: &[u8]) -> ReelResult<ConvertedAudio> {
        let words = String::from_utf8_lossy(audio).split_whitespace().count();
        Ok(ConvertedAudio {
            sample_rate: 100,
            samples: vec![0.0; words * 100],
        })
    }
}

struct Loader;

#[async_trait::async_trait]
impl ModelLoader<Character, dyn VoiceModel> for Loader {
    async fn load(&self, _key: &Character) -> ReelResult<Arc<dyn VoiceModel>> {
        Ok(Arc::new(WordSecondModel))
    }
}

struct Fixture {
    _tmp: tempfile::TempDir,
    scratch: PathBuf,
    cfg: PipelineConfig,
}

// Writes each renderer argv into the output file, so tests can inspect the invocation.
const ECHO_ARGV: &str = r#"for last; do :; done; printf '%s\n' "$@" > "$last""#;

fn fixture(script: &str) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let assets = tmp.path().join("assets");
    std::fs::create_dir_all(&assets).unwrap();
    for name in ["bg.mp4", "stewie.png", "peter.png"] {
        std::fs::write(assets.join(name), b"x").unwrap();
    }
    let scratch = tmp.path().join("scratch");

    let mut cfg = PipelineConfig::default();
    cfg.assets.background_video = assets.join("bg.mp4");
    cfg.assets.stewie_avatar = assets.join("stewie.png");
    cfg.assets.peter_avatar = assets.join("peter.png");
    cfg.renderer.program = "sh".to_string();
    cfg.renderer.leading_args = vec!["-c".into(), script.into(), "fake-ffmpeg".into()];
    cfg.renderer.temp_root = Some(scratch.clone());
    Fixture {
        _tmp: tmp,
        scratch,
        cfg,
    }
}

fn renderer(cfg: PipelineConfig, tts: Arc<CountingTts>) -> DialogueRenderer {
    let voices = Arc::new(VoiceModelRegistry::new(
        Arc::new(Loader) as Arc<dyn ModelLoader<Character, dyn VoiceModel>>
    ));
    DialogueRenderer::new(cfg)
        .unwrap()
        .with_voice(VoicePipeline::new(tts, voices))
}

fn tts() -> Arc<CountingTts> {
    Arc::new(CountingTts {
        calls: AtomicUsize::new(0),
    })
}

fn request() -> DialogueRequest {
    DialogueRequest {
        conversation: vec![
            ConversationTurn {
                stewie: Some("look at this cat".into()),
                peter: Some("nice".into()),
                overlays: vec![OverlaySpec {
                    filename: "cat.png".into(),
                    trigger_word: Some("Cat".into()),
                    ..OverlaySpec::default()
                }],
            },
            ConversationTurn {
                stewie: Some("   ".into()),
                peter: Some("bye".into()),
                overlays: vec![OverlaySpec {
                    filename: "missing.png".into(),
                    ..OverlaySpec::default()
                }],
            },
        ],
        media_files: vec![MediaFile {
            data: general_purpose::STANDARD.encode(b"\x89PNG\r\n\x1a\nfake"),
            mime_type: Some("image/png".into()),
            filename: "cat.png".into(),
            kind: "image".into(),
        }],
    }
}

#[tokio::test]
async fn renders_request_end_to_end() {
    let fx = fixture(ECHO_ARGV);
    let tts = tts();
    let r = renderer(fx.cfg.clone(), tts.clone());

    let video = r.render(&request(), "abcd1234").await.unwrap();
    assert_eq!(video.file_name, "dialogue_abcd1234.mp4");
    // stewie 4s, gap, peter 1s, gap, peter 1s, trailing pad.
    assert!((video.duration_sec - (4.0 + 0.2 + 1.0 + 0.2 + 1.0 + 1.0)).abs() < 1e-9);
    assert_eq!(tts.calls.load(Ordering::SeqCst), 3);

    let argv = String::from_utf8(video.bytes).unwrap();
    let args: Vec<&str> = argv.lines().collect();
    let graph = args[args.iter().position(|a| *a == "-filter_complex").unwrap() + 1];
    // "cat" is the fourth word of the first line, evenly split: [3, 4).
    assert!(graph.contains("overlay=(W-w)/2:100:enable='gte(t,3)*lt(t,6)'[with_overlays]"));
    assert!(!graph.contains("overlay_1"));
    assert!(args.contains(&"-shortest"));

    assert_eq!(std::fs::read_dir(&fx.scratch).unwrap().count(), 0);
}

#[tokio::test]
async fn invalid_requests_do_no_work() {
    let fx = fixture(ECHO_ARGV);
    let tts = tts();
    let r = renderer(fx.cfg.clone(), tts.clone());

    let empty = DialogueRequest::default();
    assert!(matches!(
        r.render(&empty, "x").await,
        Err(ReelError::Validation(_))
    ));
    let silent = DialogueRequest {
        conversation: vec![ConversationTurn {
            stewie: Some(" ".into()),
            ..ConversationTurn::default()
        }],
        media_files: Vec::new(),
    };
    assert!(matches!(
        r.render(&silent, "x").await,
        Err(ReelError::Validation(_))
    ));
    assert_eq!(tts.calls.load(Ordering::SeqCst), 0);
    assert!(!fx.scratch.exists());
}

#[tokio::test]
async fn missing_assets_report_the_checked_path() {
    let mut fx = fixture(ECHO_ARGV);
    let gone = fx.scratch.join("nope.png");
    fx.cfg.assets.peter_avatar = gone.clone();
    let tts = tts();
    let r = renderer(fx.cfg.clone(), tts.clone());

    match r.render(&request(), "x").await {
        Err(ReelError::MissingAsset { kind, path }) => {
            assert_eq!(kind, "peter avatar");
            assert_eq!(path, gone);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(tts.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn renderer_failure_aborts_the_request() {
    let fx = fixture("echo 'Invalid filtergraph' >&2; exit 1");
    let r = renderer(fx.cfg.clone(), tts());

    let err = r.render(&request(), "x").await.unwrap_err();
    assert!(matches!(err, ReelError::Render { .. }));
    assert_eq!(std::fs::read_dir(&fx.scratch).unwrap().count(), 0);
}

#[tokio::test]
async fn render_without_synthesizer_fails() {
    let fx = fixture(ECHO_ARGV);
    let r = DialogueRenderer::new(fx.cfg.clone()).unwrap();
    assert!(matches!(
        r.render(&request(), "x").await,
        Err(ReelError::Synthesis(_))
    ));
}

#[tokio::test]
async fn caption_only_alignment_requires_an_engine() {
    let fx = fixture(ECHO_ARGV);
    let r = DialogueRenderer::new(fx.cfg.clone()).unwrap();
    assert!(matches!(
        r.align_words(b"RIFF", "hello there").await,
        Err(ReelError::Alignment(_))
    ));
    assert!(matches!(
        r.align_words(b"RIFF", "  ").await,
        Err(ReelError::Validation(_))
    ));
}

#[tokio::test]
async fn health_reports_collaborators() {
    let fx = fixture(ECHO_ARGV);
    let r = renderer(fx.cfg.clone(), tts());
    r.render(&request(), "x").await.unwrap();

    let health = r.health().await;
    assert!(health.synthesis_configured);
    assert!(!health.alignment_available);
    assert!(!health.alignment_loaded);
    assert_eq!(health.voice_models_loaded.len(), 2);
    assert_eq!(r.characters(), &[Character::Stewie, Character::Peter]);
}

/// Answers with one word per call and reports the language it was asked for.
struct LanguageTagEngine;

#[async_trait::async_trait]
impl AlignmentEngine for LanguageTagEngine {
    fn name(&self) -> &str {
        "tagger"
    }

    async fn align(
        &self,
        _audio: &[u8],
        _text: &str,
        language: &str,
    ) -> ReelResult<Vec<AlignedSegment>> {
        Ok(vec![AlignedSegment {
            words: vec![AlignedWord {
                text: language.to_string(),
                start: 0.0,
                end: 0.25,
            }],
        }])
    }
}

#[tokio::test]
async fn alignment_engine_uses_configured_language() {
    let fx = fixture(ECHO_ARGV);
    let mut cfg = fx.cfg.clone();
    cfg.alignment.language = "fr".to_string();
    let r = DialogueRenderer::new(cfg)
        .unwrap()
        .with_alignment_engine(Arc::new(LanguageTagEngine));

    let words = r.align_words(b"RIFF", "bonjour").await.unwrap();
    assert_eq!(words[0].text, "fr");

    let health = r.health().await;
    assert!(health.alignment_available);
    assert!(health.alignment_loaded);
    assert_eq!(health.alignment_engine.as_deref(), Some("tagger"));
}

#[test]
fn request_ids_are_short() {
    let id = new_request_id();
    assert_eq!(id.len(), 8);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn config_is_validated_on_construction() {
    let mut cfg = PipelineConfig::default();
    cfg.timeline.gap_sec = -1.0;
    assert!(DialogueRenderer::new(cfg).is_err());
}
