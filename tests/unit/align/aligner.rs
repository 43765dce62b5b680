use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use crate::foundation::core::Character;
use crate::foundation::registry::ModelLoader;

enum Reply {
    Words(Vec<(&'static str, f64, f64)>),
    Empty,
    Fail,
}

struct ScriptedEngine(Reply);

#[async_trait::async_trait]
impl AlignmentEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn align(
        &self,
        _audio: &[u8],
        _text: &str,
        _language: &str,
    ) -> ReelResult<Vec<AlignedSegment>> {
        match &self.0 {
            Reply::Words(words) => Ok(vec![AlignedSegment {
                words: words
                    .iter()
                    .map(|(t, s, e)| AlignedWord {
                        text: t.to_string(),
                        start: *s,
                        end: *e,
                    })
                    .collect(),
            }]),
            Reply::Empty => Ok(vec![AlignedSegment::default()]),
            Reply::Fail => Err(ReelError::synthesis("model crashed")),
        }
    }
}

fn clip(text: &str, duration: f64) -> AudioClip {
    AudioClip::new(Vec::<u8>::new(), duration, Character::Stewie, text, 0).unwrap()
}

fn spans(words: &[TimedWord]) -> Vec<(String, f64, f64)> {
    words
        .iter()
        .map(|w| (w.text.clone(), w.start, w.end))
        .collect()
}

#[test]
fn even_split_three_words() {
    let words = even_split("one two three", 3.0);
    assert_eq!(
        spans(&words),
        vec![
            ("one".to_string(), 0.0, 1.0),
            ("two".to_string(), 1.0, 2.0),
            ("three".to_string(), 2.0, 3.0),
        ]
    );
}

#[test]
fn even_split_blank_text_is_empty() {
    assert!(even_split("", 2.0).is_empty());
    assert!(even_split("   \n\t", 2.0).is_empty());
}

#[tokio::test]
async fn missing_engine_falls_back() {
    let aligner = WordAligner::unavailable();
    assert!(!aligner.is_available());
    let words = aligner.align(&clip("one two three", 3.0)).await;
    assert_eq!(words, even_split("one two three", 3.0));
}

#[tokio::test]
async fn failing_engine_falls_back() {
    let aligner = WordAligner::new(Arc::new(ScriptedEngine(Reply::Fail)), "en");
    let words = aligner.align(&clip("hello there", 1.0)).await;
    assert_eq!(words, even_split("hello there", 1.0));
}

#[tokio::test]
async fn empty_engine_result_falls_back() {
    let aligner = WordAligner::new(Arc::new(ScriptedEngine(Reply::Empty)), "en");
    let words = aligner.align(&clip("hello there", 1.0)).await;
    assert_eq!(words.len(), 2);
    assert_eq!(words[1].start, 0.5);
}

#[tokio::test]
async fn engine_words_are_trimmed_and_keep_punctuation() {
    let aligner = WordAligner::new(
        Arc::new(ScriptedEngine(Reply::Words(vec![
            (" Hello,", 0.0, 0.4),
            ("   ", 0.4, 0.5),
            (" world! ", 0.5, 0.9),
        ]))),
        "en",
    );
    let words = aligner.align(&clip("Hello, world!", 1.0)).await;
    assert_eq!(
        spans(&words),
        vec![
            ("Hello,".to_string(), 0.0, 0.4),
            ("world!".to_string(), 0.5, 0.9),
        ]
    );
}

#[tokio::test]
async fn engine_offsets_are_clamped() {
    let aligner = WordAligner::new(
        Arc::new(ScriptedEngine(Reply::Words(vec![("a", -0.1, 0.2), ("b", 0.6, 0.5)]))),
        "en",
    );
    let words = aligner.align(&clip("a b", 1.0)).await;
    assert_eq!(words[0].start, 0.0);
    assert_eq!(words[1].start, 0.6);
    assert_eq!(words[1].end, 0.6);
}

#[tokio::test]
async fn strict_alignment_requires_engine() {
    let err = WordAligner::unavailable()
        .align_strict(b"RIFF", "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ReelError::Alignment(_)));

    let err = WordAligner::new(Arc::new(ScriptedEngine(Reply::Fail)), "en")
        .align_strict(b"RIFF", "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ReelError::Alignment(_)));
}

#[test]
fn trigger_normalisation() {
    assert_eq!(normalize_trigger("  Pizza "), "pizza");
    assert_eq!(normalize_spoken(" Pizza!? "), "pizza");
    assert_eq!(normalize_spoken("end.;:"), "end");
    assert_eq!(normalize_spoken("o'clock"), "o'clock");
    assert_eq!(normalize_spoken("(wow)"), "(wow)");
}

struct CountingLoader {
    loads: AtomicUsize,
    fail: bool,
}

impl CountingLoader {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            fail,
        })
    }
}

#[async_trait::async_trait]
impl ModelLoader<String, dyn AlignmentEngine> for CountingLoader {
    async fn load(&self, key: &String) -> ReelResult<Arc<dyn AlignmentEngine>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail {
            return Err(ReelError::alignment(format!("cannot load {key}")));
        }
        Ok(Arc::new(ScriptedEngine(Reply::Words(vec![("hi", 0.1, 0.3)]))))
    }
}

#[tokio::test]
async fn lazy_engine_loads_once_under_concurrent_requests() {
    let loader = CountingLoader::new(false);
    let engine = Arc::new(LazyAlignmentEngine::new("base.en", loader.clone()));
    assert!(!engine.is_loaded().await);

    let aligner = WordAligner::new(engine.clone(), "en");
    let a = clip("hi", 1.0);
    let b = clip("hi", 1.0);
    let (wa, wb) = tokio::join!(aligner.align(&a), aligner.align(&b));

    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    assert_eq!(spans(&wa), vec![("hi".to_string(), 0.1, 0.3)]);
    assert_eq!(wa, wb);
    assert!(engine.is_loaded().await);
    assert!(aligner.is_loaded().await);
    assert_eq!(aligner.engine_name(), Some("base.en"));
}

#[tokio::test]
async fn lazy_engine_preload_marks_it_loaded() {
    let loader = CountingLoader::new(false);
    let engine = LazyAlignmentEngine::new("base.en", loader.clone());
    engine.preload().await.unwrap();
    assert!(engine.is_loaded().await);

    engine.align(b"RIFF", "hi", "en").await.unwrap();
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lazy_engine_load_failure_falls_back_and_retries() {
    let loader = CountingLoader::new(true);
    let aligner = WordAligner::new(
        Arc::new(LazyAlignmentEngine::new("base.en", loader.clone())),
        "en",
    );
    let words = aligner.align(&clip("hello there", 1.0)).await;
    assert_eq!(words, even_split("hello there", 1.0));
    assert!(!aligner.is_loaded().await);

    aligner.align(&clip("again", 1.0)).await;
    assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
}

struct LanguageEcho(Mutex<Vec<String>>);

#[async_trait::async_trait]
impl AlignmentEngine for LanguageEcho {
    fn name(&self) -> &str {
        "echo"
    }

    async fn align(
        &self,
        _audio: &[u8],
        text: &str,
        language: &str,
    ) -> ReelResult<Vec<AlignedSegment>> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(language.to_string());
        Ok(vec![AlignedSegment {
            words: vec![AlignedWord {
                text: text.to_string(),
                start: 0.0,
                end: 0.5,
            }],
        }])
    }
}

#[tokio::test]
async fn configured_language_reaches_the_engine() {
    let engine = Arc::new(LanguageEcho(Mutex::new(Vec::new())));
    let cfg = crate::config::AlignmentConfig {
        language: "de".to_string(),
    };
    let aligner = WordAligner::from_config(engine.clone(), &cfg);
    assert_eq!(aligner.language(), "de");

    aligner.align(&clip("hallo", 1.0)).await;
    aligner.align_strict(b"RIFF", "hallo").await.unwrap();
    assert_eq!(*engine.0.lock().unwrap(), vec!["de".to_string(), "de".to_string()]);
    assert!(aligner.is_loaded().await);
    assert_eq!(WordAligner::unavailable().language(), "en");
}
