use std::sync::Arc;

use crate::foundation::error::ReelResult;
use crate::foundation::registry::{ModelLoader, ModelRegistry};

/// Word as reported by an alignment engine; offsets are relative to the submitted audio.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlignedWord {
    /// Raw word text, possibly with surrounding whitespace.
    #[serde(alias = "word")]
    pub text: String,
    /// Start in seconds.
    pub start: f64,
    /// End in seconds.
    pub end: f64,
}

/// One recognised segment.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlignedSegment {
    /// Words of the segment in spoken order.
    #[serde(default)]
    pub words: Vec<AlignedWord>,
}

/// External word-timing collaborator (speech recognition or forced alignment).
#[async_trait::async_trait]
pub trait AlignmentEngine: Send + Sync {
    /// Short identifier used in logs and health reports.
    fn name(&self) -> &str;

    /// Align `audio` (encoded WAV) against its source `text`.
    async fn align(
        &self,
        audio: &[u8],
        text: &str,
        language: &str,
    ) -> ReelResult<Vec<AlignedSegment>>;

    /// Whether the underlying model is in memory. Engines without lazy loading are always ready.
    async fn is_loaded(&self) -> bool {
        true
    }
}

/// Alignment engine whose model is loaded on first use and then shared process-wide.
pub struct LazyAlignmentEngine {
    model: String,
    registry: ModelRegistry<String, dyn AlignmentEngine>,
}

impl LazyAlignmentEngine {
    /// Wrap `loader`; `model` names the model to load.
    pub fn new(
        model: impl Into<String>,
        loader: Arc<dyn ModelLoader<String, dyn AlignmentEngine>>,
    ) -> Self {
        Self {
            model: model.into(),
            registry: ModelRegistry::new(loader),
        }
    }

    /// Load the model now instead of on the first request.
    pub async fn preload(&self) -> ReelResult<()> {
        self.registry.preload([self.model.clone()]).await
    }

}

#[async_trait::async_trait]
impl AlignmentEngine for LazyAlignmentEngine {
    fn name(&self) -> &str {
        &self.model
    }

    async fn align(
        &self,
        audio: &[u8],
        text: &str,
        language: &str,
    ) -> ReelResult<Vec<AlignedSegment>> {
        let engine = self.registry.get(&self.model).await?;
        engine.align(audio, text, language).await
    }

    async fn is_loaded(&self) -> bool {
        !self.registry.loaded().await.is_empty()
    }
}
