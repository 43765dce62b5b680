//! End-to-end dialogue rendering.
//!
//! [`DialogueRenderer`] wires the stages together: speech synthesis, timeline, overlays,
//! captions, audio concatenation, planning, and execution. [`RenderManifest`] feeds it clips
//! that were synthesized elsewhere.

pub mod manifest;
/// The dialogue renderer that drives every stage.
pub mod renderer;
/// Dialogue request model and validation.
pub mod request;

pub use manifest::{ManifestLine, ManifestTurn, PreparedDialogue, RenderManifest};
pub use renderer::{DialogueRenderer, Health, RenderedVideo, new_request_id};
pub use request::{ConversationTurn, DialogueRequest};
