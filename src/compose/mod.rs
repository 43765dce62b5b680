//! Composition: planning the renderer filter graph and running it.
//!
//! [`CompositionPlanner`] turns the timeline, overlays, and captions into a typed
//! [`CompositionPlan`]. [`CompositionExecutor`] materializes the plan in a scratch workspace and
//! invokes the external renderer.

pub mod executor;
/// Typed filter graph pieces and path quoting.
pub mod filter;
pub mod plan;
/// Scoped scratch directories for renderer jobs.
pub mod workspace;

pub use executor::{CompositionExecutor, ExecPhase, silence_like};
pub use filter::{Filter, FilterOp, StreamRef, quote_filter_path};
pub use plan::{
    Artifact, ArtifactId, CompositionPlan, CompositionPlanner, InputRole, InputSource, OutputSpec,
    PlanInput, PlanRequest,
};
pub use workspace::Workspace;
