use std::path::PathBuf;

/// Message shown to callers for failures that carry no caller-safe detail.
pub const INTERNAL_ERROR: &str = "internal server error";

/// Convenience result type used across reelcast.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid caller-provided request or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The word-timing engine is unavailable or failed.
    #[error("alignment error: {0}")]
    Alignment(String),

    /// Text-to-speech or voice conversion failed.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// A required static asset (background, avatar) is not on disk.
    #[error("missing {kind}: '{}' does not exist", path.display())]
    MissingAsset {
        /// Human readable asset role.
        kind: String,
        /// Resolved path that was checked.
        path: PathBuf,
    },

    /// The external renderer exited unsuccessfully.
    #[error("renderer exited with {status}: {stderr}")]
    Render {
        /// Exit status as reported by the OS.
        status: String,
        /// Captured diagnostic output.
        stderr: String,
    },

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::Alignment`] value.
    pub fn alignment(msg: impl Into<String>) -> Self {
        Self::Alignment(msg.into())
    }

    /// Build a [`ReelError::Synthesis`] value.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    /// Build a [`ReelError::MissingAsset`] value.
    pub fn missing_asset(kind: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingAsset {
            kind: kind.into(),
            path: path.into(),
        }
    }

    /// Build a [`ReelError::Render`] value.
    pub fn render(status: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Render {
            status: status.into(),
            stderr: stderr.into(),
        }
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for errors caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Serde(_))
    }

    /// Message suitable for untrusted callers.
    ///
    /// Renderer diagnostics can contain filesystem paths, so only the exit status and the last
    /// diagnostic line are kept. Unclassified errors collapse to a generic message.
    pub fn public_message(&self) -> String {
        match self {
            Self::Render { status, stderr } => {
                let last = stderr
                    .lines()
                    .rev()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .unwrap_or("no diagnostic output");
                format!("rendering failed ({status}): {last}")
            }
            Self::Other(_) => INTERNAL_ERROR.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ReelError {
    fn from(e: serde_json::Error) -> Self {
        Self::serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
