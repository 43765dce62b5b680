use std::collections::HashMap;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};

use crate::config::OverlayConfig;
use crate::foundation::core::MediaKind;

/// Media file as sent by the caller.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    /// Base64 payload, optionally as a `data:<mime>;base64,` URL.
    pub data: String,
    /// Declared MIME type.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Name overlay specs refer to.
    pub filename: String,
    /// Declared kind: `image` or `video`. Anything else is ignored.
    #[serde(rename = "type")]
    pub kind: String,
}

impl MediaFile {
    fn size_limit(&self, cfg: &OverlayConfig) -> Option<usize> {
        match self.kind.as_str() {
            "image" => Some(cfg.max_image_bytes),
            "video" => Some(cfg.max_clip_bytes),
            _ => None,
        }
    }
}

/// One decoded media payload.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaBuffer {
    /// Caller-side filename.
    pub filename: String,
    /// Declared MIME type, if any.
    pub mime_type: Option<String>,
    /// Decoded bytes.
    pub bytes: Arc<Vec<u8>>,
}

impl MediaBuffer {
    /// Kind implied by the filename extension.
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_filename(&self.filename)
    }

    /// File extension to use when the payload is written to disk.
    ///
    /// Keeps the caller's extension when there is one, else sniffs image magic bytes.
    pub fn extension(&self) -> String {
        let from_name = std::path::Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase);
        if let Some(ext) = from_name {
            return ext;
        }
        image::guess_format(&self.bytes)
            .ok()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("bin")
            .to_string()
    }
}

/// Decoded media keyed by filename.
#[derive(Clone, Debug, Default)]
pub struct DecodedMedia {
    by_name: HashMap<String, MediaBuffer>,
}

impl DecodedMedia {
    /// Look up a buffer by its caller-side filename.
    pub fn get(&self, filename: &str) -> Option<&MediaBuffer> {
        self.by_name.get(filename)
    }

    /// Insert or replace a buffer.
    pub fn insert(&mut self, buffer: MediaBuffer) {
        self.by_name.insert(buffer.filename.clone(), buffer);
    }

    /// Number of decoded files.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether nothing was decoded.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Decode the caller's media files.
///
/// Files with an unknown `type`, undecodable payloads and payloads above the per-type size
/// limit are skipped with a warning; none of these fail the request. A later file with the same
/// name replaces an earlier one.
#[tracing::instrument(skip_all, fields(files = files.len()))]
pub fn decode_media_files(files: &[MediaFile], cfg: &OverlayConfig) -> DecodedMedia {
    let mut out = DecodedMedia::default();
    for file in files {
        let Some(limit) = file.size_limit(cfg) else {
            tracing::debug!(filename = %file.filename, kind = %file.kind, "ignoring media of unsupported type");
            continue;
        };
        let bytes = match general_purpose::STANDARD.decode(base64_payload(&file.data)) {
            Ok(b) => b,
            Err(err) => {
                tracing::warn!(filename = %file.filename, error = %err, "skipping undecodable media");
                continue;
            }
        };
        if bytes.len() > limit {
            tracing::warn!(
                filename = %file.filename,
                size = bytes.len(),
                limit,
                "skipping oversized media"
            );
            continue;
        }
        tracing::info!(filename = %file.filename, kind = %file.kind, size = bytes.len(), "decoded media");
        out.insert(MediaBuffer {
            filename: file.filename.clone(),
            mime_type: file.mime_type.clone(),
            bytes: Arc::new(bytes),
        });
    }
    out
}

// Line-wrapped uploads (MIME style) carry whitespace the decoder rejects.
fn base64_payload(data: &str) -> Vec<u8> {
    strip_data_url(data)
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect()
}

fn strip_data_url(data: &str) -> &str {
    let data = data.trim();
    if data.starts_with("data:")
        && let Some((_, payload)) = data.split_once(";base64,")
    {
        return payload;
    }
    data
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/media.rs"]
mod tests;
