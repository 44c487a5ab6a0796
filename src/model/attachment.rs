//! Attachment references carried alongside a message.
//!
//! Content lives in the file store; only metadata passes through here.

use serde::{Deserialize, Serialize};

/// Metadata about an attachment on a stored message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Filename as uploaded or as named in the MIME part.
    pub filename: String,

    /// MIME content type (e.g. `"image/jpeg"`, `"application/pdf"`).
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Size in bytes, when the store knows it.
    #[serde(default)]
    pub size: Option<u64>,

    /// Opaque key into the file store.
    #[serde(default)]
    pub storage_key: Option<String>,

    /// `true` for inline parts referenced from HTML (`cid:` images).
    #[serde(default)]
    pub is_inline: bool,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}
