//! Routine file access.
//!
//! This module turns file tokens into validated paths under the storage root
//! and describes how the resolved files are delivered to clients.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   GET /api/{view,download}/{type}/{tok} │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             RoutineStore                │
//! │  decode → kind → join → exists → contain│
//! └────────────────────┬────────────────────┘
//!                      │ ResolvedFile
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │  content type + Delivery (inline/attach)│
//! │        streamed with ReaderStream       │
//! └─────────────────────────────────────────┘
//! ```

mod store;

pub use store::{ResolvedFile, RoutineStore};

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ResolveError;

/// Fallback content type for unrecognized extensions.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

// =============================================================================
// File Kind
// =============================================================================

/// Kinds of routine files that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Rendered routine page
    Image,
    /// Single-page routine PDF
    Pdf,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(FileKind::Image),
            "pdf" => Ok(FileKind::Pdf),
            other => Err(ResolveError::InvalidType(other.to_string())),
        }
    }
}

// =============================================================================
// Content Type
// =============================================================================

/// Determine the content type of a file from its extension.
///
/// Matching is case-insensitive. Unknown or missing extensions map to
/// [`DEFAULT_CONTENT_TYPE`].
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("pdf") => "application/pdf",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

// =============================================================================
// Delivery
// =============================================================================

/// How a resolved file is handed to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Rendered in place (e.g. as an `<img>` source); no disposition header
    Inline,
    /// Saved by the browser under the file's base name
    Attachment,
}

impl Delivery {
    /// Value of the `Content-Disposition` header for this delivery mode.
    ///
    /// Returns `None` for inline delivery.
    pub fn content_disposition(&self, file_name: &str) -> Option<String> {
        match self {
            Delivery::Inline => None,
            Delivery::Attachment => Some(attachment_disposition(file_name)),
        }
    }
}

fn attachment_disposition(file_name: &str) -> String {
    let plain = file_name
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\');

    if plain {
        return format!("attachment; filename=\"{}\"", file_name);
    }

    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}
