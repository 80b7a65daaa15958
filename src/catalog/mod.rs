//! Routine catalog.
//!
//! The catalog is a flat JSON array of routine records produced by the offline
//! indexer. It is read fresh from its [`CatalogSource`] on every request; there
//! is no in-memory cache and no write path.
//!
//! # Listing payload
//!
//! Before a catalog leaves the server, every record's `image` and `pdf` paths
//! are replaced by tokens (see [`crate::codec`]) and the resulting JSON array is
//! wrapped as a single base64 string:
//!
//! ```text
//! [ {"program": "CSE", ..., "image": "cse/49/a.png"} ]
//!            │  encode_paths()
//!            ▼
//! [ {"program": "CSE", ..., "image": "Y3NlLzQ5L2EucG5n"} ]
//!            │  to_payload()
//!            ▼
//! { "payload": "W3sicHJvZ3JhbSI6IkNTRSIs..." }
//! ```
//!
//! The envelope only discourages casual reading in developer tools.

mod source;

pub use source::{CatalogSource, FileCatalogSource};

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::codec::encode_path;
use crate::error::{CatalogError, LookupError, ResolveError};
use crate::files::{FileKind, RoutineStore};

// =============================================================================
// Records
// =============================================================================

/// Admission batch of a routine record.
///
/// The indexer writes intakes as strings, but hand-edited catalogs sometimes
/// carry plain numbers. Both forms are accepted and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Intake {
    Number(Number),
    Text(String),
}

impl fmt::Display for Intake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intake::Number(n) => write!(f, "{}", n),
            Intake::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Intake {
    fn from(value: &str) -> Self {
        Intake::Text(value.to_string())
    }
}

/// One timetable entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineRecord {
    /// Academic program name
    pub program: String,

    /// Admission batch
    pub intake: Intake,

    /// Section label
    pub section: String,

    /// Relative path to the routine image (or its token once encoded)
    pub image: String,

    /// Relative path to the routine PDF (or its token once encoded)
    pub pdf: String,

    /// Any additional fields written by the indexer, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoutineRecord {
    /// Create a record without extra fields.
    pub fn new(
        program: impl Into<String>,
        intake: impl Into<Intake>,
        section: impl Into<String>,
        image: impl Into<String>,
        pdf: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            intake: intake.into(),
            section: section.into(),
            image: image.into(),
            pdf: pdf.into(),
            extra: Map::new(),
        }
    }

    /// Return a copy with `image` and `pdf` replaced by their tokens.
    pub fn with_encoded_paths(&self) -> Self {
        Self {
            image: encode_path(&self.image),
            pdf: encode_path(&self.pdf),
            ..self.clone()
        }
    }

    /// Check whether this record matches a program/intake/section selection.
    pub fn matches(&self, program: &str, intake: &str, section: &str) -> bool {
        self.program == program && self.intake.to_string() == intake && self.section == section
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Base64-wrapped listing returned by the routines endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPayload {
    /// Base64 of the JSON array of encoded records
    pub payload: String,
}

/// Ordered list of routine records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<RoutineRecord>,
}

impl Catalog {
    /// Create a catalog from records.
    pub fn new(records: Vec<RoutineRecord>) -> Self {
        Self { records }
    }

    /// Parse a catalog from raw JSON bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CatalogError> {
        let records: Vec<RoutineRecord> =
            serde_json::from_slice(data).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(Self { records })
    }

    /// Load and parse the catalog from a source.
    pub async fn load<C: CatalogSource + ?Sized>(source: &C) -> Result<Self, CatalogError> {
        let data = source.read().await?;
        Self::from_slice(&data)
    }

    /// All records in catalog order.
    pub fn records(&self) -> &[RoutineRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records with their file paths replaced by tokens.
    pub fn encode_paths(&self) -> Vec<RoutineRecord> {
        self.records
            .iter()
            .map(RoutineRecord::with_encoded_paths)
            .collect()
    }

    /// Build the base64 listing envelope.
    ///
    /// The whole array is serialized before anything is returned, so a failure
    /// never yields a partial payload.
    pub fn to_payload(&self) -> Result<CatalogPayload, CatalogError> {
        let json = serde_json::to_vec(&self.encode_paths())
            .map_err(|e| CatalogError::Serialize(e.to_string()))?;

        Ok(CatalogPayload {
            payload: STANDARD.encode(json),
        })
    }

    /// Find the first record matching the selection.
    ///
    /// Every selection value must be non-empty.
    pub fn find(
        &self,
        program: &str,
        intake: &str,
        section: &str,
    ) -> Result<&RoutineRecord, LookupError> {
        for (name, value) in [("program", program), ("intake", intake), ("section", section)] {
            if value.trim().is_empty() {
                return Err(LookupError::MissingSelection(name));
            }
        }

        self.records
            .iter()
            .find(|r| r.matches(program, intake, section))
            .ok_or_else(|| LookupError::NoMatch {
                program: program.to_string(),
                intake: intake.to_string(),
                section: section.to_string(),
            })
    }

    /// Resolve every file referenced by the catalog against a store.
    ///
    /// Returns one issue per unresolvable reference, in catalog order.
    pub async fn audit(&self, store: &RoutineStore) -> Vec<AuditIssue> {
        let mut issues = Vec::new();

        for (index, record) in self.records.iter().enumerate() {
            for (kind, path) in [(FileKind::Image, &record.image), (FileKind::Pdf, &record.pdf)] {
                if let Err(error) = store.resolve_path(kind, path).await {
                    issues.push(AuditIssue {
                        index,
                        kind,
                        path: path.clone(),
                        error,
                    });
                }
            }
        }

        issues
    }
}

/// A catalog entry whose file reference does not resolve.
#[derive(Debug, Clone)]
pub struct AuditIssue {
    /// Position of the record in the catalog
    pub index: usize,

    /// Which of the record's files failed
    pub kind: FileKind,

    /// The raw relative path from the catalog
    pub path: String,

    /// Why resolution failed
    pub error: ResolveError,
}

impl fmt::Display for AuditIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record #{} {} '{}': {}",
            self.index, self.kind, self.path, self.error
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
