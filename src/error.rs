use thiserror::Error;

/// Errors that can occur when loading or serializing the routine catalog
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The backing store could not be read
    #[error("Failed to read catalog: {0}")]
    Read(String),

    /// The catalog content is not a valid list of routine records
    #[error("Malformed catalog: {0}")]
    Parse(String),

    /// The transformed catalog could not be serialized
    #[error("Failed to serialize catalog: {0}")]
    Serialize(String),
}

/// Errors that can occur when resolving a file token to a path on disk
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The token did not decode to a usable path
    #[error("Invalid file reference")]
    InvalidReference,

    /// The requested file kind is not one of the supported kinds
    #[error("Invalid file type: {0} (expected 'image' or 'pdf')")]
    InvalidType(String),

    /// Nothing exists at the resolved location
    #[error("File not found: {0}")]
    NotFound(String),

    /// The resolved path falls outside the storage root
    #[error("Access denied")]
    AccessDenied,

    /// Unexpected filesystem failure
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors that can occur when looking up a single routine
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    /// A selection parameter was missing or empty
    #[error("Missing {0} selection")]
    MissingSelection(&'static str),

    /// The query string could not be parsed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// No record matches the selection
    #[error("No routine found for {program} intake {intake} section {section}")]
    NoMatch {
        program: String,
        intake: String,
        section: String,
    },

    /// The catalog itself could not be loaded
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
