//! Error taxonomy of the catalogue core.

use super::tag_set::TagSetError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{entity} '{name}' already exists")]
    Conflict { entity: &'static str, name: String },

    #[error("{entity} '{name}' is still referenced by {references} sheet(s)")]
    InUse {
        entity: &'static str,
        name: String,
        references: usize,
    },

    #[error("{entity} '{name}' not found")]
    NotFound { entity: &'static str, name: String },

    #[error("empty tag")]
    EmptyTag,

    #[error("tag '{0}' not found")]
    TagNotFound(String),

    #[error("Stored {field} of sheet '{safe_sheet_name}' cannot be decoded: {reason}")]
    Corrupted {
        safe_sheet_name: String,
        field: &'static str,
        reason: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Asset IO error on {path:?}: {source}")]
    AssetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Thumbnail generation failed for '{safe_sheet_name}': {reason}")]
    Thumbnail {
        safe_sheet_name: String,
        reason: String,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn sheet_not_found(safe_sheet_name: &str) -> Self {
        CatalogError::NotFound {
            entity: "Sheet",
            name: safe_sheet_name.to_string(),
        }
    }

    pub fn composer_not_found(safe_name: &str) -> Self {
        CatalogError::NotFound {
            entity: "Composer",
            name: safe_name.to_string(),
        }
    }

    pub fn asset_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::AssetIo {
            path: path.into(),
            source,
        }
    }

    /// Maps a tag codec failure on a given sheet's stored tags.
    pub fn from_tag_set(safe_sheet_name: &str, err: TagSetError) -> Self {
        match err {
            TagSetError::Empty => CatalogError::EmptyTag,
            TagSetError::NotFound(tag) => CatalogError::TagNotFound(tag),
            TagSetError::Malformed(e) => CatalogError::Corrupted {
                safe_sheet_name: safe_sheet_name.to_string(),
                field: "tags",
                reason: e.to_string(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

/// Whether a rusqlite error is a uniqueness / primary key violation.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
