//! Error types for the materialization engine
//!
//! Every contract violation carries the concrete service type and the
//! property or method involved, so a metadata authoring mistake can be
//! diagnosed from the error alone. Storage collaborator failures pass
//! through unchanged for the caller to classify.

use crate::storage::StorageError;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Error types for materialization, dispatch, and mutation operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("cannot create '{property}' in '{service}': it already exists")]
    AlreadyExists { service: String, property: String },

    #[error("create '{property}' in '{service}' is not allowed")]
    CreateNotAllowed { service: String, property: String },

    #[error("collection '{property}' in '{service}' is not allowed to be extended")]
    AddNotAllowed { service: String, property: String },

    #[error("removing from '{property}' in '{service}' is not allowed")]
    RemoveNotAllowed { service: String, property: String },

    #[error("'{property}' in '{service}' does not support membership checks")]
    HasNotSupported { service: String, property: String },

    #[error("instance in '{service}' already deleted")]
    AlreadyDeleted { service: String },

    #[error("unknown method '{method}' on '{service}'")]
    UnknownOperation { service: String, method: String },

    #[error("singular '{singular}' does not resolve to exactly one property of '{service}'")]
    AmbiguousOrUnknownSingular { service: String, singular: String },

    /// Recoverable: the population engine absorbs this into null/empty
    /// slots. It only surfaces from mutation paths that require a link.
    #[error("no declared relationship links '{child}' to '{parent}'")]
    LinkNotFound { child: String, parent: String },

    #[error("no '{entity}' row matched {criteria}")]
    EntityNotFound { entity: String, criteria: String },

    /// Metadata authoring mistake caught at registration or access time
    #[error("invalid metadata for '{subject}': {message}")]
    Metadata { subject: String, message: String },

    /// Opaque pass-through from the storage collaborator
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    pub(crate) fn metadata(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Metadata {
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Returns true when the error is the recoverable link-absence
    /// condition rather than a contract violation or storage failure.
    pub fn is_link_not_found(&self) -> bool {
        matches!(self, Self::LinkNotFound { .. })
    }
}
