//! Error types for shading-network authoring and scene loading.

use thiserror::Error;

/// Broad category of an [`Error`].
///
/// Resolution misses are never errors; they come back as `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller passed something that cannot be authored.
    InvalidArgument,
    /// Operation attempted through a handle that is no longer usable.
    StateError,
    /// Store, path, value or I/O failure.
    Store,
}

/// Main error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Generic invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Variant set not declared on the prim
    #[error("Unknown variant set '{set}' on {prim}")]
    UnknownVariantSet { prim: String, set: String },

    /// Variant not declared in the variant set
    #[error("Unknown variant '{variant}' in variant set '{set}' on {prim}")]
    UnknownVariant { prim: String, set: String, variant: String },

    /// Two source materials share a name
    #[error("Duplicate variant name '{0}'")]
    DuplicateVariant(String),

    /// Base material assignment would make the inheritance relation cyclic
    #[error("Base material {base} of {material} forms a cycle")]
    BaseMaterialCycle { material: String, base: String },

    /// Authoring through a released edit scope
    #[error("Edit scope for {0} has already been released")]
    StaleEditScope(String),

    /// Prim does not exist on the stage
    #[error("Prim not found: {0}")]
    PrimNotFound(String),

    /// Layer index outside the layer stack
    #[error("Layer index {index} out of bounds (count: {count})")]
    LayerOutOfBounds { index: usize, count: usize },

    /// Malformed scene path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Value does not match its declared type
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a generic invalid argument error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_)
            | Self::UnknownVariantSet { .. }
            | Self::UnknownVariant { .. }
            | Self::DuplicateVariant(_)
            | Self::BaseMaterialCycle { .. }
            | Self::LayerOutOfBounds { .. } => ErrorKind::InvalidArgument,
            Self::StaleEditScope(_) => ErrorKind::StateError,
            _ => ErrorKind::Store,
        }
    }

    /// Shorthand for `kind() == ErrorKind::InvalidArgument`.
    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::UnknownVariantSet { prim: "/Looks/Wood".into(), set: "look".into() };
        assert!(e.to_string().contains("look"));
        assert!(e.to_string().contains("/Looks/Wood"));

        let e = Error::LayerOutOfBounds { index: 5, count: 3 };
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("3"));
    }

    #[test]
    fn test_error_kind() {
        assert!(Error::DuplicateVariant("A".into()).is_invalid_argument());
        assert!(Error::BaseMaterialCycle { material: "/M".into(), base: "/M".into() }.is_invalid_argument());
        assert_eq!(Error::StaleEditScope("/M".into()).kind(), ErrorKind::StateError);
        assert_eq!(Error::PrimNotFound("/X".into()).kind(), ErrorKind::Store);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
