use crate::path::ColumnPath;
use crate::value::Value;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure raised by derivation, encoding, decoding and filter
/// construction.
///
/// Derivation failures (`NoCodecAvailable`, `NoSchemaAvailable`,
/// `KeyTypeMismatch`, `SchemaShapeMismatch`, `InvalidRoot`) surface before any
/// record is processed. `DecodeMismatch` is per record and carries the path of
/// the offending value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("no codec available for type {0}")]
    NoCodecAvailable(String),

    #[error("no schema available for type {0}")]
    NoSchemaAvailable(String),

    #[error("decode mismatch at '{path}': expected {expected}, found {actual}")]
    DecodeMismatch {
        path: ColumnPath,
        expected: String,
        actual: String,
    },

    #[error("schema shape mismatch at '{path}': {detail}")]
    SchemaShapeMismatch { path: ColumnPath, detail: String },

    #[error("column '{path}' is not filterable: {reason}")]
    NotFilterable { path: ColumnPath, reason: String },

    #[error("map key at '{path}' has non-primitive type {key_type}")]
    KeyTypeMismatch { path: ColumnPath, key_type: String },

    #[error("cannot encode value at '{path}': {detail}")]
    EncodeOverflow { path: ColumnPath, detail: String },

    #[error("value does not conform to schema at '{path}': expected {expected}, found {actual}")]
    NonConforming {
        path: ColumnPath,
        expected: String,
        actual: String,
    },

    #[error("invalid root schema: {0}")]
    InvalidRoot(String),

    #[error("invalid format policy: {0}")]
    InvalidFormat(String),
}

impl Error {
    /// A decode mismatch at the current position. Enclosing codecs anchor it
    /// with [`Error::within`].
    pub fn decode_mismatch(expected: impl Into<String>, actual: &Value) -> Self {
        Error::DecodeMismatch {
            path: ColumnPath::root(),
            expected: expected.into(),
            actual: actual.kind().to_string(),
        }
    }

    pub fn overflow(detail: impl Into<String>) -> Self {
        Error::EncodeOverflow {
            path: ColumnPath::root(),
            detail: detail.into(),
        }
    }

    pub fn non_conforming(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::NonConforming {
            path: ColumnPath::root(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn key_type_mismatch(key_type: impl Into<String>) -> Self {
        Error::KeyTypeMismatch {
            path: ColumnPath::root(),
            key_type: key_type.into(),
        }
    }

    pub fn shape_mismatch(detail: impl Into<String>) -> Self {
        Error::SchemaShapeMismatch {
            path: ColumnPath::root(),
            detail: detail.into(),
        }
    }

    /// Re-anchor the error one level deeper: `segment` becomes the first
    /// component of the path. Errors without a path pass through unchanged.
    pub fn within(self, segment: impl Into<String>) -> Self {
        match self {
            Error::DecodeMismatch {
                path,
                expected,
                actual,
            } => Error::DecodeMismatch {
                path: path.prepend(segment),
                expected,
                actual,
            },
            Error::SchemaShapeMismatch { path, detail } => Error::SchemaShapeMismatch {
                path: path.prepend(segment),
                detail,
            },
            Error::NotFilterable { path, reason } => Error::NotFilterable {
                path: path.prepend(segment),
                reason,
            },
            Error::KeyTypeMismatch { path, key_type } => Error::KeyTypeMismatch {
                path: path.prepend(segment),
                key_type,
            },
            Error::EncodeOverflow { path, detail } => Error::EncodeOverflow {
                path: path.prepend(segment),
                detail,
            },
            Error::NonConforming {
                path,
                expected,
                actual,
            } => Error::NonConforming {
                path: path.prepend(segment),
                expected,
                actual,
            },
            other => other,
        }
    }

    pub fn path(&self) -> Option<&ColumnPath> {
        match self {
            Error::DecodeMismatch { path, .. }
            | Error::SchemaShapeMismatch { path, .. }
            | Error::NotFilterable { path, .. }
            | Error::KeyTypeMismatch { path, .. }
            | Error::EncodeOverflow { path, .. }
            | Error::NonConforming { path, .. } => Some(path),
            _ => None,
        }
    }

    /// True for failures that are fixed by changing types, registrations or
    /// policies rather than data.
    pub fn is_derivation_error(&self) -> bool {
        matches!(
            self,
            Error::NoCodecAvailable(_)
                | Error::NoSchemaAvailable(_)
                | Error::SchemaShapeMismatch { .. }
                | Error::KeyTypeMismatch { .. }
                | Error::InvalidRoot(_)
                | Error::InvalidFormat(_)
        )
    }
}
