use thiserror::Error;

/// Error taxonomy for schema compilation, projection, assembly and materialization.
///
/// Mirrors the teacher's `record_persist::error::PersistError` (wraps the underlying
/// `parquet` crate error the same way) but grows one variant per failure kind named in
/// the schema-projection / record-assembly contract.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("unsupported target `{type_name}`: {reason}")]
    UnsupportedTarget { type_name: String, reason: String },

    #[error("schema incompatible at `{path}`: {reason}")]
    SchemaIncompatible { path: String, reason: String },

    #[error("missing column `{path}`")]
    MissingColumn { path: String },

    #[error("null for required field `{path}`")]
    NullForRequired { path: String },

    #[error("narrowing disallowed for `{path}`: file type {file_type} into target {target_type}")]
    NarrowingDisallowed {
        path: String,
        file_type: String,
        target_type: String,
    },

    #[error("duplicate field id {id} in record scope `{scope}`")]
    DuplicateFieldId { scope: String, id: i32 },

    #[error("inexact rescale of `{path}`: {value} at scale {from_scale} cannot be rescaled to {to_scale} under UNNECESSARY rounding")]
    InexactRescale {
        path: String,
        value: String,
        from_scale: u32,
        to_scale: u32,
    },

    #[error("malformed levels at `{path}`: {reason}")]
    MalformedLevels { path: String, reason: String },

    #[error("parquet error: {0}")]
    ParquetError(String),

    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("other error: {0}")]
    Other(String),
}

impl From<parquet::errors::ParquetError> for PersistError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        Self::ParquetError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
