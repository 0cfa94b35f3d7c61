//! Bridges statically-typed record structures with the Parquet columnar file format:
//! derives a Parquet schema from a Rust type, shreds records into column streams on
//! write, and reconstructs records from a (possibly differently-shaped) file schema on
//! read via projection, compatibility narrowing, and materialization.
//!
//! Grounded on the teacher's `record_persist`/`record_persist_derive` pair, generalized
//! from a flat not-null bitmap to full Dremel definition/repetition levels so nested
//! records, lists (all three standard encodings) and maps round-trip, and extended with a
//! symmetric read path the teacher never built.

pub mod assembler;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod field;
pub mod levels;
pub mod materializer;
pub mod reader;
pub mod schema;
pub mod writer;

pub use descriptor::{FieldDescriptor, TypeDescriptor};
pub use error::{PersistError, Result};
pub use field::ParquetField;
pub use reader::TableReader;
pub use writer::TableWriter;

pub use parquet_record_derive::Record;

/// A top-level persisted type: every `#[derive(Record)]` struct implements both this and
/// [`ParquetField`] (the generalization of the teacher's `Persistable`, spec §2's Codegen
/// glue). `table_name` feeds `TableWriter::new`/`PersistConfig`'s table allow-list the same
/// way the teacher's binaries pass a `path_prefix` string by hand.
pub trait Record: ParquetField {
    fn table_name() -> &'static str;

    /// The root `TypeDescriptor::Record` this type compiles to; derived automatically.
    fn record_descriptor() -> TypeDescriptor {
        Self::describe(false)
    }
}
