//! Schema Compiler (write path) and Schema Projector (read path) — spec §4.1/§4.2.

pub mod compat;
pub mod compiler;
pub mod projector;

pub use compat::{compat_level, uuid_bytes_to_string, uuid_string_to_bytes, CompatLevel, FileLeaf, TargetLeaf};
pub use compiler::compile_message_type;
pub use projector::{project_record, FieldPlan, ListFileShape, ProjectedField, ProjectedRecord};
