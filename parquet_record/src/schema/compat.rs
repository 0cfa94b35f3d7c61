//! Numeric/logical compatibility table (spec §4.3).
//!
//! `FileLeaf` is the physical+logical shape actually found in a file's schema;
//! `TargetLeaf` is the shape the target descriptor asks for. [`compat_level`] answers
//! "can a column shaped like `file` feed a field shaped like `target`", returning the
//! `Always` / `NarrowingOnly` / `Never` lattice from the table in spec §4.3. Callers
//! (the Schema Projector) combine this with `fail_on_narrowing` to decide pass/fail;
//! the actual value conversion lives in the materializer, since it already dispatches on
//! the target kind to build the Rust value.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileLeaf {
    Int32,
    Int64,
    Float,
    Double,
    Bool,
    StringOrEnum,
    Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLeaf {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    String,
    Enum,
    Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatLevel {
    /// Always allowed, regardless of `fail_on_narrowing`.
    Always,
    /// Allowed only when `fail_on_narrowing` is false.
    NarrowingOnly,
    /// Never a valid (file, target) pairing.
    Never,
}

/// The table in spec §4.3, literally: row = file physical/logical, column = target.
pub fn compat_level(file: FileLeaf, target: TargetLeaf) -> CompatLevel {
    use CompatLevel::*;
    use TargetLeaf::*;

    match (file, target) {
        (FileLeaf::Bool, Bool) => Always,
        (FileLeaf::Bool, _) => Never,

        (FileLeaf::Int32, I8) => NarrowingOnly,
        (FileLeaf::Int32, I16) => NarrowingOnly,
        (FileLeaf::Int32, I32) => Always,
        (FileLeaf::Int32, I64) => Always,
        (FileLeaf::Int32, F32) => Always,
        (FileLeaf::Int32, F64) => Always,
        (FileLeaf::Int32, _) => Never,

        (FileLeaf::Int64, I8) => NarrowingOnly,
        (FileLeaf::Int64, I16) => NarrowingOnly,
        (FileLeaf::Int64, I32) => NarrowingOnly,
        (FileLeaf::Int64, I64) => Always,
        (FileLeaf::Int64, F32) => Always,
        (FileLeaf::Int64, F64) => Always,
        (FileLeaf::Int64, _) => Never,

        (FileLeaf::Float, F32) => Always,
        (FileLeaf::Float, F64) => Always,
        (FileLeaf::Float, _) => Never,

        (FileLeaf::Double, F32) => NarrowingOnly,
        (FileLeaf::Double, F64) => Always,
        (FileLeaf::Double, _) => Never,

        (FileLeaf::StringOrEnum, String) => Always,
        (FileLeaf::StringOrEnum, Enum) => Always,
        (FileLeaf::StringOrEnum, _) => Never,

        (FileLeaf::Uuid, String) => Always,
        (FileLeaf::Uuid, Uuid) => Always,
        (FileLeaf::Uuid, _) => Never,
    }
}

/// Renders a 16-byte UUID payload as the canonical `8-4-4-4-12` textual form (spec §4.3).
pub fn uuid_bytes_to_string(bytes: &[u8; 16]) -> String {
    uuid::Uuid::from_bytes(*bytes).hyphenated().to_string()
}

/// Parses the canonical textual form back into 16 bytes; used on write when a UUID
/// target is fed a string value and on read when a UUID column is projected as `String`.
pub fn uuid_string_to_bytes(s: &str) -> Option<[u8; 16]> {
    uuid::Uuid::parse_str(s).ok().map(|u| *u.as_bytes())
}
