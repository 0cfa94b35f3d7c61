//! Canonical representation of target record shapes (spec §3.1).
//!
//! A [`TypeDescriptor`] is constructed once per writer/reader configuration (usually by
//! `#[derive(Record)]`) and is immutable afterwards; both the Schema Compiler and the
//! Schema Projector walk it read-only.

use std::collections::HashSet;

use crate::config::NamingStrategy;
use crate::error::{PersistError, Result};

/// Rounding strategy applied when a written decimal's scale exceeds the descriptor's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Unnecessary,
    HalfUp,
    HalfEven,
}

/// Unit carried by every temporal kind (spec §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Ms,
    Us,
    Ns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalBinaryKind {
    String,
    /// `None` means any symbol is accepted; `Some(names)` restricts to a closed name-set.
    Enum(Option<Vec<String>>),
    Uuid,
    Json,
    Bson,
    RawBinary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time(TimeUnit),
    LocalDateTime(TimeUnit),
    Instant(TimeUnit),
}

/// How a `List` descriptor is encoded on write (spec §3.2). Read always accepts all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEncoding {
    OneLevel,
    TwoLevel,
    ThreeLevel,
}

impl Default for ListEncoding {
    fn default() -> Self {
        ListEncoding::ThreeLevel
    }
}

/// Concrete Rust container the materializer must build for a `List` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListContainer {
    OrderedSequence,
    UnorderedSet,
    Specific(String),
}

/// Concrete Rust container the materializer must build for a `Map` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapContainer {
    Hash,
    LinkedHash,
    Tree,
    Concurrent,
    Specific(String),
}

/// One field inside a `Record` descriptor.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Name as declared on the Rust struct.
    pub source_name: String,
    /// Explicit alias; overrides both the write-time naming strategy and the read-time
    /// matching strategy when present (spec §4.6, Open Question 2).
    pub alias: Option<String>,
    pub descriptor: TypeDescriptor,
    /// `@NotNull` override: forces `REQUIRED` even for a group-shaped descriptor.
    pub not_null: bool,
    pub field_id: Option<i32>,
}

impl FieldDescriptor {
    pub fn new(source_name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        FieldDescriptor {
            source_name: source_name.into(),
            alias: None,
            descriptor,
            not_null: false,
            field_id: None,
        }
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn with_not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    pub fn with_field_id(mut self, id: Option<i32>) -> Self {
        self.field_id = id;
        self
    }

    /// Resolves the column name to write under `strategy` (spec §4.6 resolution order:
    /// alias > configured strategy > source name verbatim — a plain `resolve` already
    /// covers the third case since every `NamingStrategy` falls back to the source name).
    pub fn resolve_name(&self, strategy: NamingStrategy) -> String {
        self.alias.clone().unwrap_or_else(|| strategy.resolve(&self.source_name))
    }

    /// Read-side candidate names to try against the file schema, in priority order.
    /// `BEST_EFFORT` tries an exact match on the source name before falling back to the
    /// snake_case transform (spec §4.6).
    pub fn match_candidates(&self, strategy: NamingStrategy) -> Vec<String> {
        if let Some(alias) = &self.alias {
            return vec![alias.clone()];
        }
        match strategy {
            NamingStrategy::FieldName => vec![self.source_name.clone()],
            NamingStrategy::SnakeCase => vec![crate::config::to_snake_case(&self.source_name)],
            NamingStrategy::BestEffort => {
                let snake = crate::config::to_snake_case(&self.source_name);
                if snake == self.source_name {
                    vec![self.source_name.clone()]
                } else {
                    vec![self.source_name.clone(), snake]
                }
            }
        }
    }
}

/// The Type Descriptor (spec §3.1): canonical, immutable shape of a record target.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Primitive { kind: PrimitiveKind, nullable: bool },
    LogicalBinary { kind: LogicalBinaryKind, nullable: bool },
    Decimal { precision: u8, scale: u8, rounding: Rounding, nullable: bool },
    Temporal { kind: TemporalKind, nullable: bool },
    List {
        element: Box<TypeDescriptor>,
        encoding: ListEncoding,
        container: ListContainer,
        nullable: bool,
    },
    Map {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
        container: MapContainer,
        nullable: bool,
    },
    Record { name: String, fields: Vec<FieldDescriptor>, nullable: bool },
    /// A generic parameter that was never monomorphized into a concrete shape. Always
    /// invalid; exists only so a hand-built descriptor can represent "I don't know yet"
    /// the way a reflection-based implementation would, per spec §3.1's invariant.
    Unresolved,
}

impl TypeDescriptor {
    pub fn nullable(&self) -> bool {
        match self {
            TypeDescriptor::Primitive { nullable, .. }
            | TypeDescriptor::LogicalBinary { nullable, .. }
            | TypeDescriptor::Decimal { nullable, .. }
            | TypeDescriptor::Temporal { nullable, .. }
            | TypeDescriptor::List { nullable, .. }
            | TypeDescriptor::Map { nullable, .. }
            | TypeDescriptor::Record { nullable, .. } => *nullable,
            TypeDescriptor::Unresolved => false,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::List { .. } | TypeDescriptor::Map { .. } | TypeDescriptor::Record { .. }
        )
    }

    /// Validates every invariant in spec §3.1: non-recursive records, map keys that
    /// aren't List/Map, unique field ids per record scope, decimal scale <= precision,
    /// and no unresolved descriptors anywhere in the tree.
    pub fn validate(&self) -> Result<()> {
        let mut stack: Vec<String> = Vec::new();
        self.validate_inner(&mut stack)
    }

    fn validate_inner(&self, record_stack: &mut Vec<String>) -> Result<()> {
        match self {
            TypeDescriptor::Unresolved => Err(PersistError::UnsupportedTarget {
                type_name: "<unresolved>".to_string(),
                reason: "descriptor has a generic/unresolved element".to_string(),
            }),
            TypeDescriptor::Primitive { .. } | TypeDescriptor::Temporal { .. } | TypeDescriptor::LogicalBinary { .. } => Ok(()),
            TypeDescriptor::Decimal { precision, scale, .. } => {
                if *scale as u32 > *precision as u32 || !(1..=38).contains(precision) {
                    return Err(PersistError::UnsupportedTarget {
                        type_name: "Decimal".to_string(),
                        reason: format!("scale {scale} > precision {precision}, or precision out of 1..=38"),
                    });
                }
                Ok(())
            }
            TypeDescriptor::List { element, .. } => element.validate_inner(record_stack),
            TypeDescriptor::Map { key, value, .. } => {
                if matches!(**key, TypeDescriptor::List { .. } | TypeDescriptor::Map { .. }) {
                    return Err(PersistError::UnsupportedTarget {
                        type_name: "Map".to_string(),
                        reason: "map key descriptor may not itself be a List or Map".to_string(),
                    });
                }
                key.validate_inner(record_stack)?;
                value.validate_inner(record_stack)
            }
            TypeDescriptor::Record { name, fields, .. } => {
                if record_stack.iter().any(|scope| scope == name) {
                    return Err(PersistError::UnsupportedTarget {
                        type_name: name.clone(),
                        reason: "record is recursive (direct or transitive)".to_string(),
                    });
                }
                let mut seen_ids: HashSet<i32> = HashSet::new();
                for field in fields {
                    if let Some(id) = field.field_id {
                        if !seen_ids.insert(id) {
                            return Err(PersistError::DuplicateFieldId { scope: name.clone(), id });
                        }
                    }
                }
                record_stack.push(name.clone());
                for field in fields {
                    field.descriptor.validate_inner(record_stack)?;
                }
                record_stack.pop();
                Ok(())
            }
        }
    }
}
