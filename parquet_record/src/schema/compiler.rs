//! Schema Compiler: target [`TypeDescriptor`] → Parquet `MessageType` (spec §4.1).

use std::sync::Arc;

use parquet::basic::{
    ConvertedType, LogicalType as PqLogicalType, Repetition, TimeUnit as PqTimeUnit, Type as PhysicalType,
};
use parquet::format::{MicroSeconds, MilliSeconds, NanoSeconds};
use parquet::schema::types::{Type, TypePtr};

use crate::config::NamingStrategy;
use crate::descriptor::{
    FieldDescriptor, ListEncoding, LogicalBinaryKind, PrimitiveKind, TemporalKind, TimeUnit as DescTimeUnit,
    TypeDescriptor,
};
use crate::error::{PersistError, Result};

/// Compiles a root `Record` descriptor into a `MessageType` named `message_name`.
///
/// Mirrors the teacher's `TableWriter`/`RowBuilder::end`, which builds
/// `Type::group_type_builder("schema").with_fields(...)`, generalized to walk the full
/// descriptor tree (nested records, lists in all three encodings, maps) instead of a
/// flat field list.
pub fn compile_message_type(descriptor: &TypeDescriptor, message_name: &str, naming: NamingStrategy) -> Result<TypePtr> {
    descriptor.validate()?;

    let fields = match descriptor {
        TypeDescriptor::Record { fields, .. } => fields,
        other => {
            return Err(PersistError::UnsupportedTarget {
                type_name: format!("{other:?}"),
                reason: "root descriptor must be a Record".to_string(),
            })
        }
    };

    let children = compile_fields(fields, naming)?;
    let group = Type::group_type_builder(message_name)
        .with_repetition(Repetition::REQUIRED)
        .with_fields(children)
        .build()?;
    Ok(Arc::new(group))
}

fn compile_fields(fields: &[FieldDescriptor], naming: NamingStrategy) -> Result<Vec<TypePtr>> {
    fields.iter().map(|f| compile_field(f, naming)).collect()
}

/// A field's own presence bit exists only when its descriptor is actually nullable (i.e.
/// the Rust type is `Option<T>`, or `not_null` was overridden): a bare, non-`Option`
/// `Vec`/`HashMap`/nested record never gets an extra OPTIONAL wrapper, since `append`
/// never increments its def level for one (only `Option<T>::append` does). Getting this
/// wrong desyncs the compiled schema's def-level depth from what the assembler writes.
fn resolve_repetition(field: &FieldDescriptor) -> Repetition {
    if field.not_null {
        return Repetition::REQUIRED;
    }
    if field.descriptor.nullable() {
        Repetition::OPTIONAL
    } else {
        Repetition::REQUIRED
    }
}

fn compile_field(field: &FieldDescriptor, naming: NamingStrategy) -> Result<TypePtr> {
    let repetition = resolve_repetition(field);
    let name = field.resolve_name(naming);
    compile_named(&field.descriptor, &name, repetition, field.field_id, naming)
}

/// Compiles one descriptor node into a named, already-repetition-resolved `Type`. Used
/// both for top-level record fields and for list/map element/key/value sub-nodes (which
/// pass their own repetition and never carry a field id — spec §4.6).
fn compile_named(
    descriptor: &TypeDescriptor,
    name: &str,
    repetition: Repetition,
    field_id: Option<i32>,
    naming: NamingStrategy,
) -> Result<TypePtr> {
    match descriptor {
        TypeDescriptor::Primitive { kind, .. } => compile_primitive(*kind, name, repetition, field_id),
        TypeDescriptor::LogicalBinary { kind, .. } => compile_logical_binary(kind, name, repetition, field_id),
        TypeDescriptor::Decimal { precision, scale, .. } => compile_decimal(*precision, *scale, name, repetition, field_id),
        TypeDescriptor::Temporal { kind, .. } => compile_temporal(*kind, name, repetition, field_id),
        TypeDescriptor::List { element, encoding, .. } => {
            compile_list(element, *encoding, name, repetition, field_id, naming)
        }
        TypeDescriptor::Map { key, value, .. } => compile_map(key, value, name, repetition, field_id, naming),
        TypeDescriptor::Record { fields, .. } => {
            let children = compile_fields(fields, naming)?;
            let mut builder = Type::group_type_builder(name).with_repetition(repetition).with_fields(children);
            if let Some(id) = field_id {
                builder = builder.with_id(id);
            }
            Ok(Arc::new(builder.build()?))
        }
        TypeDescriptor::Unresolved => Err(PersistError::UnsupportedTarget {
            type_name: name.to_string(),
            reason: "unresolved generic element".to_string(),
        }),
    }
}

fn compile_primitive(kind: PrimitiveKind, name: &str, repetition: Repetition, field_id: Option<i32>) -> Result<TypePtr> {
    let physical = match kind {
        PrimitiveKind::Bool => PhysicalType::BOOLEAN,
        PrimitiveKind::I8 | PrimitiveKind::I16 | PrimitiveKind::I32 => PhysicalType::INT32,
        PrimitiveKind::I64 => PhysicalType::INT64,
        PrimitiveKind::F32 => PhysicalType::FLOAT,
        PrimitiveKind::F64 => PhysicalType::DOUBLE,
    };
    let converted = match kind {
        PrimitiveKind::I8 => Some(ConvertedType::INT_8),
        PrimitiveKind::I16 => Some(ConvertedType::INT_16),
        _ => None,
    };
    let mut builder = Type::primitive_type_builder(name, physical).with_repetition(repetition);
    if let Some(converted) = converted {
        builder = builder.with_converted_type(converted);
    }
    if let Some(id) = field_id {
        builder = builder.with_id(id);
    }
    Ok(Arc::new(builder.build()?))
}

fn compile_logical_binary(
    kind: &LogicalBinaryKind,
    name: &str,
    repetition: Repetition,
    field_id: Option<i32>,
) -> Result<TypePtr> {
    let (physical, length, logical) = match kind {
        LogicalBinaryKind::String => (PhysicalType::BYTE_ARRAY, None, Some(PqLogicalType::String)),
        LogicalBinaryKind::Enum(_) => (PhysicalType::BYTE_ARRAY, None, Some(PqLogicalType::Enum)),
        LogicalBinaryKind::Uuid => (PhysicalType::FIXED_LEN_BYTE_ARRAY, Some(16), Some(PqLogicalType::Uuid)),
        LogicalBinaryKind::Json => (PhysicalType::BYTE_ARRAY, None, Some(PqLogicalType::Json)),
        LogicalBinaryKind::Bson => (PhysicalType::BYTE_ARRAY, None, Some(PqLogicalType::Bson)),
        LogicalBinaryKind::RawBinary => (PhysicalType::BYTE_ARRAY, None, None),
    };
    let mut builder = Type::primitive_type_builder(name, physical)
        .with_repetition(repetition)
        .with_logical_type(logical);
    if let Some(len) = length {
        builder = builder.with_length(len);
    }
    if let Some(id) = field_id {
        builder = builder.with_id(id);
    }
    Ok(Arc::new(builder.build()?))
}

/// Smallest physical backing for a DECIMAL(precision, scale), per spec §4.1:
/// INT32 up to 9 digits, INT64 up to 18, FIXED_LEN_BYTE_ARRAY beyond that.
fn decimal_physical(precision: u8) -> (PhysicalType, Option<i32>) {
    if precision <= 9 {
        (PhysicalType::INT32, None)
    } else if precision <= 18 {
        (PhysicalType::INT64, None)
    } else {
        // ceil(precision * log2(10) / 8) bytes, the standard decimal-to-fixed-width formula.
        let bytes = (((precision as f64) * std::f64::consts::LOG2_10 / 8.0).ceil() as i32).max(1);
        (PhysicalType::FIXED_LEN_BYTE_ARRAY, Some(bytes))
    }
}

fn compile_decimal(precision: u8, scale: u8, name: &str, repetition: Repetition, field_id: Option<i32>) -> Result<TypePtr> {
    let (physical, length) = decimal_physical(precision);
    let mut builder = Type::primitive_type_builder(name, physical)
        .with_repetition(repetition)
        .with_logical_type(Some(PqLogicalType::Decimal {
            precision: precision as i32,
            scale: scale as i32,
        }))
        .with_precision(precision as i32)
        .with_scale(scale as i32);
    if let Some(len) = length {
        builder = builder.with_length(len);
    }
    if let Some(id) = field_id {
        builder = builder.with_id(id);
    }
    Ok(Arc::new(builder.build()?))
}

fn compile_temporal(kind: TemporalKind, name: &str, repetition: Repetition, field_id: Option<i32>) -> Result<TypePtr> {
    let (physical, logical) = match kind {
        TemporalKind::Date => (PhysicalType::INT32, Some(PqLogicalType::Date)),
        TemporalKind::Time(unit) => (
            time_physical(unit),
            Some(PqLogicalType::Time {
                is_adjusted_to_u_t_c: true,
                unit: pq_time_unit(unit),
            }),
        ),
        TemporalKind::LocalDateTime(unit) => (
            PhysicalType::INT64,
            Some(PqLogicalType::Timestamp {
                is_adjusted_to_u_t_c: false,
                unit: pq_time_unit(unit),
            }),
        ),
        TemporalKind::Instant(unit) => (
            PhysicalType::INT64,
            Some(PqLogicalType::Timestamp {
                is_adjusted_to_u_t_c: true,
                unit: pq_time_unit(unit),
            }),
        ),
    };
    let mut builder = Type::primitive_type_builder(name, physical)
        .with_repetition(repetition)
        .with_logical_type(logical);
    if let Some(id) = field_id {
        builder = builder.with_id(id);
    }
    Ok(Arc::new(builder.build()?))
}

fn time_physical(unit: DescTimeUnit) -> PhysicalType {
    match unit {
        DescTimeUnit::Ms => PhysicalType::INT32,
        DescTimeUnit::Us | DescTimeUnit::Ns => PhysicalType::INT64,
    }
}

fn pq_time_unit(unit: DescTimeUnit) -> PqTimeUnit {
    match unit {
        DescTimeUnit::Ms => PqTimeUnit::MILLIS(MilliSeconds::new()),
        DescTimeUnit::Us => PqTimeUnit::MICROS(MicroSeconds::new()),
        DescTimeUnit::Ns => PqTimeUnit::NANOS(NanoSeconds::new()),
    }
}

/// Emits the configured LIST encoding (spec §3.2/§4.1). Structural wrapper names
/// (`list`, `element`) never carry a field id; only the outer `name` node does.
fn compile_list(
    element: &TypeDescriptor,
    encoding: ListEncoding,
    name: &str,
    repetition: Repetition,
    field_id: Option<i32>,
    naming: NamingStrategy,
) -> Result<TypePtr> {
    match encoding {
        ListEncoding::ThreeLevel => {
            let element_repetition = if element.nullable() { Repetition::OPTIONAL } else { Repetition::REQUIRED };
            let element_type = compile_named(element, "element", element_repetition, None, naming)?;
            let list_group = Type::group_type_builder("list")
                .with_repetition(Repetition::REPEATED)
                .with_fields(vec![element_type])
                .build()?;
            let mut builder = Type::group_type_builder(name)
                .with_repetition(repetition)
                .with_logical_type(Some(PqLogicalType::List))
                .with_fields(vec![Arc::new(list_group)]);
            if let Some(id) = field_id {
                builder = builder.with_id(id);
            }
            Ok(Arc::new(builder.build()?))
        }
        ListEncoding::TwoLevel => {
            // The repeated node carries the element type directly; elements can't be null.
            let element_type = compile_named(element, "element", Repetition::REPEATED, None, naming)?;
            let mut builder = Type::group_type_builder(name)
                .with_repetition(repetition)
                .with_logical_type(Some(PqLogicalType::List))
                .with_fields(vec![element_type]);
            if let Some(id) = field_id {
                builder = builder.with_id(id);
            }
            Ok(Arc::new(builder.build()?))
        }
        ListEncoding::OneLevel => {
            // No wrapper group at all: the repeated node *is* the user field.
            compile_named(element, name, Repetition::REPEATED, field_id, naming)
        }
    }
}

/// Emits the standard `group X (MAP) { repeated group key_value { required key; <value>; } }`
/// layout (spec §3.2) regardless of the target container kind, which only affects read-side
/// materialization.
fn compile_map(
    key: &TypeDescriptor,
    value: &TypeDescriptor,
    name: &str,
    repetition: Repetition,
    field_id: Option<i32>,
    naming: NamingStrategy,
) -> Result<TypePtr> {
    let key_type = compile_named(key, "key", Repetition::REQUIRED, None, naming)?;
    let value_repetition = if value.nullable() { Repetition::OPTIONAL } else { Repetition::REQUIRED };
    let value_type = compile_named(value, "value", value_repetition, None, naming)?;
    let key_value = Type::group_type_builder("key_value")
        .with_repetition(Repetition::REPEATED)
        .with_fields(vec![key_type, value_type])
        .build()?;
    let mut builder = Type::group_type_builder(name)
        .with_repetition(repetition)
        .with_logical_type(Some(PqLogicalType::Map))
        .with_fields(vec![Arc::new(key_value)]);
    if let Some(id) = field_id {
        builder = builder.with_id(id);
    }
    Ok(Arc::new(builder.build()?))
}
