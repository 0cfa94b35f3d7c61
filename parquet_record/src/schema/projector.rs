//! Schema Projector: file `MessageType` × target [`TypeDescriptor`] → projected schema
//! plus a per-field plan the Record Materializer drives (spec §4.2).

use std::sync::Arc;

use parquet::basic::{LogicalType as PqLogicalType, Repetition, Type as PhysicalType};
use parquet::schema::types::{Type, TypePtr};

use crate::config::ReaderPolicy;
use crate::descriptor::{FieldDescriptor, ListEncoding, LogicalBinaryKind, PrimitiveKind, TypeDescriptor};
use crate::error::{PersistError, Result};
use crate::schema::compat::{compat_level, CompatLevel, FileLeaf, TargetLeaf};

/// How the matched file column encodes a LIST (spec §3.2); all three are accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFileShape {
    ThreeLevel,
    TwoLevel,
    OneLevel,
}

/// Per-matched-node outcome of projection, consumed by the Record Materializer together
/// with the generic `Value` tree it reconstructs from column levels (spec §4.4). List/Map
/// element/key/value plans are positional (a list element always exists once its parent
/// occurrence does), so only [`ProjectedField`] needs to track "matched or absent".
#[derive(Debug, Clone)]
pub enum FieldPlan {
    Leaf { file_leaf: FileLeaf, narrowing: bool, file_nullable: bool },
    Decimal { file_precision: i32, file_scale: i32, file_nullable: bool },
    Record(ProjectedRecord),
    List { element: Box<FieldPlan>, file_shape: ListFileShape, list_nullable: bool },
    Map { key: Box<FieldPlan>, value: Box<FieldPlan>, map_nullable: bool },
}

/// One target field's projection outcome. `matched_name` is the file column name to look
/// up in the reconstructed `Value::Record` map; `None` means the column was missing and
/// `fail_on_missing_column` was false, so the materializer substitutes the spec §4.4
/// default without consulting `plan`.
#[derive(Debug, Clone)]
pub struct ProjectedField {
    pub matched_name: Option<String>,
    pub plan: Option<FieldPlan>,
}

#[derive(Debug, Clone)]
pub struct ProjectedRecord {
    /// Projected group type: only the columns needed by the target, in file order.
    pub schema: TypePtr,
    /// One entry per target field, in target declared-field order.
    pub fields: Vec<ProjectedField>,
}

fn file_leaf_of(t: &Type) -> Option<FileLeaf> {
    if t.is_group() {
        return None;
    }
    let logical = t.get_basic_info().logical_type();
    match (t.get_physical_type(), logical) {
        (PhysicalType::BOOLEAN, _) => Some(FileLeaf::Bool),
        (PhysicalType::INT32, Some(PqLogicalType::Decimal { .. })) => None,
        (PhysicalType::INT32, _) => Some(FileLeaf::Int32),
        (PhysicalType::INT64, Some(PqLogicalType::Decimal { .. })) => None,
        (PhysicalType::INT64, _) => Some(FileLeaf::Int64),
        (PhysicalType::FLOAT, _) => Some(FileLeaf::Float),
        (PhysicalType::DOUBLE, _) => Some(FileLeaf::Double),
        (PhysicalType::BYTE_ARRAY, Some(PqLogicalType::String)) => Some(FileLeaf::StringOrEnum),
        (PhysicalType::BYTE_ARRAY, Some(PqLogicalType::Enum)) => Some(FileLeaf::StringOrEnum),
        (PhysicalType::FIXED_LEN_BYTE_ARRAY, Some(PqLogicalType::Uuid)) => Some(FileLeaf::Uuid),
        (PhysicalType::BYTE_ARRAY, Some(PqLogicalType::Uuid)) => Some(FileLeaf::Uuid),
        _ => None,
    }
}

fn target_leaf_of(descriptor: &TypeDescriptor) -> Option<TargetLeaf> {
    match descriptor {
        TypeDescriptor::Primitive { kind, .. } => Some(match kind {
            PrimitiveKind::Bool => TargetLeaf::Bool,
            PrimitiveKind::I8 => TargetLeaf::I8,
            PrimitiveKind::I16 => TargetLeaf::I16,
            PrimitiveKind::I32 => TargetLeaf::I32,
            PrimitiveKind::I64 => TargetLeaf::I64,
            PrimitiveKind::F32 => TargetLeaf::F32,
            PrimitiveKind::F64 => TargetLeaf::F64,
        }),
        TypeDescriptor::LogicalBinary { kind, .. } => match kind {
            LogicalBinaryKind::String => Some(TargetLeaf::String),
            LogicalBinaryKind::Enum(_) => Some(TargetLeaf::Enum),
            LogicalBinaryKind::Uuid => Some(TargetLeaf::Uuid),
            LogicalBinaryKind::Json | LogicalBinaryKind::Bson | LogicalBinaryKind::RawBinary => Some(TargetLeaf::String),
        },
        _ => None,
    }
}

/// Classifies a matched file node as a List in one of the three encodings, per spec §3.2
/// and the standard Parquet LIST backward-compatibility rule (also used by `amadeus`'s
/// `parse_list`): a repeated single-field group whose inner field is itself a single-field
/// group (and not named `array`) is three-level; anything else repeated is two-level; a
/// bare repeated node with no LIST annotation is one-level.
pub(crate) fn classify_list(node: &Type) -> Option<(TypePtr, ListFileShape)> {
    if node.is_group() && node.get_basic_info().logical_type() == Some(PqLogicalType::List) {
        let fields = node.get_fields();
        if fields.len() != 1 {
            return None;
        }
        let repeated = &fields[0];
        if repeated.get_basic_info().repetition() != Repetition::REPEATED {
            return None;
        }
        if repeated.is_group() && repeated.get_fields().len() == 1 && repeated.name() != "array" {
            return Some((repeated.get_fields()[0].clone(), ListFileShape::ThreeLevel));
        }
        return Some((repeated.clone(), ListFileShape::TwoLevel));
    }
    if node.get_basic_info().repetition() == Repetition::REPEATED && node.get_basic_info().logical_type() != Some(PqLogicalType::List)
    {
        return Some((Arc::new(clone_as_required(node)), ListFileShape::OneLevel));
    }
    None
}

fn clone_as_required(node: &Type) -> Type {
    // Used only to hand the element sub-projector a node whose own repetition reads as
    // "one occurrence"; one-level lists can't have null elements (spec §3.2/§4.1).
    if node.is_group() {
        Type::group_type_builder(node.name())
            .with_repetition(Repetition::REQUIRED)
            .with_fields(node.get_fields().to_vec())
            .build()
            .expect("rebuilding group with REQUIRED repetition cannot fail")
    } else {
        let mut builder = Type::primitive_type_builder(node.name(), node.get_physical_type())
            .with_repetition(Repetition::REQUIRED)
            .with_logical_type(node.get_basic_info().logical_type());
        if node.get_type_length() > 0 {
            builder = builder.with_length(node.get_type_length());
        }
        builder.build().expect("rebuilding primitive with REQUIRED repetition cannot fail")
    }
}

pub(crate) fn classify_map(node: &Type) -> Option<(TypePtr, TypePtr)> {
    if !node.is_group() || node.get_basic_info().logical_type() != Some(PqLogicalType::Map) {
        return None;
    }
    let fields = node.get_fields();
    if fields.len() != 1 {
        return None;
    }
    let key_value = &fields[0];
    if !key_value.is_group() || key_value.get_fields().len() != 2 {
        return None;
    }
    Some((key_value.get_fields()[0].clone(), key_value.get_fields()[1].clone()))
}

/// Core entry point: projects `target_fields` (a Record's fields) against `file_group`.
pub fn project_record(file_group: &Type, target_fields: &[FieldDescriptor], policy: &ReaderPolicy, scope: &str) -> Result<ProjectedRecord> {
    if !file_group.is_group() {
        return Err(PersistError::SchemaIncompatible {
            path: scope.to_string(),
            reason: "expected a group type".to_string(),
        });
    }

    let mut fields = Vec::with_capacity(target_fields.len());
    // name -> rebuilt node to keep, populated in the order fields are resolved; final
    // output re-walks `file_group`'s own child order so the projected schema stays in
    // file order (spec §4.2 contract) regardless of target declaration order.
    let mut kept: Vec<(String, TypePtr)> = Vec::new();

    for field in target_fields {
        let path = format!("{scope}.{}", field.source_name);
        let candidates = field.match_candidates(policy.naming_strategy);
        let matched = file_group
            .get_fields()
            .iter()
            .find(|node| candidates.iter().any(|c| c == node.name()));

        let Some(matched) = matched else {
            if policy.fail_on_missing_column {
                return Err(PersistError::MissingColumn { path });
            }
            fields.push(ProjectedField { matched_name: None, plan: None });
            continue;
        };

        let (plan, rebuilt) = project_field(matched, &field.descriptor, policy, &path)?;
        kept.push((matched.name().to_string(), rebuilt));
        fields.push(ProjectedField { matched_name: Some(matched.name().to_string()), plan: Some(plan) });
    }

    let ordered_children: Vec<TypePtr> = file_group
        .get_fields()
        .iter()
        .filter_map(|node| kept.iter().find(|(name, _)| name == node.name()).map(|(_, t)| t.clone()))
        .collect();

    let schema = Arc::new(
        Type::group_type_builder(file_group.name())
            .with_repetition(file_group.get_basic_info().repetition())
            .with_fields(ordered_children)
            .build()?,
    );

    Ok(ProjectedRecord { schema, fields })
}

/// Projects one matched file node against one target descriptor, returning the plan the
/// materializer follows plus the (possibly recursively trimmed) node to keep in the
/// projected schema.
fn project_field(matched: &Type, target: &TypeDescriptor, policy: &ReaderPolicy, path: &str) -> Result<(FieldPlan, TypePtr)> {
    match target {
        TypeDescriptor::Record { fields, .. } => {
            if matched.is_group() && matched.get_basic_info().logical_type() != Some(PqLogicalType::List) && matched.get_basic_info().logical_type() != Some(PqLogicalType::Map)
            {
                let inner = project_record(matched, fields, policy, path)?;
                let rebuilt = rebuild_group_like(matched, inner.schema.clone());
                Ok((FieldPlan::Record(inner), rebuilt))
            } else {
                Err(PersistError::SchemaIncompatible {
                    path: path.to_string(),
                    reason: "target is a Record but file column is not a plain group".to_string(),
                })
            }
        }
        TypeDescriptor::List { element, .. } => {
            let Some((element_node, shape)) = classify_list(matched) else {
                return Err(PersistError::SchemaIncompatible {
                    path: path.to_string(),
                    reason: "target is a List but file column is neither LIST-annotated nor a bare repeated field".to_string(),
                });
            };
            let (element_plan, trimmed_element) = project_field(&element_node, element, policy, &format!("{path}[]"))?;
            let rebuilt = rebuild_list(matched, shape, trimmed_element);
            let list_nullable = matched.get_basic_info().repetition() != Repetition::REQUIRED;
            Ok((
                FieldPlan::List { element: Box::new(element_plan), file_shape: shape, list_nullable },
                rebuilt,
            ))
        }
        TypeDescriptor::Map { key, value, .. } => {
            let Some((key_node, value_node)) = classify_map(matched) else {
                return Err(PersistError::SchemaIncompatible {
                    path: path.to_string(),
                    reason: "target is a Map but file column is not MAP-annotated".to_string(),
                });
            };
            let (key_plan, trimmed_key) = project_field(&key_node, key, policy, &format!("{path}.key"))?;
            let (value_plan, trimmed_value) = project_field(&value_node, value, policy, &format!("{path}.value"))?;
            let rebuilt = rebuild_map(matched, &key_node, trimmed_key, trimmed_value);
            let map_nullable = matched.get_basic_info().repetition() != Repetition::REQUIRED;
            Ok((
                FieldPlan::Map { key: Box::new(key_plan), value: Box::new(value_plan), map_nullable },
                rebuilt,
            ))
        }
        TypeDescriptor::Decimal { .. } => {
            if matched.is_group() {
                return Err(PersistError::SchemaIncompatible {
                    path: path.to_string(),
                    reason: "target is a Decimal but file column is a group".to_string(),
                });
            }
            let (precision, scale) = match matched.get_basic_info().logical_type() {
                Some(PqLogicalType::Decimal { precision, scale }) => (precision, scale),
                _ => {
                    return Err(PersistError::SchemaIncompatible {
                        path: path.to_string(),
                        reason: "file column has no DECIMAL logical annotation".to_string(),
                    })
                }
            };
            let file_nullable = matched.get_basic_info().repetition() != Repetition::REQUIRED;
            check_nullability(file_nullable, target.nullable(), policy, path)?;
            Ok((FieldPlan::Decimal { file_precision: precision, file_scale: scale, file_nullable }, Arc::new(matched.clone())))
        }
        TypeDescriptor::Temporal { .. } => {
            if matched.is_group() {
                return Err(PersistError::SchemaIncompatible {
                    path: path.to_string(),
                    reason: "target is temporal but file column is a group".to_string(),
                });
            }
            let file_nullable = matched.get_basic_info().repetition() != Repetition::REQUIRED;
            check_nullability(file_nullable, target.nullable(), policy, path)?;
            // DATE is the only temporal kind backed by INT32 (spec §4.1's physical-type
            // table); everything else (Time/us/ns, LocalDateTime, Instant) is INT64.
            let file_leaf = if matched.get_physical_type() == PhysicalType::INT32 { FileLeaf::Int32 } else { FileLeaf::Int64 };
            Ok((FieldPlan::Leaf { file_leaf, narrowing: false, file_nullable }, Arc::new(matched.clone())))
        }
        _ => {
            let Some(file_leaf) = file_leaf_of(matched) else {
                return Err(PersistError::SchemaIncompatible {
                    path: path.to_string(),
                    reason: "target is a primitive/logical leaf but file column isn't a recognized leaf".to_string(),
                });
            };
            let Some(target_leaf) = target_leaf_of(target) else {
                return Err(PersistError::SchemaIncompatible {
                    path: path.to_string(),
                    reason: "unsupported target leaf kind".to_string(),
                });
            };
            let level = compat_level(file_leaf, target_leaf);
            let narrowing = match level {
                CompatLevel::Always => false,
                CompatLevel::NarrowingOnly => {
                    if policy.fail_on_narrowing {
                        return Err(PersistError::NarrowingDisallowed {
                            path: path.to_string(),
                            file_type: format!("{file_leaf:?}"),
                            target_type: format!("{target_leaf:?}"),
                        });
                    }
                    true
                }
                CompatLevel::Never => {
                    return Err(PersistError::SchemaIncompatible {
                        path: path.to_string(),
                        reason: format!("file leaf {file_leaf:?} cannot feed target leaf {target_leaf:?}"),
                    })
                }
            };
            let file_nullable = matched.get_basic_info().repetition() != Repetition::REQUIRED;
            check_nullability(file_nullable, target.nullable(), policy, path)?;
            Ok((FieldPlan::Leaf { file_leaf, narrowing, file_nullable }, Arc::new(matched.clone())))
        }
    }
}

fn check_nullability(file_nullable: bool, target_nullable: bool, policy: &ReaderPolicy, path: &str) -> Result<()> {
    if file_nullable && !target_nullable && policy.fail_on_null_for_primitive {
        return Err(PersistError::NullForRequired { path: path.to_string() });
    }
    Ok(())
}

fn rebuild_group_like(original: &Type, trimmed: TypePtr) -> TypePtr {
    let mut builder = Type::group_type_builder(original.name())
        .with_repetition(original.get_basic_info().repetition())
        .with_fields(trimmed.get_fields().to_vec());
    if let Some(id) = original.get_basic_info().id() {
        builder = builder.with_id(id);
    }
    Arc::new(builder.build().expect("rebuilding group type cannot fail"))
}

fn rebuild_list(original: &Type, shape: ListFileShape, trimmed_element: TypePtr) -> TypePtr {
    match shape {
        ListFileShape::ThreeLevel => {
            // original: group X (LIST) { repeated group list { element } }
            let inner_wrapper = &original.get_fields()[0];
            let list_group = Type::group_type_builder(inner_wrapper.name())
                .with_repetition(Repetition::REPEATED)
                .with_fields(vec![trimmed_element])
                .build()
                .expect("rebuilding list wrapper cannot fail");
            let mut builder = Type::group_type_builder(original.name())
                .with_repetition(original.get_basic_info().repetition())
                .with_logical_type(Some(PqLogicalType::List))
                .with_fields(vec![Arc::new(list_group)]);
            if let Some(id) = original.get_basic_info().id() {
                builder = builder.with_id(id);
            }
            Arc::new(builder.build().expect("rebuilding list group cannot fail"))
        }
        ListFileShape::TwoLevel => {
            let mut builder = Type::group_type_builder(original.name())
                .with_repetition(original.get_basic_info().repetition())
                .with_logical_type(Some(PqLogicalType::List))
                .with_fields(vec![trimmed_element]);
            if let Some(id) = original.get_basic_info().id() {
                builder = builder.with_id(id);
            }
            Arc::new(builder.build().expect("rebuilding list group cannot fail"))
        }
        ListFileShape::OneLevel => trimmed_element,
    }
}

fn rebuild_map(original: &Type, _key_node: &Type, trimmed_key: TypePtr, trimmed_value: TypePtr) -> TypePtr {
    let key_value_original = &original.get_fields()[0];
    let key_value = Type::group_type_builder(key_value_original.name())
        .with_repetition(Repetition::REPEATED)
        .with_fields(vec![trimmed_key, trimmed_value])
        .build()
        .expect("rebuilding key_value group cannot fail");
    let mut builder = Type::group_type_builder(original.name())
        .with_repetition(original.get_basic_info().repetition())
        .with_logical_type(Some(PqLogicalType::Map))
        .with_fields(vec![Arc::new(key_value)]);
    if let Some(id) = original.get_basic_info().id() {
        builder = builder.with_id(id);
    }
    Arc::new(builder.build().expect("rebuilding map group cannot fail"))
}
