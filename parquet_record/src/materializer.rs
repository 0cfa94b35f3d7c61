//! Record Materializer: reconstructs Rust values from the flat per-leaf-column
//! `(def_level, rep_level, value)` triples a row group physically stores (spec §4.4).
//!
//! Two passes, mirroring the `amadeus-parquet` `Reader`/`RepeatedReader`/`MapReader`
//! combinator style (`other_examples/900c79af_..._list.rs`) but restructured around a
//! schema-driven walk instead of trait-object combinators, since here one pass must cover
//! every shape a derived record can name:
//!
//! 1. [`reconstruct_records`] walks the *projected* `parquet::schema::types::Type` tree
//!    (file order) and turns each leaf's independent level stream into a generic [`Value`]
//!    tree — one [`Value::Record`] per row. This stage knows nothing about the target Rust
//!    type; a column's own repetition level is always enough to place it (spec §3.2: "a
//!    column's repetition level names the deepest repeated ancestor that just repeated").
//! 2. [`ParquetField::from_value`] then walks the *target* shape (declared-field order) and
//!    pulls the matching [`Value`] node out of the `Value::Record` map by name, via the
//!    [`crate::schema::FieldPlan`] the Schema Projector already worked out — this is where
//!    narrowing casts, decimal/enum/UUID decoding, and missing-column defaults happen.

use indexmap::IndexMap;
use parquet::basic::Repetition;
use parquet::schema::types::Type;

use crate::error::{PersistError, Result};
use crate::field::ParquetField;
use crate::schema::projector::{classify_list, classify_map};

/// Raw scalar decoded straight off a physical column reader, before any target-type
/// coercion. One variant per `ColumnReader` arm the assembler also handles.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafScalar {
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    /// `Arc`, not `Vec`: `reader.rs` interns identical dictionary-encoded byte strings
    /// within one row group so equal values share one allocation (spec §4.4).
    Bytes(std::sync::Arc<[u8]>),
}

/// Generic reconstruction of one row, independent of the eventual target Rust type.
/// `Record` preserves file field order via `IndexMap` so repeated projection of the same
/// file is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bytes(std::sync::Arc<[u8]>),
    List(Vec<Value>),
    MapEntries(Vec<(Value, Value)>),
    Record(IndexMap<String, Value>),
}

impl Value {
    pub fn as_record(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Record(m) => Some(m),
            _ => None,
        }
    }
}

/// One decoded column's worth of levels and present-values, as `reader.rs` produces per
/// leaf in the projected schema's own DFS order.
#[derive(Debug, Clone)]
pub struct LeafColumnData {
    pub def_levels: Vec<i16>,
    pub rep_levels: Vec<i16>,
    /// Only the non-null entries; a value is present iff its def level reaches this
    /// column's full depth (mirrors the assembler only pushing into its typed scratch
    /// vec when `Some`).
    pub values: Vec<LeafScalar>,
}

/// One step in a leaf's path from the record root, built once per projected schema and
/// reused across every row. `Field` is pure tree placement (no presence check); `Optional`
/// is a pure presence checkpoint (no placement) — every OPTIONAL node in the physical
/// schema, named field or not, gets exactly one of these regardless of depth. `ListEnter`/
/// `MapEnter` both consume a rep level and an unconditional "has >=1 occurrence" def
/// checkpoint, per the standard Dremel rule that a repeated node is its own checkpoint
/// independent of any optional wrapper around it (spec §3.2).
#[derive(Debug, Clone)]
enum Step {
    Field(String),
    Optional,
    ListEnter,
    MapEnter { is_key: bool },
}

#[derive(Debug, Clone)]
struct LeafPath {
    steps: Vec<Step>,
    max_def: i16,
}

fn build_paths(schema: &Type) -> Vec<LeafPath> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    walk_checked(schema, &mut prefix, &mut out);
    out
}

/// Pushes an `Optional` step (and bookkeeping) if `node` itself is independently nullable,
/// then delegates to [`walk_checked`]. "Independently" because a named record field already
/// gets its own nullability folded into the `Field` step's caller via this same function —
/// every recursive call site routes through here, so no node's optionality is ever checked
/// twice or skipped.
fn walk(node: &Type, prefix: &mut Vec<Step>, out: &mut Vec<LeafPath>) {
    if node.get_basic_info().repetition() == Repetition::OPTIONAL {
        prefix.push(Step::Optional);
        walk_checked(node, prefix, out);
        prefix.pop();
    } else {
        walk_checked(node, prefix, out);
    }
}

fn walk_checked(node: &Type, prefix: &mut Vec<Step>, out: &mut Vec<LeafPath>) {
    if let Some((element, _shape)) = classify_list(node) {
        prefix.push(Step::ListEnter);
        walk(&element, prefix, out);
        prefix.pop();
        return;
    }
    if let Some((key_node, value_node)) = classify_map(node) {
        prefix.push(Step::MapEnter { is_key: true });
        walk(&key_node, prefix, out);
        prefix.pop();
        prefix.push(Step::MapEnter { is_key: false });
        walk(&value_node, prefix, out);
        prefix.pop();
        return;
    }
    if node.is_group() {
        for child in node.get_fields() {
            prefix.push(Step::Field(child.name().to_string()));
            walk(child, prefix, out);
            prefix.pop();
        }
        return;
    }
    let max_def = prefix
        .iter()
        .filter(|s| matches!(s, Step::Optional | Step::ListEnter | Step::MapEnter { .. }))
        .count() as i16;
    out.push(LeafPath { steps: prefix.clone(), max_def });
}

type Entry = (i16, i16, Option<LeafScalar>);

fn leaf_entries(def_levels: &[i16], rep_levels: &[i16], values: &[LeafScalar], max_def: i16) -> Vec<Entry> {
    let mut cursor = 0usize;
    def_levels
        .iter()
        .zip(rep_levels.iter())
        .map(|(&def, &rep)| {
            let value = if def >= max_def {
                let v = values.get(cursor).cloned();
                cursor += 1;
                v
            } else {
                None
            };
            (def, rep, value)
        })
        .collect()
}

/// Splits a leaf's entries into groups at every boundary where `rep <= threshold` (and
/// always before the first entry) — the rule from spec §3.2/§4.4: an entry continues the
/// group open at this repeated level iff its repetition level is at or above the level
/// that would mark a new occurrence here; anything shallower closes it.
fn group_by_threshold(entries: &[Entry], threshold: i16) -> Vec<&[Entry]> {
    if entries.is_empty() {
        return Vec::new();
    }
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..entries.len() {
        if entries[i].1 <= threshold {
            groups.push(&entries[start..i]);
            start = i;
        }
    }
    groups.push(&entries[start..]);
    groups
}

fn scalar_to_value(scalar: LeafScalar) -> Value {
    match scalar {
        LeafScalar::Bool(b) => Value::Bool(b),
        LeafScalar::I32(v) => Value::I32(v),
        LeafScalar::I64(v) => Value::I64(v),
        LeafScalar::F32(v) => Value::F32(v),
        LeafScalar::F64(v) => Value::F64(v),
        LeafScalar::Bytes(v) => Value::Bytes(v),
    }
}

fn place(node: &mut Value, steps: &[Step], entries: &[Entry], def_threshold: i16, rep_threshold: i16) {
    match steps.first() {
        None => {
            let value = entries.first().and_then(|(_, _, v)| v.clone());
            *node = value.map(scalar_to_value).unwrap_or(Value::Null);
        }
        Some(Step::Field(name)) => {
            if !matches!(node, Value::Record(_)) {
                *node = Value::Record(IndexMap::new());
            }
            let Value::Record(map) = node else { unreachable!() };
            let slot = map.entry(name.clone()).or_insert(Value::Null);
            place(slot, &steps[1..], entries, def_threshold, rep_threshold);
        }
        Some(Step::Optional) => {
            let new_threshold = def_threshold + 1;
            let def = entries.first().map(|(d, _, _)| *d).unwrap_or(def_threshold);
            if def < new_threshold {
                *node = Value::Null;
            } else {
                place(node, &steps[1..], entries, new_threshold, rep_threshold);
            }
        }
        Some(Step::ListEnter) => {
            let new_def = def_threshold + 1;
            let new_rep = rep_threshold + 1;
            let empty = entries.first().map(|(d, _, _)| *d < new_def).unwrap_or(true);
            if empty {
                *node = Value::List(Vec::new());
                return;
            }
            let groups = group_by_threshold(entries, new_rep);
            let mut list = Vec::with_capacity(groups.len());
            for group in groups {
                let mut element = Value::Null;
                place(&mut element, &steps[1..], group, new_def, new_rep);
                list.push(element);
            }
            *node = Value::List(list);
        }
        Some(Step::MapEnter { is_key }) => {
            let new_def = def_threshold + 1;
            let new_rep = rep_threshold + 1;
            if !matches!(node, Value::MapEntries(_)) {
                *node = Value::MapEntries(Vec::new());
            }
            let empty = entries.first().map(|(d, _, _)| *d < new_def).unwrap_or(true);
            if empty {
                return;
            }
            let groups = group_by_threshold(entries, new_rep);
            let Value::MapEntries(pairs) = node else { unreachable!() };
            if pairs.len() < groups.len() {
                pairs.resize(groups.len(), (Value::Null, Value::Null));
            }
            for (i, group) in groups.into_iter().enumerate() {
                let slot = if *is_key { &mut pairs[i].0 } else { &mut pairs[i].1 };
                place(slot, &steps[1..], group, new_def, new_rep);
            }
        }
    }
}

/// Turns a full row group's worth of decoded leaf columns into one [`Value::Record`] per
/// row. `columns` must be in the same order as a DFS walk of `schema` (the order
/// `reader.rs` reads columns in, which is the order the Schema Projector built them in).
pub fn reconstruct_records(schema: &Type, columns: &[LeafColumnData]) -> Result<Vec<Value>> {
    let paths = build_paths(schema);
    if paths.len() != columns.len() {
        return Err(PersistError::MalformedLevels {
            path: schema.name().to_string(),
            reason: format!("schema has {} leaves but {} columns were decoded", paths.len(), columns.len()),
        });
    }

    let mut per_leaf_records: Vec<Vec<&[Entry]>> = Vec::with_capacity(paths.len());
    let mut owned_entries: Vec<Vec<Entry>> = Vec::with_capacity(paths.len());
    for (path, col) in paths.iter().zip(columns.iter()) {
        owned_entries.push(leaf_entries(&col.def_levels, &col.rep_levels, &col.values, path.max_def));
    }
    for entries in &owned_entries {
        per_leaf_records.push(group_by_threshold(entries, 0));
    }

    let num_rows = per_leaf_records.first().map(|g| g.len()).unwrap_or(0);
    for (i, groups) in per_leaf_records.iter().enumerate() {
        if groups.len() != num_rows {
            return Err(PersistError::MalformedLevels {
                path: schema.name().to_string(),
                reason: format!("leaf {i} produced {} rows, expected {num_rows}", groups.len()),
            });
        }
    }

    let mut rows = Vec::with_capacity(num_rows);
    for r in 0..num_rows {
        let mut row = Value::Record(IndexMap::new());
        for (leaf_idx, path) in paths.iter().enumerate() {
            place(&mut row, &path.steps, per_leaf_records[leaf_idx][r], 0, 0);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Reads a target field out of a reconstructed `Value::Record`, following spec §4.4's rule
/// for a missing column: if the Schema Projector never matched one (`matched_name: None`),
/// the field materializes as `T::default_for_absent()` without consulting `value` at all.
pub fn materialize_field<T: ParquetField>(record: &Value, field: &crate::schema::ProjectedField) -> Result<T> {
    let (Some(name), Some(plan)) = (&field.matched_name, &field.plan) else {
        return T::default_for_absent();
    };
    let found = record.as_record().and_then(|m| m.get(name)).unwrap_or(&Value::Null);
    T::from_value(found, plan)
}
