//! [`ParquetField`]: the write-side codegen glue every leaf and container type implements,
//! generalizing the teacher's `Persistable` trait (`describe`/`append`/`field_count`) to
//! emit full rep/def level triples instead of a flat not-null bitmap (spec §4.5).
//!
//! `#[derive(Record)]` generates one `ParquetField` impl per annotated struct, delegating
//! to each field's own impl exactly the way the teacher's derive macro calls
//! `Field::schema`/`Field::append` on every struct member.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use compact_str::CompactString;
use indexmap::IndexMap;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::assembler::RecordAssembler;
use crate::descriptor::{
    ListContainer, ListEncoding, LogicalBinaryKind, MapContainer, PrimitiveKind, Rounding, TemporalKind, TimeUnit, TypeDescriptor,
};
use crate::error::{PersistError, Result};
use crate::materializer::Value;
use crate::schema::FieldPlan;

/// A Rust type that can describe itself as a [`TypeDescriptor`], append its leaf values
/// into a [`RecordAssembler`] on write, and rebuild itself from a reconstructed [`Value`]
/// on read. `nullable` in `describe` reflects whether the *caller* (an enclosing `Option`,
/// list element, or map value) already wraps this value in optionality; most leaf impls
/// ignore it and report their own natural nullability (false).
pub trait ParquetField: Sized {
    fn describe(nullable: bool) -> TypeDescriptor;
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()>;
    fn leaf_count() -> usize;

    /// Rebuilds this value from the materializer's generic tree, given the plan the Schema
    /// Projector worked out for this position (spec §4.4). `value` is `Value::Null` both
    /// for a genuinely null column entry and for a `List`/`Map` that never recursed into
    /// this leaf at all; either way a non-`Option` target substitutes its natural default.
    fn from_value(value: &Value, plan: &FieldPlan) -> Result<Self>;

    /// Substitutes a value for a target field the Schema Projector never matched to a file
    /// column (`fail_on_missing_column` false). No generic default makes sense here — every
    /// leaf/container impl below overrides it; `Option<T>` picks `None`.
    fn default_for_absent() -> Result<Self> {
        Err(PersistError::Other("no default available for a missing column of this type".to_string()))
    }
}

fn leaf_plan_mismatch(expected: &str) -> PersistError {
    PersistError::Other(format!("materializer: expected a {expected} leaf plan"))
}

/// Pulls a primitive value out of whichever numeric `Value` variant the file's physical
/// type decoded into; `Value::Null` (missing/absent) falls back to this type's zero, the
/// same default a narrowing read with `fail_on_null_for_primitive = false` would want.
fn numeric_from_value<T: Default + 'static>(value: &Value, cast: impl Fn(f64) -> T, cast_i: impl Fn(i64) -> T) -> T {
    match value {
        Value::I32(v) => cast_i(*v as i64),
        Value::I64(v) => cast_i(*v),
        Value::F32(v) => cast(*v as f64),
        Value::F64(v) => cast(*v),
        _ => T::default(),
    }
}

macro_rules! impl_primitive {
    ($ty:ty, $kind:expr, $push:ident as $cast:ty) => {
        impl ParquetField for $ty {
            fn describe(nullable: bool) -> TypeDescriptor {
                TypeDescriptor::Primitive { kind: $kind, nullable }
            }
            fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
                asm.$push(def_level, rep_level, Some(*self as $cast));
                Ok(())
            }
            fn leaf_count() -> usize {
                1
            }
            fn from_value(value: &Value, _plan: &FieldPlan) -> Result<Self> {
                Ok(numeric_from_value(value, |f| f as $ty, |i| i as $ty))
            }
            fn default_for_absent() -> Result<Self> {
                Ok(<$ty>::default())
            }
        }
    };
    ($ty:ty, $kind:expr, $push:ident) => {
        impl_primitive!($ty, $kind, $push as $ty);
    };
}

impl ParquetField for bool {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Primitive { kind: PrimitiveKind::Bool, nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        asm.push_bool(def_level, rep_level, Some(*self));
        Ok(())
    }
    fn leaf_count() -> usize {
        1
    }
    fn from_value(value: &Value, _plan: &FieldPlan) -> Result<Self> {
        Ok(matches!(value, Value::Bool(true)))
    }
    fn default_for_absent() -> Result<Self> {
        Ok(false)
    }
}

impl_primitive!(i8, PrimitiveKind::I8, push_i32 as i32);
impl_primitive!(i16, PrimitiveKind::I16, push_i32 as i32);
impl_primitive!(i32, PrimitiveKind::I32, push_i32);
impl_primitive!(i64, PrimitiveKind::I64, push_i64);
impl_primitive!(u8, PrimitiveKind::I16, push_i32 as i32);
impl_primitive!(u16, PrimitiveKind::I32, push_i32 as i32);
impl_primitive!(u32, PrimitiveKind::I64, push_i64 as i64);
impl_primitive!(f32, PrimitiveKind::F32, push_f32);
impl_primitive!(f64, PrimitiveKind::F64, push_f64);

/// A `String`/`Enum`/UUID-as-string target can be fed by either a file `StringOrEnum`
/// column or (per spec §4.3) a file `Uuid` column rendered in its canonical textual form.
fn string_from_value(value: &Value) -> String {
    match value {
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => s.to_string(),
            Err(_) if b.len() == 16 => crate::schema::uuid_bytes_to_string(&<[u8; 16]>::try_from(b.as_ref()).expect("checked len 16")),
            Err(_) => String::from_utf8_lossy(b).into_owned(),
        },
        _ => String::new(),
    }
}

impl ParquetField for String {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::LogicalBinary { kind: LogicalBinaryKind::String, nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        asm.push_bytes(def_level, rep_level, Some(self.as_bytes()));
        Ok(())
    }
    fn leaf_count() -> usize {
        1
    }
    fn from_value(value: &Value, _plan: &FieldPlan) -> Result<Self> {
        Ok(string_from_value(value))
    }
    fn default_for_absent() -> Result<Self> {
        Ok(String::new())
    }
}

impl ParquetField for CompactString {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::LogicalBinary { kind: LogicalBinaryKind::String, nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        asm.push_bytes(def_level, rep_level, Some(self.as_bytes()));
        Ok(())
    }
    fn leaf_count() -> usize {
        1
    }
    fn from_value(value: &Value, _plan: &FieldPlan) -> Result<Self> {
        Ok(CompactString::from(string_from_value(value)))
    }
    fn default_for_absent() -> Result<Self> {
        Ok(CompactString::default())
    }
}

impl ParquetField for Uuid {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::LogicalBinary { kind: LogicalBinaryKind::Uuid, nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        asm.push_bytes(def_level, rep_level, Some(self.as_bytes().as_slice()));
        Ok(())
    }
    fn leaf_count() -> usize {
        1
    }
    fn from_value(value: &Value, _plan: &FieldPlan) -> Result<Self> {
        Ok(match value {
            Value::Bytes(b) if b.len() == 16 => Uuid::from_slice(b).unwrap_or(Uuid::nil()),
            Value::Bytes(b) => std::str::from_utf8(b).ok().and_then(|s| Uuid::parse_str(s).ok()).unwrap_or(Uuid::nil()),
            _ => Uuid::nil(),
        })
    }
    fn default_for_absent() -> Result<Self> {
        Ok(Uuid::nil())
    }
}

/// Default precision/scale a bare `rust_decimal::Decimal` field compiles to when the
/// derive macro isn't told otherwise via `#[parquet(decimal(p, s))]`; 18 digits fits in
/// INT64 (spec §4.1's decimal-physical-type table) and covers every `rust_decimal` value
/// at microsecond-money precision.
const DEFAULT_DECIMAL_PRECISION: u8 = 18;
const DEFAULT_DECIMAL_SCALE: u8 = 6;

/// Rescales `value` to exactly `scale` fractional digits under `rounding` (spec §4.5) and
/// returns the resulting unscaled integer. `round_dp_with_strategy` always returns a
/// `Decimal` whose own scale is `scale` (padding with zeros when `value` had fewer digits),
/// so its mantissa already is the unscaled integer this leaf writes.
fn decimal_unscaled(value: Decimal, scale: u32, rounding: Rounding) -> Result<i64> {
    let rescaled = match rounding {
        Rounding::HalfUp => value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero),
        Rounding::HalfEven => value.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven),
        Rounding::Unnecessary => {
            let truncated = value.round_dp_with_strategy(scale, RoundingStrategy::ToZero);
            if truncated != value {
                return Err(PersistError::InexactRescale {
                    path: "decimal".to_string(),
                    value: value.to_string(),
                    from_scale: value.scale(),
                    to_scale: scale,
                });
            }
            truncated
        }
    };
    Ok(rescaled.mantissa() as i64)
}

impl ParquetField for Decimal {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Decimal {
            precision: DEFAULT_DECIMAL_PRECISION,
            scale: DEFAULT_DECIMAL_SCALE,
            rounding: Rounding::HalfEven,
            nullable,
        }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        let unscaled = decimal_unscaled(*self, DEFAULT_DECIMAL_SCALE as u32, Rounding::HalfEven)?;
        asm.push_i64(def_level, rep_level, Some(unscaled));
        Ok(())
    }
    fn leaf_count() -> usize {
        1
    }
    /// No rescale on read (spec §4.4, Open Question resolved in DESIGN.md): the unscaled
    /// integer is reinterpreted at the *file's* scale, not `DEFAULT_DECIMAL_SCALE`.
    fn from_value(value: &Value, plan: &FieldPlan) -> Result<Self> {
        let FieldPlan::Decimal { file_scale, .. } = plan else { return Err(leaf_plan_mismatch("Decimal")) };
        let unscaled = match value {
            Value::I32(v) => *v as i64,
            Value::I64(v) => *v,
            _ => return Ok(Decimal::ZERO),
        };
        Ok(Decimal::new(unscaled, (*file_scale).max(0) as u32))
    }
    fn default_for_absent() -> Result<Self> {
        Ok(Decimal::ZERO)
    }
}

/// `Decimal` wrapper selecting round-half-up (away from zero at the midpoint) rescaling on
/// write instead of the bare `Decimal` impl's round-half-to-even (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecimalHalfUp(pub Decimal);

impl ParquetField for DecimalHalfUp {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Decimal {
            precision: DEFAULT_DECIMAL_PRECISION,
            scale: DEFAULT_DECIMAL_SCALE,
            rounding: Rounding::HalfUp,
            nullable,
        }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        let unscaled = decimal_unscaled(self.0, DEFAULT_DECIMAL_SCALE as u32, Rounding::HalfUp)?;
        asm.push_i64(def_level, rep_level, Some(unscaled));
        Ok(())
    }
    fn leaf_count() -> usize {
        1
    }
    fn from_value(value: &Value, plan: &FieldPlan) -> Result<Self> {
        Decimal::from_value(value, plan).map(DecimalHalfUp)
    }
    fn default_for_absent() -> Result<Self> {
        Ok(DecimalHalfUp(Decimal::ZERO))
    }
}

/// `Decimal` wrapper that raises [`PersistError::InexactRescale`] instead of rounding when
/// the value carries more fractional digits than the descriptor's scale (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecimalUnnecessary(pub Decimal);

impl ParquetField for DecimalUnnecessary {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Decimal {
            precision: DEFAULT_DECIMAL_PRECISION,
            scale: DEFAULT_DECIMAL_SCALE,
            rounding: Rounding::Unnecessary,
            nullable,
        }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        let unscaled = decimal_unscaled(self.0, DEFAULT_DECIMAL_SCALE as u32, Rounding::Unnecessary)?;
        asm.push_i64(def_level, rep_level, Some(unscaled));
        Ok(())
    }
    fn leaf_count() -> usize {
        1
    }
    fn from_value(value: &Value, plan: &FieldPlan) -> Result<Self> {
        Decimal::from_value(value, plan).map(DecimalUnnecessary)
    }
    fn default_for_absent() -> Result<Self> {
        Ok(DecimalUnnecessary(Decimal::ZERO))
    }
}

impl ParquetField for NaiveDate {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Temporal { kind: TemporalKind::Date, nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date");
        asm.push_i32(def_level, rep_level, Some((*self - epoch).num_days() as i32));
        Ok(())
    }
    fn leaf_count() -> usize {
        1
    }
    fn from_value(value: &Value, _plan: &FieldPlan) -> Result<Self> {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date");
        let days = match value {
            Value::I32(v) => *v,
            Value::I64(v) => *v as i32,
            _ => 0,
        };
        Ok(epoch + chrono::Duration::days(days as i64))
    }
    fn default_for_absent() -> Result<Self> {
        Ok(NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date"))
    }
}

impl ParquetField for NaiveTime {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Temporal { kind: TemporalKind::Time(TimeUnit::Us), nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).expect("valid midnight");
        asm.push_i64(def_level, rep_level, Some((*self - midnight).num_microseconds().unwrap_or_default()));
        Ok(())
    }
    fn leaf_count() -> usize {
        1
    }
    fn from_value(value: &Value, _plan: &FieldPlan) -> Result<Self> {
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).expect("valid midnight");
        let micros = match value {
            Value::I32(v) => *v as i64,
            Value::I64(v) => *v,
            _ => 0,
        };
        Ok(midnight + chrono::Duration::microseconds(micros))
    }
    fn default_for_absent() -> Result<Self> {
        Ok(NaiveTime::from_hms_opt(0, 0, 0).expect("valid midnight"))
    }
}

impl ParquetField for NaiveDateTime {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Temporal { kind: TemporalKind::LocalDateTime(TimeUnit::Us), nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        asm.push_i64(def_level, rep_level, Some(self.and_utc().timestamp_micros()));
        Ok(())
    }
    fn leaf_count() -> usize {
        1
    }
    fn from_value(value: &Value, _plan: &FieldPlan) -> Result<Self> {
        let micros = match value {
            Value::I64(v) => *v,
            Value::I32(v) => *v as i64,
            _ => 0,
        };
        let at_epoch = || DateTime::from_timestamp_micros(0).expect("epoch timestamp is representable");
        Ok(DateTime::from_timestamp_micros(micros).unwrap_or_else(at_epoch).naive_utc())
    }
    fn default_for_absent() -> Result<Self> {
        Ok(NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date").and_hms_opt(0, 0, 0).expect("valid midnight"))
    }
}

impl ParquetField for DateTime<Utc> {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Temporal { kind: TemporalKind::Instant(TimeUnit::Us), nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        asm.push_i64(def_level, rep_level, Some(self.timestamp_micros()));
        Ok(())
    }
    fn leaf_count() -> usize {
        1
    }
    fn from_value(value: &Value, _plan: &FieldPlan) -> Result<Self> {
        let micros = match value {
            Value::I64(v) => *v,
            Value::I32(v) => *v as i64,
            _ => 0,
        };
        let at_epoch = || DateTime::from_timestamp_micros(0).expect("epoch timestamp is representable");
        Ok(DateTime::from_timestamp_micros(micros).unwrap_or_else(at_epoch))
    }
    fn default_for_absent() -> Result<Self> {
        Ok(DateTime::from_timestamp_micros(0).expect("epoch timestamp is representable"))
    }
}

impl<T: ParquetField> ParquetField for Option<T> {
    fn describe(_nullable: bool) -> TypeDescriptor {
        let mut inner = T::describe(true);
        set_nullable(&mut inner, true);
        inner
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        match self {
            Some(value) => T::append(value, asm, def_level + 1, rep_level),
            None => {
                asm.push_absent(T::leaf_count(), def_level, rep_level);
                Ok(())
            }
        }
    }
    fn leaf_count() -> usize {
        T::leaf_count()
    }
    /// The materializer's [`crate::materializer::place`] already resolved this field's own
    /// `Optional` step before recursing here, so `Value::Null` at this point always means a
    /// genuine absence, never "not yet checked".
    fn from_value(value: &Value, plan: &FieldPlan) -> Result<Self> {
        if matches!(value, Value::Null) {
            Ok(None)
        } else {
            Ok(Some(T::from_value(value, plan)?))
        }
    }
    fn default_for_absent() -> Result<Self> {
        Ok(None)
    }
}

fn set_nullable(descriptor: &mut TypeDescriptor, value: bool) {
    match descriptor {
        TypeDescriptor::Primitive { nullable, .. }
        | TypeDescriptor::LogicalBinary { nullable, .. }
        | TypeDescriptor::Decimal { nullable, .. }
        | TypeDescriptor::Temporal { nullable, .. }
        | TypeDescriptor::List { nullable, .. }
        | TypeDescriptor::Map { nullable, .. }
        | TypeDescriptor::Record { nullable, .. } => *nullable = value,
        TypeDescriptor::Unresolved => {}
    }
}

/// Appends a sequence of already-present elements as a REPEATED group: the first element
/// keeps the ambient `rep_level`, later ones step it to `rep_level + 1` (spec §3.2's rule
/// that a column's repetition level names the deepest repeated ancestor that just repeated).
fn append_sequence<T: ParquetField>(items: impl Iterator<Item = impl std::ops::Deref<Target = T>>, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
    // A repeated node is itself a definition-level checkpoint distinct from any optional
    // wrapper around it: "present with >=1 element" vs "present with 0 elements" needs its
    // own bit even for a non-nullable Vec<T>, so populated elements start one def level
    // above the level at which an empty list would be recorded.
    let occupied_def = def_level + 1;
    let mut any = false;
    for (i, item) in items.enumerate() {
        any = true;
        let rep = if i == 0 { rep_level } else { rep_level + 1 };
        T::append(&item, asm, occupied_def, rep)?;
    }
    if !any {
        asm.push_absent(T::leaf_count(), def_level, rep_level);
    }
    Ok(())
}

/// Shared by every `List`-shaped container's `from_value`: unwraps the element plan,
/// requires the reconstructed node to actually be a `Value::List` (a missing/absent list
/// already short-circuited to `Value::List(vec![])` in `place`, never bare `Value::Null`
/// reaching here), and materializes each element.
fn list_elements_from_value<T: ParquetField>(value: &Value, plan: &FieldPlan) -> Result<Vec<T>> {
    let FieldPlan::List { element, .. } = plan else { return Err(leaf_plan_mismatch("List")) };
    match value {
        Value::List(items) => items.iter().map(|item| T::from_value(item, element)).collect(),
        _ => Ok(Vec::new()),
    }
}

impl<T: ParquetField> ParquetField for Vec<T> {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::List { element: Box::new(T::describe(false)), encoding: ListEncoding::default(), container: ListContainer::OrderedSequence, nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        append_sequence::<T>(self.iter(), asm, def_level, rep_level)
    }
    fn leaf_count() -> usize {
        T::leaf_count()
    }
    fn from_value(value: &Value, plan: &FieldPlan) -> Result<Self> {
        list_elements_from_value(value, plan)
    }
    fn default_for_absent() -> Result<Self> {
        Ok(Vec::new())
    }
}

impl<T: ParquetField + std::hash::Hash + Eq> ParquetField for HashSet<T> {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::List { element: Box::new(T::describe(false)), encoding: ListEncoding::default(), container: ListContainer::UnorderedSet, nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        append_sequence::<T>(self.iter(), asm, def_level, rep_level)
    }
    fn leaf_count() -> usize {
        T::leaf_count()
    }
    fn from_value(value: &Value, plan: &FieldPlan) -> Result<Self> {
        Ok(list_elements_from_value::<T>(value, plan)?.into_iter().collect())
    }
    fn default_for_absent() -> Result<Self> {
        Ok(HashSet::new())
    }
}

impl<T: ParquetField + Ord> ParquetField for BTreeSet<T> {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::List {
            element: Box::new(T::describe(false)),
            encoding: ListEncoding::default(),
            container: ListContainer::Specific("BTreeSet".to_string()),
            nullable,
        }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        append_sequence::<T>(self.iter(), asm, def_level, rep_level)
    }
    fn leaf_count() -> usize {
        T::leaf_count()
    }
    fn from_value(value: &Value, plan: &FieldPlan) -> Result<Self> {
        Ok(list_elements_from_value::<T>(value, plan)?.into_iter().collect())
    }
    fn default_for_absent() -> Result<Self> {
        Ok(BTreeSet::new())
    }
}

fn append_pairs<K: ParquetField, V: ParquetField>(
    pairs: impl ExactSizeIterator<Item = (impl std::ops::Deref<Target = K>, impl std::ops::Deref<Target = V>)>,
    asm: &mut RecordAssembler,
    def_level: i16,
    rep_level: i16,
) -> Result<()> {
    if pairs.len() == 0 {
        asm.push_absent(K::leaf_count() + V::leaf_count(), def_level, rep_level);
        return Ok(());
    }
    let occupied_def = def_level + 1;
    for (i, (key, value)) in pairs.enumerate() {
        let rep = if i == 0 { rep_level } else { rep_level + 1 };
        K::append(&key, asm, occupied_def, rep)?;
        V::append(&value, asm, occupied_def, rep)?;
    }
    Ok(())
}

/// Shared by every `Map`-shaped container's `from_value`: a missing/absent map already
/// short-circuited to `Value::MapEntries(vec![])` in `place`.
fn map_pairs_from_value<K: ParquetField, V: ParquetField>(value: &Value, plan: &FieldPlan) -> Result<Vec<(K, V)>> {
    let FieldPlan::Map { key, value: value_plan, .. } = plan else { return Err(leaf_plan_mismatch("Map")) };
    match value {
        Value::MapEntries(pairs) => pairs.iter().map(|(k, v)| Ok((K::from_value(k, key)?, V::from_value(v, value_plan)?))).collect(),
        _ => Ok(Vec::new()),
    }
}

impl<K: ParquetField + std::hash::Hash + Eq, V: ParquetField> ParquetField for HashMap<K, V> {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Map { key: Box::new(K::describe(false)), value: Box::new(V::describe(false)), container: MapContainer::Hash, nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        append_pairs::<K, V>(self.iter(), asm, def_level, rep_level)
    }
    fn leaf_count() -> usize {
        K::leaf_count() + V::leaf_count()
    }
    fn from_value(value: &Value, plan: &FieldPlan) -> Result<Self> {
        Ok(map_pairs_from_value::<K, V>(value, plan)?.into_iter().collect())
    }
    fn default_for_absent() -> Result<Self> {
        Ok(HashMap::new())
    }
}

impl<K: ParquetField + std::hash::Hash + Eq, V: ParquetField> ParquetField for IndexMap<K, V> {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Map { key: Box::new(K::describe(false)), value: Box::new(V::describe(false)), container: MapContainer::LinkedHash, nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        append_pairs::<K, V>(self.iter(), asm, def_level, rep_level)
    }
    fn leaf_count() -> usize {
        K::leaf_count() + V::leaf_count()
    }
    fn from_value(value: &Value, plan: &FieldPlan) -> Result<Self> {
        Ok(map_pairs_from_value::<K, V>(value, plan)?.into_iter().collect())
    }
    fn default_for_absent() -> Result<Self> {
        Ok(IndexMap::new())
    }
}

impl<K: ParquetField + Ord, V: ParquetField> ParquetField for BTreeMap<K, V> {
    fn describe(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Map { key: Box::new(K::describe(false)), value: Box::new(V::describe(false)), container: MapContainer::Tree, nullable }
    }
    fn append(&self, asm: &mut RecordAssembler, def_level: i16, rep_level: i16) -> Result<()> {
        append_pairs::<K, V>(self.iter(), asm, def_level, rep_level)
    }
    fn leaf_count() -> usize {
        K::leaf_count() + V::leaf_count()
    }
    fn from_value(value: &Value, plan: &FieldPlan) -> Result<Self> {
        Ok(map_pairs_from_value::<K, V>(value, plan)?.into_iter().collect())
    }
    fn default_for_absent() -> Result<Self> {
        Ok(BTreeMap::new())
    }
}
