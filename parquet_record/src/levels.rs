//! Repetition/definition level bookkeeping shared by the Record Assembler and Record
//! Materializer (spec §3.2).
//!
//! `max_def_level`/`max_rep_level` implement the Dremel formula from the spec literally:
//! "max-def-level = count of OPTIONAL ancestors + leaf optionality" and "max-rep-level =
//! count of REPEATED ancestors". Both walk the same [`TypeDescriptor`] the Schema Compiler
//! walks, so a field's levels here always agree with the column the compiler emitted for it.

use crate::descriptor::TypeDescriptor;

/// Number of OPTIONAL ancestors (inclusive of the leaf's own nullability) from the record
/// root down to `descriptor`, given whether `descriptor` itself sits behind a nullable
/// field slot (`field_nullable`, i.e. the not_null override or container nullability).
pub fn max_def_level(descriptor: &TypeDescriptor, field_nullable: bool) -> i16 {
    let here = i16::from(field_nullable);
    here + match descriptor {
        // A repeated node is its own checkpoint ("present with >=1 element" vs "present
        // with 0") independent of whether the list/map slot itself is also nullable.
        TypeDescriptor::List { element, .. } => 1 + max_def_level(element, element.nullable()),
        TypeDescriptor::Map { value, .. } => 1 + max_def_level(value, value.nullable()),
        _ => 0,
    }
}

/// Number of REPEATED ancestors from the record root down to `descriptor`.
pub fn max_rep_level(descriptor: &TypeDescriptor) -> i16 {
    match descriptor {
        TypeDescriptor::List { element, .. } => 1 + max_rep_level(element),
        TypeDescriptor::Map { value, .. } => 1 + max_rep_level(value),
        _ => 0,
    }
}

/// One flag per leaf column, in the same depth-first order [`ParquetField::append`] and
/// [`ParquetField::leaf_count`] visit them (record fields in declared order; a list visits
/// its element once, a map its key then its value) — `true` when that leaf sits under any
/// REPEATED ancestor and therefore needs its repetition levels written on flush.
pub fn leaf_repetition_flags(descriptor: &TypeDescriptor) -> Vec<bool> {
    let mut out = Vec::new();
    collect(descriptor, false, &mut out);
    return out;

    fn collect(descriptor: &TypeDescriptor, under_repetition: bool, out: &mut Vec<bool>) {
        match descriptor {
            TypeDescriptor::Record { fields, .. } => {
                for field in fields {
                    collect(&field.descriptor, under_repetition, out);
                }
            }
            TypeDescriptor::List { element, .. } => collect(element, true, out),
            TypeDescriptor::Map { key, value, .. } => {
                collect(key, true, out);
                collect(value, true, out);
            }
            _ => out.push(under_repetition),
        }
    }
}
