//! Table Reader: physically decodes column chunks for a projected schema, then drives
//! the Schema Projector and Record Materializer to rebuild whole records (spec §4.2-§4.4).
//!
//! The teacher only ever wrote a `TableWriter` (`record_persist::writer`); this mirrors its
//! shape for the read direction — open once, stream row groups — using the same
//! `SerializedFileReader`/`ColumnReader` combination `parquetinfo.rs`'s debug dumper drives.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use parquet::column::reader::ColumnReader;
use parquet::data_type::{ByteArray, FixedLenByteArray};
use parquet::file::reader::{FileReader, RowGroupReader, SerializedFileReader};
use parquet::schema::types::Type;
use tracing::debug;

use crate::config::ReaderPolicy;
use crate::descriptor::FieldDescriptor;
use crate::error::{PersistError, Result};
use crate::field::ParquetField;
use crate::materializer::{reconstruct_records, LeafColumnData, LeafScalar, Value};
use crate::schema::{project_record, FieldPlan, ProjectedField, ProjectedRecord};

const READ_BATCH: usize = 4096;

/// Dedups dictionary-encoded byte strings within one row group so equal values share one
/// allocation by reference (spec §4.4's dictionary pass-through); reset per row group since
/// a dictionary is itself scoped to its row group.
#[derive(Default)]
struct ByteInterner {
    seen: HashMap<Vec<u8>, Arc<[u8]>>,
}

impl ByteInterner {
    fn intern(&mut self, bytes: Vec<u8>) -> Arc<[u8]> {
        if let Some(existing) = self.seen.get(&bytes) {
            return existing.clone();
        }
        let arc: Arc<[u8]> = Arc::from(bytes.clone().into_boxed_slice());
        self.seen.insert(bytes, arc.clone());
        arc
    }
}

/// Dot-joined leaf paths of `t`, in file order, matching the format `ColumnPath::string()`
/// produces for the full file schema (root name excluded) — lets a projected schema's
/// leaves be located among the file's physical columns by name instead of re-deriving the
/// file's own leaf order a second time.
fn leaf_paths(t: &Type) -> Vec<String> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    walk(t, &mut prefix, &mut out);
    return out;

    fn walk(node: &Type, prefix: &mut Vec<String>, out: &mut Vec<String>) {
        if node.is_group() {
            for child in node.get_fields() {
                prefix.push(child.name().to_string());
                walk(child, prefix, out);
                prefix.pop();
            }
        } else {
            out.push(prefix.join("."));
        }
    }
}

/// Opens one Parquet file and projects it once against a target record's declared fields;
/// `read_all` then streams every row group through the Record Materializer.
pub struct TableReader {
    reader: SerializedFileReader<File>,
    file_column_index: Vec<usize>,
    projected_schema: Arc<Type>,
    fields: Vec<ProjectedField>,
}

impl TableReader {
    pub fn open(path: impl AsRef<Path>, target_fields: &[FieldDescriptor], policy: &ReaderPolicy) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let reader = SerializedFileReader::new(file)?;
        let file_schema = reader.metadata().file_metadata().schema_descr().root_schema().clone();
        let projected = project_record(&file_schema, target_fields, policy, "<root>")?;

        let file_paths: Vec<String> = reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .columns()
            .iter()
            .map(|col| col.path().string())
            .collect();
        let wanted_paths = leaf_paths(&projected.schema);
        let mut file_column_index = Vec::with_capacity(wanted_paths.len());
        for path in &wanted_paths {
            let idx = file_paths
                .iter()
                .position(|p| p == path)
                .ok_or_else(|| PersistError::Other(format!("projected column `{path}` has no matching physical column")))?;
            file_column_index.push(idx);
        }

        debug!(columns = wanted_paths.len(), "projected schema for read");
        Ok(TableReader {
            reader,
            file_column_index,
            projected_schema: projected.schema,
            fields: projected.fields,
        })
    }

    pub fn projected_schema(&self) -> &Type {
        &self.projected_schema
    }

    /// Reads every row group, materializing each row into `T` via `T::from_value` against
    /// a synthetic root `FieldPlan::Record` built from this reader's own projection.
    pub fn read_all<T: ParquetField>(&mut self) -> Result<Vec<T>> {
        let root_plan = FieldPlan::Record(ProjectedRecord {
            schema: self.projected_schema.clone(),
            fields: self.fields.clone(),
        });
        let mut out = Vec::new();
        for rg in 0..self.reader.num_row_groups() {
            for record in self.read_row_group(rg)? {
                out.push(T::from_value(&record, &root_plan)?);
            }
        }
        Ok(out)
    }

    fn read_row_group(&mut self, rg: usize) -> Result<Vec<Value>> {
        let row_group_reader = self.reader.get_row_group(rg)?;
        let mut columns = Vec::with_capacity(self.file_column_index.len());
        for &col_idx in &self.file_column_index {
            let column_reader = row_group_reader.get_column_reader(col_idx)?;
            columns.push(read_column(column_reader)?);
        }
        reconstruct_records(&self.projected_schema, &columns)
    }
}

macro_rules! drain_typed {
    ($cr:expr, $buf_ty:ty, $wrap:expr, $def_levels:expr, $rep_levels:expr, $values:expr) => {{
        loop {
            let mut def_buf = vec![0i16; READ_BATCH];
            let mut rep_buf = vec![0i16; READ_BATCH];
            let mut val_buf: Vec<$buf_ty> = vec![Default::default(); READ_BATCH];
            let (records_read, values_read, levels_read) = $cr.read_records(READ_BATCH, Some(&mut def_buf), Some(&mut rep_buf), &mut val_buf)?;
            if records_read == 0 && levels_read == 0 {
                break;
            }
            $def_levels.extend_from_slice(&def_buf[..levels_read]);
            $rep_levels.extend_from_slice(&rep_buf[..levels_read]);
            for v in val_buf.into_iter().take(values_read) {
                $values.push($wrap(v));
            }
        }
    }};
}

fn read_column(mut reader: ColumnReader) -> Result<LeafColumnData> {
    let mut interner = ByteInterner::default();
    let mut def_levels = Vec::new();
    let mut rep_levels = Vec::new();
    let mut values = Vec::new();

    match &mut reader {
        ColumnReader::BoolColumnReader(cr) => drain_typed!(cr, bool, LeafScalar::Bool, def_levels, rep_levels, values),
        ColumnReader::Int32ColumnReader(cr) => drain_typed!(cr, i32, LeafScalar::I32, def_levels, rep_levels, values),
        ColumnReader::Int64ColumnReader(cr) => drain_typed!(cr, i64, LeafScalar::I64, def_levels, rep_levels, values),
        ColumnReader::FloatColumnReader(cr) => drain_typed!(cr, f32, LeafScalar::F32, def_levels, rep_levels, values),
        ColumnReader::DoubleColumnReader(cr) => drain_typed!(cr, f64, LeafScalar::F64, def_levels, rep_levels, values),
        ColumnReader::ByteArrayColumnReader(cr) => {
            drain_typed!(cr, ByteArray, |v: ByteArray| LeafScalar::Bytes(interner.intern(v.data().to_vec())), def_levels, rep_levels, values)
        }
        ColumnReader::FixedLenByteArrayColumnReader(cr) => {
            drain_typed!(
                cr,
                FixedLenByteArray,
                |v: FixedLenByteArray| LeafScalar::Bytes(interner.intern(v.data().to_vec())),
                def_levels,
                rep_levels,
                values
            )
        }
        _ => return Err(PersistError::Other("unsupported column reader type".to_string())),
    }

    Ok(LeafColumnData { def_levels, rep_levels, values })
}
