mod support;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use rust_decimal::Decimal;

use parquet_record::assembler::RecordAssembler;
use parquet_record::config::{NamingStrategy, PersistConfig, ReaderPolicy};
use parquet_record::descriptor::{FieldDescriptor, Rounding, TypeDescriptor};
use parquet_record::field::{DecimalHalfUp, DecimalUnnecessary};
use parquet_record::levels::leaf_repetition_flags;
use parquet_record::schema::compile_message_type;
use parquet_record::{PersistError, Record, TableReader, TableWriter};

/// A file decimal column scaled at 2, distinct from the crate-wide default scale (6) a
/// `#[derive(Record)]` struct's own `Decimal` field compiles to — exercises the "no
/// rescale on read" behavior, which must reinterpret at *this* file's scale instead.
#[derive(Debug, Clone, PartialEq, Record)]
struct Trade {
    price: rust_decimal::Decimal,
}

fn write_decimal_file(path: &std::path::Path, unscaled_values: &[i64]) -> anyhow::Result<()> {
    let descriptor = TypeDescriptor::Record {
        name: "Trade".to_string(),
        fields: vec![FieldDescriptor::new(
            "price",
            TypeDescriptor::Decimal { precision: 10, scale: 2, rounding: Rounding::HalfEven, nullable: false },
        )],
        nullable: false,
    };
    let schema = compile_message_type(&descriptor, "schema", parquet_record::config::NamingStrategy::FieldName)?;
    let mut assembler = RecordAssembler::new(leaf_repetition_flags(&descriptor));

    for &value in unscaled_values {
        assembler.begin_record();
        assembler.push_i64(0, 0, Some(value));
        assembler.end_record()?;
    }

    let props = Arc::new(WriterProperties::builder().build());
    let mut writer = SerializedFileWriter::new(File::create(path)?, schema, props)?;
    assembler.record(&mut writer)?;
    writer.close()?;
    Ok(())
}

#[test]
fn decimal_read_reinterprets_at_the_files_own_scale() -> anyhow::Result<()> {
    let dir = support::tmp_folder("decimal_no_rescale");
    let path = PathBuf::from(&dir).join("trades.parquet");
    std::fs::create_dir_all(&dir)?;

    // 12345 at scale 2 is 123.45, not 0.012345 (the crate's default scale of 6 would imply).
    write_decimal_file(&path, &[12345, -500])?;

    let fields = match Trade::record_descriptor() {
        TypeDescriptor::Record { fields, .. } => fields,
        other => panic!("expected a Record descriptor, got {other:?}"),
    };
    let mut reader = TableReader::open(&path, &fields, &ReaderPolicy::default())?;
    let read_back: Vec<Trade> = reader.read_all()?;

    assert_eq!(
        read_back,
        vec![
            Trade { price: rust_decimal::Decimal::new(12345, 2) },
            Trade { price: rust_decimal::Decimal::new(-500, 2) },
        ]
    );
    Ok(())
}

/// A value sitting exactly on the rounding midpoint at the default scale (6): the 7th
/// fractional digit is 5, so half-even and half-up disagree (the preceding digit, 6, is
/// already even).
#[derive(Debug, Clone, PartialEq, Record)]
struct HalfEvenRow {
    amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Record)]
struct HalfUpRow {
    amount: DecimalHalfUp,
}

#[derive(Debug, Clone, PartialEq, Record)]
struct UnnecessaryRow {
    amount: DecimalUnnecessary,
}

#[test]
fn half_even_rounds_a_midpoint_toward_the_even_neighbour() -> anyhow::Result<()> {
    let dir = support::tmp_folder("decimal_half_even");
    let config = PersistConfig::new(&dir, "rows");
    let descriptor = HalfEvenRow::record_descriptor();
    let mut writer = TableWriter::new("rows", &descriptor, NamingStrategy::FieldName, &config)?;
    writer.append(&HalfEvenRow { amount: Decimal::new(1234565, 7) })?;
    writer.append(&HalfEvenRow { amount: Decimal::new(-1234565, 7) })?;
    writer.flush()?;

    let file = support::written_file(&dir, "rows");
    let fields = match HalfEvenRow::record_descriptor() {
        TypeDescriptor::Record { fields, .. } => fields,
        other => panic!("expected a Record descriptor, got {other:?}"),
    };
    let mut reader = TableReader::open(&file, &fields, &ReaderPolicy::default())?;
    let read_back: Vec<HalfEvenRow> = reader.read_all()?;

    assert_eq!(
        read_back,
        vec![
            HalfEvenRow { amount: Decimal::new(123456, 6) },
            HalfEvenRow { amount: Decimal::new(-123456, 6) },
        ]
    );
    Ok(())
}

#[test]
fn half_up_rounds_a_midpoint_away_from_zero() -> anyhow::Result<()> {
    let dir = support::tmp_folder("decimal_half_up");
    let config = PersistConfig::new(&dir, "rows");
    let descriptor = HalfUpRow::record_descriptor();
    let mut writer = TableWriter::new("rows", &descriptor, NamingStrategy::FieldName, &config)?;
    writer.append(&HalfUpRow { amount: DecimalHalfUp(Decimal::new(1234565, 7)) })?;
    writer.append(&HalfUpRow { amount: DecimalHalfUp(Decimal::new(-1234565, 7)) })?;
    writer.flush()?;

    let file = support::written_file(&dir, "rows");
    let fields = match HalfUpRow::record_descriptor() {
        TypeDescriptor::Record { fields, .. } => fields,
        other => panic!("expected a Record descriptor, got {other:?}"),
    };
    let mut reader = TableReader::open(&file, &fields, &ReaderPolicy::default())?;
    let read_back: Vec<HalfUpRow> = reader.read_all()?;

    assert_eq!(
        read_back,
        vec![
            HalfUpRow { amount: DecimalHalfUp(Decimal::new(123457, 6)) },
            HalfUpRow { amount: DecimalHalfUp(Decimal::new(-123457, 6)) },
        ]
    );
    Ok(())
}

#[test]
fn unnecessary_accepts_a_value_that_already_fits_the_scale() -> anyhow::Result<()> {
    let dir = support::tmp_folder("decimal_unnecessary_exact");
    let config = PersistConfig::new(&dir, "rows");
    let descriptor = UnnecessaryRow::record_descriptor();
    let mut writer = TableWriter::new("rows", &descriptor, NamingStrategy::FieldName, &config)?;
    writer.append(&UnnecessaryRow { amount: DecimalUnnecessary(Decimal::new(123456, 6)) })?;
    writer.flush()?;

    let file = support::written_file(&dir, "rows");
    let fields = match UnnecessaryRow::record_descriptor() {
        TypeDescriptor::Record { fields, .. } => fields,
        other => panic!("expected a Record descriptor, got {other:?}"),
    };
    let mut reader = TableReader::open(&file, &fields, &ReaderPolicy::default())?;
    let read_back: Vec<UnnecessaryRow> = reader.read_all()?;

    assert_eq!(read_back, vec![UnnecessaryRow { amount: DecimalUnnecessary(Decimal::new(123456, 6)) }]);
    Ok(())
}

#[test]
fn unnecessary_rejects_a_value_that_would_lose_precision() -> anyhow::Result<()> {
    let dir = support::tmp_folder("decimal_unnecessary_lossy");
    let config = PersistConfig::new(&dir, "rows");
    let descriptor = UnnecessaryRow::record_descriptor();
    let mut writer = TableWriter::new("rows", &descriptor, NamingStrategy::FieldName, &config)?;

    let err = writer
        .append(&UnnecessaryRow { amount: DecimalUnnecessary(Decimal::new(1234561, 7)) })
        .expect_err("expected an InexactRescale error");
    assert!(matches!(err, PersistError::InexactRescale { .. }), "unexpected error: {err:?}");
    Ok(())
}
