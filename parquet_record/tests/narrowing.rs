mod support;

use parquet_record::config::{NamingStrategy, PersistConfig, ReaderPolicy};
use parquet_record::{FieldDescriptor, Record, TableReader, TableWriter, TypeDescriptor};

#[derive(Debug, Clone, PartialEq, Record)]
struct WideCount {
    value: i64,
}

#[derive(Debug, Clone, PartialEq, Record)]
struct NarrowCount {
    value: i32,
}

fn record_fields<T: Record>() -> Vec<FieldDescriptor> {
    match T::record_descriptor() {
        TypeDescriptor::Record { fields, .. } => fields,
        other => panic!("expected a Record descriptor, got {other:?}"),
    }
}

fn write_wide(dir: &str, values: &[i64]) -> anyhow::Result<()> {
    let config = PersistConfig::new(dir, "counts");
    let descriptor = WideCount::record_descriptor();
    let mut writer = TableWriter::new("counts", &descriptor, NamingStrategy::FieldName, &config)?;
    for &value in values {
        writer.append(&WideCount { value })?;
    }
    writer.flush()?;
    Ok(())
}

#[test]
fn narrowing_i64_into_i32_errors_when_disallowed() -> anyhow::Result<()> {
    let dir = support::tmp_folder("narrowing_strict");
    write_wide(&dir, &[1, 2, 3])?;

    let file = support::written_file(&dir, "counts");
    let fields = record_fields::<NarrowCount>();
    let strict = ReaderPolicy { fail_on_narrowing: true, ..ReaderPolicy::default() };
    let opened = TableReader::open(&file, &fields, &strict);
    assert!(opened.is_err(), "expected a narrowing-disallowed error, got Ok");
    Ok(())
}

#[test]
fn narrowing_i64_into_i32_succeeds_when_allowed() -> anyhow::Result<()> {
    let dir = support::tmp_folder("narrowing_lenient");
    write_wide(&dir, &[10, -20, 30])?;

    let file = support::written_file(&dir, "counts");
    let fields = record_fields::<NarrowCount>();
    let lenient = ReaderPolicy { fail_on_narrowing: false, ..ReaderPolicy::default() };
    let mut reader = TableReader::open(&file, &fields, &lenient)?;
    let read_back: Vec<NarrowCount> = reader.read_all()?;

    assert_eq!(
        read_back,
        vec![
            NarrowCount { value: 10 },
            NarrowCount { value: -20 },
            NarrowCount { value: 30 },
        ]
    );
    Ok(())
}

/// Narrowing i64 -> i32 truncates as a two's-complement wraparound, not a saturating or
/// checked cast: 0x1_0000_0001 keeps only its low 32 bits, which is 1.
#[test]
fn narrowing_i64_into_i32_keeps_the_low_32_bits_on_overflow() -> anyhow::Result<()> {
    let dir = support::tmp_folder("narrowing_wraparound");
    write_wide(&dir, &[0x1_0000_0001i64])?;

    let file = support::written_file(&dir, "counts");
    let fields = record_fields::<NarrowCount>();
    let lenient = ReaderPolicy { fail_on_narrowing: false, ..ReaderPolicy::default() };
    let mut reader = TableReader::open(&file, &fields, &lenient)?;
    let read_back: Vec<NarrowCount> = reader.read_all()?;

    assert_eq!(read_back, vec![NarrowCount { value: 1 }]);
    Ok(())
}
