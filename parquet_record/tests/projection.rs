mod support;

use parquet_record::config::{NamingStrategy, PersistConfig, ReaderPolicy};
use parquet_record::{FieldDescriptor, Record, TableReader, TableWriter, TypeDescriptor};

#[derive(Debug, Clone, PartialEq, Record)]
struct WideEvent {
    id: i32,
    name: String,
    extra: f64,
}

#[derive(Debug, Clone, PartialEq, Record)]
struct NarrowEvent {
    id: i32,
    name: String,
}

fn record_fields<T: Record>() -> Vec<FieldDescriptor> {
    match T::record_descriptor() {
        TypeDescriptor::Record { fields, .. } => fields,
        other => panic!("expected a Record descriptor, got {other:?}"),
    }
}

#[test]
fn narrower_target_ignores_extra_columns() -> anyhow::Result<()> {
    let dir = support::tmp_folder("projection_subset");
    let config = PersistConfig::new(&dir, "events");
    let descriptor = WideEvent::record_descriptor();
    let mut writer = TableWriter::new("events", &descriptor, NamingStrategy::FieldName, &config)?;

    writer.append(&WideEvent { id: 1, name: "first".to_string(), extra: 3.5 })?;
    writer.append(&WideEvent { id: 2, name: "second".to_string(), extra: 7.0 })?;
    writer.flush()?;

    let file = support::written_file(&dir, "events");
    let fields = record_fields::<NarrowEvent>();
    let mut reader = TableReader::open(&file, &fields, &ReaderPolicy::default())?;
    let read_back: Vec<NarrowEvent> = reader.read_all()?;

    assert_eq!(
        read_back,
        vec![
            NarrowEvent { id: 1, name: "first".to_string() },
            NarrowEvent { id: 2, name: "second".to_string() },
        ]
    );
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Record)]
struct SourceRow {
    amount: i64,
}

#[derive(Debug, Clone, PartialEq, Record)]
struct RenamedRow {
    #[parquet(alias = "amount")]
    quantity: i64,
}

#[test]
fn alias_matches_a_differently_named_source_column() -> anyhow::Result<()> {
    let dir = support::tmp_folder("projection_alias");
    let config = PersistConfig::new(&dir, "rows");
    let descriptor = SourceRow::record_descriptor();
    let mut writer = TableWriter::new("rows", &descriptor, NamingStrategy::FieldName, &config)?;

    writer.append(&SourceRow { amount: 42 })?;
    writer.flush()?;

    let file = support::written_file(&dir, "rows");
    let fields = record_fields::<RenamedRow>();
    let mut reader = TableReader::open(&file, &fields, &ReaderPolicy::default())?;
    let read_back: Vec<RenamedRow> = reader.read_all()?;

    assert_eq!(read_back, vec![RenamedRow { quantity: 42 }]);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Record)]
struct MinimalRow {
    id: i32,
}

#[derive(Debug, Clone, PartialEq, Record)]
struct ExpandedRow {
    id: i32,
    missing: i32,
}

#[test]
fn missing_column_errors_when_policy_requires_it() -> anyhow::Result<()> {
    let dir = support::tmp_folder("projection_missing_strict");
    let config = PersistConfig::new(&dir, "rows");
    let descriptor = MinimalRow::record_descriptor();
    let mut writer = TableWriter::new("rows", &descriptor, NamingStrategy::FieldName, &config)?;
    writer.append(&MinimalRow { id: 1 })?;
    writer.flush()?;

    let file = support::written_file(&dir, "rows");
    let fields = record_fields::<ExpandedRow>();
    let strict = ReaderPolicy { fail_on_missing_column: true, ..ReaderPolicy::default() };
    let opened = TableReader::open(&file, &fields, &strict);
    assert!(opened.is_err(), "expected a missing-column error, got Ok");
    Ok(())
}

#[test]
fn missing_column_falls_back_to_default_when_policy_allows_it() -> anyhow::Result<()> {
    let dir = support::tmp_folder("projection_missing_lenient");
    let config = PersistConfig::new(&dir, "rows");
    let descriptor = MinimalRow::record_descriptor();
    let mut writer = TableWriter::new("rows", &descriptor, NamingStrategy::FieldName, &config)?;
    writer.append(&MinimalRow { id: 7 })?;
    writer.flush()?;

    let file = support::written_file(&dir, "rows");
    let fields = record_fields::<ExpandedRow>();
    let lenient = ReaderPolicy { fail_on_missing_column: false, ..ReaderPolicy::default() };
    let mut reader = TableReader::open(&file, &fields, &lenient)?;
    let read_back: Vec<ExpandedRow> = reader.read_all()?;

    assert_eq!(read_back, vec![ExpandedRow { id: 7, missing: 0 }]);
    Ok(())
}
