mod support;

use parquet_record::config::{NamingStrategy, PersistConfig, ReaderPolicy};
use parquet_record::{FieldDescriptor, Record, TableReader, TableWriter, TypeDescriptor};

#[derive(Debug, Clone, PartialEq, Record)]
struct SourcePerson {
    id: String,
    age: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Record)]
struct TargetPerson {
    id: String,
    age: i32,
}

fn record_fields<T: Record>() -> Vec<FieldDescriptor> {
    match T::record_descriptor() {
        TypeDescriptor::Record { fields, .. } => fields,
        other => panic!("expected a Record descriptor, got {other:?}"),
    }
}

fn write_people(dir: &str, rows: &[SourcePerson]) -> anyhow::Result<()> {
    let config = PersistConfig::new(dir, "people");
    let descriptor = SourcePerson::record_descriptor();
    let mut writer = TableWriter::new("people", &descriptor, NamingStrategy::FieldName, &config)?;
    for row in rows {
        writer.append(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[test]
fn null_for_a_required_primitive_defaults_under_the_lenient_policy() -> anyhow::Result<()> {
    let dir = support::tmp_folder("null_handling_lenient");
    write_people(
        &dir,
        &[
            SourcePerson { id: "a".to_string(), age: Some(7) },
            SourcePerson { id: "b".to_string(), age: None },
        ],
    )?;

    let file = support::written_file(&dir, "people");
    let fields = record_fields::<TargetPerson>();
    let mut reader = TableReader::open(&file, &fields, &ReaderPolicy::default())?;
    let read_back: Vec<TargetPerson> = reader.read_all()?;

    assert_eq!(
        read_back,
        vec![
            TargetPerson { id: "a".to_string(), age: 7 },
            TargetPerson { id: "b".to_string(), age: 0 },
        ]
    );
    Ok(())
}

#[test]
fn an_optional_file_column_is_rejected_at_projection_under_the_strict_policy() -> anyhow::Result<()> {
    let dir = support::tmp_folder("null_handling_strict");
    write_people(&dir, &[SourcePerson { id: "a".to_string(), age: Some(7) }])?;

    let file = support::written_file(&dir, "people");
    let fields = record_fields::<TargetPerson>();
    let strict = ReaderPolicy { fail_on_null_for_primitive: true, ..ReaderPolicy::default() };
    let opened = TableReader::open(&file, &fields, &strict);
    assert!(opened.is_err(), "expected a null-for-required projection error, got Ok");
    Ok(())
}
