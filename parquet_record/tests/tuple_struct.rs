mod support;

use parquet_record::config::{NamingStrategy, PersistConfig, ReaderPolicy};
use parquet_record::{FieldDescriptor, Record, TableReader, TableWriter, TypeDescriptor};

/// `#[derive(Record)]` over a tuple struct: fields are named by position ("0", "1", ...),
/// matching the teacher's own positional naming for `Fields::Unnamed`.
#[derive(Debug, Clone, PartialEq, Record)]
struct Point(f64, f64);

#[test]
fn a_tuple_struct_round_trips_through_positional_columns() -> anyhow::Result<()> {
    let dir = support::tmp_folder("tuple_struct");
    let config = PersistConfig::new(&dir, "points");
    let descriptor = Point::record_descriptor();

    let fields = match &descriptor {
        TypeDescriptor::Record { fields, .. } => fields,
        other => panic!("expected a Record descriptor, got {other:?}"),
    };
    let names: Vec<&str> = fields.iter().map(|f| f.source_name.as_str()).collect();
    assert_eq!(names, vec!["0", "1"]);

    let mut writer = TableWriter::new("points", &descriptor, NamingStrategy::FieldName, &config)?;
    writer.append(&Point(1.5, -2.25))?;
    writer.append(&Point(0.0, 100.0))?;
    writer.flush()?;

    let file = support::written_file(&dir, "points");
    let read_fields: Vec<FieldDescriptor> = fields.clone();
    let mut reader = TableReader::open(&file, &read_fields, &ReaderPolicy::default())?;
    let read_back: Vec<Point> = reader.read_all()?;

    assert_eq!(read_back, vec![Point(1.5, -2.25), Point(0.0, 100.0)]);
    Ok(())
}
