mod support;

use std::collections::HashMap;

use parquet_record::config::{NamingStrategy, PersistConfig, ReaderPolicy};
use parquet_record::{FieldDescriptor, Record, TableReader, TableWriter, TypeDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Record)]
struct CodeName {
    code: String,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Record)]
struct Catalog {
    entries: HashMap<CodeName, i32>,
}

fn record_fields<T: Record>() -> Vec<FieldDescriptor> {
    match T::record_descriptor() {
        TypeDescriptor::Record { fields, .. } => fields,
        other => panic!("expected a Record descriptor, got {other:?}"),
    }
}

#[test]
fn a_map_keyed_by_a_record_retains_both_key_fields() -> anyhow::Result<()> {
    let dir = support::tmp_folder("map_record_key");
    let config = PersistConfig::new(&dir, "catalogs");
    let descriptor = Catalog::record_descriptor();
    let mut writer = TableWriter::new("catalogs", &descriptor, NamingStrategy::FieldName, &config)?;

    let mut entries = HashMap::new();
    entries.insert(CodeName { code: "A1".to_string(), name: "Widget".to_string() }, 10);
    entries.insert(CodeName { code: "B2".to_string(), name: "Gadget".to_string() }, 20);
    writer.append(&Catalog { entries: entries.clone() })?;
    writer.flush()?;

    let file = support::written_file(&dir, "catalogs");
    let fields = record_fields::<Catalog>();
    let mut reader = TableReader::open(&file, &fields, &ReaderPolicy::default())?;
    let read_back: Vec<Catalog> = reader.read_all()?;

    assert_eq!(read_back, vec![Catalog { entries }]);
    Ok(())
}
