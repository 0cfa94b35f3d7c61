mod support;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;

use parquet_record::assembler::RecordAssembler;
use parquet_record::config::ReaderPolicy;
use parquet_record::descriptor::{FieldDescriptor, ListContainer, ListEncoding, PrimitiveKind, TypeDescriptor};
use parquet_record::field::ParquetField;
use parquet_record::levels::leaf_repetition_flags;
use parquet_record::schema::compile_message_type;
use parquet_record::{Record, TableReader};

/// Same shape (`tags: Vec<i32>`) every file below materializes into, regardless of which
/// of the three LIST encodings it was physically written with (spec §3.2/§4.4: all three
/// are accepted on read).
#[derive(Debug, Clone, PartialEq, Record)]
struct TagBag {
    tags: Vec<i32>,
}

fn tag_descriptor(encoding: ListEncoding) -> TypeDescriptor {
    TypeDescriptor::Record {
        name: "TagBag".to_string(),
        fields: vec![FieldDescriptor::new(
            "tags",
            TypeDescriptor::List {
                element: Box::new(TypeDescriptor::Primitive { kind: PrimitiveKind::I32, nullable: false }),
                encoding,
                container: ListContainer::OrderedSequence,
                nullable: false,
            },
        )],
        nullable: false,
    }
}

fn write_tagbag_file(path: &Path, encoding: ListEncoding, rows: &[Vec<i32>]) -> Result<()> {
    let descriptor = tag_descriptor(encoding);
    let schema = compile_message_type(&descriptor, "schema", parquet_record::config::NamingStrategy::FieldName)?;
    let mut assembler = RecordAssembler::new(leaf_repetition_flags(&descriptor));

    for row in rows {
        assembler.begin_record();
        row.append(&mut assembler, 0, 0)?;
        assembler.end_record()?;
    }

    let props = Arc::new(WriterProperties::builder().build());
    let mut writer = SerializedFileWriter::new(File::create(path)?, schema, props)?;
    assembler.record(&mut writer)?;
    writer.close()?;
    Ok(())
}

fn read_tagbags(path: &Path) -> Result<Vec<TagBag>> {
    let fields = match TagBag::record_descriptor() {
        TypeDescriptor::Record { fields, .. } => fields,
        other => panic!("expected a Record descriptor, got {other:?}"),
    };
    let mut reader = TableReader::open(path, &fields, &ReaderPolicy::default())?;
    Ok(reader.read_all::<TagBag>()?)
}

fn assert_encoding_round_trips(encoding: ListEncoding, name: &str) -> Result<()> {
    let dir = support::tmp_folder(&format!("list_encoding_{name}"));
    let path = PathBuf::from(&dir).join("tagbag.parquet");
    std::fs::create_dir_all(&dir)?;

    let rows = vec![vec![10, 20, 30], vec![], vec![42]];
    write_tagbag_file(&path, encoding, &rows)?;

    let read_back = read_tagbags(&path)?;
    let expected: Vec<TagBag> = rows.into_iter().map(|tags| TagBag { tags }).collect();
    assert_eq!(read_back, expected);
    Ok(())
}

#[test]
fn three_level_list_round_trips() -> Result<()> {
    assert_encoding_round_trips(ListEncoding::ThreeLevel, "three")
}

#[test]
fn two_level_list_round_trips() -> Result<()> {
    assert_encoding_round_trips(ListEncoding::TwoLevel, "two")
}

#[test]
fn one_level_list_round_trips() -> Result<()> {
    assert_encoding_round_trips(ListEncoding::OneLevel, "one")
}
