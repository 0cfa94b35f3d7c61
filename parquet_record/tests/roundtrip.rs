mod support;

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use parquet_record::config::{NamingStrategy, PersistConfig, ReaderPolicy};
use parquet_record::{FieldDescriptor, Record, TableReader, TableWriter, TypeDescriptor};

#[derive(Debug, Clone, PartialEq, Record)]
struct PriceLevel {
    price: f64,
    quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Record)]
struct Quote {
    id: Uuid,
    symbol: String,
    mid: Decimal,
    levels: Vec<PriceLevel>,
    tags: HashMap<String, String>,
    note: Option<String>,
    seen_at: DateTime<Utc>,
    trade_date: NaiveDate,
    logged_at: NaiveDateTime,
    healthy: bool,
    count: u32,
}

fn sample_quote(i: u32, with_note: bool) -> Quote {
    let mut rng = rand::thread_rng();
    let seen_at = DateTime::<Utc>::from_timestamp_micros(1_700_000_000_000_000 + i as i64 * 1_000_000).expect("representable timestamp");

    let mut tags = HashMap::new();
    tags.insert("venue".to_string(), "NYSE".to_string());
    tags.insert("book".to_string(), format!("book-{i}"));

    Quote {
        id: Uuid::new_v4(),
        symbol: format!("SYM{i}"),
        mid: Decimal::new(1_050_000 + i as i64 * 10_000, 6),
        levels: vec![
            PriceLevel { price: 100.0 + i as f64, quantity: rng.gen_range(1.0..10.0) },
            PriceLevel { price: 101.0 + i as f64, quantity: rng.gen_range(1.0..10.0) },
        ],
        tags,
        note: if with_note { Some(format!("note-{i}")) } else { None },
        seen_at,
        trade_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date") + chrono::Duration::days(i as i64),
        logged_at: seen_at.naive_utc(),
        healthy: i % 2 == 0,
        count: i,
    }
}

fn record_fields<T: Record>() -> Vec<FieldDescriptor> {
    match T::record_descriptor() {
        TypeDescriptor::Record { fields, .. } => fields,
        other => panic!("expected a Record descriptor, got {other:?}"),
    }
}

#[test]
fn round_trip_preserves_every_field() -> Result<()> {
    let dir = support::tmp_folder("roundtrip_full");
    let config = PersistConfig::new(&dir, "quotes");
    let descriptor = Quote::record_descriptor();
    let mut writer = TableWriter::new("quotes", &descriptor, NamingStrategy::FieldName, &config)?;

    let original = vec![sample_quote(0, true), sample_quote(1, false), sample_quote(2, true)];
    for q in &original {
        writer.append(q)?;
    }
    writer.flush()?;

    let file = support::written_file(&dir, "quotes");
    let fields = record_fields::<Quote>();
    let mut reader = TableReader::open(&file, &fields, &ReaderPolicy::default())?;
    let read_back: Vec<Quote> = reader.read_all()?;

    assert_eq!(read_back, original);
    Ok(())
}

#[test]
fn round_trip_handles_empty_table() -> Result<()> {
    let dir = support::tmp_folder("roundtrip_empty");
    let config = PersistConfig::new(&dir, "quotes");
    let descriptor = Quote::record_descriptor();
    let mut writer = TableWriter::new("quotes", &descriptor, NamingStrategy::FieldName, &config)?;

    // A single row is still required to produce a file at all (an empty assembler never
    // flushes, per `TableWriter::flush`'s `is_empty` guard) but an empty `levels`/`tags`
    // on that row exercises the empty-list/empty-map path end to end.
    let mut quote = sample_quote(9, false);
    quote.levels.clear();
    quote.tags.clear();
    writer.append(&quote)?;
    writer.flush()?;

    let file = support::written_file(&dir, "quotes");
    let fields = record_fields::<Quote>();
    let mut reader = TableReader::open(&file, &fields, &ReaderPolicy::default())?;
    let read_back: Vec<Quote> = reader.read_all()?;

    assert_eq!(read_back, vec![quote]);
    Ok(())
}
