use std::sync::Arc;

use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

use colcodec::{
    BlockStore, Col, Configuration, DecimalFormat, Error, ParquetRecord, RecordCodec, Registry,
    TimestampFormat, Value, read_records, read_rows, write_records,
};
use colcodec_store_memory::{MemoryBlockStore, MemoryStoreConfig};

#[derive(Debug, Clone, PartialEq, ParquetRecord)]
struct Reading {
    id: i64,
    sensor: String,
    value: Decimal,
    taken_at: DateTime<Utc>,
    labels: Vec<String>,
    note: Option<String>,
}

fn config(scale: u32) -> Configuration {
    Configuration::new(
        DecimalFormat::int64(18, scale).unwrap(),
        TimestampFormat::Int64Millis,
    )
}

fn codec(config: Configuration) -> RecordCodec<Reading> {
    RecordCodec::derive(&config, Arc::new(Registry::new())).unwrap()
}

fn readings() -> Vec<Reading> {
    (0..6)
        .map(|i| Reading {
            id: i,
            sensor: format!("s{}", i % 2),
            value: Decimal::new(1000 + i * 25, 2),
            taken_at: DateTime::from_timestamp_millis(1_700_000_000_000 + i * 60_000).unwrap(),
            labels: vec!["raw".into(); i as usize % 3],
            note: (i % 3 == 0).then(|| format!("note {i}")),
        })
        .collect()
}

fn filled_store(codec: &RecordCodec<Reading>) -> MemoryBlockStore {
    let mut store = MemoryBlockStore::new(MemoryStoreConfig { block_size: 2 });
    let written = write_records(&mut store, codec, &readings()).unwrap();
    assert_eq!(written, 6);
    store
}

#[test]
fn records_survive_the_store() {
    let codec = codec(config(2));
    let store = filled_store(&codec);
    assert_eq!(store.block_count(), 3);
    assert_eq!(store.row_count(), 6);

    let back = read_records(&store, &codec, None).unwrap();
    assert_eq!(back, readings());
}

#[test]
fn filters_prune_whole_blocks() {
    let codec = codec(config(2));
    let store = filled_store(&codec);

    let filter = Col::new("id").gt_eq(4i64);
    let predicate = codec.filter(&filter).unwrap();
    let skipped = store.statistics().filter(|s| predicate.can_skip(s)).count();
    assert_eq!(skipped, 2);

    let back = read_records(&store, &codec, Some(&filter)).unwrap();
    let ids: Vec<i64> = back.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![4, 5]);
}

#[test]
fn filters_drop_non_matching_rows_inside_a_block() {
    let codec = codec(config(2));
    let store = filled_store(&codec);

    let at: DateTime<Utc> = DateTime::from_timestamp_millis(1_700_000_060_000).unwrap();
    let filter = Col::new("taken_at").eq(at) | Col::new("value").eq(Decimal::new(1100, 2));
    let back = read_records(&store, &codec, Some(&filter)).unwrap();
    let ids: Vec<i64> = back.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 4]);

    let filter = Col::new("note").is_null() & Col::new("sensor").eq("s1");
    let back = read_records(&store, &codec, Some(&filter)).unwrap();
    let ids: Vec<i64> = back.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 5]);
}

#[test]
fn stored_decimals_are_rescaled_on_read() {
    let writer = codec(config(2));
    let store = filled_store(&writer);

    let reader = codec(config(4));
    let back = read_records(&store, &reader, None).unwrap();
    assert_eq!(back[3].value, Decimal::new(1075, 2));
    assert_eq!(back[3].value.scale(), 4);

    let verbatim_config = Configuration::new(
        DecimalFormat::int64(18, 4).unwrap().with_rescale_on_read(false),
        TimestampFormat::Int64Millis,
    );
    let verbatim = codec(verbatim_config);
    let back = read_records(&store, &verbatim, None).unwrap();
    assert_eq!(back[3].value.scale(), 2);
    assert_eq!(back, readings());
}

#[test]
fn raw_rows_come_with_the_stored_schema() {
    let writer = codec(config(2));
    let store = filled_store(&writer);

    let (schema, rows) =
        read_rows(&store, &config(2), Some(&Col::new("id").eq(0i64))).unwrap();
    assert_eq!(&schema, writer.schema());
    assert_eq!(rows.len(), 1);
    assert!(matches!(rows[0].get("value"), Some(Value::Decimal(d)) if d.scale == 2));

    let empty = MemoryBlockStore::default();
    let err = read_rows(&empty, &config(2), None).unwrap_err();
    assert!(matches!(err, Error::NoSchemaAvailable(_)));
}

#[test]
fn a_store_holds_one_schema() {
    #[derive(Debug, ParquetRecord)]
    struct Other {
        id: i64,
    }

    let writer = codec(config(2));
    let mut store = filled_store(&writer);
    let other = RecordCodec::<Other>::derive(&config(2), Arc::new(Registry::new())).unwrap();
    let err = write_records(&mut store, &other, &[Other { id: 1 }]).unwrap_err();
    assert!(matches!(err, Error::NonConforming { .. }));
    assert_eq!(store.row_count(), 6);
    assert!(store.schema().is_some());
}

#[test]
fn empty_store_reads_nothing() {
    let store = MemoryBlockStore::from_json("{}").unwrap();
    assert_eq!(store.block_size(), 1024);
    let back = read_records(&store, &codec(config(2)), None).unwrap();
    assert!(back.is_empty());
}
