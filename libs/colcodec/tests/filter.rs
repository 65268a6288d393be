use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

use colcodec::{
    BlockStatistics, Col, ColumnPath, Configuration, DecimalFormat, Error, FilterPredicate,
    ParquetRecord, RecordCodec, Registry, Row, TimestampFormat, Truth,
};

#[derive(Debug, Clone, PartialEq, ParquetRecord)]
struct Trade {
    id: i64,
    symbol: String,
    qty: i16,
    price: Decimal,
    day: NaiveDate,
    executed_at: DateTime<Utc>,
    venue: Option<String>,
    fills: Vec<i32>,
}

fn codec(config: Configuration) -> RecordCodec<Trade> {
    RecordCodec::derive(&config, Arc::new(Registry::new())).unwrap()
}

fn int64_config() -> Configuration {
    Configuration::new(
        DecimalFormat::int64(18, 2).unwrap(),
        TimestampFormat::Int64Micros,
    )
}

fn trade(id: i64, symbol: &str, price: &str, at: &str, venue: Option<&str>) -> Trade {
    let executed_at: DateTime<Utc> = at.parse().unwrap();
    Trade {
        id,
        symbol: symbol.into(),
        qty: 10,
        price: price.parse().unwrap(),
        day: executed_at.date_naive(),
        executed_at,
        venue: venue.map(str::to_string),
        fills: vec![5, 5],
    }
}

fn block(codec: &RecordCodec<Trade>, trades: &[Trade]) -> BlockStatistics {
    let rows: Vec<Row> = trades.iter().map(|t| codec.encode(t).unwrap()).collect();
    BlockStatistics::collect(codec.schema(), rows.iter())
}

fn sample(codec: &RecordCodec<Trade>) -> BlockStatistics {
    block(
        codec,
        &[
            trade(10, "ACME", "101.50", "2024-05-01T09:30:00Z", Some("XNYS")),
            trade(11, "BOLT", "99.25", "2024-05-01T10:00:00Z", None),
            trade(12, "CRUX", "120.00", "2024-05-02T15:45:00Z", Some("XNAS")),
        ],
    )
}

#[test]
fn int96_timestamps_are_not_filterable() {
    let codec = codec(Configuration::default());
    let at: DateTime<Utc> = "2024-05-01T00:00:00Z".parse().unwrap();
    let err = codec.filter(&Col::new("executed_at").gt(at)).unwrap_err();
    assert_eq!(
        err,
        Error::NotFilterable {
            path: ColumnPath::from("executed_at"),
            reason: "int96 columns carry no usable statistics".into(),
        }
    );
}

#[test]
fn int64_timestamps_prune_by_range() {
    let codec = codec(int64_config());
    let stats = sample(&codec);

    let late: DateTime<Utc> = "2024-06-01T00:00:00Z".parse().unwrap();
    let predicate = codec.filter(&Col::new("executed_at").gt_eq(late)).unwrap();
    assert!(predicate.can_skip(&stats));

    let early: DateTime<Utc> = "2024-05-01T09:59:00Z".parse().unwrap();
    let predicate = codec.filter(&Col::new("executed_at").lt(early)).unwrap();
    assert_eq!(predicate.evaluate(&stats), Truth::MaybeTrue);
}

#[test]
fn compound_filters_prune_by_statistics() {
    let codec = codec(int64_config());
    let stats = sample(&codec);

    let none_match = Col::new("id").gt(100i64) | Col::new("symbol").eq("ZZZ");
    assert!(codec.filter(&none_match).unwrap().can_skip(&stats));

    let all_match = Col::new("id").gt_eq(10i64) & Col::new("qty").eq(10i16);
    assert_eq!(codec.filter(&all_match).unwrap().evaluate(&stats), Truth::AlwaysTrue);

    let negated = !Col::new("id").lt(5i64);
    assert_eq!(codec.filter(&negated).unwrap().evaluate(&stats), Truth::AlwaysTrue);

    let listed = Col::new("symbol").is_in(["AAAA", "ZZZZ"]);
    assert!(codec.filter(&listed).unwrap().can_skip(&stats));
}

#[test]
fn decimal_and_date_literals_use_column_encoding() {
    let codec = codec(int64_config());
    let stats = sample(&codec);

    let cheap = Col::new("price").lt(Decimal::new(9000, 2));
    assert!(codec.filter(&cheap).unwrap().can_skip(&stats));

    let pricey = Col::new("price").gt(Decimal::new(110, 0));
    assert_eq!(codec.filter(&pricey).unwrap().evaluate(&stats), Truth::MaybeTrue);

    let day = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
    assert!(codec.filter(&Col::new("day").eq(day)).unwrap().can_skip(&stats));

    let err = codec.filter(&Col::new("price").eq(Decimal::new(1005, 3))).unwrap_err();
    assert!(matches!(err, Error::NotFilterable { .. }));
}

#[test]
fn null_checks_use_null_counts() {
    let codec = codec(int64_config());
    let stats = sample(&codec);

    let venue = codec.filter(&Col::new("venue").is_null()).unwrap();
    assert_eq!(venue.evaluate(&stats), Truth::MaybeTrue);

    let id = codec.filter(&Col::new("id").is_null()).unwrap();
    assert!(id.can_skip(&stats));

    let all_null = block(
        &codec,
        &[trade(1, "A", "1", "2024-01-01T00:00:00Z", None)],
    );
    let venue_eq = codec.filter(&Col::new("venue").eq("XNYS")).unwrap();
    assert!(venue_eq.can_skip(&all_null));
}

#[test]
fn filters_reject_unknown_and_nested_columns() {
    let codec = codec(int64_config());

    let err = codec.filter(&Col::new("nope").eq(1i32)).unwrap_err();
    assert!(matches!(err, Error::NotFilterable { ref path, .. } if path.to_string() == "nope"));

    let err = codec.filter(&Col::new("fills").eq(5i32)).unwrap_err();
    assert!(matches!(err, Error::NotFilterable { ref reason, .. } if reason.contains("list")));

    let err = codec.filter(&Col::new("symbol").eq(5i32)).unwrap_err();
    assert!(matches!(err, Error::NotFilterable { .. }));

    let err = codec.filter(&Col::new("qty").eq(70_000i64)).unwrap_err();
    assert!(matches!(err, Error::NotFilterable { ref reason, .. } if reason.contains("int16")));
}

#[test]
fn resolved_predicates_name_their_columns() {
    let codec = codec(int64_config());
    let predicate = codec
        .filter(&(Col::new("id").eq(1i64) & Col::new("venue").is_not_null()))
        .unwrap();
    let columns: Vec<String> = predicate.columns().iter().map(|c| c.to_string()).collect();
    assert_eq!(columns, vec!["id".to_string(), "venue".to_string()]);
    assert!(matches!(predicate, FilterPredicate::And(_, _)));
}
