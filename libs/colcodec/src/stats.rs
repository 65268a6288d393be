//! Statistics domain: the comparable form of leaf values used for min/max
//! pruning.

use std::cmp::Ordering;
use std::collections::HashMap;

use bytes::Bytes;

use crate::codec::decimal::{rescale_unscaled, to_fixed_bytes, unscaled_from_bytes};
use crate::path::ColumnPath;
use crate::schema::{LeafNode, LogicalType, MessageSchema, PhysicalType};
use crate::value::{Row, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Bytes(Bytes),
}

impl StatValue {
    /// Statistics form of a stored value under `leaf`. `None` for nulls,
    /// INT96 leaves and values that do not fit the leaf.
    pub fn from_value(value: &Value, leaf: &LeafNode) -> Option<StatValue> {
        match (leaf.physical, value) {
            (PhysicalType::Int96, _) => None,
            (PhysicalType::Boolean, Value::Boolean(v)) => Some(StatValue::Boolean(*v)),
            (PhysicalType::Int32, Value::Int32(v)) => Some(StatValue::Int32(*v)),
            (PhysicalType::Int64, Value::Int64(v)) => Some(StatValue::Int64(*v)),
            (PhysicalType::Float, Value::Float(v)) => Some(StatValue::Float(*v)),
            (PhysicalType::Double, Value::Double(v)) => Some(StatValue::Double(*v)),
            (PhysicalType::ByteArray | PhysicalType::FixedLenByteArray(_), Value::Binary(b)) => {
                Some(StatValue::Bytes(b.clone()))
            }
            (physical, Value::Decimal(stored)) => {
                let Some(LogicalType::Decimal { scale, .. }) = leaf.logical else {
                    return None;
                };
                let unscaled = rescale_unscaled(stored.unscaled, stored.scale, scale)?;
                match physical {
                    PhysicalType::Int32 => i32::try_from(unscaled).ok().map(StatValue::Int32),
                    PhysicalType::Int64 => i64::try_from(unscaled).ok().map(StatValue::Int64),
                    PhysicalType::FixedLenByteArray(len) => {
                        Some(StatValue::Bytes(to_fixed_bytes(unscaled, len)))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// How two statistics values of one column compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnOrder {
    /// Numeric order; `false < true` for booleans.
    Signed,
    /// Lexicographic unsigned bytes.
    Unsigned,
    /// Big-endian two's-complement bytes (binary decimals).
    SignedBytes,
}

impl ColumnOrder {
    pub fn for_leaf(leaf: &LeafNode) -> Self {
        match (leaf.physical, leaf.logical) {
            (
                PhysicalType::ByteArray | PhysicalType::FixedLenByteArray(_),
                Some(LogicalType::Decimal { .. }),
            ) => ColumnOrder::SignedBytes,
            (PhysicalType::ByteArray | PhysicalType::FixedLenByteArray(_), _) => {
                ColumnOrder::Unsigned
            }
            _ => ColumnOrder::Signed,
        }
    }

    /// `None` when the values are incomparable (different variants, NaN).
    pub fn compare(&self, a: &StatValue, b: &StatValue) -> Option<Ordering> {
        match (a, b) {
            (StatValue::Boolean(a), StatValue::Boolean(b)) => Some(a.cmp(b)),
            (StatValue::Int32(a), StatValue::Int32(b)) => Some(a.cmp(b)),
            (StatValue::Int64(a), StatValue::Int64(b)) => Some(a.cmp(b)),
            (StatValue::Float(a), StatValue::Float(b)) => a.partial_cmp(b),
            (StatValue::Double(a), StatValue::Double(b)) => a.partial_cmp(b),
            (StatValue::Bytes(a), StatValue::Bytes(b)) => match self {
                ColumnOrder::SignedBytes => {
                    Some(unscaled_from_bytes(a)?.cmp(&unscaled_from_bytes(b)?))
                }
                _ => Some(a.as_ref().cmp(b.as_ref())),
            },
            _ => None,
        }
    }
}

/// Min/max and null count of one column within a block.
///
/// When an incomparable value is seen, `min` and `max` are dropped for the
/// rest of the block and predicates fall back to "maybe".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStatistics {
    pub min: Option<StatValue>,
    pub max: Option<StatValue>,
    pub null_count: Option<u64>,
    pub value_count: u64,
}

impl ColumnStatistics {
    pub fn new(min: StatValue, max: StatValue, null_count: u64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            null_count: Some(null_count),
            value_count: 1,
        }
    }

    /// Fold one value (`None` for null) into the statistics.
    pub fn accumulate(&mut self, value: Option<StatValue>, order: ColumnOrder) {
        let Some(value) = value else {
            self.null_count = Some(self.null_count.unwrap_or(0) + 1);
            return;
        };
        self.null_count.get_or_insert(0);
        self.value_count += 1;
        if self.value_count == 1 {
            if order.compare(&value, &value).is_some() {
                self.min = Some(value.clone());
                self.max = Some(value);
            }
            return;
        }
        let (Some(min), Some(max)) = (&self.min, &self.max) else {
            return;
        };
        match (order.compare(&value, min), order.compare(&value, max)) {
            (Some(lo), Some(hi)) => {
                if lo == Ordering::Less {
                    self.min = Some(value.clone());
                }
                if hi == Ordering::Greater {
                    self.max = Some(value);
                }
            }
            _ => {
                self.min = None;
                self.max = None;
            }
        }
    }

    /// Every row of a block with `row_count` rows is null.
    pub fn is_all_null(&self, row_count: u64) -> bool {
        self.value_count == 0 && self.null_count == Some(row_count)
    }

    /// No row is null.
    pub fn has_no_nulls(&self) -> bool {
        self.null_count == Some(0)
    }
}

/// Per-block statistics reported by a block store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockStatistics {
    pub row_count: u64,
    pub columns: HashMap<ColumnPath, ColumnStatistics>,
}

impl BlockStatistics {
    pub fn new(row_count: u64) -> Self {
        Self {
            row_count,
            columns: HashMap::new(),
        }
    }

    pub fn with_column(mut self, path: impl Into<ColumnPath>, stats: ColumnStatistics) -> Self {
        self.columns.insert(path.into(), stats);
        self
    }

    pub fn column(&self, path: &ColumnPath) -> Option<&ColumnStatistics> {
        self.columns.get(path)
    }

    /// Compute statistics for every leaf reachable through groups. INT96
    /// columns and columns holding values that do not fit their leaf get no
    /// entry.
    pub fn collect<'a>(schema: &MessageSchema, rows: impl IntoIterator<Item = &'a Row>) -> Self {
        Self::collect_leaves(&schema.leaves(), rows)
    }

    /// Same as [`collect`](Self::collect) over leaves already taken from
    /// [`MessageSchema::leaves`], for callers that compute statistics many
    /// times against one schema.
    pub fn collect_leaves<'a>(
        leaves: &[(ColumnPath, &LeafNode)],
        rows: impl IntoIterator<Item = &'a Row>,
    ) -> Self {
        let mut columns: Vec<Option<ColumnStatistics>> = leaves
            .iter()
            .map(|(_, leaf)| leaf.is_filterable().then(ColumnStatistics::default))
            .collect();
        let mut row_count = 0u64;

        for row in rows {
            row_count += 1;
            for ((path, leaf), slot) in leaves.iter().zip(columns.iter_mut()) {
                let Some(stats) = slot else { continue };
                let value = lookup(row, path);
                if value.is_null() {
                    stats.accumulate(None, ColumnOrder::for_leaf(leaf));
                    continue;
                }
                match StatValue::from_value(value, leaf) {
                    Some(stat) => stats.accumulate(Some(stat), ColumnOrder::for_leaf(leaf)),
                    None => *slot = None,
                }
            }
        }

        let columns = leaves
            .iter()
            .zip(columns)
            .filter_map(|((path, _), stats)| stats.map(|s| (path.clone(), s)))
            .collect();
        Self { row_count, columns }
    }
}

/// Value at `path` through nested rows; missing fields and null parents read
/// as null.
pub fn lookup<'a>(row: &'a Row, path: &ColumnPath) -> &'a Value {
    static NULL: Value = Value::Null;
    let Some((first, rest)) = path.segments().split_first() else {
        return &NULL;
    };
    let mut current = match row.get(first) {
        Some(value) => value,
        None => return &NULL,
    };
    for segment in rest {
        current = match current.as_row().and_then(|r| r.get(segment)) {
            Some(value) => value,
            None => return &NULL,
        };
    }
    current
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schema::SchemaNode;
    use crate::value::DecimalValue;

    #[test]
    fn signed_bytes_order_negative_first() {
        let order = ColumnOrder::SignedBytes;
        let neg = StatValue::Bytes(Bytes::from_static(&[0xff, 0xfe]));
        let pos = StatValue::Bytes(Bytes::from_static(&[0x00, 0x01]));
        assert_eq!(order.compare(&neg, &pos), Some(Ordering::Less));
        assert_eq!(ColumnOrder::Unsigned.compare(&neg, &pos), Some(Ordering::Greater));
    }

    #[test]
    fn accumulate_tracks_bounds_and_nulls() {
        let mut stats = ColumnStatistics::default();
        for v in [Some(5), None, Some(-2), Some(9)] {
            stats.accumulate(v.map(StatValue::Int32), ColumnOrder::Signed);
        }
        assert_eq!(stats.min, Some(StatValue::Int32(-2)));
        assert_eq!(stats.max, Some(StatValue::Int32(9)));
        assert_eq!(stats.null_count, Some(1));
        assert_eq!(stats.value_count, 3);
    }

    #[test]
    fn nan_drops_bounds() {
        let mut stats = ColumnStatistics::default();
        stats.accumulate(Some(StatValue::Double(1.0)), ColumnOrder::Signed);
        stats.accumulate(Some(StatValue::Double(f64::NAN)), ColumnOrder::Signed);
        stats.accumulate(Some(StatValue::Double(0.0)), ColumnOrder::Signed);
        assert_eq!(stats.min, None);
        assert_eq!(stats.max, None);
    }

    #[test]
    fn collect_walks_nested_groups() {
        let node = SchemaNode::group([
            ("id", SchemaNode::leaf(PhysicalType::Int64)),
            (
                "inner",
                SchemaNode::group([("flag", SchemaNode::leaf(PhysicalType::Boolean))]).optional(),
            ),
            ("at", SchemaNode::leaf(PhysicalType::Int96)),
        ]);
        let schema = MessageSchema::new("T", node).unwrap();
        let rows = vec![
            Row::new().with("id", 3i64).with("inner", Row::new().with("flag", true)),
            Row::new().with("id", 1i64).with("inner", Value::Null),
        ];
        let stats = BlockStatistics::collect(&schema, &rows);
        assert_eq!(stats.row_count, 2);

        let id = stats.column(&"id".into()).unwrap();
        assert_eq!(id.min, Some(StatValue::Int64(1)));
        assert_eq!(id.max, Some(StatValue::Int64(3)));

        let flag = stats.column(&"inner.flag".into()).unwrap();
        assert_eq!(flag.null_count, Some(1));
        assert!(stats.column(&"at".into()).is_none());
    }

    #[test]
    fn shared_leaves_match_per_call_collection() {
        let node = SchemaNode::group([
            ("id", SchemaNode::leaf(PhysicalType::Int64)),
            ("name", SchemaNode::leaf(PhysicalType::ByteArray).optional()),
        ]);
        let schema = MessageSchema::new("T", node).unwrap();
        let rows = vec![
            Row::new().with("id", 2i64).with("name", "b"),
            Row::new().with("id", 9i64).with("name", Value::Null),
        ];
        let leaves = schema.leaves();
        for row in &rows {
            assert_eq!(
                BlockStatistics::collect_leaves(&leaves, std::iter::once(row)),
                BlockStatistics::collect(&schema, std::iter::once(row)),
            );
        }
        let block = BlockStatistics::collect_leaves(&leaves, &rows);
        assert_eq!(block.row_count, 2);
        assert_eq!(block.column(&"name".into()).unwrap().null_count, Some(1));
    }

    #[test]
    fn stored_decimals_map_to_leaf_scale() {
        let leaf = LeafNode::new(PhysicalType::Int64)
            .with_logical(LogicalType::Decimal { precision: 10, scale: 3 });
        let value = Value::Decimal(DecimalValue::new(125, 5, 2));
        assert_eq!(StatValue::from_value(&value, &leaf), Some(StatValue::Int64(1250)));
    }
}
