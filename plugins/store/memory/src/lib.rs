use colcodec::schema::{GroupNode, LogicalType, SchemaNode};
use colcodec::stats::BlockStatistics;
use colcodec::{
    BlockStore, DecimalValue, Error, FilterPredicate, ListValue, MapValue, MessageSchema, Result,
    Row, Value,
};

// ═══════════════════════════════════════════════════════════════
//  MemoryStoreConfig
// ═══════════════════════════════════════════════════════════════

fn default_block_size() -> usize {
    1024
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemoryStoreConfig {
    /// Rows per block; each block carries its own statistics.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryBlockStore
// ═══════════════════════════════════════════════════════════════

struct Block {
    rows: Vec<Row>,
    stats: BlockStatistics,
}

/// Block store that keeps rows in memory, split into fixed-size blocks with
/// min/max statistics per leaf column.
///
/// Decimal leaves are handed back as [`Value::Decimal`] carrying the stored
/// precision and scale, so readers under a different decimal policy can
/// rescale or preserve them.
pub struct MemoryBlockStore {
    schema: Option<MessageSchema>,
    blocks: Vec<Block>,
    block_size: usize,
}

impl Default for MemoryBlockStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

impl MemoryBlockStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            schema: None,
            blocks: Vec::new(),
            block_size: config.block_size.max(1),
        }
    }

    /// Build from a JSON config; `"{}"` selects the defaults.
    pub fn from_json(config_json: &str) -> Result<Self> {
        let config: MemoryStoreConfig = if config_json.trim() == "{}" {
            MemoryStoreConfig::default()
        } else {
            serde_json::from_str(config_json)
                .map_err(|e| Error::InvalidFormat(format!("memory store config: {e}")))?
        };
        Ok(Self::new(config))
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn row_count(&self) -> usize {
        self.blocks.iter().map(|b| b.rows.len()).sum()
    }

    pub fn statistics(&self) -> impl Iterator<Item = &BlockStatistics> {
        self.blocks.iter().map(|b| &b.stats)
    }
}

impl BlockStore for MemoryBlockStore {
    fn schema(&self) -> Option<&MessageSchema> {
        self.schema.as_ref()
    }

    fn append(&mut self, schema: &MessageSchema, rows: Vec<Row>) -> Result<()> {
        if let Some(existing) = &self.schema {
            if existing != schema {
                return Err(Error::non_conforming(
                    format!("schema '{}'", existing.name()),
                    format!("schema '{}'", schema.name()),
                ));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            schema.validate(row).map_err(|e| e.within(format!("[{i}]")))?;
        }
        if self.schema.is_none() {
            self.schema = Some(schema.clone());
        }

        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk: Vec<Row> = rows.by_ref().take(self.block_size).collect();
            let stats = BlockStatistics::collect(schema, &chunk);
            tracing::trace!(
                block = self.blocks.len(),
                rows = chunk.len(),
                columns = stats.columns.len(),
                "sealed block"
            );
            self.blocks.push(Block { rows: chunk, stats });
        }
        Ok(())
    }

    fn scan(&self, predicate: Option<&FilterPredicate>) -> Result<Vec<Row>> {
        let Some(schema) = &self.schema else {
            return Ok(Vec::new());
        };
        let leaves = schema.leaves();
        let mut out = Vec::new();
        let mut skipped = 0usize;
        for (i, block) in self.blocks.iter().enumerate() {
            if let Some(predicate) = predicate {
                if predicate.can_skip(&block.stats) {
                    tracing::trace!(block = i, "block pruned by statistics");
                    skipped += 1;
                    continue;
                }
            }
            for row in &block.rows {
                if let Some(predicate) = predicate {
                    let single = BlockStatistics::collect_leaves(&leaves, std::iter::once(row));
                    if predicate.can_skip(&single) {
                        continue;
                    }
                }
                out.push(lift_row(row.clone(), schema.root()));
            }
        }
        tracing::debug!(
            blocks = self.blocks.len(),
            skipped,
            rows = out.len(),
            "scan finished"
        );
        Ok(out)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Decimal lifting
// ═══════════════════════════════════════════════════════════════

/// Lift every field of `row` in place; field order is kept.
fn lift_row(row: Row, group: &GroupNode) -> Row {
    row.into_iter()
        .map(|(name, value)| match group.field(&name) {
            Some(node) => {
                let value = lift(value, node);
                (name, value)
            }
            None => (name, value),
        })
        .collect()
}

/// Re-tag physical decimal scalars with the stored precision and scale.
fn lift(value: Value, node: &SchemaNode) -> Value {
    match (node, value) {
        (_, Value::Null) => Value::Null,
        (SchemaNode::Leaf(leaf), value) => match leaf.logical {
            Some(LogicalType::Decimal { precision, scale }) => {
                match DecimalValue::from_physical(&value, precision, scale) {
                    Some(decimal) => Value::Decimal(decimal),
                    None => value,
                }
            }
            _ => value,
        },
        (SchemaNode::Group(group), Value::Row(row)) => Value::Row(lift_row(row, group)),
        (SchemaNode::List(list), Value::List(items)) => Value::List(
            items
                .into_iter()
                .map(|item| lift(item, &list.element))
                .collect::<ListValue>(),
        ),
        (SchemaNode::Map(map), Value::Map(entries)) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (lift(k, &map.key), lift(v, &map.value)))
                .collect::<MapValue>(),
        ),
        (_, value) => value,
    }
}

#[cfg(test)]
mod tests {
    use colcodec::schema::PhysicalType;

    use super::*;

    fn schema() -> MessageSchema {
        MessageSchema::new(
            "T",
            SchemaNode::group([("n", SchemaNode::leaf(PhysicalType::Int32))]),
        )
        .unwrap()
    }

    #[test]
    fn config_defaults() {
        let store = MemoryBlockStore::from_json("{}").unwrap();
        assert_eq!(store.block_size(), 1024);
        let store = MemoryBlockStore::from_json(r#"{"block_size": 2}"#).unwrap();
        assert_eq!(store.block_size(), 2);
        assert!(MemoryBlockStore::from_json("not json").is_err());
    }

    #[test]
    fn rows_are_split_into_blocks() {
        let mut store = MemoryBlockStore::new(MemoryStoreConfig { block_size: 2 });
        let rows = (0..5).map(|n| Row::new().with("n", n)).collect();
        store.append(&schema(), rows).unwrap();
        assert_eq!(store.block_count(), 3);
        assert_eq!(store.row_count(), 5);
    }

    #[test]
    fn invalid_rows_are_rejected_before_write() {
        let mut store = MemoryBlockStore::default();
        let rows = vec![Row::new().with("n", 1), Row::new().with("n", "x")];
        let err = store.append(&schema(), rows).unwrap_err();
        assert_eq!(err.path().map(ToString::to_string).as_deref(), Some("[1].n"));
        assert_eq!(store.row_count(), 0);
        assert!(store.schema().is_none());
    }

    #[test]
    fn decimals_are_lifted() {
        let leaf = SchemaNode::annotated(
            PhysicalType::Int64,
            LogicalType::Decimal { precision: 18, scale: 2 },
        );
        let lifted = lift(Value::Int64(1234), &leaf);
        assert_eq!(lifted, Value::Decimal(DecimalValue::new(1234, 18, 2)));
    }

    #[test]
    fn scanned_rows_keep_their_field_order() {
        let price = SchemaNode::annotated(
            PhysicalType::Int64,
            LogicalType::Decimal { precision: 18, scale: 2 },
        );
        let inner = SchemaNode::group([
            ("amount", price.clone()),
            ("note", SchemaNode::leaf(PhysicalType::Int32)),
        ]);
        let node = SchemaNode::group([
            ("price", price),
            ("n", SchemaNode::leaf(PhysicalType::Int32)),
            ("inner", inner),
        ]);
        let schema = MessageSchema::new("T", node).unwrap();
        let row = Row::new()
            .with("inner", Row::new().with("note", 1).with("amount", 250i64))
            .with("n", 7)
            .with("price", 1234i64);

        let mut store = MemoryBlockStore::default();
        store.append(&schema, vec![row]).unwrap();
        let rows = store.scan(None).unwrap();

        let names: Vec<&str> = rows[0].names().collect();
        assert_eq!(names, ["inner", "n", "price"]);
        let price = Value::Decimal(DecimalValue::new(1234, 18, 2));
        assert_eq!(rows[0].get("price"), Some(&price));
        let inner = rows[0].get("inner").and_then(Value::as_row).unwrap();
        assert_eq!(inner.names().collect::<Vec<_>>(), ["note", "amount"]);
        let amount = Value::Decimal(DecimalValue::new(250, 18, 2));
        assert_eq!(inner.get("amount"), Some(&amount));
    }
}
