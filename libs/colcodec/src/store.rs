//! Seam to the block store that persists value trees and keeps per-block
//! statistics.

use crate::catalog::RecordCodec;
use crate::codec::ParquetType;
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::predicate::FilterPredicate;
use crate::schema::MessageSchema;
use crate::value::Row;

/// Storage backend driven by the codec layer.
///
/// Stores check appended rows against the schema, keep min/max statistics
/// per block and skip blocks a predicate proves empty.
pub trait BlockStore {
    /// Schema of the stored data, if anything has been written.
    fn schema(&self) -> Option<&MessageSchema>;

    fn append(&mut self, schema: &MessageSchema, rows: Vec<Row>) -> Result<()>;

    /// Rows of every block the predicate does not rule out. Stores may also
    /// drop individual rows that cannot match.
    fn scan(&self, predicate: Option<&FilterPredicate>) -> Result<Vec<Row>>;
}

/// Encode and append `records`. Returns the number written.
pub fn write_records<'a, T, S>(
    store: &mut S,
    codec: &RecordCodec<T>,
    records: impl IntoIterator<Item = &'a T>,
) -> Result<usize>
where
    T: ParquetType + 'a,
    S: BlockStore + ?Sized,
{
    let rows = records
        .into_iter()
        .map(|record| codec.encode(record))
        .collect::<Result<Vec<_>>>()?;
    let count = rows.len();
    store.append(codec.schema(), rows)?;
    tracing::debug!(schema = codec.schema().name(), count, "wrote records");
    Ok(count)
}

/// Scan and decode. The filter is resolved against the stored schema, or
/// against `T`'s schema when the store is empty.
pub fn read_records<T, S>(
    store: &S,
    codec: &RecordCodec<T>,
    filter: Option<&Filter>,
) -> Result<Vec<T>>
where
    T: ParquetType,
    S: BlockStore + ?Sized,
{
    let schema = store.schema().unwrap_or(codec.schema());
    let predicate = filter
        .map(|f| f.resolve(schema, codec.config()))
        .transpose()?;
    let rows = store.scan(predicate.as_ref())?;
    codec.decode_each(rows).collect()
}

/// Generic read: the stored schema together with the raw rows.
pub fn read_rows<S>(
    store: &S,
    config: &Configuration,
    filter: Option<&Filter>,
) -> Result<(MessageSchema, Vec<Row>)>
where
    S: BlockStore + ?Sized,
{
    let schema = store
        .schema()
        .ok_or_else(|| Error::NoSchemaAvailable("block store holds no schema".into()))?;
    let predicate = filter.map(|f| f.resolve(schema, config)).transpose()?;
    let rows = store.scan(predicate.as_ref())?;
    Ok((schema.clone(), rows))
}
