//! Mapping between native Rust values and a columnar storage model.
//!
//! From a type's structural description this crate derives a codec to and
//! from generic [`Value`] trees, a [`SchemaNode`] describing its physical and
//! logical storage, and [`FilterPredicate`]s that prune blocks by their
//! min/max statistics. All three honour the format policies of an explicit
//! [`Configuration`].

extern crate self as colcodec;

pub mod catalog;
pub mod codec;
pub mod config;
mod convert;
pub mod derivation;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod path;
pub mod policy;
pub mod predicate;
pub mod registry;
pub mod schema;
pub mod stats;
pub mod store;
pub mod value;

pub use colcodec_derive::ParquetRecord;

pub use catalog::{Catalog, RecordCodec};
pub use codec::{Context, ParquetType, decode, encode, message_schema_of, schema_of};
pub use config::Configuration;
pub use error::{Error, Result};
pub use filter::{Col, Filter, FilterValue, Literal};
pub use path::ColumnPath;
pub use policy::{DecimalFormat, DecimalPhysical, TimestampFormat};
pub use predicate::{CmpOp, FilterPredicate, Truth};
pub use registry::{CustomCodec, Registry};
pub use schema::{
    Field, GroupNode, LeafNode, ListNode, LogicalType, MapNode, MessageSchema, PhysicalType,
    Repetition, SchemaNode, TimeUnit,
};
pub use stats::{BlockStatistics, ColumnOrder, ColumnStatistics, StatValue};
pub use store::{BlockStore, read_records, read_rows, write_records};
pub use value::{DecimalValue, ListValue, MapValue, Row, Value, ValueKind};
