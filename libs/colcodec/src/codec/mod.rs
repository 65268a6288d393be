//! Native ⇄ value-tree codecs.
//!
//! Every nested encode and decode goes through [`Context`], which consults
//! the [`Registry`] before falling back to the type's own [`ParquetType`]
//! impl.

pub mod collection;
pub mod decimal;
pub mod primitive;
pub mod temporal;

use crate::config::Configuration;
use crate::derivation;
use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::schema::{MessageSchema, SchemaNode};
use crate::value::{Row, Value};

/// Native-side capability: a structural description plus the two
/// conversions to and from the generic value tree.
///
/// Implemented for built-in scalars and collections here, for structs by
/// `#[derive(ParquetRecord)]`, and for registry-only types by
/// [`registered_type!`](crate::registered_type).
pub trait ParquetType: Sized + 'static {
    fn descriptor() -> TypeDescriptor;

    fn encode_value(&self, ctx: &Context<'_>) -> Result<Value>;

    fn decode_value(value: Value, ctx: &Context<'_>) -> Result<Self>;
}

/// Configuration and overrides threaded through one encode or decode.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    config: &'a Configuration,
    registry: &'a Registry,
}

impl<'a> Context<'a> {
    pub fn new(config: &'a Configuration, registry: &'a Registry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &'a Configuration {
        self.config
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn encode<T: ParquetType>(&self, value: &T) -> Result<Value> {
        if !self.registry.is_empty() {
            if let Some(codec) = self.registry.codec::<T>() {
                return codec.encode(value, self);
            }
        }
        value.encode_value(self)
    }

    pub fn decode<T: ParquetType>(&self, value: Value) -> Result<T> {
        if !self.registry.is_empty() {
            if let Some(codec) = self.registry.codec::<T>() {
                return codec.decode(value, self);
            }
        }
        T::decode_value(value, self)
    }

    /// Encode one record field; errors are anchored at `name`.
    pub fn encode_field<T: ParquetType>(&self, name: &str, value: &T) -> Result<Value> {
        self.encode(value).map_err(|e| e.within(name))
    }

    /// Take and decode one record field. A missing field decodes as null.
    pub fn decode_field<T: ParquetType>(&self, row: &mut Row, name: &str) -> Result<T> {
        let value = row.take(name).unwrap_or(Value::Null);
        self.decode(value).map_err(|e| e.within(name))
    }
}

pub fn expect_row(value: Value) -> Result<Row> {
    match value {
        Value::Row(row) => Ok(row),
        other => Err(Error::decode_mismatch("row", &other)),
    }
}

/// Encode with no registered overrides.
pub fn encode<T: ParquetType>(value: &T, config: &Configuration) -> Result<Value> {
    Context::new(config, Registry::empty()).encode(value)
}

/// Decode with no registered overrides.
pub fn decode<T: ParquetType>(value: Value, config: &Configuration) -> Result<T> {
    Context::new(config, Registry::empty()).decode(value)
}

/// Derive and cross-check the schema of `T` with no registered overrides.
pub fn schema_of<T: ParquetType>(config: &Configuration) -> Result<SchemaNode> {
    derivation::derive_checked(&T::descriptor(), config, Registry::empty())
}

/// Write-time schema of `T`. Fails with `InvalidRoot` unless `T` is a record.
pub fn message_schema_of<T: ParquetType>(config: &Configuration) -> Result<MessageSchema> {
    let descriptor = T::descriptor();
    let node = derivation::derive_checked(&descriptor, config, Registry::empty())?;
    MessageSchema::new(descriptor.key.short_name(), node)
}

/// Declare a type whose codec and schema come only from a [`Registry`].
///
/// Without a registration, derivation fails with `NoCodecAvailable` /
/// `NoSchemaAvailable`.
///
/// [`Registry`]: crate::registry::Registry
#[macro_export]
macro_rules! registered_type {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::codec::ParquetType for $ty {
            fn descriptor() -> $crate::descriptor::TypeDescriptor {
                $crate::descriptor::TypeDescriptor::opaque::<$ty>()
            }

            fn encode_value(
                &self,
                _ctx: &$crate::codec::Context<'_>,
            ) -> $crate::Result<$crate::value::Value> {
                ::std::result::Result::Err($crate::Error::NoCodecAvailable(
                    ::std::any::type_name::<$ty>().to_string(),
                ))
            }

            fn decode_value(
                _value: $crate::value::Value,
                _ctx: &$crate::codec::Context<'_>,
            ) -> $crate::Result<Self> {
                ::std::result::Result::Err($crate::Error::NoCodecAvailable(
                    ::std::any::type_name::<$ty>().to_string(),
                ))
            }
        }
    )+};
}
