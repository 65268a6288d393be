//! User-supplied codec and schema overrides.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::codec::Context;
use crate::config::Configuration;
use crate::descriptor::TypeKey;
use crate::error::Result;
use crate::schema::SchemaNode;
use crate::value::Value;

/// Codec for a type that the derivation engine should not build itself.
///
/// A registered codec always wins over the type's own [`ParquetType`]
/// impl, at every nesting level.
///
/// [`ParquetType`]: crate::codec::ParquetType
pub trait CustomCodec<T>: Send + Sync {
    fn encode(&self, value: &T, ctx: &Context<'_>) -> Result<Value>;

    fn decode(&self, value: Value, ctx: &Context<'_>) -> Result<T>;

    /// Storage shape of the values this codec emits.
    fn schema(&self, config: &Configuration) -> SchemaNode;
}

type SchemaFn = Arc<dyn Fn(&Configuration) -> SchemaNode + Send + Sync>;

struct Entry {
    name: &'static str,
    /// `Arc<dyn CustomCodec<T>>` behind `Any`.
    codec: Option<Arc<dyn Any + Send + Sync>>,
    codec_schema: Option<SchemaFn>,
    schema: Option<SchemaFn>,
}

impl Entry {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            codec: None,
            codec_schema: None,
            schema: None,
        }
    }
}

/// Lookup table from native type to registered overrides.
///
/// Populated before use, then shared read-only behind an `Arc`.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<TypeId, Entry>,
}

static EMPTY: LazyLock<Registry> = LazyLock::new(Registry::default);

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared registry with no overrides.
    pub fn empty() -> &'static Registry {
        &EMPTY
    }

    /// Register a codec for `T`. Its declared schema becomes `T`'s schema
    /// unless a schema override is registered as well.
    pub fn register_codec<T, C>(&mut self, codec: C) -> &mut Self
    where
        T: 'static,
        C: CustomCodec<T> + 'static,
    {
        let key = TypeKey::of::<T>();
        let codec: Arc<dyn CustomCodec<T>> = Arc::new(codec);
        let schema_codec = Arc::clone(&codec);
        let entry = self
            .entries
            .entry(key.id)
            .or_insert_with(|| Entry::new(key.name));
        entry.codec = Some(Arc::new(codec));
        entry.codec_schema = Some(Arc::new(move |cfg: &Configuration| {
            schema_codec.schema(cfg)
        }));
        tracing::debug!(ty = key.name, "registered custom codec");
        self
    }

    /// Override the schema derived for `T` without touching its codec.
    pub fn register_schema<T, F>(&mut self, schema: F) -> &mut Self
    where
        T: 'static,
        F: Fn(&Configuration) -> SchemaNode + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let entry = self
            .entries
            .entry(key.id)
            .or_insert_with(|| Entry::new(key.name));
        entry.schema = Some(Arc::new(schema));
        tracing::debug!(ty = key.name, "registered schema override");
        self
    }

    pub fn codec<T: 'static>(&self) -> Option<Arc<dyn CustomCodec<T>>> {
        self.entries
            .get(&TypeId::of::<T>())?
            .codec
            .as_ref()?
            .downcast_ref::<Arc<dyn CustomCodec<T>>>()
            .cloned()
    }

    pub fn has_codec(&self, key: &TypeKey) -> bool {
        self.entries
            .get(&key.id)
            .is_some_and(|entry| entry.codec.is_some())
    }

    /// Schema declared by the registered codec for `key`, if any.
    pub fn codec_schema(&self, key: &TypeKey, config: &Configuration) -> Option<SchemaNode> {
        let entry = self.entries.get(&key.id)?;
        entry.codec_schema.as_ref().map(|schema| schema(config))
    }

    /// Explicit schema override for `key`, if any.
    pub fn schema_override(&self, key: &TypeKey, config: &Configuration) -> Option<SchemaNode> {
        let entry = self.entries.get(&key.id)?;
        entry.schema.as_ref().map(|schema| schema(config))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.values().map(|e| e.name).collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("types", &names).finish()
    }
}
