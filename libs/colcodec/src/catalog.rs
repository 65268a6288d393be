//! Derived per-type artifacts and the cache that shares them.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::codec::{Context, ParquetType};
use crate::config::Configuration;
use crate::derivation;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::predicate::FilterPredicate;
use crate::registry::Registry;
use crate::schema::MessageSchema;
use crate::value::{Row, Value};

/// Encoder, decoder and write-time schema of a record type under one
/// configuration. Immutable once derived.
pub struct RecordCodec<T> {
    config: Configuration,
    registry: Arc<Registry>,
    schema: MessageSchema,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ParquetType> RecordCodec<T> {
    /// Derive and cross-check the codec and schema of `T`. Fails before any
    /// record is touched when `T` has no codec, no schema, a structured map
    /// key, disagreeing shapes or a non-record root.
    pub fn derive(config: &Configuration, registry: Arc<Registry>) -> Result<Self> {
        let descriptor = T::descriptor();
        let node = derivation::derive_checked(&descriptor, config, &registry)?;
        let schema = MessageSchema::new(descriptor.key.short_name(), node)?;
        Ok(Self {
            config: *config,
            registry,
            schema,
            _marker: PhantomData,
        })
    }

    fn context(&self) -> Context<'_> {
        Context::new(&self.config, &self.registry)
    }

    pub fn encode(&self, record: &T) -> Result<Row> {
        match self.context().encode(record)? {
            Value::Row(row) => Ok(row),
            other => Err(Error::shape_mismatch(format!(
                "record codec emitted {} at the root",
                other.kind()
            ))),
        }
    }

    pub fn decode(&self, row: Row) -> Result<T> {
        self.context().decode(Value::Row(row))
    }

    /// Decode a batch; each record fails on its own.
    pub fn decode_each<'a, I>(&'a self, rows: I) -> impl Iterator<Item = Result<T>> + 'a
    where
        I: IntoIterator<Item = Row>,
        I::IntoIter: 'a,
    {
        rows.into_iter().map(move |row| self.decode(row))
    }

    pub fn schema(&self) -> &MessageSchema {
        &self.schema
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Resolve a native filter against this type's schema.
    pub fn filter(&self, filter: &Filter) -> Result<FilterPredicate> {
        filter.resolve(&self.schema, &self.config)
    }
}

type CacheKey = (TypeId, Configuration);

/// Registry plus a concurrent cache of derived [`RecordCodec`]s keyed by
/// type and configuration.
pub struct Catalog {
    registry: Arc<Registry>,
    cache: RwLock<HashMap<CacheKey, Arc<dyn Any + Send + Sync>>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::with_registry(Arc::new(Registry::default()))
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("registry", &self.registry)
            .field("cached", &self.len())
            .finish()
    }
}

impl Catalog {
    pub fn new(registry: Registry) -> Self {
        Self::with_registry(Arc::new(registry))
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, Arc<dyn Any + Send + Sync>>> {
        match self.cache.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("derivation cache read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, Arc<dyn Any + Send + Sync>>> {
        match self.cache.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("derivation cache write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Cached codec for `T` under `config`, derived on first use.
    ///
    /// Concurrent misses may derive twice; the first artifact stored wins.
    /// Failures are not cached.
    pub fn record_codec<T: ParquetType>(
        &self,
        config: &Configuration,
    ) -> Result<Arc<RecordCodec<T>>> {
        let key = (TypeId::of::<T>(), *config);
        let ty = std::any::type_name::<T>();

        let cached = self.read_cache().get(&key).cloned();
        if let Some(hit) = cached.and_then(|a| a.downcast::<RecordCodec<T>>().ok()) {
            tracing::debug!(ty, "derivation cache hit");
            return Ok(hit);
        }

        tracing::debug!(ty, ?config, "derivation cache miss");
        let derived = Arc::new(RecordCodec::<T>::derive(config, Arc::clone(&self.registry))?);

        let stored = {
            let mut guard = self.write_cache();
            let entry = guard
                .entry(key)
                .or_insert_with(|| Arc::clone(&derived) as Arc<dyn Any + Send + Sync>);
            Arc::clone(entry)
        };
        Ok(stored.downcast::<RecordCodec<T>>().unwrap_or(derived))
    }

    pub fn message_schema<T: ParquetType>(&self, config: &Configuration) -> Result<MessageSchema> {
        self.record_codec::<T>(config).map(|codec| codec.schema().clone())
    }

    pub fn len(&self) -> usize {
        self.read_cache().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
