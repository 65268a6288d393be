use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use crate::codec::{Context, ParquetType};
use crate::descriptor::{CollectionKind, TypeDescriptor};
use crate::error::{Error, Result};
use crate::value::{ListValue, MapValue, Value};

// ═══════════════════════════════════════════════════════════════
//  Optional
// ═══════════════════════════════════════════════════════════════

impl<T: ParquetType> ParquetType for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional::<Self, T>()
    }

    fn encode_value(&self, ctx: &Context<'_>) -> Result<Value> {
        match self {
            Some(value) => match ctx.encode(value)? {
                // A present value must stay distinguishable from `None`.
                Value::Null => Err(Error::NoCodecAvailable(
                    std::any::type_name::<Self>().to_string(),
                )),
                encoded => Ok(encoded),
            },
            None => Ok(Value::Null),
        }
    }

    fn decode_value(value: Value, ctx: &Context<'_>) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            value => ctx.decode(value).map(Some),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Sequences and sets
// ═══════════════════════════════════════════════════════════════

fn encode_elements<'a, T, I>(elements: I, ctx: &Context<'_>) -> Result<Value>
where
    T: ParquetType + 'a,
    I: IntoIterator<Item = &'a T>,
{
    elements
        .into_iter()
        .enumerate()
        .map(|(i, element)| ctx.encode(element).map_err(|e| e.within(format!("[{i}]"))))
        .collect::<Result<ListValue>>()
        .map(Value::List)
}

fn decode_elements<T, C>(value: Value, ctx: &Context<'_>) -> Result<C>
where
    T: ParquetType,
    C: FromIterator<T>,
{
    match value {
        Value::List(list) => list
            .into_iter()
            .enumerate()
            .map(|(i, element)| ctx.decode::<T>(element).map_err(|e| e.within(format!("[{i}]"))))
            .collect(),
        other => Err(Error::decode_mismatch("list", &other)),
    }
}

impl<T: ParquetType> ParquetType for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list::<Self, T>(CollectionKind::Sequence)
    }

    fn encode_value(&self, ctx: &Context<'_>) -> Result<Value> {
        encode_elements(self, ctx)
    }

    fn decode_value(value: Value, ctx: &Context<'_>) -> Result<Self> {
        decode_elements(value, ctx)
    }
}

impl<T: ParquetType> ParquetType for VecDeque<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list::<Self, T>(CollectionKind::Sequence)
    }

    fn encode_value(&self, ctx: &Context<'_>) -> Result<Value> {
        encode_elements(self, ctx)
    }

    fn decode_value(value: Value, ctx: &Context<'_>) -> Result<Self> {
        decode_elements(value, ctx)
    }
}

impl<T: ParquetType + Eq + Hash> ParquetType for HashSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list::<Self, T>(CollectionKind::Set)
    }

    fn encode_value(&self, ctx: &Context<'_>) -> Result<Value> {
        encode_elements(self, ctx)
    }

    fn decode_value(value: Value, ctx: &Context<'_>) -> Result<Self> {
        decode_elements(value, ctx)
    }
}

impl<T: ParquetType + Ord> ParquetType for BTreeSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list::<Self, T>(CollectionKind::Set)
    }

    fn encode_value(&self, ctx: &Context<'_>) -> Result<Value> {
        encode_elements(self, ctx)
    }

    fn decode_value(value: Value, ctx: &Context<'_>) -> Result<Self> {
        decode_elements(value, ctx)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Maps
// ═══════════════════════════════════════════════════════════════

fn encode_entries<'a, K, V, I>(entries: I, ctx: &Context<'_>) -> Result<Value>
where
    K: ParquetType + 'a,
    V: ParquetType + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut map = MapValue::new();
    for (key, value) in entries {
        let key = ctx.encode(key).map_err(|e| e.within("key"))?;
        // Registered key codecs are only known at runtime.
        if !key.is_primitive() {
            return Err(Error::key_type_mismatch(key.kind().to_string()).within("key"));
        }
        let value = ctx.encode(value).map_err(|e| e.within("value"))?;
        map.insert(key, value);
    }
    Ok(Value::Map(map))
}

fn decode_entries<K, V, C>(value: Value, ctx: &Context<'_>) -> Result<C>
where
    K: ParquetType,
    V: ParquetType,
    C: FromIterator<(K, V)>,
{
    match value {
        Value::Map(map) => map
            .into_iter()
            .map(|(key, value)| {
                let key = ctx.decode::<K>(key).map_err(|e| e.within("key"))?;
                let value = ctx.decode::<V>(value).map_err(|e| e.within("value"))?;
                Ok::<_, Error>((key, value))
            })
            .collect(),
        other => Err(Error::decode_mismatch("map", &other)),
    }
}

impl<K, V> ParquetType for HashMap<K, V>
where
    K: ParquetType + Eq + Hash,
    V: ParquetType,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map::<Self, K, V>()
    }

    fn encode_value(&self, ctx: &Context<'_>) -> Result<Value> {
        encode_entries(self, ctx)
    }

    fn decode_value(value: Value, ctx: &Context<'_>) -> Result<Self> {
        decode_entries(value, ctx)
    }
}

impl<K, V> ParquetType for BTreeMap<K, V>
where
    K: ParquetType + Ord,
    V: ParquetType,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map::<Self, K, V>()
    }

    fn encode_value(&self, ctx: &Context<'_>) -> Result<Value> {
        encode_entries(self, ctx)
    }

    fn decode_value(value: Value, ctx: &Context<'_>) -> Result<Self> {
        decode_entries(value, ctx)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::codec::{decode, encode};
    use crate::config::Configuration;
    use crate::path::ColumnPath;

    #[test]
    fn option_maps_to_null() {
        let cfg = Configuration::default();
        assert_eq!(encode(&None::<i32>, &cfg).unwrap(), Value::Null);
        assert_eq!(encode(&Some(3), &cfg).unwrap(), Value::Int32(3));
        assert_eq!(decode::<Option<i32>>(Value::Null, &cfg).unwrap(), None);
        assert_eq!(decode::<Option<i32>>(Value::Int32(3), &cfg).unwrap(), Some(3));
    }

    #[test]
    fn present_value_encoding_to_null_is_rejected() {
        let cfg = Configuration::default();
        assert_eq!(encode(&None::<Option<i32>>, &cfg).unwrap(), Value::Null);
        assert_eq!(encode(&Some(Some(4)), &cfg).unwrap(), Value::Int32(4));
        let err = encode(&Some(None::<i32>), &cfg).unwrap_err();
        assert!(matches!(err, Error::NoCodecAvailable(_)));
    }

    #[test]
    fn sequence_order_is_preserved() {
        let cfg = Configuration::default();
        let values = vec![3i64, 1, 2];
        let encoded = encode(&values, &cfg).unwrap();
        assert_eq!(
            encoded,
            Value::List([3i64, 1, 2].into_iter().collect())
        );
        assert_eq!(decode::<Vec<i64>>(encoded, &cfg).unwrap(), values);
    }

    #[test]
    fn btree_map_round_trips() {
        let cfg = Configuration::default();
        let map: BTreeMap<String, Vec<i32>> =
            [("a".to_string(), vec![1]), ("b".to_string(), vec![])].into_iter().collect();
        let encoded = encode(&map, &cfg).unwrap();
        assert_eq!(encoded.as_map().map(MapValue::len), Some(2));
        assert_eq!(decode::<BTreeMap<String, Vec<i32>>>(encoded, &cfg).unwrap(), map);
    }

    #[test]
    fn element_errors_carry_index() {
        let cfg = Configuration::default();
        let list = Value::List([Value::Int32(1), Value::string("x")].into_iter().collect());
        let err = decode::<Vec<i32>>(list, &cfg).unwrap_err();
        assert_eq!(err.path(), Some(&ColumnPath::new(vec!["[1]".into()])));
    }

    #[test]
    fn map_value_errors_carry_part() {
        let cfg = Configuration::default();
        let map = Value::Map([(Value::string("k"), Value::Boolean(true))].into_iter().collect());
        let err = decode::<HashMap<String, i64>>(map, &cfg).unwrap_err();
        assert_eq!(err.path(), Some(&ColumnPath::new(vec!["value".into()])));
    }

    #[test]
    fn structured_runtime_keys_are_rejected() {
        let cfg = Configuration::default();
        let map: HashMap<Vec<i32>, i32> = [(vec![1], 1)].into_iter().collect();
        let err = encode(&map, &cfg).unwrap_err();
        assert!(matches!(err, Error::KeyTypeMismatch { .. }));
    }
}
