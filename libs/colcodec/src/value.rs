use std::fmt;

use bytes::Bytes;

use crate::codec::decimal::unscaled_from_bytes;

// ═══════════════════════════════════════════════════════════════
//  Value
// ═══════════════════════════════════════════════════════════════

/// Generic value tree. Every record passes through it between the native
/// codecs and the block store.
///
/// Construction never validates against a schema; see
/// [`SchemaNode::validate`](crate::schema::SchemaNode::validate).
/// Equality is structural and order-sensitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int32(i32),
    Int64(i64),
    Boolean(bool),
    Float(f32),
    Double(f64),
    /// Raw binary, UTF-8 strings, fixed-length decimals and INT96 timestamps.
    Binary(Bytes),
    /// Decimal reported by a block store together with its persisted scale.
    Decimal(DecimalValue),
    Row(Row),
    Map(MapValue),
    List(ListValue),
}

/// Variant tag of a [`Value`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Int32,
    Int64,
    Boolean,
    Float,
    Double,
    Binary,
    Decimal,
    Row,
    Map,
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::Boolean => "boolean",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Binary => "binary",
            ValueKind::Decimal => "decimal",
            ValueKind::Row => "row",
            ValueKind::Map => "map",
            ValueKind::List => "list",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Binary(_) => ValueKind::Binary,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Row(_) => ValueKind::Row,
            Value::Map(_) => ValueKind::Map,
            Value::List(_) => ValueKind::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Primitive scalars are the only values allowed as map keys.
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            Value::Null | Value::Row(_) | Value::Map(_) | Value::List(_)
        )
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Value::Binary(bytes.into())
    }

    /// UTF-8 string stored as binary.
    pub fn string(s: &str) -> Self {
        Value::Binary(Bytes::copy_from_slice(s.as_bytes()))
    }

    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Value::Row(row) => Some(row),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListValue> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Binary(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<DecimalValue> for Value {
    fn from(v: DecimalValue) -> Self {
        Value::Decimal(v)
    }
}

impl From<Row> for Value {
    fn from(v: Row) -> Self {
        Value::Row(v)
    }
}

impl From<MapValue> for Value {
    fn from(v: MapValue) -> Self {
        Value::Map(v)
    }
}

impl From<ListValue> for Value {
    fn from(v: ListValue) -> Self {
        Value::List(v)
    }
}

// ═══════════════════════════════════════════════════════════════
//  DecimalValue
// ═══════════════════════════════════════════════════════════════

/// Decimal as persisted: unscaled integer plus the precision and scale the
/// writer declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecimalValue {
    pub unscaled: i128,
    pub precision: u32,
    pub scale: u32,
}

impl DecimalValue {
    pub fn new(unscaled: i128, precision: u32, scale: u32) -> Self {
        Self {
            unscaled,
            precision,
            scale,
        }
    }

    /// Lift a physical decimal scalar (`Int32`, `Int64` or big-endian
    /// `Binary`) using the precision and scale of the stored column.
    pub fn from_physical(value: &Value, precision: u32, scale: u32) -> Option<Self> {
        let unscaled = match value {
            Value::Int32(v) => i128::from(*v),
            Value::Int64(v) => i128::from(*v),
            Value::Binary(bytes) => unscaled_from_bytes(bytes)?,
            Value::Decimal(d) => return Some(*d),
            _ => return None,
        };
        Some(Self::new(unscaled, precision, scale))
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.unsigned_abs().to_string();
        let sign = if self.unscaled < 0 { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

// ═══════════════════════════════════════════════════════════════
//  Row
// ═══════════════════════════════════════════════════════════════

/// Ordered named fields. Field names are unique; iteration follows
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Insert a field. An existing field of the same name is replaced in
    /// place, keeping its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.fields.iter_mut().find(|(k, _)| *k == name) {
            entry.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Builder form of [`Row::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Remove a field and return its value.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

// ═══════════════════════════════════════════════════════════════
//  MapValue
// ═══════════════════════════════════════════════════════════════

/// Key/value pairs in insertion order. Keys must be primitive scalars; this
/// is checked when the map is matched against a schema, not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapValue {
    entries: Vec<(Value, Value)>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert an entry, replacing the value of an equal key in place.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for MapValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MapValue::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for MapValue {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ═══════════════════════════════════════════════════════════════
//  ListValue
// ═══════════════════════════════════════════════════════════════

/// Ordered elements of one logical type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListValue {
    elements: Vec<Value>,
}

impl ListValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.elements.push(value.into());
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<V: Into<Value>> FromIterator<V> for ListValue {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl IntoIterator for ListValue {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}
