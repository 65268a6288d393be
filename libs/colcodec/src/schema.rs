use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::ColumnPath;
use crate::value::{Row, Value};

// ═══════════════════════════════════════════════════════════════
//  Leaf types
// ═══════════════════════════════════════════════════════════════

/// On-disk scalar encoding of a leaf column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    /// 96-bit fixed binary. Statistics for it are not usable for pruning.
    Int96,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray(usize),
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalType::Boolean => f.write_str("boolean"),
            PhysicalType::Int32 => f.write_str("int32"),
            PhysicalType::Int64 => f.write_str("int64"),
            PhysicalType::Int96 => f.write_str("int96"),
            PhysicalType::Float => f.write_str("float"),
            PhysicalType::Double => f.write_str("double"),
            PhysicalType::ByteArray => f.write_str("binary"),
            PhysicalType::FixedLenByteArray(len) => write!(f, "fixed_len_byte_array({len})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Millis,
    Micros,
    Nanos,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Millis => f.write_str("MILLIS"),
            TimeUnit::Micros => f.write_str("MICROS"),
            TimeUnit::Nanos => f.write_str("NANOS"),
        }
    }
}

/// Semantic annotation layered on a physical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    String,
    Decimal { precision: u32, scale: u32 },
    Date,
    /// UTC-adjusted instant.
    Timestamp { unit: TimeUnit },
    Integer { bit_width: u8, signed: bool },
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::String => f.write_str("STRING"),
            LogicalType::Decimal { precision, scale } => write!(f, "DECIMAL({precision},{scale})"),
            LogicalType::Date => f.write_str("DATE"),
            LogicalType::Timestamp { unit } => write!(f, "TIMESTAMP({unit},true)"),
            LogicalType::Integer { bit_width, signed } => {
                write!(f, "INTEGER({bit_width},{signed})")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repetition {
    #[default]
    Required,
    Optional,
}

impl fmt::Display for Repetition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repetition::Required => f.write_str("required"),
            Repetition::Optional => f.write_str("optional"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Nodes
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    pub physical: PhysicalType,
    pub logical: Option<LogicalType>,
    pub repetition: Repetition,
}

impl LeafNode {
    pub fn new(physical: PhysicalType) -> Self {
        Self {
            physical,
            logical: None,
            repetition: Repetition::Required,
        }
    }

    pub fn with_logical(mut self, logical: LogicalType) -> Self {
        self.logical = Some(logical);
        self
    }

    pub fn is_filterable(&self) -> bool {
        self.physical != PhysicalType::Int96
    }

    fn describe(&self) -> String {
        match self.logical {
            Some(logical) => format!("{} {} ({})", self.repetition, self.physical, logical),
            None => format!("{} {}", self.repetition, self.physical),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub node: SchemaNode,
}

impl Field {
    pub fn new(name: impl Into<String>, node: SchemaNode) -> Self {
        Self {
            name: name.into(),
            node,
        }
    }
}

/// Named children in declared order; mirrors [`Row`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    pub fields: Vec<Field>,
    pub repetition: Repetition,
}

impl GroupNode {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            repetition: Repetition::Required,
        }
    }

    pub fn field(&self, name: &str) -> Option<&SchemaNode> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.node)
    }

    /// Check a row against this group. Row fields the group does not
    /// declare are rejected; declared fields missing from the row count as
    /// null.
    pub fn validate_row(&self, row: &Row) -> Result<()> {
        for field in &self.fields {
            let value = row.get(&field.name).unwrap_or(&Value::Null);
            field.node.validate(value).map_err(|e| e.within(&field.name))?;
        }
        if let Some(extra) = row.names().find(|name| self.field(name).is_none()) {
            return Err(Error::non_conforming("no such field", "unexpected field").within(extra));
        }
        Ok(())
    }
}

/// Repeated element of one type; mirrors [`ListValue`](crate::value::ListValue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListNode {
    pub element: Box<SchemaNode>,
    pub repetition: Repetition,
}

/// Key/value pairs; the key must be a required leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapNode {
    pub key: Box<SchemaNode>,
    pub value: Box<SchemaNode>,
    pub repetition: Repetition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Group,
    List,
    Map,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Leaf => f.write_str("leaf"),
            NodeKind::Group => f.write_str("group"),
            NodeKind::List => f.write_str("list"),
            NodeKind::Map => f.write_str("map"),
        }
    }
}

/// One position in the schema tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Leaf(LeafNode),
    Group(GroupNode),
    List(ListNode),
    Map(MapNode),
}

impl From<LeafNode> for SchemaNode {
    fn from(leaf: LeafNode) -> Self {
        SchemaNode::Leaf(leaf)
    }
}

impl From<GroupNode> for SchemaNode {
    fn from(group: GroupNode) -> Self {
        SchemaNode::Group(group)
    }
}

impl SchemaNode {
    pub fn leaf(physical: PhysicalType) -> Self {
        SchemaNode::Leaf(LeafNode::new(physical))
    }

    pub fn annotated(physical: PhysicalType, logical: LogicalType) -> Self {
        SchemaNode::Leaf(LeafNode::new(physical).with_logical(logical))
    }

    pub fn group<N: Into<String>>(fields: impl IntoIterator<Item = (N, SchemaNode)>) -> Self {
        SchemaNode::Group(GroupNode::new(
            fields
                .into_iter()
                .map(|(name, node)| Field::new(name, node))
                .collect(),
        ))
    }

    pub fn list(element: SchemaNode) -> Self {
        SchemaNode::List(ListNode {
            element: Box::new(element),
            repetition: Repetition::Required,
        })
    }

    pub fn map(key: SchemaNode, value: SchemaNode) -> Self {
        SchemaNode::Map(MapNode {
            key: Box::new(key),
            value: Box::new(value),
            repetition: Repetition::Required,
        })
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            SchemaNode::Leaf(_) => NodeKind::Leaf,
            SchemaNode::Group(_) => NodeKind::Group,
            SchemaNode::List(_) => NodeKind::List,
            SchemaNode::Map(_) => NodeKind::Map,
        }
    }

    pub fn repetition(&self) -> Repetition {
        match self {
            SchemaNode::Leaf(n) => n.repetition,
            SchemaNode::Group(n) => n.repetition,
            SchemaNode::List(n) => n.repetition,
            SchemaNode::Map(n) => n.repetition,
        }
    }

    pub fn with_repetition(mut self, repetition: Repetition) -> Self {
        match &mut self {
            SchemaNode::Leaf(n) => n.repetition = repetition,
            SchemaNode::Group(n) => n.repetition = repetition,
            SchemaNode::List(n) => n.repetition = repetition,
            SchemaNode::Map(n) => n.repetition = repetition,
        }
        self
    }

    pub fn optional(self) -> Self {
        self.with_repetition(Repetition::Optional)
    }

    pub fn is_optional(&self) -> bool {
        self.repetition() == Repetition::Optional
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            SchemaNode::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            SchemaNode::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Walk `path` through nested groups. Lists and maps are not entered.
    pub fn resolve(&self, path: &ColumnPath) -> Option<&SchemaNode> {
        let mut node = self;
        for segment in path.segments() {
            node = node.as_group()?.field(segment)?;
        }
        Some(node)
    }

    /// Every leaf reachable through groups only, with its column path.
    pub fn leaves(&self) -> Vec<(ColumnPath, &LeafNode)> {
        let mut out = Vec::new();
        collect_leaves(self, ColumnPath::root(), &mut out);
        out
    }

    /// Match a value tree against this node.
    pub fn validate(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            return if self.is_optional() {
                Ok(())
            } else {
                Err(Error::non_conforming(self.describe(), "null"))
            };
        }
        match (self, value) {
            (SchemaNode::Leaf(leaf), value) => validate_leaf(leaf, value),
            (SchemaNode::Group(group), Value::Row(row)) => group.validate_row(row),
            (SchemaNode::List(list), Value::List(elements)) => {
                for (i, element) in elements.iter().enumerate() {
                    list.element
                        .validate(element)
                        .map_err(|e| e.within(format!("[{i}]")))?;
                }
                Ok(())
            }
            (SchemaNode::Map(map), Value::Map(entries)) => {
                for (key, value) in entries.iter() {
                    if !key.is_primitive() {
                        return Err(Error::non_conforming("primitive key", key.kind().to_string())
                            .within("key"));
                    }
                    map.key.validate(key).map_err(|e| e.within("key"))?;
                    map.value.validate(value).map_err(|e| e.within("value"))?;
                }
                Ok(())
            }
            (node, value) => Err(Error::non_conforming(node.describe(), value.kind().to_string())),
        }
    }

    fn describe(&self) -> String {
        match self {
            SchemaNode::Leaf(leaf) => leaf.describe(),
            other => format!("{} {}", other.repetition(), other.kind()),
        }
    }
}

fn collect_leaves<'a>(
    node: &'a SchemaNode,
    path: ColumnPath,
    out: &mut Vec<(ColumnPath, &'a LeafNode)>,
) {
    match node {
        SchemaNode::Leaf(leaf) => out.push((path, leaf)),
        SchemaNode::Group(group) => {
            for field in &group.fields {
                collect_leaves(&field.node, path.child(&field.name), out);
            }
        }
        SchemaNode::List(_) | SchemaNode::Map(_) => {}
    }
}

fn validate_leaf(leaf: &LeafNode, value: &Value) -> Result<()> {
    let ok = match (leaf.physical, value) {
        (_, Value::Decimal(_)) => matches!(leaf.logical, Some(LogicalType::Decimal { .. })),
        (PhysicalType::Boolean, Value::Boolean(_))
        | (PhysicalType::Int32, Value::Int32(_))
        | (PhysicalType::Int64, Value::Int64(_))
        | (PhysicalType::Float, Value::Float(_))
        | (PhysicalType::Double, Value::Double(_))
        | (PhysicalType::ByteArray, Value::Binary(_)) => true,
        (PhysicalType::Int96, Value::Binary(bytes)) => bytes.len() == 12,
        (PhysicalType::FixedLenByteArray(len), Value::Binary(bytes)) => bytes.len() == len,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::non_conforming(leaf.describe(), value.kind().to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════
//  MessageSchema
// ═══════════════════════════════════════════════════════════════

/// Write-time root of a stored unit of data. Always a required group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSchema {
    name: String,
    root: GroupNode,
}

impl MessageSchema {
    pub fn new(name: impl Into<String>, root: SchemaNode) -> Result<Self> {
        let name = name.into();
        match root {
            SchemaNode::Group(group) if group.repetition == Repetition::Required => {
                Ok(Self { name, root: group })
            }
            SchemaNode::Group(_) => Err(Error::InvalidRoot(format!(
                "{name}: root group must be required"
            ))),
            other => Err(Error::InvalidRoot(format!(
                "{name}: root must be a group, found {}",
                other.kind()
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &GroupNode {
        &self.root
    }

    pub fn fields(&self) -> &[Field] {
        &self.root.fields
    }

    pub fn resolve(&self, path: &ColumnPath) -> Option<&SchemaNode> {
        let (first, rest) = path.segments().split_first()?;
        let node = self.root.field(first)?;
        node.resolve(&ColumnPath::new(rest.to_vec()))
    }

    pub fn leaves(&self) -> Vec<(ColumnPath, &LeafNode)> {
        let mut out = Vec::new();
        for field in &self.root.fields {
            collect_leaves(&field.node, ColumnPath::root().child(&field.name), &mut out);
        }
        out
    }

    pub fn validate(&self, row: &Row) -> Result<()> {
        self.root.validate_row(row)
    }

    pub fn into_node(self) -> SchemaNode {
        SchemaNode::Group(self.root)
    }
}

impl fmt::Display for MessageSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "message {} {{", self.name)?;
        for field in &self.root.fields {
            write_node(f, &field.name, &field.node, 1)?;
        }
        f.write_str("}")
    }
}

fn write_node(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    node: &SchemaNode,
    depth: usize,
) -> fmt::Result {
    let pad = "  ".repeat(depth);
    match node {
        SchemaNode::Leaf(leaf) => match leaf.logical {
            Some(logical) => {
                writeln!(f, "{pad}{} {} {name} ({logical});", leaf.repetition, leaf.physical)
            }
            None => writeln!(f, "{pad}{} {} {name};", leaf.repetition, leaf.physical),
        },
        SchemaNode::Group(group) => {
            writeln!(f, "{pad}{} group {name} {{", group.repetition)?;
            for field in &group.fields {
                write_node(f, &field.name, &field.node, depth + 1)?;
            }
            writeln!(f, "{pad}}}")
        }
        SchemaNode::List(list) => {
            writeln!(f, "{pad}{} group {name} (LIST) {{", list.repetition)?;
            writeln!(f, "{pad}  repeated group list {{")?;
            write_node(f, "element", &list.element, depth + 2)?;
            writeln!(f, "{pad}  }}")?;
            writeln!(f, "{pad}}}")
        }
        SchemaNode::Map(map) => {
            writeln!(f, "{pad}{} group {name} (MAP) {{", map.repetition)?;
            writeln!(f, "{pad}  repeated group key_value {{")?;
            write_node(f, "key", &map.key, depth + 2)?;
            write_node(f, "value", &map.value, depth + 2)?;
            writeln!(f, "{pad}  }}")?;
            writeln!(f, "{pad}}}")
        }
    }
}
