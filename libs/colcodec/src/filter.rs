//! Native filters over column paths, resolved against a schema into
//! statistics-domain [`FilterPredicate`]s.

use std::fmt;
use std::ops;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use crate::codec::decimal::{rescale_unscaled, to_fixed_bytes};
use crate::codec::temporal::{days_since_epoch, epoch_offset};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::path::ColumnPath;
use crate::policy::max_unscaled;
use crate::predicate::{CmpOp, FilterPredicate};
use crate::schema::{LeafNode, LogicalType, MessageSchema, PhysicalType, SchemaNode};
use crate::stats::{ColumnOrder, StatValue};

/// Native comparison value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Bytes),
    Decimal(Decimal),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl Literal {
    fn type_name(&self) -> &'static str {
        match self {
            Literal::Boolean(_) => "boolean",
            Literal::Int(_) => "integer",
            Literal::Float(_) => "float",
            Literal::Double(_) => "double",
            Literal::String(_) => "string",
            Literal::Binary(_) => "binary",
            Literal::Decimal(_) => "decimal",
            Literal::Date(_) => "date",
            Literal::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(v) => write!(f, "{v}"),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Double(v) => write!(f, "{v}"),
            Literal::String(v) => write!(f, "{v:?}"),
            Literal::Binary(v) => write!(f, "<{} bytes>", v.len()),
            Literal::Decimal(v) => write!(f, "{v}"),
            Literal::Date(v) => write!(f, "{v}"),
            Literal::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

/// Native types usable as filter literals.
pub trait FilterValue {
    fn into_literal(self) -> Literal;
}

macro_rules! filter_value {
    ($($ty:ty => |$v:ident| $body:expr),+ $(,)?) => {$(
        impl FilterValue for $ty {
            fn into_literal(self) -> Literal {
                let $v = self;
                $body
            }
        }
    )+};
}

filter_value! {
    bool => |v| Literal::Boolean(v),
    i8 => |v| Literal::Int(i64::from(v)),
    i16 => |v| Literal::Int(i64::from(v)),
    i32 => |v| Literal::Int(i64::from(v)),
    i64 => |v| Literal::Int(v),
    f32 => |v| Literal::Float(v),
    f64 => |v| Literal::Double(v),
    String => |v| Literal::String(v),
    &str => |v| Literal::String(v.to_string()),
    Bytes => |v| Literal::Binary(v),
    Decimal => |v| Literal::Decimal(v),
    NaiveDate => |v| Literal::Date(v),
    NaiveDateTime => |v| Literal::Timestamp(v.and_utc()),
    DateTime<Utc> => |v| Literal::Timestamp(v),
    Literal => |v| v,
}

// ═══════════════════════════════════════════════════════════════
//  Filter
// ═══════════════════════════════════════════════════════════════

/// Filter expression over named columns, not yet bound to a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        column: ColumnPath,
        op: CmpOp,
        value: Literal,
    },
    In {
        column: ColumnPath,
        values: Vec<Literal>,
    },
    IsNull {
        column: ColumnPath,
    },
    IsNotNull {
        column: ColumnPath,
    },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn and(self, other: Filter) -> Filter {
        Filter::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Filter) -> Filter {
        Filter::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }

    /// Bind every column to a filterable leaf of `schema` and encode every
    /// literal into that leaf's statistics domain.
    pub fn resolve(
        &self,
        schema: &MessageSchema,
        config: &Configuration,
    ) -> Result<FilterPredicate> {
        let predicate = self.resolve_inner(schema, config)?;
        tracing::debug!(schema = schema.name(), filter = %self, "resolved filter predicate");
        Ok(predicate)
    }

    fn resolve_inner(
        &self,
        schema: &MessageSchema,
        config: &Configuration,
    ) -> Result<FilterPredicate> {
        match self {
            Filter::Compare { column, op, value } => {
                let leaf = filterable_leaf(schema, column)?;
                Ok(FilterPredicate::Compare {
                    column: column.clone(),
                    op: *op,
                    value: encode_literal(value, leaf, config).map_err(|reason| {
                        Error::NotFilterable {
                            path: column.clone(),
                            reason,
                        }
                    })?,
                    order: ColumnOrder::for_leaf(leaf),
                })
            }
            Filter::In { column, values } => {
                let leaf = filterable_leaf(schema, column)?;
                let values = values
                    .iter()
                    .map(|value| encode_literal(value, leaf, config))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|reason| Error::NotFilterable {
                        path: column.clone(),
                        reason,
                    })?;
                Ok(FilterPredicate::In {
                    column: column.clone(),
                    values,
                    order: ColumnOrder::for_leaf(leaf),
                })
            }
            Filter::IsNull { column } => {
                filterable_leaf(schema, column)?;
                Ok(FilterPredicate::IsNull {
                    column: column.clone(),
                })
            }
            Filter::IsNotNull { column } => {
                filterable_leaf(schema, column)?;
                Ok(FilterPredicate::IsNotNull {
                    column: column.clone(),
                })
            }
            Filter::And(a, b) => Ok(FilterPredicate::And(
                Box::new(a.resolve_inner(schema, config)?),
                Box::new(b.resolve_inner(schema, config)?),
            )),
            Filter::Or(a, b) => Ok(FilterPredicate::Or(
                Box::new(a.resolve_inner(schema, config)?),
                Box::new(b.resolve_inner(schema, config)?),
            )),
            Filter::Not(x) => Ok(FilterPredicate::Not(Box::new(x.resolve_inner(schema, config)?))),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Compare { column, op, value } => write!(f, "{column} {op} {value}"),
            Filter::In { column, values } => {
                write!(f, "{column} IN (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
            Filter::IsNull { column } => write!(f, "{column} IS NULL"),
            Filter::IsNotNull { column } => write!(f, "{column} IS NOT NULL"),
            Filter::And(a, b) => write!(f, "({a} AND {b})"),
            Filter::Or(a, b) => write!(f, "({a} OR {b})"),
            Filter::Not(x) => write!(f, "NOT {x}"),
        }
    }
}

impl ops::BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.and(rhs)
    }
}

impl ops::BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        self.or(rhs)
    }
}

impl ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }
}

/// Column reference used to build filters: `Col::new("address.city").eq("Oslo")`.
#[derive(Debug, Clone)]
pub struct Col(ColumnPath);

impl Col {
    pub fn new(path: &str) -> Self {
        Self(ColumnPath::parse(path))
    }

    pub fn path(&self) -> &ColumnPath {
        &self.0
    }

    fn compare(&self, op: CmpOp, value: impl FilterValue) -> Filter {
        Filter::Compare {
            column: self.0.clone(),
            op,
            value: value.into_literal(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn eq(&self, value: impl FilterValue) -> Filter {
        self.compare(CmpOp::Eq, value)
    }

    pub fn not_eq(&self, value: impl FilterValue) -> Filter {
        self.compare(CmpOp::NotEq, value)
    }

    pub fn lt(&self, value: impl FilterValue) -> Filter {
        self.compare(CmpOp::Lt, value)
    }

    pub fn lt_eq(&self, value: impl FilterValue) -> Filter {
        self.compare(CmpOp::LtEq, value)
    }

    pub fn gt(&self, value: impl FilterValue) -> Filter {
        self.compare(CmpOp::Gt, value)
    }

    pub fn gt_eq(&self, value: impl FilterValue) -> Filter {
        self.compare(CmpOp::GtEq, value)
    }

    pub fn is_in<V: FilterValue>(&self, values: impl IntoIterator<Item = V>) -> Filter {
        Filter::In {
            column: self.0.clone(),
            values: values.into_iter().map(FilterValue::into_literal).collect(),
        }
    }

    pub fn is_null(&self) -> Filter {
        Filter::IsNull {
            column: self.0.clone(),
        }
    }

    pub fn is_not_null(&self) -> Filter {
        Filter::IsNotNull {
            column: self.0.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Resolution
// ═══════════════════════════════════════════════════════════════

fn not_filterable(column: &ColumnPath, reason: impl Into<String>) -> Error {
    Error::NotFilterable {
        path: column.clone(),
        reason: reason.into(),
    }
}

/// Walk `column` through groups to a leaf with usable statistics.
fn filterable_leaf<'a>(schema: &'a MessageSchema, column: &ColumnPath) -> Result<&'a LeafNode> {
    let segments = column.segments();
    if segments.is_empty() {
        return Err(not_filterable(column, "empty column path"));
    }
    let mut group = schema.root();
    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        let node = group
            .field(segment)
            .ok_or_else(|| not_filterable(column, format!("no column named '{segment}'")))?;
        match node {
            SchemaNode::Group(inner) if !last => group = inner,
            SchemaNode::Leaf(leaf) if last => {
                if !leaf.is_filterable() {
                    return Err(not_filterable(
                        column,
                        format!("{} columns carry no usable statistics", leaf.physical),
                    ));
                }
                return Ok(leaf);
            }
            SchemaNode::Leaf(_) => {
                return Err(not_filterable(
                    column,
                    format!("'{segment}' is a leaf with no children"),
                ));
            }
            other => {
                return Err(not_filterable(
                    column,
                    format!("'{segment}' is a {}, not a leaf", other.kind()),
                ));
            }
        }
    }
    Err(not_filterable(column, "path does not end at a leaf"))
}

type Encoded = std::result::Result<StatValue, String>;

fn mismatch(literal: &Literal, leaf: &LeafNode) -> String {
    match leaf.logical {
        Some(logical) => format!(
            "{} literal cannot be compared with {} ({logical}) column",
            literal.type_name(),
            leaf.physical
        ),
        None => format!(
            "{} literal cannot be compared with {} column",
            literal.type_name(),
            leaf.physical
        ),
    }
}

fn int32_in_range(v: i64, bits: u8) -> std::result::Result<i32, String> {
    let fits = match bits {
        8 => i8::try_from(v).is_ok(),
        16 => i16::try_from(v).is_ok(),
        _ => i32::try_from(v).is_ok(),
    };
    if fits {
        i32::try_from(v).map_err(|_| format!("{v} out of int32 range"))
    } else {
        Err(format!("{v} out of int{bits} range"))
    }
}

/// Encode a literal into the statistics domain of `leaf`.
pub(crate) fn encode_literal(
    literal: &Literal,
    leaf: &LeafNode,
    config: &Configuration,
) -> Encoded {
    match (leaf.logical, literal) {
        (Some(LogicalType::Decimal { precision, scale }), Literal::Decimal(d)) => {
            encode_decimal_literal(d.mantissa(), d.scale(), precision, scale, leaf)
        }
        (Some(LogicalType::Decimal { precision, scale }), Literal::Int(v)) => {
            encode_decimal_literal(i128::from(*v), 0, precision, scale, leaf)
        }
        (Some(LogicalType::Decimal { .. }), _) => Err(mismatch(literal, leaf)),

        (Some(LogicalType::Date), Literal::Date(date)) => i32::try_from(days_since_epoch(date))
            .map(StatValue::Int32)
            .map_err(|_| format!("{date} out of date range")),
        (Some(LogicalType::Date), _) => Err(mismatch(literal, leaf)),

        (Some(LogicalType::Timestamp { unit }), Literal::Timestamp(ts))
            if leaf.physical == PhysicalType::Int64 =>
        {
            epoch_offset(ts, unit)
                .map(StatValue::Int64)
                .ok_or_else(|| format!("{} out of range for {unit}", ts.to_rfc3339()))
        }
        (Some(LogicalType::Timestamp { .. }), _) => Err(mismatch(literal, leaf)),

        (Some(LogicalType::String), Literal::String(s)) => {
            Ok(StatValue::Bytes(Bytes::copy_from_slice(s.as_bytes())))
        }
        (Some(LogicalType::String), _) => Err(mismatch(literal, leaf)),

        (Some(LogicalType::Integer { bit_width, .. }), Literal::Int(v)) => {
            int32_in_range(*v, bit_width).map(StatValue::Int32)
        }
        (Some(LogicalType::Integer { .. }), _) => Err(mismatch(literal, leaf)),

        (None, literal) => encode_plain(literal, leaf, config),
    }
}

fn encode_plain(literal: &Literal, leaf: &LeafNode, config: &Configuration) -> Encoded {
    match (leaf.physical, literal) {
        (PhysicalType::Boolean, Literal::Boolean(v)) => Ok(StatValue::Boolean(*v)),
        (PhysicalType::Int32, Literal::Int(v)) => int32_in_range(*v, 32).map(StatValue::Int32),
        (PhysicalType::Int64, Literal::Int(v)) => Ok(StatValue::Int64(*v)),
        (PhysicalType::Int64, Literal::Timestamp(ts)) => match config.timestamp.time_unit() {
            Some(unit) => epoch_offset(ts, unit)
                .map(StatValue::Int64)
                .ok_or_else(|| format!("{} out of range for {unit}", ts.to_rfc3339())),
            None => Err(
                "timestamp literal against an int64 column needs an int64 timestamp format".into(),
            ),
        },
        (PhysicalType::Float, Literal::Float(v)) => Ok(StatValue::Float(*v)),
        (PhysicalType::Double, Literal::Double(v)) => Ok(StatValue::Double(*v)),
        (PhysicalType::Double, Literal::Float(v)) => Ok(StatValue::Double(f64::from(*v))),
        (PhysicalType::ByteArray, Literal::Binary(b)) => Ok(StatValue::Bytes(b.clone())),
        (PhysicalType::ByteArray, Literal::String(s)) => {
            Ok(StatValue::Bytes(Bytes::copy_from_slice(s.as_bytes())))
        }
        (PhysicalType::FixedLenByteArray(len), Literal::Binary(b)) if b.len() == len => {
            Ok(StatValue::Bytes(b.clone()))
        }
        (PhysicalType::FixedLenByteArray(len), Literal::Binary(b)) => {
            Err(format!("{}-byte literal against {len}-byte column", b.len()))
        }
        _ => Err(mismatch(literal, leaf)),
    }
}

fn encode_decimal_literal(
    unscaled: i128,
    literal_scale: u32,
    precision: u32,
    scale: u32,
    leaf: &LeafNode,
) -> Encoded {
    let rescaled = rescale_unscaled(unscaled, literal_scale, scale)
        .ok_or_else(|| format!("literal does not fit DECIMAL({precision},{scale})"))?;
    if literal_scale > scale && rescale_unscaled(rescaled, scale, literal_scale) != Some(unscaled) {
        return Err(format!("literal has more than {scale} fractional digits"));
    }
    if rescaled.unsigned_abs() > max_unscaled(precision).unsigned_abs() {
        return Err(format!("literal does not fit DECIMAL({precision},{scale})"));
    }
    match leaf.physical {
        PhysicalType::Int32 => i32::try_from(rescaled)
            .map(StatValue::Int32)
            .map_err(|_| "literal exceeds int32 decimal".to_string()),
        PhysicalType::Int64 => i64::try_from(rescaled)
            .map(StatValue::Int64)
            .map_err(|_| "literal exceeds int64 decimal".to_string()),
        PhysicalType::FixedLenByteArray(len) => Ok(StatValue::Bytes(to_fixed_bytes(rescaled, len))),
        PhysicalType::ByteArray => Ok(StatValue::Bytes(to_fixed_bytes(rescaled, 16))),
        other => Err(format!("decimal stored as {other} is not supported")),
    }
}
