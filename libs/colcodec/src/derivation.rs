//! Codec and schema derivation over [`TypeDescriptor`]s.
//!
//! Both walks follow the same resolution order: a registration for the type,
//! then built-in primitives, optional wrappers, sequences and sets, maps,
//! records, and finally failure. [`derive_checked`] runs both and rejects
//! any disagreement about storage shape.

use std::fmt;

use crate::config::Configuration;
use crate::descriptor::{Primitive, Shape, TypeDescriptor};
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::schema::{LogicalType, PhysicalType, SchemaNode};

/// Shape of the value trees a codec emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    /// May also be null.
    Optional(Box<ValueShape>),
    Row(Vec<(String, ValueShape)>),
    List(Box<ValueShape>),
    Map(Box<ValueShape>, Box<ValueShape>),
    /// Generic passthrough; matches any schema.
    Any,
}

impl ValueShape {
    /// Shape implied by a schema node, as declared by a registered codec.
    pub fn of_node(node: &SchemaNode) -> Self {
        let shape = match node {
            SchemaNode::Leaf(_) => ValueShape::Scalar,
            SchemaNode::Group(group) => ValueShape::Row(
                group
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), ValueShape::of_node(&f.node)))
                    .collect(),
            ),
            SchemaNode::List(list) => {
                ValueShape::List(Box::new(ValueShape::of_node(&list.element)))
            }
            SchemaNode::Map(map) => ValueShape::Map(
                Box::new(ValueShape::of_node(&map.key)),
                Box::new(ValueShape::of_node(&map.value)),
            ),
        };
        if node.is_optional() {
            ValueShape::Optional(Box::new(shape))
        } else {
            shape
        }
    }

    fn is_scalar(&self) -> bool {
        matches!(self, ValueShape::Scalar)
    }
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueShape::Scalar => f.write_str("scalar"),
            ValueShape::Optional(inner) => write!(f, "optional {inner}"),
            ValueShape::Row(_) => f.write_str("row"),
            ValueShape::List(_) => f.write_str("list"),
            ValueShape::Map(_, _) => f.write_str("map"),
            ValueShape::Any => f.write_str("any"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Codec side
// ═══════════════════════════════════════════════════════════════

pub fn derive_codec_shape(
    descriptor: &TypeDescriptor,
    config: &Configuration,
    registry: &Registry,
) -> Result<ValueShape> {
    if registry.has_codec(&descriptor.key) {
        if let Some(node) = registry.codec_schema(&descriptor.key, config) {
            return Ok(ValueShape::of_node(&node));
        }
    }
    match &descriptor.shape {
        Shape::Primitive(_) => Ok(ValueShape::Scalar),
        Shape::Optional(inner) => match derive_codec_shape(inner, config, registry)? {
            // Null could not tell an absent outer value from an absent inner one.
            ValueShape::Optional(_) => {
                Err(Error::NoCodecAvailable(descriptor.key.name.to_string()))
            }
            shape => Ok(ValueShape::Optional(Box::new(shape))),
        },
        Shape::List { element, .. } => derive_codec_shape(element, config, registry)
            .map(|s| ValueShape::List(Box::new(s)))
            .map_err(|e| e.within("element")),
        Shape::Map { key, value } => {
            let key_shape = derive_codec_shape(key, config, registry).map_err(|e| e.within("key"))?;
            if !key_shape.is_scalar() {
                return Err(Error::key_type_mismatch(key.key.name).within("key"));
            }
            let value_shape =
                derive_codec_shape(value, config, registry).map_err(|e| e.within("value"))?;
            Ok(ValueShape::Map(Box::new(key_shape), Box::new(value_shape)))
        }
        Shape::Record { fields } => fields
            .iter()
            .map(|field| {
                derive_codec_shape(&field.ty, config, registry)
                    .map(|s| (field.name.to_string(), s))
                    .map_err(|e| e.within(field.name))
            })
            .collect::<Result<Vec<_>>>()
            .map(ValueShape::Row),
        Shape::Dynamic => Ok(ValueShape::Any),
        Shape::Opaque => Err(Error::NoCodecAvailable(descriptor.key.name.to_string())),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Schema side
// ═══════════════════════════════════════════════════════════════

/// Leaf for a built-in primitive under the configured format policies.
pub fn leaf_for(primitive: Primitive, config: &Configuration) -> SchemaNode {
    match primitive {
        Primitive::Boolean => SchemaNode::leaf(PhysicalType::Boolean),
        Primitive::Int8 => SchemaNode::annotated(
            PhysicalType::Int32,
            LogicalType::Integer { bit_width: 8, signed: true },
        ),
        Primitive::Int16 => SchemaNode::annotated(
            PhysicalType::Int32,
            LogicalType::Integer { bit_width: 16, signed: true },
        ),
        Primitive::Int32 => SchemaNode::leaf(PhysicalType::Int32),
        Primitive::Int64 => SchemaNode::leaf(PhysicalType::Int64),
        Primitive::Float => SchemaNode::leaf(PhysicalType::Float),
        Primitive::Double => SchemaNode::leaf(PhysicalType::Double),
        Primitive::String => SchemaNode::annotated(PhysicalType::ByteArray, LogicalType::String),
        Primitive::Binary => SchemaNode::leaf(PhysicalType::ByteArray),
        Primitive::Decimal => SchemaNode::annotated(
            config.decimal.physical_type(),
            config.decimal.logical_type(),
        ),
        Primitive::Date => SchemaNode::annotated(PhysicalType::Int32, LogicalType::Date),
        Primitive::Timestamp => match config.timestamp.logical_type() {
            Some(logical) => SchemaNode::annotated(config.timestamp.physical_type(), logical),
            None => SchemaNode::leaf(config.timestamp.physical_type()),
        },
    }
}

pub fn derive_schema(
    descriptor: &TypeDescriptor,
    config: &Configuration,
    registry: &Registry,
) -> Result<SchemaNode> {
    if let Some(node) = registry
        .schema_override(&descriptor.key, config)
        .or_else(|| registry.codec_schema(&descriptor.key, config))
    {
        return Ok(node);
    }
    match &descriptor.shape {
        Shape::Primitive(primitive) => Ok(leaf_for(*primitive, config)),
        Shape::Optional(inner) => {
            let node = derive_schema(inner, config, registry)?;
            if node.is_optional() {
                return Err(Error::NoSchemaAvailable(descriptor.key.name.to_string()));
            }
            Ok(node.optional())
        }
        Shape::List { element, .. } => derive_schema(element, config, registry)
            .map(SchemaNode::list)
            .map_err(|e| e.within("element")),
        Shape::Map { key, value } => {
            let key_node = derive_schema(key, config, registry).map_err(|e| e.within("key"))?;
            if key_node.as_leaf().is_none() || key_node.is_optional() {
                return Err(Error::key_type_mismatch(key.key.name).within("key"));
            }
            let value_node = derive_schema(value, config, registry).map_err(|e| e.within("value"))?;
            Ok(SchemaNode::map(key_node, value_node))
        }
        Shape::Record { fields } => fields
            .iter()
            .map(|field| {
                derive_schema(&field.ty, config, registry)
                    .map(|node| (field.name, node))
                    .map_err(|e| e.within(field.name))
            })
            .collect::<Result<Vec<_>>>()
            .map(SchemaNode::group),
        Shape::Dynamic | Shape::Opaque => {
            Err(Error::NoSchemaAvailable(descriptor.key.name.to_string()))
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Cross-check
// ═══════════════════════════════════════════════════════════════

/// Verify that every value tree of `shape` fits `node`.
pub fn check_consistency(shape: &ValueShape, node: &SchemaNode) -> Result<()> {
    match (shape, node) {
        (ValueShape::Any, _) => Ok(()),
        (ValueShape::Optional(inner), node) => {
            if !node.is_optional() {
                return Err(Error::shape_mismatch(
                    "codec emits null but schema is required",
                ));
            }
            check_consistency(inner, node)
        }
        (ValueShape::Scalar, SchemaNode::Leaf(_)) => Ok(()),
        (ValueShape::Row(fields), SchemaNode::Group(group)) => {
            let codec_names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
            let schema_names: Vec<&str> = group.fields.iter().map(|f| f.name.as_str()).collect();
            if codec_names != schema_names {
                return Err(Error::shape_mismatch(format!(
                    "codec fields {codec_names:?}, schema fields {schema_names:?}"
                )));
            }
            for ((name, shape), field) in fields.iter().zip(&group.fields) {
                check_consistency(shape, &field.node).map_err(|e| e.within(name.as_str()))?;
            }
            Ok(())
        }
        (ValueShape::List(element), SchemaNode::List(list)) => {
            check_consistency(element, &list.element).map_err(|e| e.within("element"))
        }
        (ValueShape::Map(key, value), SchemaNode::Map(map)) => {
            check_consistency(key, &map.key).map_err(|e| e.within("key"))?;
            check_consistency(value, &map.value).map_err(|e| e.within("value"))
        }
        (shape, node) => Err(Error::shape_mismatch(format!(
            "codec emits {shape}, schema declares {}",
            node.kind()
        ))),
    }
}

/// Derive the codec shape and the schema of a type and require them to agree.
pub fn derive_checked(
    descriptor: &TypeDescriptor,
    config: &Configuration,
    registry: &Registry,
) -> Result<SchemaNode> {
    let shape = derive_codec_shape(descriptor, config, registry)?;
    let node = derive_schema(descriptor, config, registry)?;
    check_consistency(&shape, &node)?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::codec::ParquetType;
    use crate::policy::{DecimalFormat, TimestampFormat};
    use crate::schema::TimeUnit;

    fn schema<T: ParquetType>(config: &Configuration) -> Result<SchemaNode> {
        derive_checked(&T::descriptor(), config, Registry::empty())
    }

    #[test]
    fn primitive_leaves_follow_policies() {
        let cfg = Configuration::default()
            .with_decimal(DecimalFormat::int64(18, 2).unwrap())
            .with_timestamp(TimestampFormat::Int64Micros);
        assert_eq!(
            schema::<rust_decimal::Decimal>(&cfg).unwrap(),
            SchemaNode::annotated(
                PhysicalType::Int64,
                LogicalType::Decimal { precision: 18, scale: 2 }
            )
        );
        assert_eq!(
            schema::<chrono::DateTime<chrono::Utc>>(&cfg).unwrap(),
            SchemaNode::annotated(
                PhysicalType::Int64,
                LogicalType::Timestamp { unit: TimeUnit::Micros }
            )
        );
        assert_eq!(
            schema::<chrono::NaiveDateTime>(&Configuration::default()).unwrap(),
            SchemaNode::leaf(PhysicalType::Int96)
        );
    }

    #[test]
    fn optional_list_of_strings() {
        let node = schema::<Option<Vec<String>>>(&Configuration::default()).unwrap();
        assert_eq!(
            node,
            SchemaNode::list(SchemaNode::annotated(PhysicalType::ByteArray, LogicalType::String))
                .optional()
        );
    }

    #[test]
    fn structured_map_keys_fail_both_walks() {
        let cfg = Configuration::default();
        let descriptor = HashMap::<Vec<i32>, i32>::descriptor();
        let codec = derive_codec_shape(&descriptor, &cfg, Registry::empty()).unwrap_err();
        let schema = derive_schema(&descriptor, &cfg, Registry::empty()).unwrap_err();
        assert!(matches!(codec, Error::KeyTypeMismatch { .. }));
        assert!(matches!(schema, Error::KeyTypeMismatch { .. }));
    }

    #[test]
    fn optional_map_keys_are_rejected() {
        let err = schema::<HashMap<Option<i32>, i32>>(&Configuration::default()).unwrap_err();
        assert!(matches!(err, Error::KeyTypeMismatch { .. }));
    }

    #[test]
    fn nested_optionals_are_rejected_by_both_walks() {
        let cfg = Configuration::default();
        let descriptor = Option::<Option<i32>>::descriptor();
        let codec = derive_codec_shape(&descriptor, &cfg, Registry::empty()).unwrap_err();
        let schema = derive_schema(&descriptor, &cfg, Registry::empty()).unwrap_err();
        assert!(matches!(codec, Error::NoCodecAvailable(_)));
        assert!(matches!(schema, Error::NoSchemaAvailable(_)));
    }

    #[test]
    fn dynamic_rows_have_no_schema() {
        let err = schema::<crate::value::Row>(&Configuration::default()).unwrap_err();
        assert!(matches!(err, Error::NoSchemaAvailable(_)));
    }

    #[test]
    fn nullable_codec_against_required_schema() {
        let err = check_consistency(
            &ValueShape::Optional(Box::new(ValueShape::Scalar)),
            &SchemaNode::leaf(PhysicalType::Int32),
        )
        .unwrap_err();
        assert!(matches!(err, Error::SchemaShapeMismatch { .. }));
    }

    #[test]
    fn list_against_leaf_reports_path() {
        let shape = ValueShape::Row(vec![(
            "tags".into(),
            ValueShape::List(Box::new(ValueShape::Scalar)),
        )]);
        let node = SchemaNode::group([("tags", SchemaNode::leaf(PhysicalType::ByteArray))]);
        let err = check_consistency(&shape, &node).unwrap_err();
        assert_eq!(
            err,
            Error::SchemaShapeMismatch {
                path: "tags".into(),
                detail: "codec emits list, schema declares leaf".into(),
            }
        );
    }
}
