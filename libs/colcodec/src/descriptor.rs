//! Structural type descriptions consumed by the derivation engines.

use std::any::TypeId;
use std::fmt;

use crate::codec::ParquetType;

/// Identity of a native type: its `TypeId` plus a readable name.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Last path component of the type name, generics stripped.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Built-in scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    String,
    Binary,
    Decimal,
    Date,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Order preserved as given.
    Sequence,
    /// Iteration order of the set preserved.
    Set,
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub ty: TypeDescriptor,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, ty: TypeDescriptor) -> Self {
        Self { name, ty }
    }
}

#[derive(Debug, Clone)]
pub enum Shape {
    Primitive(Primitive),
    Optional(Box<TypeDescriptor>),
    List {
        element: Box<TypeDescriptor>,
        kind: CollectionKind,
    },
    Map {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    Record {
        fields: Vec<FieldDescriptor>,
    },
    /// Generic value tree passed through unchanged. Has no derivable schema.
    Dynamic,
    /// Known only through registration.
    Opaque,
}

/// Description of a native type, built recursively from its parts.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub key: TypeKey,
    pub shape: Shape,
}

impl TypeDescriptor {
    pub fn primitive<T: 'static>(primitive: Primitive) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            shape: Shape::Primitive(primitive),
        }
    }

    pub fn optional<T: 'static, I: ParquetType>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            shape: Shape::Optional(Box::new(I::descriptor())),
        }
    }

    pub fn list<T: 'static, E: ParquetType>(kind: CollectionKind) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            shape: Shape::List {
                element: Box::new(E::descriptor()),
                kind,
            },
        }
    }

    pub fn map<T: 'static, K: ParquetType, V: ParquetType>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            shape: Shape::Map {
                key: Box::new(K::descriptor()),
                value: Box::new(V::descriptor()),
            },
        }
    }

    pub fn record<T: 'static>(fields: Vec<FieldDescriptor>) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            shape: Shape::Record { fields },
        }
    }

    pub fn dynamic<T: 'static>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            shape: Shape::Dynamic,
        }
    }

    pub fn opaque<T: 'static>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            shape: Shape::Opaque,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self.shape, Shape::Record { .. })
    }
}
