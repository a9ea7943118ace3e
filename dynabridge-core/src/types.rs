//! # Type Inspector
//!
//! Declared parameter, return and field shapes are described by [`TypeRef`], a closed
//! tagged variant over the protobuf type system:
//!
//! * **Scalars** ([`ScalarKind`]), the leaves handled by the coercion registry.
//!   [`ScalarKind::Bytes`] doubles as the raw-content type for upload style operations.
//! * **Enums** and **Messages**, backed by `prost-reflect` descriptors.
//! * **Lists** and **Maps**, whose element type is carried inline so that nested
//!   containers (a list of lists of messages) can be unwound with [`TypeRef::element`].
//!
//! The module also exposes the field accessors of a message type: every field is both
//! readable and writable, and is addressed by its normalized name.
use crate::naming;
use prost_reflect::{EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor};
use std::fmt;

/// Primitive leaf types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I32 => "int32",
            ScalarKind::I64 => "int64",
            ScalarKind::U32 => "uint32",
            ScalarKind::U64 => "uint64",
            ScalarKind::F32 => "float",
            ScalarKind::F64 => "double",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a coercion target in the registry.
///
/// Message types can be registered too: a message with a registered converter is treated
/// as a primitive leaf (e.g. `google.protobuf.Timestamp`) instead of being built field by field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Scalar(ScalarKind),
    Message(String),
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Scalar(kind) => write!(f, "{kind}"),
            TypeKey::Message(name) => f.write_str(name),
        }
    }
}

/// A declared type: the shape of a parameter, a return value or a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Scalar(ScalarKind),
    Enum(EnumDescriptor),
    Message(MessageDescriptor),
    List(Box<TypeRef>),
    Map {
        key: ScalarKind,
        value: Box<TypeRef>,
    },
}

impl TypeRef {
    pub fn list(element: TypeRef) -> Self {
        TypeRef::List(Box::new(element))
    }

    /// Maps a protobuf field kind to its declared type.
    pub fn of_kind(kind: &Kind) -> Self {
        let scalar = match kind {
            Kind::Double => ScalarKind::F64,
            Kind::Float => ScalarKind::F32,
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => ScalarKind::I32,
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => ScalarKind::I64,
            Kind::Uint32 | Kind::Fixed32 => ScalarKind::U32,
            Kind::Uint64 | Kind::Fixed64 => ScalarKind::U64,
            Kind::Bool => ScalarKind::Bool,
            Kind::String => ScalarKind::String,
            Kind::Bytes => ScalarKind::Bytes,
            Kind::Message(message) => return TypeRef::Message(message.clone()),
            Kind::Enum(enumeration) => return TypeRef::Enum(enumeration.clone()),
        };
        TypeRef::Scalar(scalar)
    }

    /// The declared type of a message field, including its list/map container.
    pub fn of_field(field: &FieldDescriptor) -> Self {
        let kind = field.kind();

        if field.is_map()
            && let Kind::Message(entry) = &kind
        {
            let key = match TypeRef::of_kind(&entry.map_entry_key_field().kind()) {
                TypeRef::Scalar(scalar) => scalar,
                _ => ScalarKind::String,
            };
            let value = TypeRef::of_kind(&entry.map_entry_value_field().kind());
            return TypeRef::Map {
                key,
                value: Box::new(value),
            };
        }

        if field.is_list() {
            return TypeRef::list(TypeRef::of_kind(&kind));
        }

        TypeRef::of_kind(&kind)
    }

    /// The innermost element type, unwinding nested containers.
    pub fn element(&self) -> &TypeRef {
        match self {
            TypeRef::List(inner) => inner.element(),
            TypeRef::Map { value, .. } => value.element(),
            other => other,
        }
    }

    pub fn is_raw_content(&self) -> bool {
        matches!(self, TypeRef::Scalar(ScalarKind::Bytes))
    }

    /// The registry key for this type, if it can be a coercion target at all.
    pub fn type_key(&self) -> Option<TypeKey> {
        match self {
            TypeRef::Scalar(kind) => Some(TypeKey::Scalar(*kind)),
            TypeRef::Message(message) => Some(TypeKey::Message(message.full_name().to_string())),
            _ => None,
        }
    }

    pub fn message_descriptor(&self) -> Option<&MessageDescriptor> {
        match self {
            TypeRef::Message(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Scalar(kind) => write!(f, "{kind}"),
            TypeRef::Enum(enumeration) => f.write_str(enumeration.full_name()),
            TypeRef::Message(message) => f.write_str(message.full_name()),
            TypeRef::List(inner) => write!(f, "list<{inner}>"),
            TypeRef::Map { key, value } => write!(f, "map<{key}, {value}>"),
        }
    }
}

/// A readable and writable field of a message type.
#[derive(Debug, Clone)]
pub struct FieldAccessor {
    descriptor: FieldDescriptor,
    ty: TypeRef,
    key: String,
}

impl FieldAccessor {
    pub fn new(descriptor: FieldDescriptor) -> Self {
        let ty = TypeRef::of_field(&descriptor);
        let is_boolean = ty == TypeRef::Scalar(ScalarKind::Bool);
        let key = naming::readable_key(descriptor.name(), is_boolean);
        Self {
            descriptor,
            ty,
            key,
        }
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Normalized key used when the field is read back into generic data.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    pub fn is_boolean(&self) -> bool {
        self.ty == TypeRef::Scalar(ScalarKind::Bool)
    }

    /// Whether a generic input key addresses this field.
    pub fn matches(&self, key: &str) -> bool {
        naming::key_matches_field(key, self.name(), self.is_boolean())
    }
}

/// Lists the field accessors of a message type in declaration order.
pub fn accessors(message: &MessageDescriptor) -> Vec<FieldAccessor> {
    message.fields().map(FieldAccessor::new).collect()
}

/// Finds the accessor addressed by `key`. The first declared match wins.
pub fn find_accessor(message: &MessageDescriptor, key: &str) -> Option<FieldAccessor> {
    message
        .fields()
        .map(FieldAccessor::new)
        .find(|accessor| accessor.matches(key))
}
