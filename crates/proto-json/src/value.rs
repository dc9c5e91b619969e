//! Value tree for decoded protobuf messages.
//!
//! A decoded message has no fixed Rust shape; its fields are only known through
//! the descriptor. [`ProtoMessage`] keeps the populated fields keyed by their
//! proto name, and [`ProtoFieldValue`] is the tagged value stored for each one.
//! The renderer walks this tree, using the descriptor for declaration order and
//! for the fields that were not populated.

use protobuf::reflect::{
    EnumDescriptor, FieldDescriptor, MessageDescriptor, RuntimeFieldType, RuntimeType,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Represents a field value in a decoded protobuf message.
#[derive(Clone)]
pub enum ProtoFieldValue {
    Double(f64),
    Float(f32),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Enum {
        descriptor: EnumDescriptor,
        number: i32,
    },
    Message(Box<ProtoMessage>),
    Repeated(Vec<ProtoFieldValue>),
    Map(Vec<(ProtoFieldValue, ProtoFieldValue)>),
}

impl ProtoFieldValue {
    /// Zero value for a singular field of the given runtime type.
    ///
    /// Returns `None` for message types, which have no scalar zero value.
    pub fn default_for(runtime_type: &RuntimeType) -> Option<Self> {
        Some(match runtime_type {
            RuntimeType::I32 => ProtoFieldValue::Int32(0),
            RuntimeType::I64 => ProtoFieldValue::Int64(0),
            RuntimeType::U32 => ProtoFieldValue::Uint32(0),
            RuntimeType::U64 => ProtoFieldValue::Uint64(0),
            RuntimeType::F32 => ProtoFieldValue::Float(0.0),
            RuntimeType::F64 => ProtoFieldValue::Double(0.0),
            RuntimeType::Bool => ProtoFieldValue::Bool(false),
            RuntimeType::String => ProtoFieldValue::String(String::new()),
            RuntimeType::VecU8 => ProtoFieldValue::Bytes(Vec::new()),
            RuntimeType::Enum(descriptor) => ProtoFieldValue::Enum {
                descriptor: descriptor.clone(),
                number: 0,
            },
            RuntimeType::Message(_) => return None,
        })
    }

    /// Whether this is the zero value of a scalar type.
    pub fn is_default(&self) -> bool {
        match self {
            ProtoFieldValue::Double(v) => *v == 0.0 && v.is_sign_positive(),
            ProtoFieldValue::Float(v) => *v == 0.0 && v.is_sign_positive(),
            ProtoFieldValue::Int32(v) => *v == 0,
            ProtoFieldValue::Int64(v) => *v == 0,
            ProtoFieldValue::Uint32(v) => *v == 0,
            ProtoFieldValue::Uint64(v) => *v == 0,
            ProtoFieldValue::Bool(v) => !v,
            ProtoFieldValue::String(v) => v.is_empty(),
            ProtoFieldValue::Bytes(v) => v.is_empty(),
            ProtoFieldValue::Enum { number, .. } => *number == 0,
            ProtoFieldValue::Message(_) => false,
            ProtoFieldValue::Repeated(v) => v.is_empty(),
            ProtoFieldValue::Map(v) => v.is_empty(),
        }
    }

    /// Ordering used for map keys; keys of one map always share a type.
    pub(crate) fn cmp_map_key(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ProtoFieldValue::Bool(a), ProtoFieldValue::Bool(b)) => a.cmp(b),
            (ProtoFieldValue::Int32(a), ProtoFieldValue::Int32(b)) => a.cmp(b),
            (ProtoFieldValue::Int64(a), ProtoFieldValue::Int64(b)) => a.cmp(b),
            (ProtoFieldValue::Uint32(a), ProtoFieldValue::Uint32(b)) => a.cmp(b),
            (ProtoFieldValue::Uint64(a), ProtoFieldValue::Uint64(b)) => a.cmp(b),
            (ProtoFieldValue::String(a), ProtoFieldValue::String(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ProtoFieldValue::Double(_) => "double",
            ProtoFieldValue::Float(_) => "float",
            ProtoFieldValue::Int32(_) => "int32",
            ProtoFieldValue::Int64(_) => "int64",
            ProtoFieldValue::Uint32(_) => "uint32",
            ProtoFieldValue::Uint64(_) => "uint64",
            ProtoFieldValue::Bool(_) => "bool",
            ProtoFieldValue::String(_) => "string",
            ProtoFieldValue::Bytes(_) => "bytes",
            ProtoFieldValue::Enum { .. } => "enum",
            ProtoFieldValue::Message(_) => "message",
            ProtoFieldValue::Repeated(_) => "repeated",
            ProtoFieldValue::Map(_) => "map",
        }
    }
}

impl fmt::Debug for ProtoFieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtoFieldValue::Double(v) => write!(f, "Double({v:?})"),
            ProtoFieldValue::Float(v) => write!(f, "Float({v:?})"),
            ProtoFieldValue::Int32(v) => write!(f, "Int32({v})"),
            ProtoFieldValue::Int64(v) => write!(f, "Int64({v})"),
            ProtoFieldValue::Uint32(v) => write!(f, "Uint32({v})"),
            ProtoFieldValue::Uint64(v) => write!(f, "Uint64({v})"),
            ProtoFieldValue::Bool(v) => write!(f, "Bool({v})"),
            ProtoFieldValue::String(v) => write!(f, "String({v:?})"),
            ProtoFieldValue::Bytes(v) => write!(f, "Bytes({v:?})"),
            ProtoFieldValue::Enum { descriptor, number } => {
                write!(f, "Enum({}={number})", descriptor.full_name())
            }
            ProtoFieldValue::Message(m) => m.fmt(f),
            ProtoFieldValue::Repeated(v) => f.debug_list().entries(v).finish(),
            ProtoFieldValue::Map(v) => f
                .debug_map()
                .entries(v.iter().map(|(k, v)| (k, v)))
                .finish(),
        }
    }
}

/// Represents a decoded protobuf message.
#[derive(Clone)]
pub struct ProtoMessage {
    /// Fully qualified message type name (e.g., "mypackage.MyMessage")
    pub message_type: String,
    /// Populated field values by proto field name
    pub fields: HashMap<String, ProtoFieldValue>,
    /// Schema reference for field order and unpopulated fields
    pub descriptor: MessageDescriptor,
}

impl ProtoMessage {
    pub fn new(descriptor: MessageDescriptor) -> Self {
        Self {
            message_type: descriptor.full_name().to_string(),
            fields: HashMap::new(),
            descriptor,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ProtoFieldValue> {
        self.fields.get(name)
    }

    /// Names of the populated fields, in declaration order.
    pub fn populated_fields(&self) -> Vec<String> {
        self.descriptor
            .fields()
            .map(|field| field.name().to_string())
            .filter(|name| self.fields.contains_key(name))
            .collect()
    }

    /// The field's value, or its zero value when it was not populated.
    pub(crate) fn get_or_default(&self, name: &str) -> Option<ProtoFieldValue> {
        if let Some(value) = self.fields.get(name) {
            return Some(value.clone());
        }
        let field = self.descriptor.field_by_name(name)?;
        match field.runtime_field_type() {
            RuntimeFieldType::Singular(runtime_type) => ProtoFieldValue::default_for(&runtime_type),
            RuntimeFieldType::Repeated(_) => Some(ProtoFieldValue::Repeated(Vec::new())),
            RuntimeFieldType::Map(..) => Some(ProtoFieldValue::Map(Vec::new())),
        }
    }
}

impl fmt::Debug for ProtoMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ProtoMessage");
        s.field("message_type", &self.message_type);
        for name in self.populated_fields() {
            if let Some(value) = self.fields.get(&name) {
                s.field(&name, value);
            }
        }
        s.finish()
    }
}

/// How an unset field is represented when unpopulated fields are emitted.
#[derive(Clone)]
pub(crate) enum Presence {
    Repeated,
    Map,
    /// Member of a oneof, including proto3 `optional` fields.
    Oneof,
    /// Tracks presence (messages, proto2 scalars); unset means `null`.
    Explicit,
    /// Proto3 scalar; unset means its zero value.
    Implicit(RuntimeType),
}

pub(crate) fn presence(message: &MessageDescriptor, field: &FieldDescriptor) -> Presence {
    match field.runtime_field_type() {
        RuntimeFieldType::Repeated(_) => Presence::Repeated,
        RuntimeFieldType::Map(..) => Presence::Map,
        RuntimeFieldType::Singular(runtime_type) => {
            if field.proto().has_oneof_index() {
                Presence::Oneof
            } else if matches!(runtime_type, RuntimeType::Message(_)) {
                Presence::Explicit
            } else if message.file_descriptor_proto().syntax() == "proto3" {
                Presence::Implicit(runtime_type)
            } else {
                Presence::Explicit
            }
        }
    }
}
