//! Canonical JSON rendering of decoded messages.
//!
//! Output follows the proto3 JSON mapping, with two fixed choices: fields are
//! named by their declared proto name (never the lowerCamelCase json name), and
//! they appear in declaration order.

use crate::error::{ProtoJsonError, Result};
use crate::value::{presence, Presence, ProtoFieldValue, ProtoMessage};
use crate::well_known;
use base64::Engine;
use proto_schema::SchemaRegistry;
use protobuf::reflect::{EnumDescriptor, FieldDescriptor, MessageDescriptor};
use serde_json::{Map, Number, Value};

const NULL_VALUE: &str = "google.protobuf.NullValue";

/// Integral doubles below this magnitude render without a fraction.
const MAX_INTEGRAL_DOUBLE: f64 = 1e15;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Emit fields that were not populated, at their zero value (or `null`).
    pub emit_unpopulated: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            emit_unpopulated: true,
        }
    }
}

/// Renders [`ProtoMessage`] trees as JSON.
///
/// A registry is only needed to expand `google.protobuf.Any` payloads.
#[derive(Debug, Clone, Default)]
pub struct JsonRenderer {
    options: RenderOptions,
    registry: Option<SchemaRegistry>,
}

impl JsonRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            registry: None,
        }
    }

    pub fn with_registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    pub fn render(&self, message: &ProtoMessage) -> Result<Value> {
        self.message_to_json(message)
    }

    /// Render with a two-space indent.
    pub fn to_pretty_string(&self, message: &ProtoMessage) -> Result<String> {
        serde_json::to_string_pretty(&self.render(message)?)
            .map_err(|e| ProtoJsonError::Render(e.to_string()))
    }

    /// Render on a single line.
    pub fn to_compact_string(&self, message: &ProtoMessage) -> Result<String> {
        serde_json::to_string(&self.render(message)?)
            .map_err(|e| ProtoJsonError::Render(e.to_string()))
    }

    pub(crate) fn message_to_json(&self, message: &ProtoMessage) -> Result<Value> {
        if let Some(value) = well_known::render(self, message)? {
            return Ok(value);
        }

        let mut object = Map::new();
        for field in message.descriptor.fields() {
            let name = field.name();
            let value = match message.get(name) {
                Some(value) => Some(self.value_to_json(value)?),
                None if self.options.emit_unpopulated => {
                    self.unpopulated(&message.descriptor, &field)?
                }
                None => None,
            };
            if let Some(value) = value {
                object.insert(name.to_string(), value);
            }
        }

        Ok(Value::Object(object))
    }

    fn unpopulated(
        &self,
        message: &MessageDescriptor,
        field: &FieldDescriptor,
    ) -> Result<Option<Value>> {
        Ok(match presence(message, field) {
            Presence::Repeated => Some(Value::Array(Vec::new())),
            Presence::Map => Some(Value::Object(Map::new())),
            Presence::Oneof => None,
            Presence::Explicit => Some(Value::Null),
            Presence::Implicit(runtime_type) => match ProtoFieldValue::default_for(&runtime_type) {
                Some(default) => Some(self.value_to_json(&default)?),
                None => Some(Value::Null),
            },
        })
    }

    pub(crate) fn value_to_json(&self, value: &ProtoFieldValue) -> Result<Value> {
        Ok(match value {
            ProtoFieldValue::Double(v) => double_to_json(*v),
            ProtoFieldValue::Float(v) => float_to_json(*v),
            ProtoFieldValue::Int32(v) => Value::from(*v),
            ProtoFieldValue::Uint32(v) => Value::from(*v),
            // 64-bit integers are strings so JavaScript readers keep full precision.
            ProtoFieldValue::Int64(v) => Value::String(v.to_string()),
            ProtoFieldValue::Uint64(v) => Value::String(v.to_string()),
            ProtoFieldValue::Bool(v) => Value::Bool(*v),
            ProtoFieldValue::String(v) => Value::String(v.clone()),
            ProtoFieldValue::Bytes(v) => {
                Value::String(base64::engine::general_purpose::STANDARD.encode(v))
            }
            ProtoFieldValue::Enum { descriptor, number } => enum_to_json(descriptor, *number),
            ProtoFieldValue::Message(m) => self.message_to_json(m)?,
            ProtoFieldValue::Repeated(values) => Value::Array(
                values
                    .iter()
                    .map(|v| self.value_to_json(v))
                    .collect::<Result<Vec<_>>>()?,
            ),
            ProtoFieldValue::Map(entries) => {
                let mut object = Map::new();
                for (key, value) in entries {
                    object.insert(map_key(key)?, self.value_to_json(value)?);
                }
                Value::Object(object)
            }
        })
    }

    pub(crate) fn resolve_message(&self, full_name: &str) -> Result<MessageDescriptor> {
        let registry = self.registry.as_ref().ok_or_else(|| {
            ProtoJsonError::Render(format!(
                "cannot resolve message type {full_name}: no schema registry"
            ))
        })?;
        registry
            .find_message(full_name)
            .map_err(|e| ProtoJsonError::Render(e.to_string()))
    }
}

fn enum_to_json(descriptor: &EnumDescriptor, number: i32) -> Value {
    if descriptor.full_name() == NULL_VALUE {
        return Value::Null;
    }
    match descriptor.value_by_number(number) {
        Some(value) => Value::String(value.name().to_string()),
        None => Value::from(number),
    }
}

fn map_key(key: &ProtoFieldValue) -> Result<String> {
    match key {
        ProtoFieldValue::String(v) => Ok(v.clone()),
        ProtoFieldValue::Bool(v) => Ok(v.to_string()),
        ProtoFieldValue::Int32(v) => Ok(v.to_string()),
        ProtoFieldValue::Int64(v) => Ok(v.to_string()),
        ProtoFieldValue::Uint32(v) => Ok(v.to_string()),
        ProtoFieldValue::Uint64(v) => Ok(v.to_string()),
        other => Err(ProtoJsonError::Render(format!(
            "invalid map key type: {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn double_to_json(v: f64) -> Value {
    if v.is_nan() {
        Value::String("NaN".to_string())
    } else if v.is_infinite() {
        let name = if v > 0.0 { "Infinity" } else { "-Infinity" };
        Value::String(name.to_string())
    } else if v.fract() == 0.0 && v.abs() < MAX_INTEGRAL_DOUBLE && !is_negative_zero(v) {
        Value::Number(Number::from(v as i64))
    } else {
        Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn is_negative_zero(v: f64) -> bool {
    v == 0.0 && v.is_sign_negative()
}

fn float_to_json(v: f32) -> Value {
    if !v.is_finite() {
        return double_to_json(f64::from(v));
    }
    // Widen through the shortest f32 decimal so 0.1f32 renders as 0.1.
    let widened = v.to_string().parse::<f64>().unwrap_or(f64::from(v));
    double_to_json(widened)
}
