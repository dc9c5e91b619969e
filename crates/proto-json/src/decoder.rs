//! Protobuf decoder implementation.
//!
//! Wire decoding is done by the `protobuf` crate's dynamic messages; this module
//! then walks the populated message into a [`ProtoMessage`] value tree.

use crate::error::{ProtoJsonError, Result};
use crate::value::{presence, Presence, ProtoFieldValue, ProtoMessage};
use protobuf::reflect::{MessageDescriptor, ReflectValueRef, RuntimeFieldType};
use protobuf::MessageDyn;
use tracing::trace;

/// Runtime protobuf decoder bound to one message type.
#[derive(Clone)]
pub struct ProtoDecoder {
    descriptor: MessageDescriptor,
}

impl ProtoDecoder {
    /// Create a new decoder for the given message type.
    pub fn new(descriptor: MessageDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    /// Decode one wire-format message.
    ///
    /// Every call starts from a fresh instance, so nothing carries over between
    /// inputs. Unknown fields are kept by the dynamic message and never rendered.
    pub fn decode(&self, data: &[u8]) -> Result<ProtoMessage> {
        let mut message = self.descriptor.new_instance();
        message
            .merge_from_bytes_dyn(data)
            .map_err(|e| ProtoJsonError::Decode(e.to_string()))?;
        message
            .check_initialized_dyn()
            .map_err(|e| ProtoJsonError::Decode(e.to_string()))?;

        trace!(
            message_type = %self.descriptor.full_name(),
            bytes = data.len(),
            "Decoded protobuf message"
        );
        Ok(message_from_dyn(&*message))
    }
}

impl std::fmt::Debug for ProtoDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtoDecoder")
            .field("message_type", &self.descriptor.full_name())
            .finish()
    }
}

fn message_from_dyn(message: &dyn MessageDyn) -> ProtoMessage {
    let descriptor = message.descriptor_dyn();
    let mut decoded = ProtoMessage::new(descriptor.clone());

    for field in descriptor.fields() {
        let value = match field.runtime_field_type() {
            RuntimeFieldType::Singular(_) => {
                let implicit = matches!(presence(&descriptor, &field), Presence::Implicit(_));
                field
                    .get_singular(message)
                    .map(value_from_ref)
                    // Proto3 scalars holding their zero value count as unset.
                    .filter(|value| !(implicit && value.is_default()))
            }
            RuntimeFieldType::Repeated(_) => {
                let repeated = field.get_repeated(message);
                let values: Vec<_> = (0..repeated.len())
                    .map(|i| value_from_ref(repeated.get(i)))
                    .collect();
                (!values.is_empty()).then_some(ProtoFieldValue::Repeated(values))
            }
            RuntimeFieldType::Map(..) => {
                let map = field.get_map(message);
                let mut entries: Vec<_> = (&map)
                    .into_iter()
                    .map(|(k, v)| (value_from_ref(k), value_from_ref(v)))
                    .collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp_map_key(b));
                (!entries.is_empty()).then_some(ProtoFieldValue::Map(entries))
            }
        };

        if let Some(value) = value {
            decoded.fields.insert(field.name().to_string(), value);
        }
    }

    decoded
}

fn value_from_ref(value: ReflectValueRef) -> ProtoFieldValue {
    match value {
        ReflectValueRef::U32(v) => ProtoFieldValue::Uint32(v),
        ReflectValueRef::U64(v) => ProtoFieldValue::Uint64(v),
        ReflectValueRef::I32(v) => ProtoFieldValue::Int32(v),
        ReflectValueRef::I64(v) => ProtoFieldValue::Int64(v),
        ReflectValueRef::F32(v) => ProtoFieldValue::Float(v),
        ReflectValueRef::F64(v) => ProtoFieldValue::Double(v),
        ReflectValueRef::Bool(v) => ProtoFieldValue::Bool(v),
        ReflectValueRef::String(v) => ProtoFieldValue::String(v.to_string()),
        ReflectValueRef::Bytes(v) => ProtoFieldValue::Bytes(v.to_vec()),
        ReflectValueRef::Enum(descriptor, number) => ProtoFieldValue::Enum { descriptor, number },
        ReflectValueRef::Message(m) => ProtoFieldValue::Message(Box::new(message_from_dyn(&*m))),
    }
}
