//! Schema-driven protobuf to JSON conversion for `proto2json`.
//!
//! Features:
//!
//! - Dynamic decoding: Decode wire-format bytes against a runtime `MessageDescriptor`
//! - Canonical JSON: Proto field names, declaration order, 64-bit integers as strings,
//!   base64 bytes, enum names
//! - Well-known types: Dedicated JSON forms for `Timestamp`, `Duration`, wrappers,
//!   `Struct`, `FieldMask`, `Empty` and `Any`

/// Decoder from wire bytes to the [`ProtoMessage`] value tree
pub mod decoder;
pub mod error;

/// JSON rendering of decoded messages
pub mod render;
pub mod value;
pub mod well_known;

#[cfg(test)]
mod testing;

pub use decoder::ProtoDecoder;
pub use error::{ProtoJsonError, Result};
pub use render::{JsonRenderer, RenderOptions};
pub use value::{ProtoFieldValue, ProtoMessage};
pub use well_known::is_well_known;
