//! Runtime protobuf schema resolution for `proto2json`.
//!
//! Features:
//!
//! - Proto discovery: Recursively locate `.proto` sources under a root directory
//! - Descriptor compilation: Produce an imports-resolved `FileDescriptorSet`, either with
//!   an external `protoc` process or in-process with `protobuf-parse`
//! - Message lookup: Resolve a message descriptor by its fully-qualified name

/// Compilers turning `.proto` sources into descriptor-set bytes
///
/// `ProtocCompiler` shells out to `protoc`; `BuiltinCompiler` parses in-process.
pub mod compiler;
pub mod error;
pub mod locator;

/// Registry of dynamic file descriptors with lookup by full message name
pub mod registry;

pub use compiler::{BuiltinCompiler, DescriptorCompiler, ProtocCompiler};
pub use error::{Result, SchemaError};
pub use locator::{find_proto_files, DEFAULT_PROTO_PATTERN};
pub use registry::SchemaRegistry;
