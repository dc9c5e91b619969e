//! Shared helpers for unit tests.

use proto_schema::{BuiltinCompiler, SchemaRegistry};
use protobuf::CodedOutputStream;
use tempfile::TempDir;

/// Compile inline `.proto` sources into a registry.
pub(crate) fn registry_from(files: &[(&str, &str)]) -> SchemaRegistry {
    let temp_dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for (name, content) in files {
        let path = temp_dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        paths.push(path);
    }
    SchemaRegistry::compile(&BuiltinCompiler, temp_dir.path(), &paths)
        .expect("Failed to build registry")
}

/// Build wire-format bytes with a `CodedOutputStream`.
pub(crate) fn encode<F>(write: F) -> Vec<u8>
where
    F: FnOnce(&mut CodedOutputStream<'_>) -> Result<(), protobuf::Error>,
{
    let mut buffer = Vec::new();
    {
        let mut stream = CodedOutputStream::vec(&mut buffer);
        write(&mut stream).expect("Failed to encode");
        stream.flush().expect("Failed to flush");
    }
    buffer
}
