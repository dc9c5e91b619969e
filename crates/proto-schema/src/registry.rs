use crate::compiler::DescriptorCompiler;
use crate::error::{Result, SchemaError};
use protobuf::descriptor::FileDescriptorSet;
use protobuf::reflect::{FileDescriptor, MessageDescriptor};
use protobuf::Message;
use std::path::{Path, PathBuf};

/// Queryable set of file descriptors built from one compiled descriptor set.
#[derive(Clone)]
pub struct SchemaRegistry {
    files: Vec<FileDescriptor>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field(
                "files",
                &self.files.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SchemaRegistry {
    /// Compile `files` with `compiler` and build a registry from the result.
    pub fn compile(
        compiler: &dyn DescriptorCompiler,
        root: &Path,
        files: &[PathBuf],
    ) -> Result<Self> {
        let bytes = compiler.compile(root, files)?;
        Self::from_descriptor_set_bytes(&bytes)
    }

    /// Parse a serialized `FileDescriptorSet`.
    pub fn from_descriptor_set_bytes(bytes: &[u8]) -> Result<Self> {
        let set = FileDescriptorSet::parse_from_bytes(bytes)
            .map_err(|e| SchemaError::Schema(e.to_string()))?;
        Self::from_descriptor_set(set)
    }

    pub fn from_descriptor_set(set: FileDescriptorSet) -> Result<Self> {
        let files = FileDescriptor::new_dynamic_fds(set.file, &[])
            .map_err(|e| SchemaError::Schema(e.to_string()))?;

        tracing::debug!("Loaded {} file descriptors", files.len());

        Ok(Self { files })
    }

    pub fn files(&self) -> &[FileDescriptor] {
        &self.files
    }

    /// Find a message by fully-qualified name, e.g. `mypackage.MyMessage`.
    ///
    /// Top-level messages are scanned first, file by file, and the first exact
    /// match wins. Nested types (`pkg.Outer.Inner`) are resolved afterwards.
    pub fn find_message(&self, full_name: &str) -> Result<MessageDescriptor> {
        let name = full_name.strip_prefix('.').unwrap_or(full_name);

        let top_level = self
            .files
            .iter()
            .flat_map(|file| file.messages())
            .find(|message| message.full_name() == name);
        if let Some(message) = top_level {
            return Ok(message);
        }

        self.files
            .iter()
            .flat_map(|file| file.messages())
            .find_map(|message| find_nested(&message, name))
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    /// Every resolvable message name, sorted.
    pub fn message_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for file in &self.files {
            for message in file.messages() {
                collect_names(&message, &mut names);
            }
        }
        names.sort();
        names
    }
}

fn find_nested(parent: &MessageDescriptor, name: &str) -> Option<MessageDescriptor> {
    for nested in parent.nested_messages() {
        if nested.is_map_entry() {
            continue;
        }
        if nested.full_name() == name {
            return Some(nested);
        }
        if let Some(found) = find_nested(&nested, name) {
            return Some(found);
        }
    }
    None
}

fn collect_names(message: &MessageDescriptor, names: &mut Vec<String>) {
    names.push(message.full_name().to_string());
    for nested in message.nested_messages() {
        if !nested.is_map_entry() {
            collect_names(&nested, names);
        }
    }
}
