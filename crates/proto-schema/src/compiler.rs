//! Compilation of `.proto` sources into a serialized `FileDescriptorSet`.
//!
//! Two bridges implement [`DescriptorCompiler`]:
//!
//! - [`ProtocCompiler`] runs the external `protoc` binary and reads back the
//!   descriptor set it writes into a scratch directory.
//! - [`BuiltinCompiler`] parses the sources in-process with `protobuf-parse`.
//!
//! Both include every transitively imported file in the output, so the
//! registry built from it never needs a second lookup.

use crate::error::{Result, SchemaError};
use protobuf::descriptor::FileDescriptorSet;
use protobuf::Message;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Name of the descriptor-set artifact inside the scratch directory.
const DESCRIPTOR_SET_FILE: &str = "descriptor-set.pb";

/// Produces serialized `FileDescriptorSet` bytes for a set of `.proto` files.
pub trait DescriptorCompiler {
    /// Compile `files` using `root` as the import path.
    fn compile(&self, root: &Path, files: &[PathBuf]) -> Result<Vec<u8>>;
}

fn ensure_inputs(root: &Path, files: &[PathBuf]) -> Result<()> {
    if files.is_empty() {
        return Err(SchemaError::Compilation(format!(
            "no .proto files found under {}",
            root.display()
        )));
    }
    Ok(())
}

/// Compiles through an external `protoc` process.
#[derive(Debug, Clone)]
pub struct ProtocCompiler {
    protoc: PathBuf,
    scratch_dir: Option<PathBuf>,
}

impl Default for ProtocCompiler {
    fn default() -> Self {
        Self::new("protoc")
    }
}

impl ProtocCompiler {
    pub fn new(protoc: impl Into<PathBuf>) -> Self {
        Self {
            protoc: protoc.into(),
            scratch_dir: None,
        }
    }

    /// Write the temporary descriptor set under `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn protoc(&self) -> &Path {
        &self.protoc
    }

    fn scratch(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("proto2json-");
        match &self.scratch_dir {
            Some(dir) => builder.tempdir_in(dir).map_err(|e| SchemaError::io(dir, e)),
            None => builder
                .tempdir()
                .map_err(|e| SchemaError::io(std::env::temp_dir(), e)),
        }
    }
}

impl DescriptorCompiler for ProtocCompiler {
    fn compile(&self, root: &Path, files: &[PathBuf]) -> Result<Vec<u8>> {
        ensure_inputs(root, files)?;

        // Removed on drop, whichever way this function returns.
        let scratch = self.scratch()?;
        let descriptor_set = scratch.path().join(DESCRIPTOR_SET_FILE);

        let mut out_arg = OsString::from("--descriptor_set_out=");
        out_arg.push(&descriptor_set);
        let mut include_arg = OsString::from("-I");
        include_arg.push(root);

        let mut cmd = Command::new(&self.protoc);
        cmd.arg("--include_imports")
            .arg(out_arg)
            .arg(include_arg)
            .args(files)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        tracing::debug!("Running {:?}", cmd);

        let status = cmd.status().map_err(|e| {
            SchemaError::Compilation(format!("failed to run {}: {e}", self.protoc.display()))
        })?;
        if !status.success() {
            return Err(SchemaError::Compilation(format!(
                "{} failed with {status}",
                self.protoc.display()
            )));
        }

        let bytes =
            std::fs::read(&descriptor_set).map_err(|e| SchemaError::io(&descriptor_set, e))?;

        tracing::debug!(
            "Read {} byte descriptor set compiled from {} files",
            bytes.len(),
            files.len()
        );

        Ok(bytes)
    }
}

/// Compiles in-process with the pure-Rust `protobuf-parse` parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCompiler;

impl DescriptorCompiler for BuiltinCompiler {
    fn compile(&self, root: &Path, files: &[PathBuf]) -> Result<Vec<u8>> {
        ensure_inputs(root, files)?;

        let mut parser = protobuf_parse::Parser::new();
        parser.pure();
        parser.include(root);
        parser.inputs(files);

        let parsed = parser
            .parse_and_typecheck()
            .map_err(|e| SchemaError::Compilation(format!("{e:#}")))?;

        tracing::debug!(
            "Parsed {} file descriptors from {} inputs",
            parsed.file_descriptors.len(),
            files.len()
        );

        let mut set = FileDescriptorSet::new();
        set.file = parsed.file_descriptors;
        set.write_to_bytes()
            .map_err(|e| SchemaError::Compilation(e.to_string()))
    }
}
