//! proto2json Library
//!
//! Converts binary protocol-buffer messages to JSON, resolving the message
//! schema at runtime from `.proto` sources instead of generated code.
//!
//! # Features
//!
//! - Single-shot conversion: One binary message on stdin, one pretty JSON document on stdout
//! - Stream conversion: Newline-delimited JSON envelopes whose base64 `value` is replaced
//!   by the decoded message
//! - Two compiler bridges: An external `protoc` or the in-process `protobuf-parse` parser
//!
//! # CLI Usage
//!
//! ```bash
//! # One message
//! proto2json --proto-path ./protos --type demo.Person < person.bin
//!
//! # A stream of envelopes, omitting unpopulated fields
//! proto2json --proto-path ./protos --type demo.Person --kt-stream --skip-unpopulated < records.jsonl
//! ```

use clap::{Parser, ValueEnum};
use proto_json::{JsonRenderer, ProtoDecoder, RenderOptions};
use proto_schema::{
    find_proto_files, BuiltinCompiler, DescriptorCompiler, ProtocCompiler, SchemaRegistry,
    DEFAULT_PROTO_PATTERN,
};
use std::io::{BufRead, Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};

pub mod error;
pub mod stream;

pub use error::{Error, Result};
pub use stream::{process_stream, StreamStats};

// Re-export the library crates for callers that build their own pipeline
pub use proto_json;
pub use proto_schema;

/// How `.proto` sources are turned into a descriptor set
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompilerKind {
    /// Spawn the external `protoc` compiler
    Protoc,
    /// Parse in-process, no external tools required
    Builtin,
}

#[derive(Parser, Debug, Clone)]
pub struct Config {
    /// Root directory searched recursively for .proto files
    #[arg(
        long,
        alias = "proto_path",
        value_name = "DIR",
        env = "PROTO2JSON_PROTO_PATH"
    )]
    pub proto_path: PathBuf,

    /// Fully-qualified message type name (e.g. mypackage.MyMessage)
    #[arg(long = "type", value_name = "NAME", env = "PROTO2JSON_TYPE")]
    pub message_type: String,

    /// Read newline-delimited JSON envelopes with a base64 "value" field
    #[arg(long, alias = "kt_stream")]
    pub kt_stream: bool,

    /// Omit fields that were not populated
    #[arg(long, alias = "skip_unpopulated")]
    pub skip_unpopulated: bool,

    /// File name glob used to select proto sources
    #[arg(long, default_value = DEFAULT_PROTO_PATTERN)]
    pub pattern: String,

    /// Compiler used to build the descriptor set
    #[arg(
        long,
        value_enum,
        default_value = "protoc",
        env = "PROTO2JSON_COMPILER"
    )]
    pub compiler: CompilerKind,

    /// protoc executable (only used with --compiler protoc)
    #[arg(long, default_value = "protoc", env = "PROTOC")]
    pub protoc: PathBuf,

    /// Directory for the temporary descriptor set (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,
}

impl Config {
    pub fn compiler(&self) -> Box<dyn DescriptorCompiler> {
        match self.compiler {
            CompilerKind::Builtin => Box::new(BuiltinCompiler),
            CompilerKind::Protoc => {
                let mut protoc = ProtocCompiler::new(&self.protoc);
                if let Some(dir) = &self.scratch_dir {
                    protoc = protoc.with_scratch_dir(dir);
                }
                Box::new(protoc)
            }
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            emit_unpopulated: !self.skip_unpopulated,
        }
    }

    /// Locate and compile every proto source under `proto_path`.
    pub fn load_schema(&self) -> Result<SchemaRegistry> {
        let files = find_proto_files(&self.proto_path, &self.pattern)?;
        info!(
            "Found {} proto files under {}",
            files.len(),
            self.proto_path.display()
        );

        let registry =
            SchemaRegistry::compile(self.compiler().as_ref(), &self.proto_path, &files)?;
        info!(
            "Compiled descriptor set with {} files",
            registry.files().len()
        );
        Ok(registry)
    }
}

/// Decoder and renderer for one resolved message type.
#[derive(Debug, Clone)]
pub struct Converter {
    decoder: ProtoDecoder,
    renderer: JsonRenderer,
}

impl Converter {
    pub fn new(
        registry: SchemaRegistry,
        message_type: &str,
        options: RenderOptions,
    ) -> Result<Self> {
        let descriptor = match registry.find_message(message_type) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                debug!(
                    available = ?registry.message_names(),
                    "Message type {message_type} is not in the descriptor set"
                );
                return Err(e.into());
            }
        };

        Ok(Self {
            decoder: ProtoDecoder::new(descriptor),
            renderer: JsonRenderer::new(options).with_registry(registry),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = config.load_schema()?;
        Self::new(registry, &config.message_type, config.render_options())
    }

    pub fn decoder(&self) -> &ProtoDecoder {
        &self.decoder
    }

    pub fn renderer(&self) -> &JsonRenderer {
        &self.renderer
    }

    /// Decode all of `reader` as one message and write it as pretty JSON.
    pub fn run_single<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<()> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        debug!("Read {} bytes", data.len());

        let message = self.decoder.decode(&data)?;
        let json = self.renderer.to_pretty_string(&message)?;
        writeln!(writer, "{json}")?;
        writer.flush()?;
        Ok(())
    }

    /// Convert a stream of envelopes; see [`process_stream`].
    pub fn run_stream<R: BufRead, W: Write>(&self, reader: R, writer: W) -> Result<StreamStats> {
        process_stream(reader, writer, &self.decoder, &self.renderer)
    }
}

/// Resolve the schema once, then convert `input` in the configured mode.
pub fn run<R: BufRead, W: Write>(config: &Config, input: R, output: W) -> Result<()> {
    let converter = Converter::from_config(config)?;
    info!("Converting messages of type {}", config.message_type);

    if config.kt_stream {
        let stats = converter.run_stream(input, output)?;
        info!("Stream complete: {} records", stats.records);
    } else {
        converter.run_single(input, output)?;
    }
    Ok(())
}
