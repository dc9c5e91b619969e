use clap::Parser;
use proto2json::{CompilerKind, Config, Converter, Error};
use protobuf::CodedOutputStream;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

const PERSON_PROTO: &str = r#"
syntax = "proto3";
package demo;

import "common/address.proto";

message Person {
    string name = 1;
    int32 age = 2;
    repeated string tags = 3;
    common.Address address = 4;
    int64 id = 5;
}
"#;

const ADDRESS_PROTO: &str = r#"
syntax = "proto3";
package common;

message Address {
    string city = 1;
    string postcode = 2;
}
"#;

fn write_protos(root: &Path) {
    std::fs::create_dir_all(root.join("common")).unwrap();
    std::fs::write(root.join("person.proto"), PERSON_PROTO).unwrap();
    std::fs::write(root.join("common/address.proto"), ADDRESS_PROTO).unwrap();
    std::fs::write(root.join("README.md"), "not a proto").unwrap();
}

fn config(root: &Path, message_type: &str) -> Config {
    Config {
        proto_path: root.to_path_buf(),
        message_type: message_type.to_string(),
        kt_stream: false,
        skip_unpopulated: false,
        pattern: "*.proto".to_string(),
        compiler: CompilerKind::Builtin,
        protoc: "protoc".into(),
        scratch_dir: None,
    }
}

fn encode<F>(write: F) -> Vec<u8>
where
    F: FnOnce(&mut CodedOutputStream<'_>) -> Result<(), protobuf::Error>,
{
    let mut buffer = Vec::new();
    {
        let mut stream = CodedOutputStream::vec(&mut buffer);
        write(&mut stream).unwrap();
        stream.flush().unwrap();
    }
    buffer
}

fn ada() -> Vec<u8> {
    encode(|s| {
        s.write_string(1, "Ada")?;
        s.write_int32(2, 30)
    })
}

fn run(config: &Config, input: &[u8]) -> (Result<(), Error>, String) {
    let mut output = Vec::new();
    let result = proto2json::run(config, Cursor::new(input), &mut output);
    (result, String::from_utf8(output).unwrap())
}

#[test]
fn test_single_shot_emits_pretty_json_with_defaults() {
    let temp_dir = TempDir::new().unwrap();
    write_protos(temp_dir.path());

    let (result, output) = run(&config(temp_dir.path(), "demo.Person"), &ada());
    result.expect("Conversion failed");

    assert_eq!(
        output,
        r#"{
  "name": "Ada",
  "age": 30,
  "tags": [],
  "address": null,
  "id": "0"
}
"#
    );
}

#[test]
fn test_single_shot_skip_unpopulated() {
    let temp_dir = TempDir::new().unwrap();
    write_protos(temp_dir.path());
    let mut config = config(temp_dir.path(), "demo.Person");
    config.skip_unpopulated = true;

    let (result, output) = run(&config, &ada());
    result.expect("Conversion failed");
    assert_eq!(output, "{\n  \"name\": \"Ada\",\n  \"age\": 30\n}\n");

    let data = encode(|s| s.write_int32(2, 30));
    let (result, output) = run(&config, &data);
    result.expect("Conversion failed");
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value, serde_json::json!({"age": 30}));
}

#[test]
fn test_imported_message_types_resolve() {
    let temp_dir = TempDir::new().unwrap();
    write_protos(temp_dir.path());
    let mut config = config(temp_dir.path(), "common.Address");
    config.skip_unpopulated = true;

    let data = encode(|s| s.write_string(1, "London"));
    let (result, output) = run(&config, &data);
    result.expect("Conversion failed");
    assert_eq!(output, "{\n  \"city\": \"London\"\n}\n");
}

#[test]
fn test_stream_preserves_order_and_envelope_keys() {
    let temp_dir = TempDir::new().unwrap();
    write_protos(temp_dir.path());
    let mut config = config(temp_dir.path(), "demo.Person");
    config.kt_stream = true;
    config.skip_unpopulated = true;

    let address = encode(|s| s.write_string(1, "London"));
    let grace = encode(|s| {
        s.write_string(1, "Grace")?;
        s.write_string(3, "navy")?;
        s.write_bytes(4, &address)?;
        s.write_int64(5, 1 << 60)
    });
    use base64::Engine;
    let b64 = |data: &[u8]| base64::engine::general_purpose::STANDARD.encode(data);
    let input = format!(
        "{{\"key\":\"k1\",\"value\":\"{}\",\"offset\":7}}\n{{\"value\":\"{}\",\"key\":\"k2\"}}\n",
        b64(&ada()),
        b64(&grace)
    );

    let (result, output) = run(&config, input.as_bytes());
    result.expect("Stream conversion failed");

    let lines: Vec<_> = output.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#"{"key":"k1","value":{"name":"Ada","age":30},"offset":7}"#,
            r#"{"value":{"name":"Grace","tags":["navy"],"address":{"city":"London"},"id":"1152921504606846976"},"key":"k2"}"#,
        ]
    );
}

#[test]
fn test_stream_stops_at_first_bad_line() {
    let temp_dir = TempDir::new().unwrap();
    write_protos(temp_dir.path());
    let mut config = config(temp_dir.path(), "demo.Person");
    config.kt_stream = true;

    let input = "{\"value\":\"CgNBZGEQHg==\"}\n{\"value\":\"%%%\"}\n{\"value\":\"CgNBZGEQHg==\"}\n";
    let (result, output) = run(&config, input.as_bytes());

    assert!(matches!(result, Err(Error::Encoding(_))));
    assert_eq!(output.lines().count(), 1);
}

#[test]
fn test_stream_envelope_errors() {
    let temp_dir = TempDir::new().unwrap();
    write_protos(temp_dir.path());
    let mut config = config(temp_dir.path(), "demo.Person");
    config.kt_stream = true;

    let (result, output) = run(&config, b"{\"value\":\"CgNBZGEQHg==\"}\n\n");
    assert!(matches!(result, Err(Error::Parse(m)) if m.starts_with("line 2: ")));
    assert_eq!(output.lines().count(), 1);

    let (result, _) = run(&config, b"{\"key\":\"k1\"}\n");
    assert!(matches!(result, Err(Error::Type(_))));

    let (result, _) = run(&config, b"not json\n");
    assert!(matches!(result, Err(Error::Parse(_))));
}

#[test]
fn test_unknown_type_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    write_protos(temp_dir.path());

    let (result, output) = run(&config(temp_dir.path(), "demo.Nobody"), &ada());
    match result {
        Err(e @ Error::NotFound(_)) => assert_eq!(e.to_string(), "proto not found: demo.Nobody"),
        other => panic!("Expected NotFound, got {other:?}"),
    }
    assert!(output.is_empty());
}

#[test]
fn test_empty_proto_tree_is_compilation_error() {
    let temp_dir = TempDir::new().unwrap();
    let (result, _) = run(&config(temp_dir.path(), "demo.Person"), &ada());
    assert!(matches!(result, Err(Error::Compilation(_))));
}

#[test]
fn test_missing_proto_root_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing");
    let (result, _) = run(&config(&missing, "demo.Person"), &ada());
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_malformed_payload_is_decode_error() {
    let temp_dir = TempDir::new().unwrap();
    write_protos(temp_dir.path());
    let (result, output) = run(&config(temp_dir.path(), "demo.Person"), &[0x0a, 0x0a, 0x41]);
    assert!(matches!(result, Err(Error::Decode(_))));
    assert!(output.is_empty());
}

#[test]
fn test_converter_reuses_one_schema() {
    let temp_dir = TempDir::new().unwrap();
    write_protos(temp_dir.path());
    let converter = Converter::from_config(&config(temp_dir.path(), "demo.Person")).unwrap();
    assert_eq!(converter.decoder().descriptor().full_name(), "demo.Person");
    assert!(converter.renderer().options().emit_unpopulated);

    for _ in 0..2 {
        let mut output = Vec::new();
        converter.run_single(Cursor::new(ada()), &mut output).unwrap();
        assert!(String::from_utf8(output).unwrap().contains("\"Ada\""));
    }
}

#[test]
fn test_cli_flags_and_aliases() {
    let config = Config::try_parse_from([
        "proto2json",
        "--proto_path",
        "/protos",
        "--type",
        "demo.Person",
        "--kt_stream",
        "--skip_unpopulated",
        "--compiler",
        "builtin",
    ])
    .unwrap();
    assert_eq!(config.proto_path, Path::new("/protos"));
    assert_eq!(config.message_type, "demo.Person");
    assert!(config.kt_stream);
    assert!(config.skip_unpopulated);
    assert_eq!(config.compiler, CompilerKind::Builtin);
    assert!(!config.render_options().emit_unpopulated);

    let config = Config::try_parse_from([
        "proto2json",
        "--proto-path",
        "/protos",
        "--type",
        "demo.Person",
    ])
    .unwrap();
    assert!(!config.kt_stream);
    assert_eq!(config.pattern, "*.proto");
    assert!(config.render_options().emit_unpopulated);

    assert!(Config::try_parse_from(["proto2json", "--proto-path", "/protos"]).is_err());
}
