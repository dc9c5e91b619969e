//! Newline-delimited envelope streams.
//!
//! Each line is a JSON object whose `value` holds a base64 protobuf payload.
//! The payload is decoded and `value` is replaced by the rendered message; all
//! other keys pass through unchanged and in their original order.

use crate::error::{Error, Result};
use base64::Engine;
use proto_json::{JsonRenderer, ProtoDecoder};
use serde_json::{Map, Value};
use std::io::{BufRead, Write};
use tracing::debug;

/// Envelope key carrying the encoded message.
pub const VALUE_KEY: &str = "value";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Envelopes converted and written.
    pub records: usize,
}

/// Convert every envelope from `reader`, writing one compact line per record.
///
/// Every line must hold an envelope, blank lines included. The first failing
/// line aborts the stream; lines converted before it have already been written.
pub fn process_stream<R, W>(
    reader: R,
    mut writer: W,
    decoder: &ProtoDecoder,
    renderer: &JsonRenderer,
) -> Result<StreamStats>
where
    R: BufRead,
    W: Write,
{
    let mut stats = StreamStats::default();

    for (index, line) in reader.split(b'\n').enumerate() {
        let line_number = index + 1;
        let mut line = line.map_err(|e| Error::from(e).at_line(line_number))?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        let envelope =
            convert_envelope(&line, decoder, renderer).map_err(|e| e.at_line(line_number))?;

        serde_json::to_writer(&mut writer, &envelope)
            .map_err(|e| Error::Render(e.to_string()).at_line(line_number))?;
        writer.write_all(b"\n")?;
        stats.records += 1;

        debug!(line = line_number, "Converted envelope");
    }

    writer.flush()?;
    Ok(stats)
}

/// Parse one envelope and swap its encoded `value` for the decoded message.
pub fn convert_envelope(
    line: &[u8],
    decoder: &ProtoDecoder,
    renderer: &JsonRenderer,
) -> Result<Map<String, Value>> {
    let mut envelope = match serde_json::from_slice::<Value>(line) {
        Ok(Value::Object(envelope)) => envelope,
        Ok(other) => {
            return Err(Error::Parse(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            )))
        }
        Err(e) => return Err(Error::Parse(e.to_string())),
    };

    let encoded = match envelope.get(VALUE_KEY) {
        Some(Value::String(encoded)) => encoded,
        Some(other) => {
            return Err(Error::Type(format!(
                "\"{VALUE_KEY}\" must be a string, found {}",
                json_kind(other)
            )))
        }
        None => return Err(Error::Type(format!("missing \"{VALUE_KEY}\" field"))),
    };

    let payload = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| Error::Encoding(e.to_string()))?;

    let message = decoder.decode(&payload)?;
    let rendered = renderer.render(&message)?;
    envelope.insert(VALUE_KEY.to_string(), rendered);

    Ok(envelope)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto_json::RenderOptions;
    use proto_schema::{BuiltinCompiler, SchemaRegistry};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn person() -> (ProtoDecoder, JsonRenderer) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("person.proto");
        std::fs::write(
            &path,
            r#"
                syntax = "proto3";
                package demo;

                message Person {
                    string name = 1;
                    int32 age = 2;
                }
            "#,
        )
        .unwrap();
        let registry =
            SchemaRegistry::compile(&BuiltinCompiler, temp_dir.path(), &[path]).unwrap();
        let decoder = ProtoDecoder::new(registry.find_message("demo.Person").unwrap());
        let renderer = JsonRenderer::new(RenderOptions {
            emit_unpopulated: false,
        });
        (decoder, renderer)
    }

    fn run(input: impl AsRef<[u8]>) -> (Result<StreamStats>, String) {
        let (decoder, renderer) = person();
        let mut output = Vec::new();
        let result = process_stream(
            Cursor::new(input.as_ref()),
            &mut output,
            &decoder,
            &renderer,
        );
        (result, String::from_utf8(output).unwrap())
    }

    // "CgNBZGEQHg==" is Person { name: "Ada", age: 30 }.
    const ADA: &str = "CgNBZGEQHg==";

    #[test]
    fn test_value_is_replaced_and_siblings_kept_in_order() {
        let input = format!(r#"{{"topic":"people","value":"{ADA}","partition":2}}"#);
        let (result, output) = run(&input);

        assert_eq!(result.unwrap(), StreamStats { records: 1 });
        assert_eq!(
            output,
            "{\"topic\":\"people\",\"value\":{\"name\":\"Ada\",\"age\":30},\"partition\":2}\n"
        );
    }

    #[test]
    fn test_blank_line_aborts_stream() {
        let input = format!("{{\"value\":\"{ADA}\"}}\n\n{{\"value\":\"{ADA}\"}}\n");
        let (result, output) = run(&input);

        match result {
            Err(Error::Parse(message)) => assert!(message.starts_with("line 2: ")),
            other => panic!("Expected parse error, got {other:?}"),
        }
        assert_eq!(output, "{\"value\":{\"name\":\"Ada\",\"age\":30}}\n");
    }

    #[test]
    fn test_crlf_line_endings() {
        let input = format!("{{\"value\":\"{ADA}\"}}\r\n{{\"value\":\"\"}}\r\n");
        let (result, output) = run(&input);

        assert_eq!(result.unwrap(), StreamStats { records: 2 });
        assert_eq!(
            output,
            "{\"value\":{\"name\":\"Ada\",\"age\":30}}\n{\"value\":{}}\n"
        );
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let mut input = br#"{"key":""#.to_vec();
        input.push(0xff);
        input.extend_from_slice(format!(r#"","value":"{ADA}"}}"#).as_bytes());
        input.push(b'\n');

        let (result, output) = run(&input);
        assert!(matches!(result, Err(Error::Parse(m)) if m.starts_with("line 1: ")));
        assert!(output.is_empty());
    }

    #[test]
    fn test_invalid_base64_aborts_with_line_number() {
        let input = format!("{{\"value\":\"{ADA}\"}}\n{{\"value\":\"!!not base64!!\"}}\n{{\"value\":\"{ADA}\"}}\n");
        let (result, output) = run(&input);

        match result {
            Err(Error::Encoding(message)) => assert!(message.starts_with("line 2: ")),
            other => panic!("Expected encoding error, got {other:?}"),
        }
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let (result, output) = run("{\"value\": ");
        assert!(matches!(result, Err(Error::Parse(m)) if m.starts_with("line 1: ")));
        assert!(output.is_empty());

        let (result, _) = run("[1, 2]");
        assert!(matches!(result, Err(Error::Parse(m)) if m.contains("an array")));
    }

    #[test]
    fn test_missing_or_non_string_value_is_type_error() {
        let (result, _) = run(r#"{"key":"k1"}"#);
        assert!(matches!(result, Err(Error::Type(m)) if m.contains("missing")));

        let (result, _) = run(r#"{"value":42}"#);
        assert!(matches!(result, Err(Error::Type(m)) if m.contains("a number")));
    }

    #[test]
    fn test_undecodable_payload_is_decode_error() {
        // Field 1, length 10, only two bytes follow.
        let (result, _) = run(r#"{"value":"CgpBZA=="}"#);
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
