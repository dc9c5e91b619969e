//! JSON forms of the `google.protobuf` well-known types.
//!
//! These messages do not render as objects of their fields; each has a
//! dedicated representation (RFC 3339 strings, bare wrapper values, native
//! JSON for `Struct`, and so on).

use crate::decoder::ProtoDecoder;
use crate::error::{ProtoJsonError, Result};
use crate::render::{double_to_json, JsonRenderer};
use crate::value::{ProtoFieldValue, ProtoMessage};
use serde_json::{Map, Value};

const ANY: &str = "google.protobuf.Any";
const TIMESTAMP: &str = "google.protobuf.Timestamp";
const DURATION: &str = "google.protobuf.Duration";
const STRUCT: &str = "google.protobuf.Struct";
const VALUE: &str = "google.protobuf.Value";
const LIST_VALUE: &str = "google.protobuf.ListValue";
const FIELD_MASK: &str = "google.protobuf.FieldMask";
const EMPTY: &str = "google.protobuf.Empty";

const WRAPPERS: [&str; 9] = [
    "google.protobuf.DoubleValue",
    "google.protobuf.FloatValue",
    "google.protobuf.Int64Value",
    "google.protobuf.UInt64Value",
    "google.protobuf.Int32Value",
    "google.protobuf.UInt32Value",
    "google.protobuf.BoolValue",
    "google.protobuf.StringValue",
    "google.protobuf.BytesValue",
];

const NANOS_PER_SECOND: i32 = 1_000_000_000;
/// 0001-01-01T00:00:00Z
const MIN_TIMESTAMP_SECONDS: i64 = -62_135_596_800;
/// 9999-12-31T23:59:59Z
const MAX_TIMESTAMP_SECONDS: i64 = 253_402_300_799;
/// Roughly 10,000 years.
const MAX_DURATION_SECONDS: u64 = 315_576_000_000;

/// Whether the type has a dedicated JSON form.
pub fn is_well_known(full_name: &str) -> bool {
    matches!(
        full_name,
        ANY | TIMESTAMP | DURATION | STRUCT | VALUE | LIST_VALUE | FIELD_MASK | EMPTY
    ) || WRAPPERS.contains(&full_name)
}

/// Render `message` in its dedicated form, or `None` for ordinary messages.
pub(crate) fn render(renderer: &JsonRenderer, message: &ProtoMessage) -> Result<Option<Value>> {
    let name = message.message_type.as_str();
    let value = match name {
        ANY => any(renderer, message)?,
        TIMESTAMP => timestamp(message)?,
        DURATION => duration(message)?,
        STRUCT => structure(renderer, message)?,
        VALUE => value(renderer, message)?,
        LIST_VALUE => list_value(renderer, message)?,
        FIELD_MASK => field_mask(message),
        EMPTY => Value::Object(Map::new()),
        _ if WRAPPERS.contains(&name) => match message.get_or_default("value") {
            Some(inner) => renderer.value_to_json(&inner)?,
            None => Value::Null,
        },
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn int64_field(message: &ProtoMessage, name: &str) -> i64 {
    match message.get(name) {
        Some(ProtoFieldValue::Int64(v)) => *v,
        _ => 0,
    }
}

fn int32_field(message: &ProtoMessage, name: &str) -> i32 {
    match message.get(name) {
        Some(ProtoFieldValue::Int32(v)) => *v,
        _ => 0,
    }
}

/// Fraction digits in groups of three, trailing zero groups dropped.
fn fraction(nanos: u32) -> String {
    if nanos == 0 {
        String::new()
    } else if nanos % 1_000_000 == 0 {
        format!(".{:03}", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!(".{:06}", nanos / 1_000)
    } else {
        format!(".{nanos:09}")
    }
}

fn timestamp(message: &ProtoMessage) -> Result<Value> {
    let seconds = int64_field(message, "seconds");
    let nanos = int32_field(message, "nanos");
    let out_of_range = || {
        ProtoJsonError::Render(format!(
            "{TIMESTAMP} out of range: seconds={seconds} nanos={nanos}"
        ))
    };

    if !(MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&seconds)
        || !(0..NANOS_PER_SECOND).contains(&nanos)
    {
        return Err(out_of_range());
    }
    let nanos = nanos.unsigned_abs();
    let datetime = chrono::DateTime::from_timestamp(seconds, nanos).ok_or_else(out_of_range)?;

    Ok(Value::String(format!(
        "{}{}Z",
        datetime.format("%Y-%m-%dT%H:%M:%S"),
        fraction(nanos)
    )))
}

fn duration(message: &ProtoMessage) -> Result<Value> {
    let seconds = int64_field(message, "seconds");
    let nanos = int32_field(message, "nanos");

    if seconds.unsigned_abs() > MAX_DURATION_SECONDS
        || nanos.unsigned_abs() >= NANOS_PER_SECOND.unsigned_abs()
        || (seconds > 0 && nanos < 0)
        || (seconds < 0 && nanos > 0)
    {
        return Err(ProtoJsonError::Render(format!(
            "{DURATION} out of range: seconds={seconds} nanos={nanos}"
        )));
    }

    let sign = if seconds < 0 || nanos < 0 { "-" } else { "" };
    Ok(Value::String(format!(
        "{sign}{}{}s",
        seconds.unsigned_abs(),
        fraction(nanos.unsigned_abs())
    )))
}

fn structure(renderer: &JsonRenderer, message: &ProtoMessage) -> Result<Value> {
    let mut object = Map::new();
    if let Some(ProtoFieldValue::Map(entries)) = message.get("fields") {
        for (key, value) in entries {
            let ProtoFieldValue::String(key) = key else {
                return Err(ProtoJsonError::Render(format!(
                    "{STRUCT} key must be a string, got {}",
                    key.type_name()
                )));
            };
            object.insert(key.clone(), renderer.value_to_json(value)?);
        }
    }
    Ok(Value::Object(object))
}

fn value(renderer: &JsonRenderer, message: &ProtoMessage) -> Result<Value> {
    // `kind` is a oneof, so at most one field is populated.
    let Some(kind) = message.populated_fields().into_iter().next() else {
        return Err(ProtoJsonError::Render(format!(
            "{VALUE} has none of its kind fields set"
        )));
    };
    let Some(inner) = message.get(&kind) else {
        return Ok(Value::Null);
    };
    if let ProtoFieldValue::Double(v) = inner {
        if !v.is_finite() {
            return Err(ProtoJsonError::Render(format!(
                "{VALUE} cannot hold a non-finite number: {v}"
            )));
        }
        return Ok(double_to_json(*v));
    }
    renderer.value_to_json(inner)
}

fn list_value(renderer: &JsonRenderer, message: &ProtoMessage) -> Result<Value> {
    match message.get("values") {
        Some(values) => renderer.value_to_json(values),
        None => Ok(Value::Array(Vec::new())),
    }
}

fn field_mask(message: &ProtoMessage) -> Value {
    let paths = match message.get("paths") {
        Some(ProtoFieldValue::Repeated(paths)) => paths
            .iter()
            .filter_map(|path| match path {
                ProtoFieldValue::String(path) => Some(lower_camel(path)),
                _ => None,
            })
            .collect::<Vec<_>>(),
        _ => Vec::new(),
    };
    Value::String(paths.join(","))
}

fn lower_camel(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut upper_next = false;
    for c in path.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn any(renderer: &JsonRenderer, message: &ProtoMessage) -> Result<Value> {
    let type_url = match message.get("type_url") {
        Some(ProtoFieldValue::String(url)) => url.as_str(),
        _ => "",
    };
    let payload: &[u8] = match message.get("value") {
        Some(ProtoFieldValue::Bytes(bytes)) => bytes,
        _ => &[],
    };

    if type_url.is_empty() {
        if payload.is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        return Err(ProtoJsonError::Render(format!(
            "{ANY} has a payload but no type_url"
        )));
    }

    let type_name = type_url.rsplit('/').next().unwrap_or(type_url);
    let descriptor = renderer.resolve_message(type_name)?;
    let inner = ProtoDecoder::new(descriptor).decode(payload)?;

    let mut object = Map::new();
    object.insert("@type".to_string(), Value::String(type_url.to_string()));
    match renderer.message_to_json(&inner)? {
        Value::Object(fields) if !is_well_known(&inner.message_type) => object.extend(fields),
        other => {
            object.insert("value".to_string(), other);
        }
    }
    Ok(Value::Object(object))
}
