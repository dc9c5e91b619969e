use proto_json::ProtoJsonError;
use proto_schema::SchemaError;
use thiserror::Error;

/// Every way a conversion run can fail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Descriptor compilation failed: {0}")]
    Compilation(String),

    #[error("Invalid descriptor set: {0}")]
    Schema(String),

    #[error("proto not found: {0}")]
    NotFound(String),

    #[error("Protobuf decode error: {0}")]
    Decode(String),

    #[error("JSON render error: {0}")]
    Render(String),

    #[error("JSON parse error: {0}")]
    Parse(String),

    #[error("Envelope type error: {0}")]
    Type(String),

    #[error("Base64 decode error: {0}")]
    Encoding(String),
}

impl Error {
    /// Prefix the message with the 1-based stream line it came from.
    pub(crate) fn at_line(self, line: usize) -> Self {
        let tag = |message: String| format!("line {line}: {message}");
        match self {
            Error::Io(m) => Error::Io(tag(m)),
            Error::Compilation(m) => Error::Compilation(tag(m)),
            Error::Schema(m) => Error::Schema(tag(m)),
            Error::NotFound(m) => Error::NotFound(m),
            Error::Decode(m) => Error::Decode(tag(m)),
            Error::Render(m) => Error::Render(tag(m)),
            Error::Parse(m) => Error::Parse(tag(m)),
            Error::Type(m) => Error::Type(tag(m)),
            Error::Encoding(m) => Error::Encoding(tag(m)),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Io { path, source } => {
                Error::Io(format!("{}: {source}", path.display()))
            }
            invalid @ SchemaError::InvalidPattern { .. } => Error::Io(invalid.to_string()),
            SchemaError::Compilation(m) => Error::Compilation(m),
            SchemaError::Schema(m) => Error::Schema(m),
            SchemaError::NotFound(name) => Error::NotFound(name),
        }
    }
}

impl From<ProtoJsonError> for Error {
    fn from(err: ProtoJsonError) -> Self {
        match err {
            ProtoJsonError::Decode(m) => Error::Decode(m),
            ProtoJsonError::Render(m) => Error::Render(m),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err: Error = SchemaError::NotFound("demo.Missing".to_string()).into();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(err.to_string(), "proto not found: demo.Missing");
    }

    #[test]
    fn test_schema_errors_keep_their_category() {
        let err: Error = SchemaError::Compilation("protoc exited with 1".to_string()).into();
        assert!(matches!(err, Error::Compilation(_)));

        let err: Error = SchemaError::InvalidPattern {
            pattern: "[".to_string(),
            message: "unclosed".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Io(m) if m.contains("'['")));
    }

    #[test]
    fn test_at_line_prefixes_message() {
        let err = Error::Encoding("Invalid byte 33".to_string()).at_line(3);
        assert_eq!(err.to_string(), "Base64 decode error: line 3: Invalid byte 33");

        let err: Error = ProtoJsonError::Decode("truncated".to_string()).into();
        assert!(matches!(err.at_line(2), Error::Decode(m) if m == "line 2: truncated"));
    }
}
