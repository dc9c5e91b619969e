use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoJsonError {
    #[error("Protobuf decode error: {0}")]
    Decode(String),

    #[error("JSON render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, ProtoJsonError>;
