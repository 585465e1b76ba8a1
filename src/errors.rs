use thiserror::Error;

/// Errors raised while shredding, materializing, encoding or decoding.
///
/// Every variant is a deterministic failure of the call in progress: the same
/// input fails the same way, so none of them should be retried as-is.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("too many values for field: {0}")]
    TooManyValuesForField(String),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("missing option: {option} (required for {type_name})")]
    MissingOption {
        option: &'static str,
        type_name: &'static str,
    },

    #[error("invalid value for FIXED_LEN_BYTE_ARRAY: expected {expected} bytes, got {actual}")]
    InvalidFixedLengthValue { expected: usize, actual: usize },

    #[error("invalid RLE encoding: {0}")]
    InvalidRleEncoding(String),

    #[error("{type_name} value is out of bounds: {value}")]
    Domain { type_name: String, value: String },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("out of spec: {0}")]
    OutOfSpec(String),

    #[error("compression error: {0}")]
    Compression(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn domain(type_name: impl ToString, value: impl ToString) -> Self {
        Error::Domain {
            type_name: type_name.to_string(),
            value: value.to_string(),
        }
    }
}

macro_rules! general_err {
    ($fmt:expr) => ($crate::errors::Error::OutOfSpec($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => ($crate::errors::Error::OutOfSpec(format!($fmt, $($args),*)));
}

macro_rules! rle_err {
    ($fmt:expr) => ($crate::errors::Error::InvalidRleEncoding($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => ($crate::errors::Error::InvalidRleEncoding(format!($fmt, $($args),*)));
}

macro_rules! schema_err {
    ($fmt:expr) => ($crate::errors::Error::InvalidSchema($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => ($crate::errors::Error::InvalidSchema(format!($fmt, $($args),*)));
}
