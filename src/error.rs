//! Library error types.
use std::fmt;

/// A jksn `Result`, normally returning a jksn [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A jksn error. Encompasses the failure modes spec §6 surfaces: encoding
/// hitting an unsupported dynamic type or value, and decoding meeting an
/// invalid, incomplete, or unmappable stream.
#[derive(Clone, Debug)]
pub enum Error {
    /// Encode attempted to dump a dynamic value kind this codec has no
    /// proxy rule for.
    UnsupportedType(&'static str),
    /// Encode rejected a value on semantic grounds (e.g. a VLQ asked to
    /// encode a negative magnitude).
    UnsupportedValue(String),
    /// Decode met an invalid or incomplete byte stream.
    SyntaxError {
        message: String,
        /// Byte offset (from the start of the document, magic included)
        /// where the failure was detected.
        offset: i64,
    },
    /// A decoded value's kind cannot populate the caller's sink.
    UnmarshalType {
        expected: &'static str,
        offset: i64,
    },
    /// `Unmarshal` was called with no usable destination.
    InvalidUnmarshal,
    /// The underlying reader/writer failed.
    Io(String),
}

impl Error {
    pub(crate) fn eof(offset: i64) -> Error {
        Error::SyntaxError {
            message: "unexpected end of stream".to_string(),
            offset,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>, offset: i64) -> Error {
        Error::SyntaxError {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnsupportedType(ty) => write!(f, "jksn: unsupported type: {}", ty),
            Error::UnsupportedValue(msg) => write!(f, "jksn: unsupported value: {}", msg),
            Error::SyntaxError { message, offset } => {
                write!(f, "jksn: syntax error at offset {}: {}", offset, message)
            }
            Error::UnmarshalType { expected, offset } => write!(
                f,
                "jksn: cannot unmarshal value at offset {} into {}",
                offset, expected
            ),
            Error::InvalidUnmarshal => write!(f, "jksn: Unmarshal(invalid destination)"),
            Error::Io(msg) => write!(f, "jksn: i/o error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
