//! # Redis Error
//!
//! All redis errors are abstracted in this mod.
use crate::value::Value;

/// Redis errors
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// A command is not found
    CommandNotFound(String),
    /// Invalid number of arguments
    InvalidArgsCount(String),
    /// Internal Error
    Internal,
    /// Protocol error
    Protocol(String, String),
    /// Index out of range
    OutOfRange,
    /// Syntax error
    Syntax,
    /// Byte cannot be converted to a number
    NotANumber,
    /// Wrong data type
    WrongType,
    /// An option token is not recognized
    UnsupportedOption(String),
    /// Two or more options passed to a command are not compatible with each other
    OptsNotCompatible(String),
    /// Connection was closed or reset mid-request
    Quit,
    /// A command line with no content was received
    EmptyLine,
    /// Low level I/O error while reading/writing the protocol
    Io,
    /// A score token could not be parsed as a float (or as one of the `inf`/`-inf` spellings)
    NotAValidFloat,
    /// The literal score, or the result of an INCR, is NaN
    ScoreNotANumber,
    /// INCR was combined with more than one score/member pair
    IncrArity,
    /// INCR was applied to a member whose current score is already `+inf`/`-inf`
    IncrInfinite,
    /// INCR was combined with XX against a member that does not exist
    IncrMissing,
    /// A COUNT argument must be strictly positive
    CountOutOfRange,
    /// WEIGHTS was given a number of values different from the number of input keys
    WeightsCountMismatch,
    /// The operation's context was cancelled while waiting to acquire a key lock
    Cancelled,
}

impl Error {
    fn encode(&self) -> (&'static str, String) {
        let err_type = match self {
            Error::WrongType => "WRONGTYPE",
            _ => "ERR",
        };

        let err_msg = match self {
            Error::CommandNotFound(x) => format!("unknown command `{}`", x),
            Error::InvalidArgsCount(x) => format!("wrong number of arguments for '{}' command", x),
            Error::Internal => "internal error".to_owned(),
            Error::Protocol(x, y) => format!("Protocol error: expected '{}', got '{}'", x, y),
            Error::NotANumber => "value is not an integer or out of range".to_owned(),
            Error::OutOfRange => "index out of range".to_owned(),
            Error::Syntax => "syntax error".to_owned(),
            Error::WrongType => {
                "Operation against a key holding the wrong kind of value".to_owned()
            }
            Error::UnsupportedOption(x) => format!("Unsupported option {}", x),
            Error::OptsNotCompatible(x) => format!("{} are not compatible options", x),
            Error::Quit => "connection closed".to_owned(),
            Error::EmptyLine => "empty command".to_owned(),
            Error::Io => "I/O error".to_owned(),
            Error::NotAValidFloat => "value is not a valid float".to_owned(),
            Error::ScoreNotANumber => "resulting score is not a number (NaN)".to_owned(),
            Error::IncrArity => "INCR option supports a single increment-element pair".to_owned(),
            Error::IncrInfinite => "increment would produce NaN on an infinite score".to_owned(),
            Error::IncrMissing => "INCR/XX can't be used against a non existing member".to_owned(),
            Error::CountOutOfRange => "value is out of range, must be positive".to_owned(),
            Error::WeightsCountMismatch => {
                "syntax error, WEIGHTS must be given for each input key".to_owned()
            }
            Error::Cancelled => "operation cancelled".to_owned(),
        };

        (err_type, err_msg)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (err_type, err_msg) = self.encode();
        write!(f, "{} {}", err_type, err_msg)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(_: std::io::Error) -> Self {
        Error::Io
    }
}

impl From<redis_config_parser::de::Error> for Error {
    fn from(err: redis_config_parser::de::Error) -> Self {
        Error::Protocol("config".to_owned(), err.to_string())
    }
}

impl From<Error> for Value {
    fn from(value: Error) -> Value {
        let (err_type, err_msg) = value.encode();
        Value::Err(err_type.to_string(), err_msg)
    }
}
