//! # Value
//!
//! The reply/storage type threaded through the dispatcher, the keyspace and the wire codec.
//! Encoding follows RESP2 (<https://redis.io/docs/reference/protocol-spec/>): simple strings,
//! errors, integers, bulk strings (plus the nil bulk string) and arrays (plus the nil array).
pub mod sorted_set;

use crate::{error::Error, value_try_from, value_vec_try_from};
use bytes::{Bytes, BytesMut};
use redis_zero_protocol_parser::Value as ParsedValue;
use std::{
    convert::{TryFrom, TryInto},
    str::FromStr,
};

/// A reply (or a stored container) flowing through the command pipeline.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    /// A contracted sorted set (ZADD/ZRANGE/...). This is the only aggregate container type
    /// this keyspace knows how to store.
    SortedSet(sorted_set::SortedSet),
    /// Array/multi-bulk reply
    Array(Vec<Value>),
    /// Bulk string: binary-safe byte string
    Blob(BytesMut),
    /// Simple string: a short, non-binary status line such as `+OK`
    String(String),
    /// Error reply: `(error type, message)`, e.g. `("ERR", "syntax error")`
    Err(String, String),
    /// Integer reply
    Integer(i64),
    /// Nil bulk string reply (`$-1\r\n`)
    NullBulk,
    /// Nil array reply (`*-1\r\n`)
    NullArray,
    /// `+OK\r\n`
    Ok,
    /// Nothing is written to the client: used for malformed/empty input lines.
    Ignore,
}

impl Default for Value {
    fn default() -> Self {
        Self::NullBulk
    }
}

impl Value {
    /// Creates a new bulk string value from a byte slice.
    pub fn new(value: &[u8]) -> Self {
        Self::Blob(value.into())
    }

    /// Is this value an error reply?
    pub fn is_err(&self) -> bool {
        matches!(self, Self::Err(..))
    }
}

/// Formats a sorted set score the way ZSCORE/ZRANGE WITHSCORES/... report it: `+Inf`/`-Inf` for
/// the infinities, otherwise the shortest decimal that round-trips back to the same `f64`.
pub fn format_score(score: f64) -> String {
    if score == f64::INFINITY {
        "+Inf".to_owned()
    } else if score == f64::NEG_INFINITY {
        "-Inf".to_owned()
    } else {
        format!("{}", score)
    }
}

/// Encodes a score the way ZSCORE/ZINCRBY/... report it: as a bulk string holding
/// [`format_score`]'s output.
pub fn score_to_value(score: f64) -> Value {
    Value::Blob(format_score(score).into_bytes()[..].into())
}

impl From<&Value> for Vec<u8> {
    fn from(value: &Value) -> Vec<u8> {
        match value {
            Value::Ignore => b"".to_vec(),
            Value::NullBulk => b"$-1\r\n".to_vec(),
            Value::NullArray => b"*-1\r\n".to_vec(),
            Value::Array(x) => {
                let mut s: Vec<u8> = format!("*{}\r\n", x.len()).into();
                for i in x.iter() {
                    let b: Vec<u8> = i.into();
                    s.extend(b);
                }
                s
            }
            Value::Integer(x) => format!(":{}\r\n", x).into(),
            Value::Blob(x) => {
                let mut s: BytesMut = format!("${}\r\n", x.len()).as_str().as_bytes().into();
                s.extend_from_slice(x);
                s.extend_from_slice(b"\r\n");
                s.to_vec()
            }
            Value::Err(x, y) => format!("-{} {}\r\n", x, y).into(),
            Value::String(x) => format!("+{}\r\n", x).into(),
            Value::Ok => b"+OK\r\n".to_vec(),
            Value::SortedSet(_) => {
                b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n".to_vec()
            }
        }
    }
}

impl From<Value> for Vec<u8> {
    fn from(value: Value) -> Vec<u8> {
        (&value).into()
    }
}

impl TryFrom<&Value> for i64 {
    type Error = Error;

    fn try_from(val: &Value) -> Result<Self, Self::Error> {
        match val {
            Value::Integer(x) => Ok(*x),
            Value::Blob(x) => bytes_to_number::<i64>(x),
            Value::String(x) => x.parse::<i64>().map_err(|_| Error::NotANumber),
            _ => Err(Error::NotANumber),
        }
    }
}

impl TryFrom<&Value> for f64 {
    type Error = Error;

    fn try_from(val: &Value) -> Result<Self, Self::Error> {
        match val {
            Value::Blob(x) => bytes_to_number::<f64>(x),
            Value::String(x) => x.parse::<f64>().map_err(|_| Error::NotANumber),
            _ => Err(Error::NotANumber),
        }
    }
}

/// Tries to convert bytes data into a number.
///
/// If the conversion fails a `Error::NotANumber` error is returned.
#[inline]
pub fn bytes_to_number<T: FromStr>(bytes: &[u8]) -> Result<T, Error> {
    let x = String::from_utf8_lossy(bytes);
    x.parse::<T>().map_err(|_| Error::NotANumber)
}

/// Parses a ZADD/ZINCRBY score token, including the `+inf`/`-inf`/`inf` spellings Redis accepts.
pub fn bytes_to_score(bytes: &[u8]) -> Result<f64, Error> {
    match bytes.to_ascii_lowercase().as_slice() {
        b"+inf" | b"inf" | b"infinity" | b"+infinity" => Ok(f64::INFINITY),
        b"-inf" | b"-infinity" => Ok(f64::NEG_INFINITY),
        _ => {
            let s = String::from_utf8_lossy(bytes);
            let value: f64 = s.parse().map_err(|_| Error::NotAValidFloat)?;
            if value.is_nan() {
                Err(Error::NotAValidFloat)
            } else {
                Ok(value)
            }
        }
    }
}

impl<'a> From<&ParsedValue<'a>> for Value {
    fn from(value: &ParsedValue) -> Self {
        match value {
            ParsedValue::String(x) => Self::String((*x).to_string()),
            ParsedValue::Blob(x) => Self::new(x),
            ParsedValue::Array(x) => Self::Array(x.iter().map(|x| x.into()).collect()),
            ParsedValue::Boolean(x) => Self::Integer(if *x { 1 } else { 0 }),
            ParsedValue::BigInteger(x) => Self::String(x.to_string()),
            ParsedValue::Integer(x) => Self::Integer(*x),
            ParsedValue::Float(x) => Self::String(format_score(*x)),
            ParsedValue::Error(x, y) => Self::Err((*x).to_string(), (*y).to_string()),
            ParsedValue::Null => Self::NullBulk,
        }
    }
}

value_try_from!(i32, Value::Integer);
value_try_from!(u32, Value::Integer);
value_try_from!(i64, Value::Integer);

impl From<usize> for Value {
    fn from(value: usize) -> Value {
        Value::Integer(value as i64)
    }
}

impl From<Option<&Bytes>> for Value {
    fn from(v: Option<&Bytes>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::NullBulk,
        }
    }
}

impl From<&Bytes> for Value {
    fn from(v: &Bytes) -> Self {
        Value::new(v)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::Blob(value.as_bytes().into())
    }
}

value_vec_try_from!(&str);

impl From<String> for Value {
    fn from(value: String) -> Value {
        value.as_str().into()
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Value {
        Value::Array(value)
    }
}

impl TryInto<Vec<Value>> for Value {
    type Error = Error;

    fn try_into(self) -> Result<Vec<Value>, Self::Error> {
        match self {
            Self::Array(x) => Ok(x),
            _ => Err(Error::Internal),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use paste::paste;

    macro_rules! serialize_deserialize {
        ($name:ty, $x:expr, $str:expr) => {
            paste! {
                #[test]
                fn [<serialize_and_deserialize_ $name>]() {
                    let raw_bytes: Vec<u8> = $x.into();
                    let parsed: ParsedValue = redis_zero_protocol_parser::parse(&raw_bytes).unwrap().1;
                    assert_eq!(Value::String($str.to_owned()), (&parsed).into());
                }
            }
        };
        ($name:ty, $x:expr) => {
            paste! {
                #[test]
                fn [<serialize_and_deserialize_ $name>]() {
                    let raw_bytes: Vec<u8> = $x.into();
                    let parsed: ParsedValue = redis_zero_protocol_parser::parse(&raw_bytes).unwrap().1;
                    assert_eq!($x, (&parsed).into());
                }
            }
        };
    }

    macro_rules! try_into {
        ($name:ty, $x:expr, $ty:ty, $expected:expr) => {
            paste! {
                #[test]
                fn [<try_into_ $ty _ $name>]() {
                    let val: Result<$ty, _> = (&$x).try_into();
                    assert_eq!(val, $expected);
                }
            }
        };
    }

    serialize_deserialize!(blob, Value::Blob("test".into()));
    serialize_deserialize!(int, Value::Integer(1));
    serialize_deserialize!(string, Value::String("test".into()));
    serialize_deserialize!(array, Value::Array(vec!["test".into(), "1.2".into()]));
    serialize_deserialize!(err, Value::Err("foo".to_owned(), "bar".to_owned()));
    serialize_deserialize!(ok, Value::Ok, "OK");

    try_into!(integer, Value::Integer(2), i64, Ok(2));
    try_into!(blob, Value::Blob("3".into()), i64, Ok(3));
    try_into!(string, Value::String("4".into()), i64, Ok(4));
    try_into!(ok, Value::Ok, i64, Err(Error::NotANumber));
    try_into!(
        string_1,
        Value::String("foo".into()),
        i64,
        Err(Error::NotANumber)
    );
    try_into!(blob, Value::Blob("3.1".into()), f64, Ok(3.1));
    try_into!(string, Value::String("4.1".into()), f64, Ok(4.1));
    try_into!(ok, Value::Ok, f64, Err(Error::NotANumber));

    #[test]
    fn test_try_into_array() {
        let x: Result<Vec<Value>, _> = Value::Ok.try_into();
        assert_eq!(Err(Error::Internal), x);
    }

    #[test]
    fn null_bulk_and_null_array_encode_differently() {
        let bulk: Vec<u8> = Value::NullBulk.into();
        let array: Vec<u8> = Value::NullArray.into();
        assert_eq!(b"$-1\r\n".to_vec(), bulk);
        assert_eq!(b"*-1\r\n".to_vec(), array);
    }

    #[test]
    fn serialize_none() {
        let x: Option<Bytes> = None;
        assert_eq!(Value::NullBulk, x.as_ref().into());
    }

    #[test]
    fn serialize_bytes() {
        let x: Option<Bytes> = Some("test".into());
        assert_eq!(Value::Blob("test".into()), x.as_ref().into());
    }

    #[test]
    fn test_is_err() {
        assert!(Value::Err("foo".to_owned(), "bar".to_owned()).is_err());
        assert!(!Value::Ok.is_err());
    }

    #[test]
    fn score_formatting() {
        assert_eq!("+Inf", format_score(f64::INFINITY));
        assert_eq!("-Inf", format_score(f64::NEG_INFINITY));
        assert_eq!("1", format_score(1.0));
        assert_eq!("1.5", format_score(1.5));
    }

    #[test]
    fn score_parsing_accepts_infinities() {
        assert_eq!(Ok(f64::INFINITY), bytes_to_score(b"+inf"));
        assert_eq!(Ok(f64::INFINITY), bytes_to_score(b"inf"));
        assert_eq!(Ok(f64::NEG_INFINITY), bytes_to_score(b"-inf"));
        assert_eq!(Ok(1.5), bytes_to_score(b"1.5"));
        assert_eq!(Err(Error::NotAValidFloat), bytes_to_score(b"nan"));
        assert_eq!(Err(Error::NotAValidFloat), bytes_to_score(b"not-a-number"));
    }
}
