/*!
 * RESP Wire Codec
 *
 * Implements the Redis Serialization Protocol: framing, parsing and
 * serialization of the five value kinds used by the rest of this crate.
 * The codec is generic over `Read`/`Write` so the same implementation
 * drives both live client sockets and the append-only log.
 */

use crate::error::{Error, Result};
use std::io::{Read, Write};

/// Maximum accepted bulk string length: 512 MiB.
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;
/// Maximum accepted array length.
pub const MAX_ARRAY_LEN: i64 = 1_048_576;

/// One RESP datum.
///
/// `BulkString` and `Array` carry their own null marker; the other three
/// variants have no null representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Option<Vec<u8>>),
    Array(Option<Vec<Value>>),
}

impl Value {
    /// Convenience constructor for a non-null bulk string.
    pub fn bulk(bytes: impl Into<Vec<u8>>) -> Value {
        Value::BulkString(Some(bytes.into()))
    }

    /// Convenience constructor for an array request/response.
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Some(items))
    }

    /// Raw bytes backing a non-null bulk string, if this is one.
    pub fn as_bulk(&self) -> Option<&[u8]> {
        match self {
            Value::BulkString(Some(b)) => Some(b),
            _ => None,
        }
    }

    /// The elements of a non-null array, if this is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(Some(items)) => Some(items),
            _ => None,
        }
    }
}

/// Reads RESP values one at a time from an underlying byte stream.
pub struct Reader<R> {
    inner: R,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R) -> Self {
        Reader { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads exactly one complete value.
    ///
    /// Stray CR/LF bytes at the tag position are skipped silently — this
    /// tolerates clients that send extra line endings between pipelined
    /// requests. An `Io` error (including a clean EOF) is returned if the
    /// stream ends before a tag byte is found.
    pub fn read_value(&mut self) -> Result<Value> {
        loop {
            let tag = self.read_byte()?;
            match tag {
                b'\r' | b'\n' => continue,
                b'+' => return Ok(Value::SimpleString(self.read_line_string()?)),
                b'-' => return Ok(Value::Error(self.read_line_string()?)),
                b':' => return Ok(Value::Integer(self.read_decimal_line()?)),
                b'$' => return self.read_bulk(),
                b'*' => return self.read_array(),
                other => {
                    return Err(Error::protocol(format!(
                        "expected type tag, got {:?}",
                        other as char
                    )))
                }
            }
        }
    }

    /// Reads a single byte, or an `Io` error on EOF/failure.
    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Accumulates bytes until a trailing CR LF, returning the line
    /// without the terminator.
    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        loop {
            let b = self.read_byte()?;
            if b == b'\n' && line.last() == Some(&b'\r') {
                line.pop();
                return Ok(line);
            }
            line.push(b);
        }
    }

    /// Reads a line (see `read_line`) and validates it as UTF-8, for the
    /// simple/error string variants.
    fn read_line_string(&mut self) -> Result<String> {
        let bytes = self.read_line()?;
        String::from_utf8(bytes).map_err(|_| Error::protocol("invalid utf-8 in line"))
    }

    /// Reads a line and parses it as a decimal `i64` — used for the
    /// integer variant as well as the bulk/array length prefixes.
    fn read_decimal_line(&mut self) -> Result<i64> {
        let bytes = self.read_line()?;
        let s =
            std::str::from_utf8(&bytes).map_err(|_| Error::protocol("invalid utf-8 in integer"))?;
        s.parse::<i64>()
            .map_err(|_| Error::protocol(format!("invalid integer: {:?}", s)))
    }

    /// Reads a bulk string body after the `$` tag has been consumed: a
    /// length prefix, the payload, and its trailing CR LF. A length of
    /// `-1` is the null-bulk form; anything outside `0..=MAX_BULK_LEN`
    /// is rejected.
    fn read_bulk(&mut self) -> Result<Value> {
        let len = self.read_decimal_line()?;
        if len == -1 {
            return Ok(Value::BulkString(None));
        }
        if !(0..=MAX_BULK_LEN).contains(&len) {
            return Err(Error::protocol(format!("bulk string too long: {}", len)));
        }
        let mut payload = vec![0u8; len as usize];
        self.inner.read_exact(&mut payload)?;
        let mut crlf = [0u8; 2];
        self.inner.read_exact(&mut crlf)?;
        Ok(Value::BulkString(Some(payload)))
    }

    /// Reads an array body after the `*` tag has been consumed: a length
    /// prefix followed by that many nested values, read recursively via
    /// `read_value`. A length of `-1` is the null-array form; anything
    /// outside `0..=MAX_ARRAY_LEN` is rejected.
    fn read_array(&mut self) -> Result<Value> {
        let len = self.read_decimal_line()?;
        if len == -1 {
            return Ok(Value::Array(None));
        }
        if !(0..=MAX_ARRAY_LEN).contains(&len) {
            return Err(Error::protocol(format!("array too long: {}", len)));
        }
        let mut items = Vec::with_capacity(len as usize);
        for _ in 0..len {
            items.push(self.read_value()?);
        }
        Ok(Value::Array(Some(items)))
    }
}

/// Writes RESP values to an underlying byte sink.
pub struct Writer<W> {
    inner: W,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Writer { inner }
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Writes a simple string, e.g. `+OK\r\n`.
    pub fn write_simple_string(&mut self, s: &str) -> Result<()> {
        write!(self.inner, "+{}\r\n", s)?;
        Ok(())
    }

    /// Writes an error reply, e.g. `-ERR boom\r\n`.
    pub fn write_error(&mut self, s: &str) -> Result<()> {
        write!(self.inner, "-{}\r\n", s)?;
        Ok(())
    }

    /// Writes an integer reply, e.g. `:42\r\n`.
    pub fn write_integer(&mut self, i: i64) -> Result<()> {
        write!(self.inner, ":{}\r\n", i)?;
        Ok(())
    }

    /// Writes a non-null bulk string: length prefix, payload, CR LF.
    pub fn write_bulk(&mut self, b: &[u8]) -> Result<()> {
        write!(self.inner, "${}\r\n", b.len())?;
        self.inner.write_all(b)?;
        self.inner.write_all(b"\r\n")?;
        Ok(())
    }

    /// Writes the null-bulk form, `$-1\r\n`.
    pub fn write_null(&mut self) -> Result<()> {
        self.inner.write_all(b"$-1\r\n")?;
        Ok(())
    }

    /// Writes the null-array form, `*-1\r\n`.
    pub fn write_null_array(&mut self) -> Result<()> {
        self.inner.write_all(b"*-1\r\n")?;
        Ok(())
    }

    /// Writes a non-null array: length prefix followed by each item,
    /// recursively, via `write_value`.
    pub fn write_array(&mut self, items: &[Value]) -> Result<()> {
        write!(self.inner, "*{}\r\n", items.len())?;
        for item in items {
            self.write_value(item)?;
        }
        Ok(())
    }

    /// Serializes any `Value`, recursing into array children.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::SimpleString(s) => self.write_simple_string(s),
            Value::Error(s) => self.write_error(s),
            Value::Integer(i) => self.write_integer(*i),
            Value::BulkString(Some(b)) => self.write_bulk(b),
            Value::BulkString(None) => self.write_null(),
            Value::Array(Some(items)) => self.write_array(items),
            Value::Array(None) => self.write_null_array(),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Serializes a value into a freshly-allocated buffer — used by the AOF
/// to build a record before taking the file mutex.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    Writer::new(&mut buf)
        .write_value(value)
        .expect("writing to a Vec<u8> cannot fail");
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(v: Value) {
        let bytes = encode(&v);
        let mut r = Reader::new(Cursor::new(bytes));
        let parsed = r.read_value().unwrap();
        assert_eq!(parsed, v);
    }

    #[test]
    fn roundtrips_simple_string() {
        roundtrip(Value::SimpleString("OK".into()));
    }

    #[test]
    fn roundtrips_error() {
        roundtrip(Value::Error("ERR boom".into()));
    }

    #[test]
    fn roundtrips_integer() {
        roundtrip(Value::Integer(-42));
        roundtrip(Value::Integer(0));
    }

    #[test]
    fn roundtrips_bulk_string() {
        roundtrip(Value::bulk(b"hello".to_vec()));
        roundtrip(Value::bulk(Vec::new()));
        roundtrip(Value::BulkString(None));
    }

    #[test]
    fn roundtrips_nested_array() {
        roundtrip(Value::array(vec![
            Value::bulk(b"SET".to_vec()),
            Value::bulk(b"k".to_vec()),
            Value::array(vec![Value::Integer(1), Value::BulkString(None)]),
        ]));
        roundtrip(Value::Array(None));
        roundtrip(Value::Array(Some(Vec::new())));
    }

    #[test]
    fn parses_request_array() {
        let mut r = Reader::new(Cursor::new(
            b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n".to_vec(),
        ));
        let v = r.read_value().unwrap();
        let items = v.as_array().unwrap();
        assert_eq!(items[0].as_bulk(), Some(&b"SET"[..]));
        assert_eq!(items[1].as_bulk(), Some(&b"a"[..]));
        assert_eq!(items[2].as_bulk(), Some(&b"1"[..]));
    }

    #[test]
    fn skips_stray_crlf_between_pipelined_requests() {
        let mut r = Reader::new(Cursor::new(
            b"\r\n*1\r\n$4\r\nPING\r\n".to_vec(),
        ));
        let v = r.read_value().unwrap();
        assert_eq!(v.as_array().unwrap()[0].as_bulk(), Some(&b"PING"[..]));
    }

    #[test]
    fn rejects_bad_tag() {
        let mut r = Reader::new(Cursor::new(b"!nope\r\n".to_vec()));
        assert!(matches!(r.read_value(), Err(Error::Protocol(_))));
    }

    #[test]
    fn rejects_oversized_bulk() {
        let mut r = Reader::new(Cursor::new(b"$999999999999\r\n".to_vec()));
        assert!(matches!(r.read_value(), Err(Error::Protocol(_))));
    }

    #[test]
    fn rejects_oversized_array() {
        let mut r = Reader::new(Cursor::new(b"*99999999\r\n".to_vec()));
        assert!(matches!(r.read_value(), Err(Error::Protocol(_))));
    }

    #[test]
    fn eof_mid_value_is_io_error() {
        let mut r = Reader::new(Cursor::new(b"$5\r\nhel".to_vec()));
        assert!(matches!(r.read_value(), Err(Error::Io(_))));
    }

    #[test]
    fn clean_eof_at_tag_position_is_io_error() {
        let mut r = Reader::new(Cursor::new(Vec::new()));
        assert!(matches!(r.read_value(), Err(Error::Io(_))));
    }
}
