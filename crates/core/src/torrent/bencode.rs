//! Bencode codec for torrent metadata.
//!
//! Values are kept as a tagged enum so every consumer has to handle the four
//! wire cases explicitly. Dictionaries are stored in a `BTreeMap`, which gives
//! byte-lexicographic key order on encode for free.

use std::collections::BTreeMap;

use thiserror::Error;

/// Maximum nesting of lists/dicts accepted by the decoder.
const MAX_DEPTH: usize = 64;

/// A decoded bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(BTreeMap<Vec<u8>, Value>),
}

impl Value {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, Value>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Look up a key when this value is a dictionary.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict().and_then(|map| map.get(key))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Bytes(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// Errors produced while decoding bencode data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BencodeError {
    #[error("Unexpected end of data at offset {0}")]
    UnexpectedEof(usize),

    #[error("Invalid bencode type tag {tag:#04x} at offset {offset}")]
    InvalidTag { tag: u8, offset: usize },

    #[error("Invalid integer at offset {0}")]
    InvalidInteger(usize),

    #[error("Invalid string length at offset {0}")]
    InvalidLength(usize),

    #[error("Dictionary key at offset {0} is not a byte string")]
    NonStringKey(usize),

    #[error("Nesting too deep at offset {0}")]
    TooDeep(usize),

    #[error("Trailing data after value at offset {0}")]
    TrailingData(usize),
}

/// Decode a single bencode value spanning the whole input.
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let mut decoder = Decoder { data, pos: 0 };
    let value = decoder.value(0)?;
    if decoder.pos != data.len() {
        return Err(BencodeError::TrailingData(decoder.pos));
    }
    Ok(value)
}

/// Encode a value. Dictionary keys come out sorted.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Integer(i) => {
            out.push(b'i');
            out.extend_from_slice(i.to_string().as_bytes());
            out.push(b'e');
        }
        Value::Bytes(bytes) => encode_bytes(bytes, out),
        Value::List(items) => {
            out.push(b'l');
            for item in items {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        Value::Dict(map) => {
            out.push(b'd');
            for (key, item) in map {
                encode_bytes(key, out);
                encode_into(item, out);
            }
            out.push(b'e');
        }
    }
}

fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(bytes.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(bytes);
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    fn peek(&self) -> Result<u8, BencodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(BencodeError::UnexpectedEof(self.pos))
    }

    fn value(&mut self, depth: usize) -> Result<Value, BencodeError> {
        if depth > MAX_DEPTH {
            return Err(BencodeError::TooDeep(self.pos));
        }

        match self.peek()? {
            b'i' => {
                self.pos += 1;
                self.integer().map(Value::Integer)
            }
            b'l' => {
                self.pos += 1;
                let mut items = Vec::new();
                while self.peek()? != b'e' {
                    items.push(self.value(depth + 1)?);
                }
                self.pos += 1;
                Ok(Value::List(items))
            }
            b'd' => {
                self.pos += 1;
                let mut map = BTreeMap::new();
                while self.peek()? != b'e' {
                    let key_offset = self.pos;
                    if !self.peek()?.is_ascii_digit() {
                        return Err(BencodeError::NonStringKey(key_offset));
                    }
                    let key = self.bytes()?;
                    let item = self.value(depth + 1)?;
                    map.insert(key, item);
                }
                self.pos += 1;
                Ok(Value::Dict(map))
            }
            b'0'..=b'9' => self.bytes().map(Value::Bytes),
            tag => Err(BencodeError::InvalidTag {
                tag,
                offset: self.pos,
            }),
        }
    }

    /// Reads digits up to `terminator`, returning them without the terminator.
    fn digits_until(&mut self, terminator: u8) -> Result<&[u8], BencodeError> {
        let start = self.pos;
        let end = self.data[start..]
            .iter()
            .position(|&b| b == terminator)
            .map(|idx| start + idx)
            .ok_or(BencodeError::UnexpectedEof(self.data.len()))?;
        self.pos = end + 1;
        Ok(&self.data[start..end])
    }

    fn integer(&mut self) -> Result<i64, BencodeError> {
        let offset = self.pos;
        let raw = self.digits_until(b'e')?;
        let text = std::str::from_utf8(raw).map_err(|_| BencodeError::InvalidInteger(offset))?;
        let well_formed = match text.as_bytes() {
            [] | [b'-'] => false,
            [b'-', rest @ ..] => rest.iter().all(u8::is_ascii_digit),
            digits => digits.iter().all(u8::is_ascii_digit),
        };
        if !well_formed {
            return Err(BencodeError::InvalidInteger(offset));
        }
        text.parse()
            .map_err(|_| BencodeError::InvalidInteger(offset))
    }

    fn bytes(&mut self) -> Result<Vec<u8>, BencodeError> {
        let offset = self.pos;
        let raw = self.digits_until(b':')?;
        if raw.is_empty() || !raw.iter().all(u8::is_ascii_digit) {
            return Err(BencodeError::InvalidLength(offset));
        }
        let len: usize = std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(BencodeError::InvalidLength(offset))?;

        let start = self.pos;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(BencodeError::UnexpectedEof(self.data.len()))?;
        self.pos = end;
        Ok(self.data[start..end].to_vec())
    }
}
