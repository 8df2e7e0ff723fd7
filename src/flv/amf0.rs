//! A decoder for AMF0 (Action Message Format 0), used to carry the name/value pairs of an FLV
//! script tag (and, in RTMP, command invocations -- out of scope here: only the decoder used by
//! script-tag parsing is implemented).

use crate::flv::FlvError;
use std::collections::BTreeMap;
use std::convert::TryInto;

const MARKER_NUMBER: u8 = 0x00;
const MARKER_BOOLEAN: u8 = 0x01;
const MARKER_STRING: u8 = 0x02;
const MARKER_OBJECT: u8 = 0x03;
const MARKER_NULL: u8 = 0x05;
const MARKER_UNDEFINED: u8 = 0x06;
const MARKER_REFERENCE: u8 = 0x07;
const MARKER_ECMA_ARRAY: u8 = 0x08;
const MARKER_OBJECT_END: u8 = 0x09;
const MARKER_STRICT_ARRAY: u8 = 0x0a;
const MARKER_DATE: u8 = 0x0b;

/// A decoded AMF0 value. Covers the marker set used by script-tag metadata; markers not in this
/// list (e.g. `MovieClip`, `LongString`, `XMLDocument`) are not produced by this decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(String),
    Object(BTreeMap<String, Value>),
    Null,
    Undefined,
    Reference(u16),
    EcmaArray(BTreeMap<String, Value>),
    StrictArray(Vec<Value>),
    /// Milliseconds since the epoch, plus a (unused in practice) timezone offset in minutes.
    Date { millis: f64, timezone_offset: i16 },
}

/// Reads one AMF0 value, returning it along with the unconsumed remainder of `data`.
pub fn decode_value(data: &[u8]) -> Result<(Value, &[u8]), FlvError> {
    if data.is_empty() {
        return Err(FlvError::TooShort);
    }
    let marker = data[0];
    let rest = &data[1..];
    match marker {
        MARKER_NUMBER => {
            let (bytes, rest) = take(rest, 8)?;
            let n = f64::from_be_bytes(bytes.try_into().unwrap());
            Ok((Value::Number(n), rest))
        }
        MARKER_BOOLEAN => {
            let (bytes, rest) = take(rest, 1)?;
            Ok((Value::Boolean(bytes[0] != 0), rest))
        }
        MARKER_STRING => decode_string(rest).map(|(s, rest)| (Value::String(s), rest)),
        MARKER_OBJECT => decode_object_body(rest).map(|(m, rest)| (Value::Object(m), rest)),
        MARKER_NULL => Ok((Value::Null, rest)),
        MARKER_UNDEFINED => Ok((Value::Undefined, rest)),
        MARKER_REFERENCE => {
            let (bytes, rest) = take(rest, 2)?;
            let id = u16::from_be_bytes(bytes.try_into().unwrap());
            Ok((Value::Reference(id), rest))
        }
        MARKER_ECMA_ARRAY => {
            let (count_bytes, rest) = take(rest, 4)?;
            let _count = u32::from_be_bytes(count_bytes.try_into().unwrap());
            decode_object_body(rest).map(|(m, rest)| (Value::EcmaArray(m), rest))
        }
        MARKER_STRICT_ARRAY => {
            let (count_bytes, mut rest) = take(rest, 4)?;
            let count = u32::from_be_bytes(count_bytes.try_into().unwrap());
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (v, tail) = decode_value(rest)?;
                values.push(v);
                rest = tail;
            }
            Ok((Value::StrictArray(values), rest))
        }
        MARKER_DATE => {
            let (bytes, rest) = take(rest, 10)?;
            let millis = f64::from_be_bytes(bytes[0..8].try_into().unwrap());
            let timezone_offset = i16::from_be_bytes(bytes[8..10].try_into().unwrap());
            Ok((
                Value::Date {
                    millis,
                    timezone_offset,
                },
                rest,
            ))
        }
        _ => Err(FlvError::Amf0UnsupportedMarker(marker)),
    }
}

/// Decodes the `name`/`value` pair at the start of an FLV script tag's payload (e.g.
/// `onMetaData` followed by an `EcmaArray`).
pub fn decode_name_value(data: &[u8]) -> Result<((String, Value), &[u8]), FlvError> {
    let (name, rest) = decode_string(data)?;
    let (value, rest) = decode_value(rest)?;
    Ok(((name, value), rest))
}

/// A bare UTF-8 string: 2-byte big-endian length, then that many bytes (no marker byte -- this is
/// the encoding used for object keys and for the name half of a script tag's name/value pair,
/// distinct from a `Value::String`, which is marker-prefixed).
fn decode_string(data: &[u8]) -> Result<(String, &[u8]), FlvError> {
    let (len_bytes, rest) = take(data, 2)?;
    let len = u16::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
    let (bytes, rest) = take(rest, len)?;
    let s = String::from_utf8_lossy(bytes).into_owned();
    Ok((s, rest))
}

/// The key/value run shared by `Object` and `EcmaArray`: repeated `(string key, value)` pairs
/// terminated by an empty key followed by the `ObjectEnd` marker.
fn decode_object_body(mut data: &[u8]) -> Result<(BTreeMap<String, Value>, &[u8]), FlvError> {
    let mut out = BTreeMap::new();
    loop {
        let (key, rest) = decode_string(data)?;
        if key.is_empty() {
            let (marker, rest) = take(rest, 1)?;
            if marker[0] != MARKER_OBJECT_END {
                return Err(FlvError::InvalidField("expected AMF0 object-end marker"));
            }
            return Ok((out, rest));
        }
        let (value, rest) = decode_value(rest)?;
        out.insert(key, value);
        data = rest;
    }
}

fn take(data: &[u8], len: usize) -> Result<(&[u8], &[u8]), FlvError> {
    if data.len() < len {
        Err(FlvError::TooShort)
    } else {
        Ok(data.split_at(len))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_number() {
        let data = hex!("00" "4024000000000000"); // 10.0
        let (v, rest) = decode_value(&data).unwrap();
        assert_eq!(v, Value::Number(10.0));
        assert!(rest.is_empty());
    }

    #[test]
    fn decodes_boolean_and_null() {
        let (v, rest) = decode_value(&hex!("01" "01")).unwrap();
        assert_eq!(v, Value::Boolean(true));
        assert!(rest.is_empty());

        let (v, rest) = decode_value(&hex!("05")).unwrap();
        assert_eq!(v, Value::Null);
        assert!(rest.is_empty());
    }

    #[test]
    fn decodes_string() {
        let data = hex!("02" "0003" "666f6f"); // "foo"
        let (v, rest) = decode_value(&data).unwrap();
        assert_eq!(v, Value::String("foo".to_string()));
        assert!(rest.is_empty());
    }

    #[test]
    fn decodes_ecma_array_script_tag_metadata() {
        // onMetaData { duration: 10.0 }
        let mut data = Vec::new();
        data.extend_from_slice(&hex!("000a" "6f6e4d657461446174 61")); // "onMetaData" (10 bytes)
        data.extend_from_slice(&hex!("08" "00000001")); // ecma array, 1 entry
        data.extend_from_slice(&hex!("0008" "6475726174696f6e")); // key "duration"
        data.extend_from_slice(&hex!("00" "4024000000000000")); // 10.0
        data.extend_from_slice(&hex!("000009")); // empty key + object-end marker

        let ((name, value), rest) = decode_name_value(&data).unwrap();
        assert_eq!(name, "onMetaData");
        match value {
            Value::EcmaArray(map) => {
                assert_eq!(map.get("duration"), Some(&Value::Number(10.0)));
            }
            other => panic!("expected EcmaArray, got {:?}", other),
        }
        assert!(rest.is_empty());
    }
}
