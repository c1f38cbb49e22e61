//! Binary stream codec primitives.
//!
//! Every record is written as a fixed sequence of typed values in a
//! version-stable order. Value encodings:
//!
//! ```text
//! integer     big-endian, fixed width
//! bool        1 byte, 0 or 1
//! string      u32 length prefix + UTF-8 bytes
//! sequence    u32 count prefix + element-encoded items
//! string map  u32 count prefix + (key string, value string) pairs
//! ```
//!
//! Absence is not representable in this format: a record either fully
//! round-trips or decoding fails. Changing a shipped record's field order
//! requires a new record variant, not an in-place edit.

use crate::error::WireError;
use crate::{MAX_SEQ_LEN, MAX_VALUE_LEN};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;

/// A record that can be written to the binary wire format.
pub trait WireEncode {
    /// Writes the record's fields into `buf` in wire order.
    fn encode(&self, buf: &mut BytesMut);
}

/// A record that can be read back from the binary wire format.
pub trait WireDecode: Sized {
    /// Reads the record's fields from `buf` in wire order.
    fn decode(buf: &mut Bytes) -> Result<Self, WireError>;
}

fn ensure(buf: &Bytes, needed: usize) -> Result<(), WireError> {
    if buf.remaining() < needed {
        return Err(WireError::Truncated {
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

pub fn get_u8(buf: &mut Bytes) -> Result<u8, WireError> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn get_u16(buf: &mut Bytes) -> Result<u16, WireError> {
    ensure(buf, 2)?;
    Ok(buf.get_u16())
}

pub fn get_u32(buf: &mut Bytes) -> Result<u32, WireError> {
    ensure(buf, 4)?;
    Ok(buf.get_u32())
}

/// Writes a u32-length-prefixed UTF-8 string.
pub fn put_str(buf: &mut BytesMut, value: &str) {
    buf.put_u32(value.len() as u32);
    buf.put_slice(value.as_bytes());
}

/// Reads a u32-length-prefixed UTF-8 string.
///
/// The length prefix is checked against [`MAX_VALUE_LEN`] before any
/// allocation so a corrupt prefix cannot trigger a huge buffer.
pub fn get_str(buf: &mut Bytes) -> Result<String, WireError> {
    let len = get_u32(buf)? as usize;
    if len > MAX_VALUE_LEN {
        return Err(WireError::LengthOverflow {
            len,
            max: MAX_VALUE_LEN,
        });
    }
    ensure(buf, len)?;
    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)
}

pub fn put_bool(buf: &mut BytesMut, value: bool) {
    buf.put_u8(value as u8);
}

pub fn get_bool(buf: &mut Bytes) -> Result<bool, WireError> {
    match get_u8(buf)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(WireError::InvalidBool(other)),
    }
}

/// Writes a u32-count-prefixed sequence of element-encoded items.
pub fn put_seq<T: WireEncode>(buf: &mut BytesMut, items: &[T]) {
    buf.put_u32(items.len() as u32);
    for item in items {
        item.encode(buf);
    }
}

/// Reads a u32-count-prefixed sequence, decoding exactly `count` elements
/// with the element type's own decoder.
pub fn get_seq<T: WireDecode>(buf: &mut Bytes) -> Result<Vec<T>, WireError> {
    let count = get_u32(buf)? as usize;
    if count > MAX_SEQ_LEN {
        return Err(WireError::LengthOverflow {
            len: count,
            max: MAX_SEQ_LEN,
        });
    }
    // Every element carries at least a length prefix, so a count larger than
    // the remaining bytes can never complete.
    ensure(buf, count)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(T::decode(buf)?);
    }
    Ok(items)
}

/// Writes a u32-count-prefixed map of string pairs in key order.
pub fn put_str_map(buf: &mut BytesMut, map: &BTreeMap<String, String>) {
    buf.put_u32(map.len() as u32);
    for (key, value) in map {
        put_str(buf, key);
        put_str(buf, value);
    }
}

/// Reads a u32-count-prefixed map of string pairs.
pub fn get_str_map(buf: &mut Bytes) -> Result<BTreeMap<String, String>, WireError> {
    let count = get_u32(buf)? as usize;
    if count > MAX_SEQ_LEN {
        return Err(WireError::LengthOverflow {
            len: count,
            max: MAX_SEQ_LEN,
        });
    }
    ensure(buf, count)?;
    let mut map = BTreeMap::new();
    for _ in 0..count {
        let key = get_str(buf)?;
        let value = get_str(buf)?;
        map.insert(key, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    impl WireEncode for String {
        fn encode(&self, buf: &mut BytesMut) {
            put_str(buf, self);
        }
    }

    impl WireDecode for String {
        fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
            get_str(buf)
        }
    }

    #[test]
    fn test_str_roundtrip() {
        let mut buf = BytesMut::new();
        put_str(&mut buf, "workflow-7");

        let mut bytes = buf.freeze();
        assert_eq!(get_str(&mut bytes).unwrap(), "workflow-7");
        assert_eq!(bytes.remaining(), 0);
    }

    #[test]
    fn test_empty_str() {
        let mut buf = BytesMut::new();
        put_str(&mut buf, "");

        let mut bytes = buf.freeze();
        assert_eq!(get_str(&mut bytes).unwrap(), "");
    }

    #[test]
    fn test_str_truncated() {
        let mut buf = BytesMut::new();
        put_str(&mut buf, "hello");

        let mut bytes = buf.freeze().slice(..6);
        let result = get_str(&mut bytes);
        assert!(matches!(result, Err(WireError::Truncated { .. })));
    }

    #[test]
    fn test_str_length_overflow() {
        let mut buf = BytesMut::new();
        buf.put_u32(u32::MAX);

        let mut bytes = buf.freeze();
        let result = get_str(&mut bytes);
        assert!(matches!(result, Err(WireError::LengthOverflow { .. })));
    }

    #[test]
    fn test_str_invalid_utf8() {
        let mut buf = BytesMut::new();
        buf.put_u32(2);
        buf.put_slice(&[0xff, 0xfe]);

        let mut bytes = buf.freeze();
        let result = get_str(&mut bytes);
        assert!(matches!(result, Err(WireError::InvalidUtf8)));
    }

    #[test]
    fn test_bool_roundtrip() {
        let mut buf = BytesMut::new();
        put_bool(&mut buf, true);
        put_bool(&mut buf, false);

        let mut bytes = buf.freeze();
        assert!(get_bool(&mut bytes).unwrap());
        assert!(!get_bool(&mut bytes).unwrap());
    }

    #[test]
    fn test_bool_invalid_byte() {
        let mut bytes = Bytes::from_static(&[2]);
        let result = get_bool(&mut bytes);
        assert!(matches!(result, Err(WireError::InvalidBool(2))));
    }

    #[test]
    fn test_seq_roundtrip() {
        let items = vec!["a".to_string(), "bb".to_string(), "ccc".to_string()];
        let mut buf = BytesMut::new();
        put_seq(&mut buf, &items);

        let mut bytes = buf.freeze();
        let decoded: Vec<String> = get_seq(&mut bytes).unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn test_seq_count_exceeds_remaining() {
        let mut buf = BytesMut::new();
        buf.put_u32(1000);

        let mut bytes = buf.freeze();
        let result: Result<Vec<String>, _> = get_seq(&mut bytes);
        assert!(matches!(result, Err(WireError::Truncated { .. })));
    }

    #[test]
    fn test_seq_count_overflow() {
        let mut buf = BytesMut::new();
        buf.put_u32((MAX_SEQ_LEN + 1) as u32);

        let mut bytes = buf.freeze();
        let result: Result<Vec<String>, _> = get_seq(&mut bytes);
        assert!(matches!(result, Err(WireError::LengthOverflow { .. })));
    }

    #[test]
    fn test_str_map_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert("ctx".to_string(), "alerts".to_string());
        map.insert("threshold".to_string(), "5".to_string());

        let mut buf = BytesMut::new();
        put_str_map(&mut buf, &map);

        let mut bytes = buf.freeze();
        assert_eq!(get_str_map(&mut bytes).unwrap(), map);
    }

    #[test]
    fn test_empty_buffer_reads() {
        let mut bytes = Bytes::new();
        assert!(matches!(
            get_u8(&mut bytes),
            Err(WireError::Truncated { .. })
        ));
        assert!(matches!(
            get_u32(&mut bytes),
            Err(WireError::Truncated { .. })
        ));
        assert!(matches!(
            get_str(&mut bytes),
            Err(WireError::Truncated { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_str_roundtrip(s in ".*") {
            let mut buf = BytesMut::new();
            put_str(&mut buf, &s);
            let mut bytes = buf.freeze();
            prop_assert_eq!(get_str(&mut bytes).unwrap(), s);
            prop_assert_eq!(bytes.remaining(), 0);
        }

        #[test]
        fn prop_seq_roundtrip(items in proptest::collection::vec(".*", 0..8)) {
            let mut buf = BytesMut::new();
            put_seq(&mut buf, &items);
            let mut bytes = buf.freeze();
            let decoded: Vec<String> = get_seq(&mut bytes).unwrap();
            prop_assert_eq!(decoded, items);
        }
    }
}
