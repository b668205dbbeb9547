//! Count-prefixed keyed collections.
//!
//! A mapping on disk is a `u32` count followed by that many `(key, value)`
//! pairs in file order. The routines here are parametric in the key and value
//! decoders, so a value decoder may itself call [`read_mapping`] to decode a
//! mapping of mappings.

use std::collections::HashMap;
use std::hash::Hash;

use crate::codec::{DatBuffer, DatReader};
use crate::error::DecodeError;

/// Read a collection count and reject counts that cannot fit in the buffer.
///
/// Every entry occupies at least one byte, so a count larger than the
/// remaining bytes is necessarily corrupt.
pub fn read_count(reader: &mut DatReader<'_>) -> Result<u32, DecodeError> {
    let offset = reader.position();
    let count = reader.read_u32()?;
    check_count(reader, offset, count)?;
    Ok(count)
}

fn check_count(reader: &DatReader<'_>, offset: usize, count: u32) -> Result<(), DecodeError> {
    if count as usize > reader.remaining() {
        return Err(DecodeError::MalformedCollection {
            offset,
            count,
            remaining: reader.remaining(),
        });
    }
    Ok(())
}

/// Preallocation for `count` decoded values, bounded so the allocation never
/// outgrows the bytes left to decode them from.
fn capacity_hint<T>(reader: &DatReader<'_>, count: u32) -> usize {
    let per_item = std::mem::size_of::<T>().max(1);
    (count as usize).min(reader.remaining() / per_item)
}

/// Decode a count-prefixed mapping. Duplicate keys overwrite: last wins.
pub fn read_mapping<'a, K, V, FK, FV>(
    reader: &mut DatReader<'a>,
    mut read_key: FK,
    mut read_value: FV,
) -> Result<HashMap<K, V>, DecodeError>
where
    K: Eq + Hash,
    FK: FnMut(&mut DatReader<'a>) -> Result<K, DecodeError>,
    FV: FnMut(&mut DatReader<'a>) -> Result<V, DecodeError>,
{
    let count = read_count(reader)?;
    let mut map = HashMap::with_capacity(capacity_hint::<(K, V)>(reader, count));
    for _ in 0..count {
        let key = read_key(reader)?;
        let value = read_value(reader)?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Decode exactly `count` values whose count was stored elsewhere.
///
/// A list that runs out of bytes fails with `TruncatedInput` at the first
/// item that cannot be read.
pub fn read_list<'a, T, F>(
    reader: &mut DatReader<'a>,
    count: u32,
    mut read_item: F,
) -> Result<Vec<T>, DecodeError>
where
    F: FnMut(&mut DatReader<'a>) -> Result<T, DecodeError>,
{
    let mut items = Vec::with_capacity(capacity_hint::<T>(reader, count));
    for _ in 0..count {
        items.push(read_item(reader)?);
    }
    Ok(items)
}

/// Encode a mapping with a `u32` count prefix.
///
/// Entries are written in ascending key order so encoding is deterministic.
pub fn write_mapping<K, V, FK, FV>(
    buf: &mut DatBuffer,
    map: &HashMap<K, V>,
    mut write_key: FK,
    mut write_value: FV,
) -> Result<(), DecodeError>
where
    K: Ord,
    FK: FnMut(&mut DatBuffer, &K) -> Result<(), DecodeError>,
    FV: FnMut(&mut DatBuffer, &V) -> Result<(), DecodeError>,
{
    let mut entries: Vec<(&K, &V)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    buf.write_u32(entries.len() as u32);
    for (key, value) in entries {
        write_key(buf, key)?;
        write_value(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_pairs(pairs: &[(u32, u32)]) -> Vec<u8> {
        let mut buf = DatBuffer::new();
        buf.write_u32(pairs.len() as u32);
        for (k, v) in pairs {
            buf.write_u32(*k);
            buf.write_u32(*v);
        }
        buf.into_bytes()
    }

    #[test]
    fn test_read_mapping_in_file_order() {
        let bytes = u32_pairs(&[(1, 10), (2, 20), (3, 30)]);
        let mut r = DatReader::new(&bytes);
        let map = read_mapping(&mut r, |r| r.read_u32(), |r| r.read_u32()).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map[&2], 20);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let bytes = u32_pairs(&[(7, 1), (8, 2), (7, 3)]);
        let mut r = DatReader::new(&bytes);
        let map = read_mapping(&mut r, |r| r.read_u32(), |r| r.read_u32()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&7], 3);
    }

    #[test]
    fn test_nested_mapping() {
        let mut buf = DatBuffer::new();
        buf.write_u32(2);
        for outer in [100u32, 200] {
            buf.write_u32(outer);
            buf.write_u32(1);
            buf.write_u32(outer + 1);
            buf.write_u32(outer + 2);
        }
        let bytes = buf.into_bytes();

        let mut r = DatReader::new(&bytes);
        let map = read_mapping(
            &mut r,
            |r| r.read_u32(),
            |r| read_mapping(r, |r| r.read_u32(), |r| r.read_u32()),
        )
        .unwrap();
        assert_eq!(map[&100][&101], 102);
        assert_eq!(map[&200][&201], 202);
    }

    #[test]
    fn test_count_exceeding_buffer_is_malformed() {
        let mut buf = DatBuffer::new();
        buf.write_u32(0xFFFF_FFF0);
        buf.write_u32(1);
        let bytes = buf.into_bytes();

        let mut r = DatReader::new(&bytes);
        let err = read_mapping(&mut r, |r| r.read_u32(), |r| r.read_u32()).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedCollection { count: 0xFFFF_FFF0, .. }));
    }

    #[test]
    fn test_truncated_pair() {
        let mut bytes = u32_pairs(&[(1, 10), (2, 20)]);
        bytes.truncate(bytes.len() - 2);
        let mut r = DatReader::new(&bytes);
        let err = read_mapping(&mut r, |r| r.read_u32(), |r| r.read_u32()).unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedInput { .. }));
    }

    #[test]
    fn test_short_list_is_truncated() {
        let bytes = 7u32.to_le_bytes();
        let mut r = DatReader::new(&bytes);
        let err = read_list(&mut r, 2, |r| r.read_u32()).unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedInput { offset: 4, needed: 4, remaining: 0 }));
    }

    #[test]
    fn test_capacity_bounded_by_remaining_bytes() {
        let bytes = [0u8; 64];
        let r = DatReader::new(&bytes);
        assert_eq!(capacity_hint::<[u8; 16]>(&r, 60), 4);
        assert_eq!(capacity_hint::<u8>(&r, 10), 10);
        assert_eq!(capacity_hint::<()>(&r, 1000), 64);
    }

    #[test]
    fn test_write_mapping_sorted() {
        let map: HashMap<u32, u32> = [(3, 30), (1, 10), (2, 20)].into_iter().collect();
        let mut buf = DatBuffer::new();
        write_mapping(
            &mut buf,
            &map,
            |b, k| {
                b.write_u32(*k);
                Ok(())
            },
            |b, v| {
                b.write_u32(*v);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(buf.into_bytes(), u32_pairs(&[(1, 10), (2, 20), (3, 30)]));
    }
}
