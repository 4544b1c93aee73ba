//! Byte layout of hash files.

use std::io::{self, Read, Write};

use bytes::Bytes;
use sasldb_ll_store::{LLEntry, LLError};

pub const MAGIC: [u8; 4] = *b"SDBH";
pub const VERSION: u32 = 1;
pub const HEADER_LEN: u64 = 16;

/// Frames whose key or value claims to be longer than this are treated as
/// corruption rather than allocated.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Smallest bucket count written; always a power of two.
pub const MIN_BUCKETS: u32 = 16;

/// Entries per bucket the writer aims for.
const LOAD_FACTOR: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub bucket_count: u32,
    pub entry_count: u32,
}

impl Header {
    pub fn empty() -> Self {
        Header {
            bucket_count: MIN_BUCKETS,
            entry_count: 0,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN as usize] {
        let mut buf = [0u8; HEADER_LEN as usize];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&VERSION.to_le_bytes());
        buf[8..12].copy_from_slice(&self.bucket_count.to_le_bytes());
        buf[12..16].copy_from_slice(&self.entry_count.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; HEADER_LEN as usize]) -> Result<Self, LLError> {
        if buf[0..4] != MAGIC {
            return Err(LLError::corrupt(0, "bad magic, not a hash file"));
        }
        let version = read_u32(&buf[4..8]);
        if version != VERSION {
            return Err(LLError::corrupt(
                4,
                format!("unsupported version {}", version),
            ));
        }
        let bucket_count = read_u32(&buf[8..12]);
        if bucket_count == 0 || !bucket_count.is_power_of_two() {
            return Err(LLError::corrupt(
                8,
                format!("bucket count {} is not a power of two", bucket_count),
            ));
        }
        Ok(Header {
            bucket_count,
            entry_count: read_u32(&buf[12..16]),
        })
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    u32::from_le_bytes(word)
}

/// 32-bit FNV-1a.
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for b in bytes {
        hash ^= u32::from(*b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

pub fn bucket_of(key: &[u8], bucket_count: u32) -> u32 {
    fnv1a32(key) & (bucket_count - 1)
}

pub fn bucket_count_for(entries: usize) -> u32 {
    let wanted = (entries / LOAD_FACTOR).max(MIN_BUCKETS as usize);
    u32::try_from(wanted.next_power_of_two()).unwrap_or(1 << 31)
}

pub fn write_frame<W: Write>(w: &mut W, key: &[u8], value: &[u8]) -> io::Result<()> {
    let key_len = frame_len(key.len())?;
    let value_len = frame_len(value.len())?;
    w.write_all(&key_len.to_le_bytes())?;
    w.write_all(&value_len.to_le_bytes())?;
    w.write_all(key)?;
    w.write_all(value)
}

fn frame_len(len: usize) -> io::Result<u32> {
    match u32::try_from(len) {
        Ok(len) if len <= MAX_FRAME_LEN => Ok(len),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds {} byte limit", len, MAX_FRAME_LEN),
        )),
    }
}

/// Read the frame starting at `offset`, returning the entry and the offset of
/// the following frame.
///
/// The caller knows how many frames to expect, so running out of bytes here is
/// always corruption.
pub fn read_frame<R: Read>(r: &mut R, offset: u64) -> Result<(LLEntry, u64), LLError> {
    let mut lens = [0u8; 8];
    read_exact_at(r, &mut lens, offset, "frame header")?;
    let key_len = read_u32(&lens[0..4]);
    let value_len = read_u32(&lens[4..8]);
    if key_len > MAX_FRAME_LEN || value_len > MAX_FRAME_LEN {
        return Err(LLError::corrupt(
            offset,
            format!(
                "frame lengths {}/{} exceed {} byte limit",
                key_len, value_len, MAX_FRAME_LEN
            ),
        ));
    }

    let mut key = vec![0u8; key_len as usize];
    read_exact_at(r, &mut key, offset + 8, "key")?;
    let mut value = vec![0u8; value_len as usize];
    read_exact_at(r, &mut value, offset + 8 + u64::from(key_len), "value")?;

    let next = offset + 8 + u64::from(key_len) + u64::from(value_len);
    Ok(((Bytes::from(key), Bytes::from(value)), next))
}

fn read_exact_at<R: Read>(r: &mut R, buf: &mut [u8], offset: u64, what: &str) -> Result<(), LLError> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => LLError::corrupt(offset, format!("truncated {}", what)),
        _ => LLError::from(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_encoding_is_stable() {
        let header = Header {
            bucket_count: 32,
            entry_count: 3,
        };
        let buf = header.encode();
        assert_eq!(&buf[0..4], b"SDBH");
        assert_eq!(Header::decode(&buf).unwrap(), header);
    }

    #[test]
    fn bad_magic_is_corrupt() {
        let mut buf = Header::empty().encode();
        buf[0] = b'X';
        assert!(matches!(
            Header::decode(&buf),
            Err(LLError::Corrupt { offset: 0, .. })
        ));
    }

    #[test]
    fn non_power_of_two_buckets_is_corrupt() {
        let mut buf = Header::empty().encode();
        buf[8..12].copy_from_slice(&12u32.to_le_bytes());
        assert!(matches!(
            Header::decode(&buf),
            Err(LLError::Corrupt { offset: 8, .. })
        ));
    }

    #[test]
    fn fnv_reference_values() {
        assert_eq!(fnv1a32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
    }

    #[test]
    fn bucket_counts_grow_with_entries() {
        assert_eq!(bucket_count_for(0), MIN_BUCKETS);
        assert_eq!(bucket_count_for(64), MIN_BUCKETS);
        assert_eq!(bucket_count_for(68), 32);
        assert!(bucket_count_for(10_000).is_power_of_two());
    }

    #[test]
    fn frame_with_embedded_nuls() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"bob\0realm\0cmusaslsecretPLAIN", b"\0pw\0").unwrap();
        let ((key, value), next) = read_frame(&mut buf.as_slice(), 16).unwrap();
        assert_eq!(&key[..], b"bob\0realm\0cmusaslsecretPLAIN");
        assert_eq!(&value[..], b"\0pw\0");
        assert_eq!(next, 16 + buf.len() as u64);
    }

    #[test]
    fn truncated_frame_is_corrupt() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"key", b"value").unwrap();
        buf.truncate(buf.len() - 2);
        assert!(matches!(
            read_frame(&mut buf.as_slice(), 100),
            Err(LLError::Corrupt { offset: 111, .. })
        ));
    }

    #[test]
    fn oversized_frame_is_corrupt() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_LEN + 1).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            read_frame(&mut buf.as_slice(), 16),
            Err(LLError::Corrupt { offset: 16, .. })
        ));
    }
}
