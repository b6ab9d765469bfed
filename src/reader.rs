//! Component A: a positioned byte source over little-endian primitives.

use crate::error::{OneStoreError, Result};
use std::io::{Read, Seek, SeekFrom};
use std::mem::size_of;
use uuid::Uuid;

/// A positioned reader over a seekable byte source.
///
/// All multi-byte integers in MS-ONESTORE are little-endian; all GUIDs are
/// 16-byte little-endian. Every routine that seeks away to decode something
/// out of line (a property set, a file-data-store object, a nested
/// FileNodeList) is expected to save [`Reader::tell`] first and restore it
/// with [`Reader::seek`] afterward — the reader holds a single cursor and
/// there is no concurrent access.
pub struct Reader<R> {
    inner: R,
}

impl<R> Reader<R>
where
    R: Read + Seek,
{
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Current(n as i64))?;
        Ok(())
    }

    /// Read exactly `n` bytes, or fail with [`OneStoreError::Truncated`].
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let offset = self.tell()?;
        let mut buf = vec![0u8; n];
        let mut read = 0;
        while read < n {
            match self.inner.read(&mut buf[read..])? {
                0 => {
                    return Err(OneStoreError::Truncated {
                        offset,
                        needed: n,
                        available: read,
                    })
                }
                bytes => read += bytes,
            }
        }
        Ok(buf)
    }

    pub fn bytes_array<const S: usize>(&mut self) -> Result<[u8; S]> {
        let bytes = self.read_exact(S)?;
        let mut arr = [0u8; S];
        arr.copy_from_slice(&bytes);
        Ok(arr)
    }

    /// 16-byte little-endian GUID.
    pub fn guid(&mut self) -> Result<Uuid> {
        let bytes: [u8; 16] = self.bytes_array()?;
        Ok(Uuid::from_bytes_le(bytes))
    }

    /// UTF-16LE string of `char_count` UTF-16 code units (not bytes).
    pub fn utf16_string(&mut self, char_count: usize) -> Result<String> {
        let bytes = self.read_exact(char_count * 2)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units))
    }
}

macro_rules! impl_read_num {
    ($($ty:ident),+) => {
        impl<R> Reader<R>
        where
            R: Read + Seek,
        {
            $(
                pub fn $ty(&mut self) -> Result<$ty> {
                    let bytes: [u8; size_of::<$ty>()] = self.bytes_array()?;
                    Ok($ty::from_le_bytes(bytes))
                }
            )+
        }
    };
}

impl_read_num!(u8, u16, u32, u64, i16, f32);

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_little_endian_primitives() {
        let mut r = Reader::new(Cursor::new(vec![0x01, 0x02, 0x03, 0x04]));
        assert_eq!(r.u32().unwrap(), 0x0403_0201);
    }

    #[test]
    fn truncated_read_reports_available_bytes() {
        let mut r = Reader::new(Cursor::new(vec![0x01, 0x02]));
        match r.u32() {
            Err(OneStoreError::Truncated {
                needed, available, ..
            }) => {
                assert_eq!(needed, 4);
                assert_eq!(available, 2);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn seek_and_tell_round_trip() {
        let mut r = Reader::new(Cursor::new(vec![0u8; 16]));
        r.seek(10).unwrap();
        assert_eq!(r.tell().unwrap(), 10);
    }

    #[test]
    fn utf16_string_decodes() {
        let bytes = "hi".encode_utf16().flat_map(|c| c.to_le_bytes()).collect();
        let mut r = Reader::new(Cursor::new(bytes));
        assert_eq!(r.utf16_string(2).unwrap(), "hi");
    }
}
