//! `ExtendedGUID` and `CompactID`: the two ways object identity is spelled
//! in a revision-store file (`spec.md` §3).

use crate::error::Result;
use crate::reader::Reader;
use std::io::{Read, Seek};
use uuid::Uuid;

/// `(guid: 16 B, n: u32)` — identity of object spaces, revisions, object
/// groups, and roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExtendedGuid {
    pub guid: Uuid,
    pub n: u32,
}

impl ExtendedGuid {
    pub fn read<R>(r: &mut Reader<R>) -> Result<Self>
    where
        R: Read + Seek,
    {
        let guid = r.guid()?;
        let n = r.u32()?;
        Ok(Self { guid, n })
    }
}

impl std::fmt::Display for ExtendedGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}, {}", self.guid, self.n)
    }
}

/// A 32-bit packed `(n: 8 bits, guidIndex: 24 bits)`. Dereferences to an
/// [`ExtendedGuid`] via the Global Identification Table of the revision
/// active at the time it was decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CompactId {
    pub n: u8,
    pub guid_index: u32,
    /// The revision active when this CompactID was decoded; GIDT lookups
    /// are always scoped to this revision, never the one active when the
    /// CompactID is later rendered.
    pub revision: ExtendedGuid,
}

impl CompactId {
    pub fn read<R>(r: &mut Reader<R>, revision: ExtendedGuid) -> Result<Self>
    where
        R: Read + Seek,
    {
        let value = r.u32()?;
        Ok(Self {
            n: (value & 0xFF) as u8,
            guid_index: value >> 8,
            revision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn compact_id_splits_n_and_guid_index() {
        // n = 0x01, guidIndex = 0x000007 -> packed = 0x00000701
        let mut r = Reader::new(Cursor::new(0x0000_0701u32.to_le_bytes().to_vec()));
        let revision = ExtendedGuid {
            guid: Uuid::nil(),
            n: 0,
        };
        let id = CompactId::read(&mut r, revision).unwrap();
        assert_eq!(id.n, 1);
        assert_eq!(id.guid_index, 7);
    }
}
