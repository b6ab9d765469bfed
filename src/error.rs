use crate::guid::ExtendedGuid;
use std::result;
use thiserror::Error;

/// Errors raised while parsing a revision-store file.
#[derive(Error, Debug)]
pub enum OneStoreError {
    #[error("offset {offset:#X}: guidFileType does not match .one or .onetoc2")]
    InvalidSignature { offset: u64 },

    #[error("offset {offset:#X}: needed {needed} bytes, only {available} available")]
    Truncated {
        offset: u64,
        needed: usize,
        available: usize,
    },

    #[error("offset {offset:#X}: FileNodeListHeader magic mismatch (found {found:#X})")]
    BadMagic { offset: u64, found: u64 },

    #[error("offset {offset:#X}: fragment listId {found:#X} does not match list's {expected:#X}")]
    ListIdMismatch {
        offset: u64,
        expected: u32,
        found: u32,
    },

    #[error("offset {offset:#X}: invalid PropertyID type tag {type_tag:#X}")]
    InvalidPropertyType { offset: u64, type_tag: u8 },

    #[error("offset {offset:#X}: ArrayOfPropertyValues (type 0x10) is not implemented")]
    UnimplementedPropertyType { offset: u64 },

    #[error("no Global Identification Table entry for (revision {revision:?}, index {guid_index:#X})")]
    MissingGidtEntry {
        revision: ExtendedGuid,
        guid_index: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type used throughout the crate.
pub type Result<T> = result::Result<T, OneStoreError>;
