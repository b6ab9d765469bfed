//! Component: the 1024-byte MS-ONESTORE file header.

use crate::error::{OneStoreError, Result};
use crate::fcr::{decode_fcr32, decode_fcr64x32, Fcr};
use crate::reader::Reader;
use std::io::{Read, Seek};
use uuid::Uuid;

/// `.one` files (section documents).
pub const ONE_GUID: Uuid = Uuid::from_bytes([
    0x7B, 0x5C, 0x52, 0xE4, 0xD8, 0x8C, 0x4D, 0xA7, 0xAE, 0xB1, 0x53, 0x78, 0xD0, 0x29, 0x96, 0xD3,
]);

/// `.onetoc2` files (notebook tables of contents).
pub const ONETOC2_GUID: Uuid = Uuid::from_bytes([
    0x43, 0xFF, 0x2F, 0xA1, 0xEF, 0xD9, 0x4C, 0x76, 0x9E, 0xE2, 0x10, 0xEA, 0x57, 0x22, 0x76, 0x5F,
]);

/// `guidFileFormat` for every revision-store file regardless of extension.
pub const GUID_FILE_FORMAT: Uuid = Uuid::from_bytes([
    0x10, 0x9A, 0xDD, 0x3F, 0x91, 0x1B, 0x49, 0xF5, 0xA5, 0xD0, 0x17, 0x91, 0xED, 0xC8, 0xAE, 0xD8,
]);

/// The first 1024 bytes of a revision-store file (MS-ONESTORE 2.3.1).
///
/// Legacy fields (`fcrLegacy*`, `cTransactionsInLog`, ...) are retained
/// verbatim even though nothing in this crate acts on them, because
/// `header_summary` surfaces the whole header for diagnostics the way the
/// original tool's dictionary dump does.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Header {
    pub guid_file_type: Uuid,
    pub guid_file: Uuid,
    pub guid_legacy_file_version: Uuid,
    pub guid_file_format: Uuid,

    pub ffv_last_code_that_wrote_to_this_file: u32,
    pub ffv_oldest_code_that_has_written_to_this_file: u32,
    pub ffv_newest_code_that_has_written_to_this_file: u32,
    pub ffv_oldest_code_that_may_read_this_file: u32,

    pub fcr_legacy_free_chunk_list: Fcr,
    pub fcr_legacy_transaction_log: Fcr,
    pub c_transactions_in_log: u32,
    pub cb_legacy_expected_file_length: u32,
    pub fcr_legacy_file_node_list_root: Fcr,
    pub cb_legacy_free_space_in_free_chunk_list: u32,

    pub f_needs_defrag: bool,
    pub f_repaired_file: bool,
    pub f_needs_garbage_collect: bool,
    pub f_has_no_embedded_file_objects: bool,

    pub guid_ancestor: Uuid,
    pub crc_name: u32,

    pub fcr_hashed_chunk_list: Fcr,
    pub fcr_transaction_log: Fcr,
    pub fcr_file_node_list_root: Fcr,
    pub fcr_free_chunk_list: Fcr,
    pub cb_expected_file_length: u64,
    pub cb_free_space_in_free_chunk_list: u64,

    pub guid_file_version: Uuid,
    pub n_file_version_generation: u64,
    pub guid_deny_read_file_version: Uuid,
    pub grf_debug_log_flags: u32,

    pub fcr_debug_log: Fcr,
    pub fcr_alloc_verification_free_chunk_list: Fcr,

    pub bn_created: u32,
    pub bn_last_wrote_to_this_file: u32,
    pub bn_oldest_written: u32,
    pub bn_newest_written: u32,
}

impl Header {
    pub fn read<R>(r: &mut Reader<R>) -> Result<Self>
    where
        R: Read + Seek,
    {
        let offset = r.tell()?;

        let guid_file_type = r.guid()?;
        let guid_file = r.guid()?;
        let guid_legacy_file_version = r.guid()?;
        let guid_file_format = r.guid()?;

        if guid_file_type != ONE_GUID && guid_file_type != ONETOC2_GUID {
            return Err(OneStoreError::InvalidSignature { offset });
        }
        if guid_file_format != GUID_FILE_FORMAT {
            return Err(OneStoreError::InvalidSignature { offset });
        }

        let ffv_last_code_that_wrote_to_this_file = r.u32()?;
        let ffv_oldest_code_that_has_written_to_this_file = r.u32()?;
        let ffv_newest_code_that_has_written_to_this_file = r.u32()?;
        let ffv_oldest_code_that_may_read_this_file = r.u32()?;

        let fcr_legacy_free_chunk_list = decode_fcr32(&r.bytes_array()?);
        let fcr_legacy_transaction_log = decode_fcr32(&r.bytes_array()?);
        let c_transactions_in_log = r.u32()?;
        let cb_legacy_expected_file_length = r.u32()?;
        r.skip(8)?; // rgbPlaceholder
        let fcr_legacy_file_node_list_root = decode_fcr32(&r.bytes_array()?);
        let cb_legacy_free_space_in_free_chunk_list = r.u32()?;

        let flags = r.u32()?;
        let f_needs_defrag = flags & 0x1 != 0;
        let f_repaired_file = flags & 0x2 != 0;
        let f_needs_garbage_collect = flags & 0x4 != 0;
        let f_has_no_embedded_file_objects = flags & 0x8 != 0;

        let guid_ancestor = r.guid()?;
        let crc_name = r.u32()?;

        let fcr_hashed_chunk_list = decode_fcr64x32(&r.bytes_array()?);
        let fcr_transaction_log = decode_fcr64x32(&r.bytes_array()?);
        let fcr_file_node_list_root = decode_fcr64x32(&r.bytes_array()?);
        let fcr_free_chunk_list = decode_fcr64x32(&r.bytes_array()?);
        let cb_expected_file_length = r.u64()?;
        let cb_free_space_in_free_chunk_list = r.u64()?;

        let guid_file_version = r.guid()?;
        let n_file_version_generation = r.u64()?;
        let guid_deny_read_file_version = r.guid()?;
        let grf_debug_log_flags = r.u32()?;

        let fcr_debug_log = decode_fcr64x32(&r.bytes_array()?);
        let fcr_alloc_verification_free_chunk_list = decode_fcr64x32(&r.bytes_array()?);

        let bn_created = r.u32()?;
        let bn_last_wrote_to_this_file = r.u32()?;
        let bn_oldest_written = r.u32()?;
        let bn_newest_written = r.u32()?;

        r.skip(728)?; // rgbReserved

        Ok(Self {
            guid_file_type,
            guid_file,
            guid_legacy_file_version,
            guid_file_format,
            ffv_last_code_that_wrote_to_this_file,
            ffv_oldest_code_that_has_written_to_this_file,
            ffv_newest_code_that_has_written_to_this_file,
            ffv_oldest_code_that_may_read_this_file,
            fcr_legacy_free_chunk_list,
            fcr_legacy_transaction_log,
            c_transactions_in_log,
            cb_legacy_expected_file_length,
            fcr_legacy_file_node_list_root,
            cb_legacy_free_space_in_free_chunk_list,
            f_needs_defrag,
            f_repaired_file,
            f_needs_garbage_collect,
            f_has_no_embedded_file_objects,
            guid_ancestor,
            crc_name,
            fcr_hashed_chunk_list,
            fcr_transaction_log,
            fcr_file_node_list_root,
            fcr_free_chunk_list,
            cb_expected_file_length,
            cb_free_space_in_free_chunk_list,
            guid_file_version,
            n_file_version_generation,
            guid_deny_read_file_version,
            grf_debug_log_flags,
            fcr_debug_log,
            fcr_alloc_verification_free_chunk_list,
            bn_created,
            bn_last_wrote_to_this_file,
            bn_oldest_written,
            bn_newest_written,
        })
    }

    /// Whether this is a `.onetoc2` table of contents rather than a section.
    pub fn is_toc(&self) -> bool {
        self.guid_file_type == ONETOC2_GUID
    }

    /// Key/value dump for diagnostics, mirroring the original tool's
    /// dictionary conversion (`rgbReserved` omitted, everything else
    /// stringified).
    pub fn header_summary(&self) -> indexmap::IndexMap<String, String> {
        let mut map = indexmap::IndexMap::new();
        map.insert("guidFileType".into(), self.guid_file_type.to_string());
        map.insert("guidFile".into(), self.guid_file.to_string());
        map.insert(
            "guidLegacyFileVersion".into(),
            self.guid_legacy_file_version.to_string(),
        );
        map.insert("guidFileFormat".into(), self.guid_file_format.to_string());
        map.insert(
            "ffvLastCodeThatWroteToThisFile".into(),
            self.ffv_last_code_that_wrote_to_this_file.to_string(),
        );
        map.insert(
            "ffvOldestCodeThatHasWrittenToThisFile".into(),
            self.ffv_oldest_code_that_has_written_to_this_file.to_string(),
        );
        map.insert(
            "ffvNewestCodeThatHasWrittenToThisFile".into(),
            self.ffv_newest_code_that_has_written_to_this_file.to_string(),
        );
        map.insert(
            "ffvOldestCodeThatMayReadThisFile".into(),
            self.ffv_oldest_code_that_may_read_this_file.to_string(),
        );
        map.insert("cTransactionsInLog".into(), self.c_transactions_in_log.to_string());
        map.insert(
            "cbLegacyExpectedFileLength".into(),
            self.cb_legacy_expected_file_length.to_string(),
        );
        map.insert(
            "cbLegacyFreeSpaceInFreeChunkList".into(),
            self.cb_legacy_free_space_in_free_chunk_list.to_string(),
        );
        map.insert("fNeedsDefrag".into(), self.f_needs_defrag.to_string());
        map.insert("fRepairedFile".into(), self.f_repaired_file.to_string());
        map.insert(
            "fNeedsGarbageCollect".into(),
            self.f_needs_garbage_collect.to_string(),
        );
        map.insert(
            "fHasNoEmbeddedFileObjects".into(),
            self.f_has_no_embedded_file_objects.to_string(),
        );
        map.insert("guidAncestor".into(), self.guid_ancestor.to_string());
        map.insert("crcName".into(), self.crc_name.to_string());
        map.insert("cbExpectedFileLength".into(), self.cb_expected_file_length.to_string());
        map.insert(
            "cbFreeSpaceInFreeChunkList".into(),
            self.cb_free_space_in_free_chunk_list.to_string(),
        );
        map.insert("guidFileVersion".into(), self.guid_file_version.to_string());
        map.insert(
            "nFileVersionGeneration".into(),
            self.n_file_version_generation.to_string(),
        );
        map.insert(
            "guidDenyReadFileVersion".into(),
            self.guid_deny_read_file_version.to_string(),
        );
        map.insert("grfDebugLogFlags".into(), self.grf_debug_log_flags.to_string());
        map.insert("bnCreated".into(), self.bn_created.to_string());
        map.insert(
            "bnLastWroteToThisFile".into(),
            self.bn_last_wrote_to_this_file.to_string(),
        );
        map.insert("bnOldestWritten".into(), self.bn_oldest_written.to_string());
        map.insert("bnNewestWritten".into(), self.bn_newest_written.to_string());
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_header_bytes() -> Vec<u8> {
        let mut bytes = vec![0u8; 1024];
        bytes[0..16].copy_from_slice(ONE_GUID.to_bytes_le().as_slice());
        bytes[16..32].copy_from_slice(Uuid::nil().to_bytes_le().as_slice());
        bytes[32..48].copy_from_slice(Uuid::nil().to_bytes_le().as_slice());
        bytes[48..64].copy_from_slice(GUID_FILE_FORMAT.to_bytes_le().as_slice());
        bytes
    }

    #[test]
    fn reads_valid_one_header() {
        let bytes = sample_header_bytes();
        let mut r = Reader::new(Cursor::new(bytes));
        let header = Header::read(&mut r).unwrap();
        assert_eq!(header.guid_file_type, ONE_GUID);
        assert!(!header.is_toc());
    }

    #[test]
    fn rejects_bad_file_type_guid() {
        let mut bytes = sample_header_bytes();
        bytes[0..16].copy_from_slice(Uuid::nil().to_bytes_le().as_slice());
        let mut r = Reader::new(Cursor::new(bytes));
        match Header::read(&mut r) {
            Err(OneStoreError::InvalidSignature { .. }) => {}
            other => panic!("expected InvalidSignature, got {other:?}"),
        }
    }

    #[test]
    fn header_summary_omits_reserved_bytes() {
        let bytes = sample_header_bytes();
        let mut r = Reader::new(Cursor::new(bytes));
        let header = Header::read(&mut r).unwrap();
        let summary = header.header_summary();
        assert!(!summary.contains_key("rgbReserved"));
        assert_eq!(summary.get("guidFileType").unwrap(), &ONE_GUID.to_string());
    }
}
