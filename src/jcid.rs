//! JCID: classifies the object an `ObjectDeclaration*` node declares.

use crate::error::Result;
use crate::reader::Reader;
use once_jcid_names::jcid_names;
use std::io::{Read, Seek};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Jcid {
    pub raw: u32,
    pub index: u16,
    pub is_binary: bool,
    pub is_property_set: bool,
    pub is_graph_node: bool,
    pub is_file_data: bool,
    pub is_read_only: bool,
}

impl Jcid {
    pub fn read<R>(r: &mut Reader<R>) -> Result<Self>
    where
        R: Read + Seek,
    {
        let raw = r.u32()?;
        Ok(Self {
            raw,
            index: (raw & 0xFFFF) as u16,
            is_binary: (raw >> 16) & 1 == 1,
            is_property_set: (raw >> 17) & 1 == 1,
            is_graph_node: (raw >> 18) & 1 == 1,
            is_file_data: (raw >> 19) & 1 == 1,
            is_read_only: (raw >> 20) & 1 == 1,
        })
    }

    /// Every candidate name the original name table lists for this id.
    ///
    /// The original source table has several id keys written more than
    /// once with different names (e.g. `0x00020001`, `0x0012004D`) — a
    /// Python dict literal keeps only the last assignment, silently
    /// dropping the earlier name. Which one is "correct" for a given file
    /// is not recoverable from that table alone (open question, `spec.md`
    /// §9), so here every candidate survives and callers pick by context.
    pub fn candidate_names(&self) -> &'static [&'static str] {
        jcid_names(self.raw)
    }

    /// The name consumers should default to when they don't have extra
    /// context to disambiguate: the last-registered candidate, matching
    /// the original table's last-write-wins behavior.
    pub fn name(&self) -> &'static str {
        self.candidate_names().last().copied().unwrap_or("Unknown")
    }
}

mod once_jcid_names {
    /// MS-ONESTORE 2.1.13 Property Set: JCID -> object type name.
    ///
    /// Ids with more than one entry below are the duplicate keys noted on
    /// [`super::Jcid::candidate_names`]; all candidates are kept, in table
    /// order, so last() matches the original's last-write-wins semantics.
    const TABLE: &[(u32, &str)] = &[
        (0x0012_0001, "jcidReadOnlyPersistablePropertyContainerForAuthor"),
        (0x0002_0001, "jcidPersistablePropertyContainerForTOC"),
        (0x0002_0001, "jcidPersistablePropertyContainerForTOCSection"),
        (0x0006_0007, "jcidSectionNode"),
        (0x0006_0008, "jcidPageSeriesNode"),
        (0x0006_000B, "jcidPageNode"),
        (0x0006_000C, "jcidOutlineNode"),
        (0x0006_000D, "jcidOutlineElementNode"),
        (0x0006_000E, "jcidRichTextOENode"),
        (0x0006_0011, "jcidImageNode"),
        (0x0006_0012, "jcidNumberListNode"),
        (0x0006_0019, "jcidOutlineGroup"),
        (0x0006_0022, "jcidTableNode"),
        (0x0006_0023, "jcidTableRowNode"),
        (0x0006_0024, "jcidTableCellNode"),
        (0x0006_002C, "jcidTitleNode"),
        (0x0002_0030, "jcidPageMetaData"),
        (0x0002_0031, "jcidSectionMetaData"),
        (0x0006_0035, "jcidEmbeddedFileNode"),
        (0x0006_0037, "jcidPageManifestNode"),
        (0x0002_0038, "jcidConflictPageMetaData"),
        (0x0006_003C, "jcidVersionHistoryContent"),
        (0x0006_003D, "jcidVersionProxy"),
        (0x0012_0043, "jcidNoteTagSharedDefinitionContainer"),
        (0x0002_0044, "jcidRevisionMetaData"),
        (0x0002_0046, "jcidVersionHistoryMetaData"),
        (0x0012_004D, "jcidParagraphStyleObject"),
        (0x0012_004D, "jcidParagraphStyleObjectForText"),
    ];

    const EMPTY: &[&str] = &[];

    pub fn jcid_names(raw: u32) -> &'static [&'static str] {
        // Small fixed table: linear scan is fine and keeps insertion order
        // visible, which matters for last-write-wins semantics.
        let mut buf: Vec<&'static str> = Vec::new();
        for (id, name) in TABLE {
            if *id == raw {
                buf.push(name);
            }
        }
        if buf.is_empty() {
            EMPTY
        } else {
            Box::leak(buf.into_boxed_slice())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_bit_fields() {
        // index=0x0007, IsPropertySet=1 (bit 17) -> 0x00020007
        let mut r = Reader::new(Cursor::new(0x0002_0007u32.to_le_bytes().to_vec()));
        let jcid = Jcid::read(&mut r).unwrap();
        assert_eq!(jcid.index, 0x0007);
        assert!(jcid.is_property_set);
        assert!(!jcid.is_binary);
    }

    #[test]
    fn duplicate_key_keeps_all_candidates() {
        let jcid = Jcid {
            raw: 0x0002_0001,
            index: 1,
            is_binary: false,
            is_property_set: false,
            is_graph_node: false,
            is_file_data: false,
            is_read_only: false,
        };
        let names = jcid.candidate_names();
        assert_eq!(names.len(), 2);
        assert_eq!(jcid.name(), "jcidPersistablePropertyContainerForTOCSection");
    }

    #[test]
    fn unknown_id_has_no_candidates() {
        let jcid = Jcid {
            raw: 0xFFFF_FFFF,
            index: 0,
            is_binary: false,
            is_property_set: false,
            is_graph_node: false,
            is_file_data: false,
            is_read_only: false,
        };
        assert!(jcid.candidate_names().is_empty());
        assert_eq!(jcid.name(), "Unknown");
    }
}
