//! Component E: the FileNodeList walker, and the parse-time side effects
//! that depend on traversal order (GIDT population, revision tracking,
//! out-of-line PropertySet decoding).

use crate::error::{OneStoreError, Result};
use crate::fcr::{decode_fcr64x32, Fcr};
use crate::file_node::{file_node_name, BaseType, FileNodeBody, FileNodeHeader};
use crate::gidt::GlobalIdTable;
use crate::guid::ExtendedGuid;
use crate::jcid::Jcid;
use crate::property_set::ObjectSpaceObjectPropSet;
use crate::reader::Reader;
use std::io::{Read, Seek};
use log::{debug, trace, warn};
use uuid::Uuid;

const MAGIC: u64 = 0xA456_7AB1_F5F7_F4C4;

#[derive(Debug, Clone, Copy)]
pub struct FileNodeListHeader {
    pub list_id: u32,
    pub n_fragment_sequence: u32,
}

impl FileNodeListHeader {
    fn read<R>(r: &mut Reader<R>) -> Result<Self>
    where
        R: Read + Seek,
    {
        let offset = r.tell()?;
        let magic = r.u64()?;
        if magic != MAGIC {
            return Err(OneStoreError::BadMagic {
                offset,
                found: magic,
            });
        }
        let list_id = r.u32()?;
        let n_fragment_sequence = r.u32()?;
        Ok(Self {
            list_id,
            n_fragment_sequence,
        })
    }
}

/// A decoded node: its header/body plus the name and starting byte offset,
/// useful for diagnostics without keeping a parent pointer (§9 design note:
/// no stored "container" back-reference).
#[derive(Debug, Clone)]
pub struct FileNode {
    pub offset: u64,
    pub header: FileNodeHeader,
    pub name: &'static str,
    pub body: FileNodeBody,
    /// Present iff this node declared a property set (`ObjectDeclaration2RefCountFND`
    /// whose `jcid.IsPropertySet` is set) and it decoded successfully.
    pub property_set: Option<ObjectSpaceObjectPropSet>,
    pub children: Vec<FileNodeListFragment>,
}

#[derive(Debug, Clone)]
pub struct FileNodeListFragment {
    pub header: FileNodeListHeader,
    pub nodes: Vec<FileNode>,
}

#[derive(Debug, Clone, Default)]
pub struct FileNodeList {
    pub fragments: Vec<FileNodeListFragment>,
}

/// Mutable state threaded through a single-pass traversal: the GIDT being
/// assembled and the revision currently in scope. Neither is meaningful
/// outside the traversal that builds it.
pub struct ParseState {
    pub gidt: GlobalIdTable,
    pub current_revision: ExtendedGuid,
}

impl ParseState {
    pub fn new() -> Self {
        Self {
            gidt: GlobalIdTable::new(),
            current_revision: ExtendedGuid {
                guid: Uuid::nil(),
                n: 0,
            },
        }
    }
}

impl FileNodeList {
    /// Walk a FileNodeList starting at `root`, per §4.E.
    pub fn read<R>(r: &mut Reader<R>, root: Fcr, state: &mut ParseState) -> Result<Self>
    where
        R: Read + Seek,
    {
        let mut fragments = Vec::new();
        let mut current = root;
        let mut list_id = None;
        loop {
            let section_end = current.stp + current.cb;
            let fragment_offset = current.stp;
            r.seek(current.stp)?;
            let fragment = read_fragment(r, section_end, state)?;

            match list_id {
                None => list_id = Some(fragment.header.list_id),
                Some(expected) if expected != fragment.header.list_id => {
                    return Err(OneStoreError::ListIdMismatch {
                        offset: fragment_offset,
                        expected,
                        found: fragment.header.list_id,
                    })
                }
                Some(_) => {}
            }

            r.seek(section_end - 20)?;
            let next_fragment = decode_fcr64x32(&r.bytes_array()?);
            let _footer = r.u64()?;

            fragments.push(fragment);

            if next_fragment.is_nil() {
                break;
            }
            current = next_fragment;
        }
        Ok(Self { fragments })
    }
}

fn read_fragment<R>(
    r: &mut Reader<R>,
    section_end: u64,
    state: &mut ParseState,
) -> Result<FileNodeListFragment>
where
    R: Read + Seek,
{
    let header = FileNodeListHeader::read(r)?;
    let mut nodes = Vec::new();

    while r.tell()? + 24 < section_end {
        let node = read_node(r, state)?;
        let terminator = node.header.is_terminator();
        nodes.push(node);
        if terminator {
            break;
        }
    }

    Ok(FileNodeListFragment { header, nodes })
}

fn read_node<R>(r: &mut Reader<R>, state: &mut ParseState) -> Result<FileNode>
where
    R: Read + Seek,
{
    let offset = r.tell()?;
    let header = FileNodeHeader::read(r)?;
    let name = file_node_name(header.id);
    trace!("file node {name} (0x{:03X}) at {offset} base_type={}", header.id, header.base_type);

    let body = FileNodeBody::read(header.id, &header, offset, r, state.current_revision)?;
    if let FileNodeBody::Unknown { id } = &body {
        warn!("unrecognized file node id 0x{id:03X} at {offset}, skipped via header.size");
    }

    apply_side_effects(&header, &body, state);

    let property_set = decode_property_set_if_needed(r, &header, &body, state)?;

    let mut children = Vec::new();
    if header.base_type_kind() == Some(BaseType::ChildFileNodeList) {
        if let Some(list_ref) = body.child_ref() {
            let resume = r.tell()?;
            let child = FileNodeList::read(r, list_ref, state)?;
            children = child.fragments;
            r.seek(resume)?;
        } else {
            warn!("file node {name} has baseType==2 but no child reference");
        }
    }

    Ok(FileNode {
        offset,
        header,
        name,
        body,
        property_set,
        children,
    })
}

fn apply_side_effects(header: &FileNodeHeader, body: &FileNodeBody, state: &mut ParseState) {
    match body {
        FileNodeBody::RevisionManifestStart4Fnd { rid, .. }
        | FileNodeBody::RevisionManifestStart6Fnd { rid, .. }
        | FileNodeBody::RevisionManifestStart7Fnd { rid, .. } => {
            debug!("revision {rid} begins at file node 0x{:03X}", header.id);
            state.current_revision = *rid;
        }
        FileNodeBody::GlobalIdTableEntryFndx { index, guid } => {
            state.gidt.insert(state.current_revision, *index, *guid);
            debug!("gidt[{}][{index}] = {guid}", state.current_revision);
        }
        _ => {}
    }
}

fn decode_property_set_if_needed<R>(
    r: &mut Reader<R>,
    _header: &FileNodeHeader,
    body: &FileNodeBody,
    state: &mut ParseState,
) -> Result<Option<ObjectSpaceObjectPropSet>>
where
    R: Read + Seek,
{
    if let FileNodeBody::ObjectDeclaration2RefCountFnd { list_ref, body, .. } = body {
        if is_property_set(&body.jcid) {
            let resume = r.tell()?;
            r.seek(list_ref.stp)?;
            debug!("decoding property set for oid guid_index={}", body.oid.guid_index);
            let prop_set = ObjectSpaceObjectPropSet::read(r, state.current_revision)?;
            r.seek(resume)?;
            return Ok(Some(prop_set));
        }
    }
    Ok(None)
}

fn is_property_set(jcid: &Jcid) -> bool {
    jcid.is_property_set
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn node_header_bytes(id: u16, base_type: u8) -> [u8; 4] {
        let raw: u32 = (id as u32) | (4 << 10) | (base_type as u32) << 27;
        raw.to_le_bytes()
    }

    /// A fragment with its terminator node followed by enough padding that
    /// the `tell() + 24 < section_end` cushion still lets the loop read the
    /// terminator before falling through to the trailer.
    fn fragment_bytes_with_terminator(list_id: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        bytes.extend_from_slice(&list_id.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // nFragmentSequence
        bytes.extend_from_slice(&node_header_bytes(0xFF, 0)); // ChunkTerminatorFND
        bytes.extend_from_slice(&[0u8; 4]); // padding, skipped by the trailer seek
        // nextFragment: FCR64x32 nil
        bytes.extend_from_slice(&0xFFFF_FFFF_FFFF_FFFFu64.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes()); // footer
        bytes
    }

    fn root_fcr(len: u64) -> Fcr {
        let mut bytes = [0u8; 12];
        bytes[0..8].copy_from_slice(&0u64.to_le_bytes());
        bytes[8..12].copy_from_slice(&(len as u32).to_le_bytes());
        decode_fcr64x32(&bytes)
    }

    #[test]
    fn walks_single_fragment_with_terminator() {
        let bytes = fragment_bytes_with_terminator(7);
        let len = bytes.len() as u64;
        let mut r = Reader::new(Cursor::new(bytes));
        let root = root_fcr(len);
        let mut state = ParseState::new();
        let list = FileNodeList::read(&mut r, root, &mut state).unwrap();
        assert_eq!(list.fragments.len(), 1);
        assert_eq!(list.fragments[0].header.list_id, 7);
        assert_eq!(list.fragments[0].nodes.len(), 1);
        assert!(matches!(
            list.fragments[0].nodes[0].body,
            FileNodeBody::ChunkTerminatorFnd
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = fragment_bytes_with_terminator(1);
        bytes[0] = 0x00; // corrupt magic
        let len = bytes.len() as u64;
        let mut r = Reader::new(Cursor::new(bytes));
        let root = root_fcr(len);
        let mut state = ParseState::new();
        match FileNodeList::read(&mut r, root, &mut state) {
            Err(OneStoreError::BadMagic { .. }) => {}
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn list_id_mismatch_across_fragments_is_detected() {
        let frag_len = 44u64;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        bytes.extend_from_slice(&7u32.to_le_bytes()); // listId
        bytes.extend_from_slice(&0u32.to_le_bytes()); // nFragmentSequence
        bytes.extend_from_slice(&node_header_bytes(0xFF, 0));
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.extend_from_slice(&frag_len.to_le_bytes()); // nextFragment.stp
        bytes.extend_from_slice(&(frag_len as u32).to_le_bytes()); // nextFragment.cb
        bytes.extend_from_slice(&0u64.to_le_bytes()); // footer

        bytes.extend_from_slice(&fragment_bytes_with_terminator(9)); // mismatched listId

        let mut r = Reader::new(Cursor::new(bytes));
        let root = root_fcr(frag_len);
        let mut state = ParseState::new();
        match FileNodeList::read(&mut r, root, &mut state) {
            Err(OneStoreError::ListIdMismatch {
                expected: 7,
                found: 9,
                ..
            }) => {}
            other => panic!("expected ListIdMismatch, got {other:?}"),
        }
    }
}
