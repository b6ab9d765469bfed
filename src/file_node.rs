//! Components C+D: the FileNode header and its per-id body.

use crate::error::Result;
use crate::fcr::{decode_fcr, Fcr};
use crate::guid::{CompactId, ExtendedGuid};
use crate::jcid::Jcid;
use crate::reader::Reader;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::io::{Read, Seek};
use uuid::Uuid;

/// `FileNodeHeader.baseType` (MS-ONESTORE 2.4.3): what shape of reference,
/// if any, the node's body carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum BaseType {
    None = 0,
    Data = 1,
    ChildFileNodeList = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FileNodeHeader {
    pub id: u16,
    pub size: u16,
    pub stp_format: u8,
    pub cb_format: u8,
    pub base_type: u8,
}

impl FileNodeHeader {
    pub fn read<R>(r: &mut Reader<R>) -> Result<Self>
    where
        R: Read + Seek,
    {
        let raw = r.u32()?;
        Ok(Self {
            id: (raw & 0x3FF) as u16,
            size: ((raw >> 10) & 0x1FFF) as u16,
            stp_format: ((raw >> 23) & 0x3) as u8,
            cb_format: ((raw >> 25) & 0x3) as u8,
            base_type: ((raw >> 27) & 0xF) as u8,
        })
    }

    /// `true` for the two sentinel ids (`0x00`, `0xFF`) that terminate a
    /// fragment's node sequence.
    pub fn is_terminator(&self) -> bool {
        self.id == 0x00 || self.id == 0xFF
    }

    /// The known `baseType` classification, or `None` for the reserved
    /// value `3`.
    pub fn base_type_kind(&self) -> Option<BaseType> {
        BaseType::try_from(self.base_type).ok()
    }
}

pub fn file_node_name(id: u16) -> &'static str {
    match id {
        0x004 => "ObjectSpaceManifestRootFND",
        0x008 => "ObjectSpaceManifestListReferenceFND",
        0x00C => "ObjectSpaceManifestListStartFND",
        0x010 => "RevisionManifestListReferenceFND",
        0x014 => "RevisionManifestListStartFND",
        0x01B => "RevisionManifestStart4FND",
        0x01C => "RevisionManifestEndFND",
        0x01E => "RevisionManifestStart6FND",
        0x01F => "RevisionManifestStart7FND",
        0x021 => "GlobalIdTableStartFNDX",
        0x022 => "GlobalIdTableStart2FND",
        0x024 => "GlobalIdTableEntryFNDX",
        0x025 => "GlobalIdTableEntry2FNDX",
        0x026 => "GlobalIdTableEntry3FNDX",
        0x028 => "GlobalIdTableEndFNDX",
        0x02D => "ObjectDeclarationWithRefCountFNDX",
        0x02E => "ObjectDeclarationWithRefCount2FNDX",
        0x041 => "ObjectRevisionWithRefCountFNDX",
        0x042 => "ObjectRevisionWithRefCount2FNDX",
        0x059 => "RootObjectReference2FNDX",
        0x05A => "RootObjectReference3FND",
        0x05C => "RevisionRoleDeclarationFND",
        0x05D => "RevisionRoleAndContextDeclarationFND",
        0x072 => "ObjectDeclarationFileData3RefCountFND",
        0x073 => "ObjectDeclarationFileData3LargeRefCountFND",
        0x07C => "ObjectDataEncryptionKeyV2FNDX",
        0x084 => "ObjectInfoDependencyOverridesFND",
        0x08C => "DataSignatureGroupDefinitionFND",
        0x090 => "FileDataStoreListReferenceFND",
        0x094 => "FileDataStoreObjectReferenceFND",
        0x0A4 => "ObjectDeclaration2RefCountFND",
        0x0A5 => "ObjectDeclaration2LargeRefCountFND",
        0x0B0 => "ObjectGroupListReferenceFND",
        0x0B4 => "ObjectGroupStartFND",
        0x0B8 => "ObjectGroupEndFND",
        0x0C2 => "HashedChunkDescriptor2FND",
        0x0C4 => "ReadOnlyObjectDeclaration2RefCountFND",
        0x0C5 => "ReadOnlyObjectDeclaration2LargeRefCountFND",
        0x0FF => "ChunkTerminatorFND",
        _ => "UnknownType",
    }
}

/// `CompactID oid, JCID jcid, u8 flags` shared by every `ObjectDeclaration*`
/// and `ReadOnlyObjectDeclaration*` body.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Declaration2Body {
    pub oid: CompactId,
    pub jcid: Jcid,
    pub has_oid_references: bool,
    pub has_osid_references: bool,
}

impl Declaration2Body {
    fn read<R>(r: &mut Reader<R>, revision: ExtendedGuid) -> Result<Self>
    where
        R: Read + Seek,
    {
        let oid = CompactId::read(r, revision)?;
        let jcid = Jcid::read(r)?;
        let flags = r.u8()?;
        Ok(Self {
            oid,
            jcid,
            has_oid_references: flags & 0x1 != 0,
            has_osid_references: flags & 0x2 != 0,
        })
    }
}

fn string_in_storage_buffer<R>(r: &mut Reader<R>) -> Result<String>
where
    R: Read + Seek,
{
    let cch = r.u32()? as usize;
    r.utf16_string(cch)
}

/// MS-ONESTORE 2.5.21 FileDataStoreObject: header GUID, length-prefixed
/// data, footer GUID. Decoded out of line at the FCR the referencing node
/// carries; the cursor is restored by the caller.
fn read_file_data_store_object<R>(r: &mut Reader<R>, file_ref: Fcr) -> Result<Vec<u8>>
where
    R: Read + Seek,
{
    r.seek(file_ref.stp)?;
    r.skip(16)?; // guidHeader
    let cb_length = r.u64()?;
    r.skip(12)?; // unused(4) + reserved(8)
    let file_data = r.read_exact(cb_length as usize)?;
    r.seek(file_ref.stp + file_ref.cb - 16)?;
    r.skip(16)?; // guidFooter
    Ok(file_data)
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FileNodeBody {
    ObjectSpaceManifestRootFnd {
        gosid_root: ExtendedGuid,
    },
    ObjectSpaceManifestListReferenceFnd {
        list_ref: Fcr,
        gosid: ExtendedGuid,
    },
    ObjectSpaceManifestListStartFnd {
        gosid: ExtendedGuid,
    },
    RevisionManifestListReferenceFnd {
        list_ref: Fcr,
    },
    RevisionManifestListStartFnd {
        gosid: ExtendedGuid,
        n_instance: u32,
    },
    RevisionManifestStart4Fnd {
        rid: ExtendedGuid,
        rid_dependent: ExtendedGuid,
        time_creation: u64,
        revision_role: u32,
        odcs_default: u16,
    },
    RevisionManifestEndFnd,
    RevisionManifestStart6Fnd {
        rid: ExtendedGuid,
        rid_dependent: ExtendedGuid,
        revision_role: u32,
        odcs_default: u16,
    },
    RevisionManifestStart7Fnd {
        rid: ExtendedGuid,
        rid_dependent: ExtendedGuid,
        revision_role: u32,
        odcs_default: u16,
        gctxid: ExtendedGuid,
    },
    GlobalIdTableStartFndx,
    GlobalIdTableStart2Fnd,
    GlobalIdTableEntryFndx {
        index: u32,
        guid: Uuid,
    },
    GlobalIdTableEndFndx,
    ObjectDeclarationWithRefCountFnd {
        list_ref: Fcr,
        body: Declaration2Body,
        c_ref: u32,
    },
    ObjectRevisionWithRefCountFndx {
        list_ref: Fcr,
        rid: ExtendedGuid,
        c_ref: u32,
    },
    RootObjectReference2Fndx {
        oid_root: CompactId,
        root_role: u32,
    },
    RootObjectReference3Fnd {
        oid_root: ExtendedGuid,
        root_role: u32,
    },
    RevisionRoleDeclarationFnd {
        rid: ExtendedGuid,
        revision_role: u32,
    },
    RevisionRoleAndContextDeclarationFnd {
        rid: ExtendedGuid,
        revision_role: u32,
        gctxid: ExtendedGuid,
    },
    ObjectDeclarationFileData3RefCountFnd {
        oid: CompactId,
        jcid: Jcid,
        c_ref: u32,
        file_data_reference: String,
        extension: String,
    },
    ObjectDataEncryptionKeyV2Fndx {
        list_ref: Fcr,
    },
    ObjectInfoDependencyOverridesFnd {
        list_ref: Fcr,
    },
    DataSignatureGroupDefinitionFnd {
        data_signature_group: ExtendedGuid,
    },
    FileDataStoreListReferenceFnd {
        list_ref: Fcr,
    },
    FileDataStoreObjectReferenceFnd {
        list_ref: Fcr,
        guid_reference: Uuid,
        file_data: Vec<u8>,
    },
    ObjectDeclaration2RefCountFnd {
        list_ref: Fcr,
        body: Declaration2Body,
        c_ref: u32,
    },
    ObjectGroupListReferenceFnd {
        list_ref: Fcr,
        object_group_id: ExtendedGuid,
    },
    ObjectGroupStartFnd {
        oid: ExtendedGuid,
    },
    ObjectGroupEndFnd,
    HashedChunkDescriptor2Fnd {
        list_ref: Fcr,
    },
    ReadOnlyObjectDeclaration2RefCountFnd {
        list_ref: Fcr,
        body: Declaration2Body,
        c_ref: u32,
        md5_hash: [u8; 16],
    },
    ChunkTerminatorFnd,
    Unknown {
        id: u16,
    },
}

impl FileNodeBody {
    /// The FCR a `baseType == 2` node uses to locate its child FileNodeList,
    /// when this body carries one.
    pub fn child_ref(&self) -> Option<Fcr> {
        use FileNodeBody::*;
        match self {
            ObjectSpaceManifestListReferenceFnd { list_ref, .. }
            | RevisionManifestListReferenceFnd { list_ref }
            | ObjectDeclarationWithRefCountFnd { list_ref, .. }
            | ObjectRevisionWithRefCountFndx { list_ref, .. }
            | ObjectDataEncryptionKeyV2Fndx { list_ref }
            | ObjectInfoDependencyOverridesFnd { list_ref }
            | FileDataStoreListReferenceFnd { list_ref }
            | FileDataStoreObjectReferenceFnd { list_ref, .. }
            | ObjectDeclaration2RefCountFnd { list_ref, .. }
            | ObjectGroupListReferenceFnd { list_ref, .. }
            | HashedChunkDescriptor2Fnd { list_ref }
            | ReadOnlyObjectDeclaration2RefCountFnd { list_ref, .. } => Some(*list_ref),
            _ => None,
        }
    }

    pub fn read<R>(
        id: u16,
        header: &FileNodeHeader,
        node_offset: u64,
        r: &mut Reader<R>,
        current_revision: ExtendedGuid,
    ) -> Result<Self>
    where
        R: Read + Seek,
    {
        let sf = header.stp_format;
        let cf = header.cb_format;
        let body = match id {
            0x004 => FileNodeBody::ObjectSpaceManifestRootFnd {
                gosid_root: ExtendedGuid::read(r)?,
            },
            0x008 => {
                let list_ref = decode_fcr(sf, cf, r)?;
                let gosid = ExtendedGuid::read(r)?;
                FileNodeBody::ObjectSpaceManifestListReferenceFnd { list_ref, gosid }
            }
            0x00C => FileNodeBody::ObjectSpaceManifestListStartFnd {
                gosid: ExtendedGuid::read(r)?,
            },
            0x010 => FileNodeBody::RevisionManifestListReferenceFnd {
                list_ref: decode_fcr(sf, cf, r)?,
            },
            0x014 => {
                let gosid = ExtendedGuid::read(r)?;
                let n_instance = r.u32()?;
                FileNodeBody::RevisionManifestListStartFnd { gosid, n_instance }
            }
            0x01B => {
                let rid = ExtendedGuid::read(r)?;
                let rid_dependent = ExtendedGuid::read(r)?;
                let time_creation = r.u64()?;
                let revision_role = r.u32()?;
                let odcs_default = r.u16()?;
                FileNodeBody::RevisionManifestStart4Fnd {
                    rid,
                    rid_dependent,
                    time_creation,
                    revision_role,
                    odcs_default,
                }
            }
            0x01C => FileNodeBody::RevisionManifestEndFnd,
            0x01E => {
                let rid = ExtendedGuid::read(r)?;
                let rid_dependent = ExtendedGuid::read(r)?;
                let revision_role = r.u32()?;
                let odcs_default = r.u16()?;
                FileNodeBody::RevisionManifestStart6Fnd {
                    rid,
                    rid_dependent,
                    revision_role,
                    odcs_default,
                }
            }
            0x01F => {
                let rid = ExtendedGuid::read(r)?;
                let rid_dependent = ExtendedGuid::read(r)?;
                let revision_role = r.u32()?;
                let odcs_default = r.u16()?;
                let gctxid = ExtendedGuid::read(r)?;
                FileNodeBody::RevisionManifestStart7Fnd {
                    rid,
                    rid_dependent,
                    revision_role,
                    odcs_default,
                    gctxid,
                }
            }
            0x021 => FileNodeBody::GlobalIdTableStartFndx,
            0x022 => FileNodeBody::GlobalIdTableStart2Fnd,
            0x024 | 0x025 | 0x026 => {
                let index = r.u32()?;
                let guid = r.guid()?;
                FileNodeBody::GlobalIdTableEntryFndx { index, guid }
            }
            0x028 => FileNodeBody::GlobalIdTableEndFndx,
            0x02D => {
                let list_ref = decode_fcr(sf, cf, r)?;
                let body = Declaration2Body::read(r, current_revision)?;
                let c_ref = r.u8()? as u32;
                FileNodeBody::ObjectDeclarationWithRefCountFnd {
                    list_ref,
                    body,
                    c_ref,
                }
            }
            0x02E => {
                let list_ref = decode_fcr(sf, cf, r)?;
                let body = Declaration2Body::read(r, current_revision)?;
                let c_ref = r.u32()?;
                FileNodeBody::ObjectDeclarationWithRefCountFnd {
                    list_ref,
                    body,
                    c_ref,
                }
            }
            0x041 => {
                let list_ref = decode_fcr(sf, cf, r)?;
                let rid = ExtendedGuid::read(r)?;
                let c_ref = r.u8()? as u32;
                FileNodeBody::ObjectRevisionWithRefCountFndx {
                    list_ref,
                    rid,
                    c_ref,
                }
            }
            0x042 => {
                let list_ref = decode_fcr(sf, cf, r)?;
                let rid = ExtendedGuid::read(r)?;
                let c_ref = r.u32()?;
                FileNodeBody::ObjectRevisionWithRefCountFndx {
                    list_ref,
                    rid,
                    c_ref,
                }
            }
            0x059 => {
                let oid_root = CompactId::read(r, current_revision)?;
                let root_role = r.u32()?;
                FileNodeBody::RootObjectReference2Fndx {
                    oid_root,
                    root_role,
                }
            }
            0x05A => {
                let oid_root = ExtendedGuid::read(r)?;
                let root_role = r.u32()?;
                FileNodeBody::RootObjectReference3Fnd {
                    oid_root,
                    root_role,
                }
            }
            0x05C => {
                let rid = ExtendedGuid::read(r)?;
                let revision_role = r.u32()?;
                FileNodeBody::RevisionRoleDeclarationFnd { rid, revision_role }
            }
            0x05D => {
                let rid = ExtendedGuid::read(r)?;
                let revision_role = r.u32()?;
                let gctxid = ExtendedGuid::read(r)?;
                FileNodeBody::RevisionRoleAndContextDeclarationFnd {
                    rid,
                    revision_role,
                    gctxid,
                }
            }
            0x072 => {
                let oid = CompactId::read(r, current_revision)?;
                let jcid = Jcid::read(r)?;
                let c_ref = r.u8()? as u32;
                let file_data_reference = string_in_storage_buffer(r)?;
                let extension = string_in_storage_buffer(r)?;
                FileNodeBody::ObjectDeclarationFileData3RefCountFnd {
                    oid,
                    jcid,
                    c_ref,
                    file_data_reference,
                    extension,
                }
            }
            0x073 => {
                let oid = CompactId::read(r, current_revision)?;
                let jcid = Jcid::read(r)?;
                let c_ref = r.u32()?;
                let file_data_reference = string_in_storage_buffer(r)?;
                let extension = string_in_storage_buffer(r)?;
                FileNodeBody::ObjectDeclarationFileData3RefCountFnd {
                    oid,
                    jcid,
                    c_ref,
                    file_data_reference,
                    extension,
                }
            }
            0x07C => FileNodeBody::ObjectDataEncryptionKeyV2Fndx {
                list_ref: decode_fcr(sf, cf, r)?,
            },
            0x084 => {
                let list_ref = decode_fcr(sf, cf, r)?;
                if list_ref.is_nil() {
                    skip_dependency_override_data(r, current_revision)?;
                }
                FileNodeBody::ObjectInfoDependencyOverridesFnd { list_ref }
            }
            0x08C => FileNodeBody::DataSignatureGroupDefinitionFnd {
                data_signature_group: ExtendedGuid::read(r)?,
            },
            0x090 => FileNodeBody::FileDataStoreListReferenceFnd {
                list_ref: decode_fcr(sf, cf, r)?,
            },
            0x094 => {
                let list_ref = decode_fcr(sf, cf, r)?;
                let guid_reference = r.guid()?;
                let resume = r.tell()?;
                let file_data = read_file_data_store_object(r, list_ref)?;
                r.seek(resume)?;
                FileNodeBody::FileDataStoreObjectReferenceFnd {
                    list_ref,
                    guid_reference,
                    file_data,
                }
            }
            0x0A4 => {
                let list_ref = decode_fcr(sf, cf, r)?;
                let body = Declaration2Body::read(r, current_revision)?;
                let c_ref = r.u8()? as u32;
                FileNodeBody::ObjectDeclaration2RefCountFnd {
                    list_ref,
                    body,
                    c_ref,
                }
            }
            0x0A5 => {
                let list_ref = decode_fcr(sf, cf, r)?;
                let body = Declaration2Body::read(r, current_revision)?;
                let c_ref = r.u32()?;
                FileNodeBody::ObjectDeclaration2RefCountFnd {
                    list_ref,
                    body,
                    c_ref,
                }
            }
            0x0B0 => {
                let list_ref = decode_fcr(sf, cf, r)?;
                let object_group_id = ExtendedGuid::read(r)?;
                FileNodeBody::ObjectGroupListReferenceFnd {
                    list_ref,
                    object_group_id,
                }
            }
            0x0B4 => FileNodeBody::ObjectGroupStartFnd {
                oid: ExtendedGuid::read(r)?,
            },
            0x0B8 => FileNodeBody::ObjectGroupEndFnd,
            0x0C2 => FileNodeBody::HashedChunkDescriptor2Fnd {
                list_ref: decode_fcr(sf, cf, r)?,
            },
            0x0C4 => {
                let list_ref = decode_fcr(sf, cf, r)?;
                let body = Declaration2Body::read(r, current_revision)?;
                let c_ref = r.u8()? as u32;
                let md5_hash = r.bytes_array()?;
                FileNodeBody::ReadOnlyObjectDeclaration2RefCountFnd {
                    list_ref,
                    body,
                    c_ref,
                    md5_hash,
                }
            }
            0x0C5 => {
                let list_ref = decode_fcr(sf, cf, r)?;
                let body = Declaration2Body::read(r, current_revision)?;
                let c_ref = r.u32()?;
                let md5_hash = r.bytes_array()?;
                FileNodeBody::ReadOnlyObjectDeclaration2RefCountFnd {
                    list_ref,
                    body,
                    c_ref,
                    md5_hash,
                }
            }
            0x0FF => FileNodeBody::ChunkTerminatorFnd,
            _ => {
                r.seek(node_offset + header.size as u64)?;
                FileNodeBody::Unknown { id }
            }
        };
        Ok(body)
    }
}

fn skip_dependency_override_data<R>(r: &mut Reader<R>, current_revision: ExtendedGuid) -> Result<()>
where
    R: Read + Seek,
{
    let c8 = r.u32()?;
    let c32 = r.u32()?;
    let _crc = r.u32()?;
    for _ in 0..c8 {
        CompactId::read(r, current_revision)?;
        r.u8()?;
    }
    for _ in 0..c32 {
        CompactId::read(r, current_revision)?;
        r.u32()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_header_bit_fields() {
        // id=0x0FF, size=10, stpFormat=1, cbFormat=2, baseType=0
        let raw: u32 = 0x0FF | (10 << 10) | (1 << 23) | (2 << 25) | (0 << 27);
        let mut r = Reader::new(Cursor::new(raw.to_le_bytes().to_vec()));
        let header = FileNodeHeader::read(&mut r).unwrap();
        assert_eq!(header.id, 0x0FF);
        assert_eq!(header.size, 10);
        assert_eq!(header.stp_format, 1);
        assert_eq!(header.cb_format, 2);
        assert!(header.is_terminator());
    }

    #[test]
    fn base_type_kind_recognizes_reference_shapes() {
        let header = FileNodeHeader {
            id: 0x008,
            size: 0,
            stp_format: 0,
            cb_format: 0,
            base_type: 2,
        };
        assert_eq!(header.base_type_kind(), Some(BaseType::ChildFileNodeList));

        let reserved = FileNodeHeader { base_type: 3, ..header };
        assert_eq!(reserved.base_type_kind(), None);
    }

    #[test]
    fn chunk_terminator_has_no_body_bytes() {
        let header = FileNodeHeader {
            id: 0xFF,
            size: 4,
            stp_format: 0,
            cb_format: 0,
            base_type: 0,
        };
        let mut r = Reader::new(Cursor::new(Vec::<u8>::new()));
        let revision = ExtendedGuid {
            guid: Uuid::nil(),
            n: 0,
        };
        let body = FileNodeBody::read(0xFF, &header, 0, &mut r, revision).unwrap();
        assert!(matches!(body, FileNodeBody::ChunkTerminatorFnd));
    }

    #[test]
    fn unknown_id_is_recorded_not_rejected() {
        let header = FileNodeHeader {
            id: 0x3FF,
            size: 4,
            stp_format: 0,
            cb_format: 0,
            base_type: 0,
        };
        let mut r = Reader::new(Cursor::new(Vec::<u8>::new()));
        let revision = ExtendedGuid {
            guid: Uuid::nil(),
            n: 0,
        };
        let body = FileNodeBody::read(0x3FF, &header, 0, &mut r, revision).unwrap();
        assert!(matches!(body, FileNodeBody::Unknown { id: 0x3FF }));
        assert_eq!(file_node_name(0x3FF), "UnknownType");
        assert_eq!(r.tell().unwrap(), header.size as u64);
    }
}
