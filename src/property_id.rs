//! PropertyID: a packed `(id: 26 bits, type: 5 bits, boolValue: 1 bit)` key
//! inside a PropertySet (`spec.md` §3, MS-ONESTORE 2.1.11).

use crate::error::Result;
use crate::reader::Reader;
use std::io::{Read, Seek};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PropertyId {
    pub raw: u32,
    pub id: u32,
    pub value_type: u8,
    pub bool_value: bool,
}

impl PropertyId {
    pub fn read<R>(r: &mut Reader<R>) -> Result<Self>
    where
        R: Read + Seek,
    {
        let raw = r.u32()?;
        Ok(Self {
            raw,
            id: raw & 0x03FF_FFFF,
            value_type: ((raw >> 26) & 0x1F) as u8,
            bool_value: (raw >> 31) & 1 == 1,
        })
    }

    /// Human name keyed on the *full* packed value, matching how the
    /// original name table was built: two properties can share an `id`
    /// with a different `type`/`boolValue` and still be distinct
    /// well-known properties.
    pub fn name(&self) -> &'static str {
        names::lookup(self.raw).unwrap_or("Unknown")
    }
}

mod names {
    /// MS-ONESTORE 2.1.12 Properties.
    const TABLE: &[(u32, &str)] = &[
        (0x0800_1C00, "LayoutTightLayout"),
        (0x1400_1C01, "PageWidth"),
        (0x1400_1C02, "PageHeight"),
        (0x0C00_1C03, "OutlineElementChildLevel"),
        (0x0800_1C04, "Bold"),
        (0x0800_1C05, "Italic"),
        (0x0800_1C06, "Underline"),
        (0x0800_1C07, "Strikethrough"),
        (0x0800_1C08, "Superscript"),
        (0x0800_1C09, "Subscript"),
        (0x1C00_1C0A, "Font"),
        (0x1000_1C0B, "FontSize"),
        (0x1400_1C0C, "FontColor"),
        (0x1400_1C0D, "Highlight"),
        (0x1C00_1C12, "RgOutlineIndentDistance"),
        (0x0C00_1C13, "BodyTextAlignment"),
        (0x1400_1C14, "OffsetFromParentHoriz"),
        (0x1400_1C15, "OffsetFromParentVert"),
        (0x1C00_1C1A, "NumberListFormat"),
        (0x1400_1C1B, "LayoutMaxWidth"),
        (0x1400_1C1C, "LayoutMaxHeight"),
        (0x2400_1C1F, "ContentChildNodesOfPageManifest"),
        (0x2400_1C20, "ElementChildNodesOfOutlineElement"),
        (0x0800_1E1E, "EnableHistory"),
        (0x1C00_1C22, "RichEditTextUnicode"),
        (0x2400_1C26, "ListNodes"),
        (0x1C00_1C30, "NotebookManagementEntityGuid"),
        (0x0800_1C34, "OutlineElementRTL"),
        (0x1400_1C3B, "LanguageID"),
        (0x1400_1C3E, "LayoutAlignmentInParent"),
        (0x2000_1C3F, "PictureContainer"),
        (0x1400_1C4C, "PageMarginTop"),
        (0x1400_1C4D, "PageMarginBottom"),
        (0x1400_1C4E, "PageMarginLeft"),
        (0x1400_1C4F, "PageMarginRight"),
        (0x1C00_1C52, "ListFont"),
        (0x1800_1C65, "TopologyCreationTimeStamp"),
        (0x1400_1C84, "LayoutAlignmentSelf"),
        (0x0800_1C87, "IsTitleTime"),
        (0x0800_1C88, "IsBoilerText"),
        (0x1400_1C8B, "PageSize"),
        (0x0800_1C8E, "PortraitPage"),
        (0x0800_1C91, "EnforceOutlineStructure"),
        (0x0800_1C92, "EditRootRTL"),
        (0x0800_1CB2, "CannotBeSelected"),
        (0x0800_1CB4, "IsTitleText"),
        (0x0800_1CB5, "IsTitleDate"),
        (0x1400_1CB7, "ListRestart"),
        (0x0800_1CBD, "IsLayoutSizeSetByUser"),
        (0x1400_1CCB, "ListSpacingMu"),
        (0x1400_1CDB, "LayoutOutlineReservedWidth"),
        (0x0800_1CDC, "LayoutResolveChildCollisions"),
        (0x0800_1CDE, "IsReadOnly"),
        (0x1400_1CEC, "LayoutMinimumOutlineWidth"),
        (0x1400_1CF1, "LayoutCollisionPriority"),
        (0x1C00_1CF3, "CachedTitleString"),
        (0x0800_1CF9, "DescendantsCannotBeMoved"),
        (0x1000_1CFE, "RichEditTextLangID"),
        (0x0800_1CFF, "LayoutTightAlignment"),
        (0x0C00_1D01, "Charset"),
        (0x1400_1D09, "CreationTimeStamp"),
        (0x0800_1D0C, "Deletable"),
        (0x1000_1D0E, "ListMSAAIndex"),
        (0x0800_1D13, "IsBackground"),
        (0x1400_1D24, "IRecordMedia"),
        (0x1C00_1D3C, "CachedTitleStringFromPage"),
        (0x1400_1D57, "RowCount"),
        (0x1400_1D58, "ColumnCount"),
        (0x0800_1D5E, "TableBordersVisible"),
        (0x2400_1D5F, "StructureElementChildNodes"),
        (0x2C00_1D63, "ChildGraphSpaceElementNodes"),
        (0x1C00_1D66, "TableColumnWidths"),
        (0x1C00_1D75, "Author"),
        (0x1800_1D77, "LastModifiedTimeStamp"),
        (0x2000_1D78, "AuthorOriginal"),
        (0x2000_1D79, "AuthorMostRecent"),
        (0x1400_1D7A, "LastModifiedTime"),
        (0x0800_1D7C, "IsConflictPage"),
        (0x1C00_1D7D, "TableColumnsLocked"),
        (0x1400_1D82, "SchemaRevisionInOrderToRead"),
        (0x0800_1D96, "IsConflictObjectForRender"),
        (0x2000_1D9B, "EmbeddedFileContainer"),
        (0x1C00_1D9C, "EmbeddedFileName"),
        (0x1C00_1D9D, "SourceFilepath"),
        (0x1C00_1D9E, "ConflictingUserName"),
        (0x1C00_1DD7, "ImageFilename"),
        (0x0800_1DDB, "IsConflictObjectForSelection"),
        (0x1400_1DFF, "PageLevel"),
        (0x1C00_1E12, "TextRunIndex"),
        (0x2400_1E13, "TextRunFormatting"),
        (0x0800_1E14, "Hyperlink"),
        (0x0C00_1E15, "UnderlineType"),
        (0x0800_1E16, "Hidden"),
        (0x0800_1E19, "HyperlinkProtected"),
        (0x0800_1E22, "TextRunIsEmbeddedObject"),
        (0x1400_1E26, "CellShadingColor"),
        (0x1C00_1E58, "ImageAltText"),
        (0x0800_3401, "MathFormatting"),
        (0x2000_342C, "ParagraphStyle"),
        (0x1400_342E, "ParagraphSpaceBefore"),
        (0x1400_342F, "ParagraphSpaceAfter"),
        (0x1400_3430, "ParagraphLineSpacingExact"),
        (0x2400_3442, "MetaDataObjectsAboveGraphSpace"),
        (0x2400_3458, "TextRunDataObject"),
        (0x4000_3499, "TextRunData"),
        (0x1C00_345A, "ParagraphStyleId"),
        (0x0800_3462, "HasVersionPages"),
        (0x1000_3463, "ActionItemType"),
        (0x1000_3464, "NoteTagShape"),
        (0x1400_3465, "NoteTagHighlightColor"),
        (0x1400_3466, "NoteTagTextColor"),
        (0x1400_3467, "NoteTagPropertyStatus"),
        (0x1C00_3468, "NoteTagLabel"),
        (0x1400_346E, "NoteTagCreated"),
        (0x1400_346F, "NoteTagCompleted"),
        (0x2000_3488, "NoteTagDefinitionOid"),
        (0x0400_3489, "NoteTagStates"),
        (0x1000_3470, "ActionItemStatus"),
        (0x0C00_3473, "ActionItemSchemaVersion"),
        (0x0800_3476, "ReadingOrderRTL"),
        (0x0C00_3477, "ParagraphAlignment"),
        (0x3400_347B, "VersionHistoryGraphSpaceContextNodes"),
        (0x1400_3480, "DisplayedPageNumber"),
        (0x1C00_349B, "SectionDisplayName"),
        (0x1C00_348A, "NextStyle"),
        (0x2000_34C8, "WebPictureContainer14"),
        (0x1400_34CB, "ImageUploadState"),
        (0x1C00_3498, "TextExtendedAscii"),
        (0x1400_34CD, "PictureWidth"),
        (0x1400_34CE, "PictureHeight"),
        (0x1400_1D0F, "PageMarginOriginX"),
        (0x1400_1D10, "PageMarginOriginY"),
        (0x1C00_1E20, "WzHyperlinkUrl"),
        (0x1400_346B, "TaskTagDueDate"),
        (0x1C00_1DE9, "IsDeletedGraphSpaceContent"),
    ];

    pub fn lookup(raw: u32) -> Option<&'static str> {
        TABLE
            .iter()
            .find(|(value, _)| *value == raw)
            .map(|(_, name)| *name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_bit_fields() {
        let mut r = Reader::new(Cursor::new(0x1400_1C01u32.to_le_bytes().to_vec()));
        let pid = PropertyId::read(&mut r).unwrap();
        assert_eq!(pid.id, 0x1C01);
        assert_eq!(pid.value_type, 0x05);
        assert!(!pid.bool_value);
        assert_eq!(pid.name(), "PageWidth");
    }

    #[test]
    fn unknown_raw_value_is_unknown() {
        let pid = PropertyId {
            raw: 0xFFFF_FFFF,
            id: 0,
            value_type: 0,
            bool_value: false,
        };
        assert_eq!(pid.name(), "Unknown");
    }

    #[test]
    fn bool_value_flag_set_when_top_bit_is_one() {
        let mut r = Reader::new(Cursor::new(0x8800_1C04u32.to_le_bytes().to_vec()));
        let pid = PropertyId::read(&mut r).unwrap();
        assert!(pid.bool_value);
    }
}
