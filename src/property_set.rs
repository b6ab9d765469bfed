//! Component G: the PropertySet decoder (MS-ONESTORE 2.1.11/2.1.14).

use crate::error::{OneStoreError, Result};
use crate::gidt::GlobalIdTable;
use crate::guid::{CompactId, ExtendedGuid};
use crate::property_id::PropertyId;
use crate::reader::Reader;
use crate::value_fmt;
use indexmap::IndexMap;
use std::io::{Read, Seek};
use log::warn;

/// Packed `Count:24 | reserved:6 | ExtendedStreamsPresent:1 | OsidStreamNotPresent:1`.
#[derive(Debug, Clone, Copy)]
pub struct ObjectSpaceObjectStreamHeader {
    pub count: u32,
    pub extended_streams_present: bool,
    pub osid_stream_not_present: bool,
}

impl ObjectSpaceObjectStreamHeader {
    pub fn read<R>(r: &mut Reader<R>) -> Result<Self>
    where
        R: Read + Seek,
    {
        let raw = r.u32()?;
        Ok(Self {
            count: raw & 0x00FF_FFFF,
            extended_streams_present: (raw >> 30) & 1 == 1,
            osid_stream_not_present: (raw >> 31) & 1 == 1,
        })
    }
}

/// A sequence of CompactIDs with a read cursor: §4.G.1's OID/OSID/ContextID
/// streams. Consuming the stream never touches the underlying byte reader.
#[derive(Debug, Clone)]
pub struct CompactIdStream {
    pub header: ObjectSpaceObjectStreamHeader,
    entries: Vec<CompactId>,
    cursor: usize,
}

impl CompactIdStream {
    pub fn read<R>(r: &mut Reader<R>, revision: ExtendedGuid) -> Result<Self>
    where
        R: Read + Seek,
    {
        let header = ObjectSpaceObjectStreamHeader::read(r)?;
        let mut entries = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            entries.push(CompactId::read(r, revision)?);
        }
        Ok(Self {
            header,
            entries,
            cursor: 0,
        })
    }

    fn next(&mut self) -> Option<CompactId> {
        let id = self.entries.get(self.cursor).copied();
        if id.is_some() {
            self.cursor += 1;
        }
        id
    }
}

/// The three streams that frame an `ObjectSpaceObjectPropSet`, plus the
/// PropertySet itself.
#[derive(Debug, Clone)]
pub struct ObjectSpaceObjectPropSet {
    pub oids: CompactIdStream,
    pub osids: Option<CompactIdStream>,
    pub context_ids: Option<CompactIdStream>,
    pub body: PropertySet,
}

impl ObjectSpaceObjectPropSet {
    pub fn read<R>(r: &mut Reader<R>, revision: ExtendedGuid) -> Result<Self>
    where
        R: Read + Seek,
    {
        let mut oids = CompactIdStream::read(r, revision)?;
        let osids = if oids.header.osid_stream_not_present {
            None
        } else {
            Some(CompactIdStream::read(r, revision)?)
        };
        let context_ids = if oids.header.extended_streams_present {
            Some(CompactIdStream::read(r, revision)?)
        } else {
            None
        };
        let mut osids_mut = osids;
        let mut context_ids_mut = context_ids;
        let body = PropertySet::read(r, &mut oids, &mut osids_mut, &mut context_ids_mut)?;
        Ok(Self {
            oids,
            osids: osids_mut,
            context_ids: context_ids_mut,
            body,
        })
    }
}

/// A single decoded property value, tagged by the 5-bit type that produced it.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    None,
    Bool(bool),
    OneByte([u8; 1]),
    TwoBytes([u8; 2]),
    FourBytes([u8; 4]),
    EightBytes([u8; 8]),
    Bytes(Vec<u8>),
    CompactIds(Vec<CompactId>),
    Nested(Box<PropertySet>),
}

#[derive(Debug, Clone)]
pub struct PropertySet {
    pub prids: Vec<PropertyId>,
    pub values: Vec<PropertyValue>,
}

impl PropertySet {
    pub fn read<R>(
        r: &mut Reader<R>,
        oids: &mut CompactIdStream,
        osids: &mut Option<CompactIdStream>,
        context_ids: &mut Option<CompactIdStream>,
    ) -> Result<Self>
    where
        R: Read + Seek,
    {
        let offset = r.tell()?;
        let c_properties = r.u16()? as usize;
        let mut prids = Vec::with_capacity(c_properties);
        for _ in 0..c_properties {
            prids.push(PropertyId::read(r)?);
        }

        let mut values = Vec::with_capacity(c_properties);
        for prid in &prids {
            let value = match prid.value_type {
                0x1 => PropertyValue::None,
                0x2 => PropertyValue::Bool(prid.bool_value),
                0x3 => PropertyValue::OneByte(r.bytes_array()?),
                0x4 => PropertyValue::TwoBytes(r.bytes_array()?),
                0x5 => PropertyValue::FourBytes(r.bytes_array()?),
                0x6 => PropertyValue::EightBytes(r.bytes_array()?),
                0x7 => {
                    let cb = r.u32()? as usize;
                    PropertyValue::Bytes(r.read_exact(cb)?)
                }
                0x8 => PropertyValue::CompactIds(read_compact_ids(oids, 1)),
                0x9 => {
                    let count = r.u32()? as usize;
                    PropertyValue::CompactIds(read_compact_ids(oids, count))
                }
                0xA => {
                    let stream = osids.as_mut().ok_or(OneStoreError::InvalidPropertyType {
                        offset,
                        type_tag: prid.value_type,
                    })?;
                    PropertyValue::CompactIds(read_compact_ids(stream, 1))
                }
                0xB => {
                    let count = r.u32()? as usize;
                    let stream = osids.as_mut().ok_or(OneStoreError::InvalidPropertyType {
                        offset,
                        type_tag: prid.value_type,
                    })?;
                    PropertyValue::CompactIds(read_compact_ids(stream, count))
                }
                0xC => {
                    let stream = context_ids
                        .as_mut()
                        .ok_or(OneStoreError::InvalidPropertyType {
                            offset,
                            type_tag: prid.value_type,
                        })?;
                    PropertyValue::CompactIds(read_compact_ids(stream, 1))
                }
                0xD => {
                    let count = r.u32()? as usize;
                    let stream = context_ids
                        .as_mut()
                        .ok_or(OneStoreError::InvalidPropertyType {
                            offset,
                            type_tag: prid.value_type,
                        })?;
                    PropertyValue::CompactIds(read_compact_ids(stream, count))
                }
                0x10 => return Err(OneStoreError::UnimplementedPropertyType { offset }),
                0x11 => {
                    PropertyValue::Nested(Box::new(PropertySet::read(r, oids, osids, context_ids)?))
                }
                other => {
                    return Err(OneStoreError::InvalidPropertyType {
                        offset,
                        type_tag: other,
                    })
                }
            };
            values.push(value);
        }

        Ok(Self { prids, values })
    }

    /// Render every named property to its formatted string, per §4.G.2.
    /// Properties whose PropertyID has no known name are omitted, matching
    /// the original renderer (it only surfaces properties it can name).
    pub fn get_properties(&self, gidt: &GlobalIdTable) -> IndexMap<String, String> {
        let mut out = IndexMap::new();
        for (prid, value) in self.prids.iter().zip(self.values.iter()) {
            let name = prid.name();
            if name == "Unknown" {
                continue;
            }
            out.insert(name.to_string(), format_value(name, value, gidt));
        }
        out
    }
}

fn read_compact_ids(stream: &mut CompactIdStream, count: usize) -> Vec<CompactId> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        match stream.next() {
            Some(id) => out.push(id),
            None => {
                warn!("compact id stream exhausted before satisfying requested count");
                break;
            }
        }
    }
    out
}

fn format_value(name: &str, value: &PropertyValue, gidt: &GlobalIdTable) -> String {
    let name_lower = name.to_lowercase();
    match value {
        PropertyValue::None => String::new(),
        PropertyValue::Bool(b) => b.to_string(),
        PropertyValue::OneByte(bytes) => format_raw_bytes(&name_lower, bytes),
        PropertyValue::TwoBytes(bytes) => format_raw_bytes(&name_lower, bytes),
        PropertyValue::FourBytes(bytes) => format_raw_bytes(&name_lower, bytes),
        PropertyValue::EightBytes(bytes) => format_raw_bytes(&name_lower, bytes),
        PropertyValue::Bytes(bytes) => {
            if name_lower.contains("guid") {
                value_fmt::bytes_as_guid(bytes)
                    .map(|g| g.simple().to_string())
                    .unwrap_or_else(|| hex_string(bytes))
            } else {
                value_fmt::bytes_as_text_or_hex(bytes)
            }
        }
        PropertyValue::CompactIds(ids) => ids
            .iter()
            .map(|id| match gidt.resolve(id) {
                Some(guid) => format!("{{{guid}}}, {}", id.n),
                None => "<missing>".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        PropertyValue::Nested(inner) => inner
            .get_properties(gidt)
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

fn format_raw_bytes(name_lower: &str, bytes: &[u8]) -> String {
    if name_lower.contains("time") {
        return match bytes.len() {
            8 => value_fmt::filetime_to_string(u64::from_le_bytes(bytes.try_into().unwrap())),
            4 => value_fmt::time32_to_string(u32::from_le_bytes(bytes.try_into().unwrap())),
            _ => hex_string(bytes),
        };
    }
    if name_lower.contains("height")
        || name_lower.contains("width")
        || name_lower.contains("offset")
        || name_lower.contains("margin")
    {
        if bytes.len() == 4 {
            let value = f32::from_le_bytes(bytes.try_into().unwrap());
            return value_fmt::half_inch_to_pixels(value, 96).to_string();
        }
    }
    if name_lower.contains("languageid") && bytes.len() == 4 {
        return value_fmt::lcid_label(u32::from_le_bytes(bytes.try_into().unwrap()));
    }
    if name_lower.contains("langid") && bytes.len() == 2 {
        return value_fmt::lcid_label(u16::from_le_bytes(bytes.try_into().unwrap()) as u32);
    }
    hex_string(bytes)
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_four_byte_integer_property() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_le_bytes()); // cProperties
        bytes.extend_from_slice(&0x1400_1C01u32.to_le_bytes()); // PageWidth, type 5
        bytes.extend_from_slice(&0x41F0_0000u32.to_le_bytes()); // 30.0f

        let mut r = Reader::new(Cursor::new(bytes));
        let mut oids = CompactIdStream {
            header: ObjectSpaceObjectStreamHeader {
                count: 0,
                extended_streams_present: false,
                osid_stream_not_present: true,
            },
            entries: vec![],
            cursor: 0,
        };
        let mut osids = None;
        let mut context_ids = None;
        let set = PropertySet::read(&mut r, &mut oids, &mut osids, &mut context_ids).unwrap();
        assert_eq!(set.prids.len(), 1);

        let gidt = GlobalIdTable::new();
        let props = set.get_properties(&gidt);
        assert_eq!(props.get("PageWidth").unwrap(), "1440");
    }

    #[test]
    fn none_type_consumes_no_bytes() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&0x0400_1C87u32.to_le_bytes()); // IsTitleTime, type 1 (None)

        let mut r = Reader::new(Cursor::new(bytes));
        let mut oids = CompactIdStream {
            header: ObjectSpaceObjectStreamHeader {
                count: 0,
                extended_streams_present: false,
                osid_stream_not_present: true,
            },
            entries: vec![],
            cursor: 0,
        };
        let mut osids = None;
        let mut context_ids = None;
        let set = PropertySet::read(&mut r, &mut oids, &mut osids, &mut context_ids).unwrap();
        assert!(matches!(set.values[0], PropertyValue::None));
        assert_eq!(r.tell().unwrap(), 6);
    }

    #[test]
    fn unimplemented_array_type_errors() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_le_bytes());
        let raw = (0x10u32 << 26) | 0x1C01;
        bytes.extend_from_slice(&raw.to_le_bytes());

        let mut r = Reader::new(Cursor::new(bytes));
        let mut oids = CompactIdStream {
            header: ObjectSpaceObjectStreamHeader {
                count: 0,
                extended_streams_present: false,
                osid_stream_not_present: true,
            },
            entries: vec![],
            cursor: 0,
        };
        let mut osids = None;
        let mut context_ids = None;
        match PropertySet::read(&mut r, &mut oids, &mut osids, &mut context_ids) {
            Err(OneStoreError::UnimplementedPropertyType { .. }) => {}
            other => panic!("expected UnimplementedPropertyType, got {other:?}"),
        }
    }

    #[test]
    fn nested_property_set_decodes_recursively() {
        let mut bytes = Vec::new();
        // Outer: one property of type 0x11 (nested).
        bytes.extend_from_slice(&1u16.to_le_bytes());
        let outer_prid = (0x11u32 << 26) | 0x3458; // TextRunDataObject-ish name unused here
        bytes.extend_from_slice(&outer_prid.to_le_bytes());
        // Inner PropertySet: one property of type 0x5 (four bytes).
        bytes.extend_from_slice(&1u16.to_le_bytes());
        let inner_prid = (0x5u32 << 26) | 0x1C01;
        bytes.extend_from_slice(&inner_prid.to_le_bytes());
        bytes.extend_from_slice(&42u32.to_le_bytes());

        let mut r = Reader::new(Cursor::new(bytes));
        let mut oids = CompactIdStream {
            header: ObjectSpaceObjectStreamHeader {
                count: 0,
                extended_streams_present: false,
                osid_stream_not_present: true,
            },
            entries: vec![],
            cursor: 0,
        };
        let mut osids = None;
        let mut context_ids = None;
        let set = PropertySet::read(&mut r, &mut oids, &mut osids, &mut context_ids).unwrap();
        match &set.values[0] {
            PropertyValue::Nested(inner) => {
                assert_eq!(inner.prids.len(), 1);
            }
            other => panic!("expected Nested, got {other:?}"),
        }
    }
}
