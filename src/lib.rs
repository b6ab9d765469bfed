//! A parser for Microsoft OneNote revision-store files (`.one` / `.onetoc2`,
//! MS-ONESTORE).

/// Error handling types.
pub mod error;

mod document;
mod fcr;
mod file_node;
mod file_node_list;
mod gidt;
mod guid;
mod header;
mod jcid;
mod property_id;
mod property_set;
mod reader;
mod value_fmt;

pub use document::{Document, FileEntry, LinkEntry, PropertyRecord};
pub use error::{OneStoreError, Result};
pub use fcr::Fcr;
pub use file_node::{FileNodeBody, FileNodeHeader};
pub use file_node_list::{FileNode, FileNodeListFragment};
pub use gidt::GlobalIdTable;
pub use guid::{CompactId, ExtendedGuid};
pub use header::{Header, ONETOC2_GUID, ONE_GUID};
pub use jcid::Jcid;
pub use property_id::PropertyId;
pub use property_set::{ObjectSpaceObjectPropSet, PropertySet, PropertyValue};
