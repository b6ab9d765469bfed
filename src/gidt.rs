//! Component F: the Global Identification Table.
//!
//! A per-revision index -> GUID map, built incrementally during traversal
//! and consulted when resolving `CompactID`s. There is no concurrent
//! access: writes happen while walking the FileNodeList, reads happen when
//! rendering a PropertySet afterward.

use crate::guid::{CompactId, ExtendedGuid};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct GlobalIdTable {
    entries: HashMap<(ExtendedGuid, u32), uuid::Uuid>,
}

impl GlobalIdTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, revision: ExtendedGuid, index: u32, guid: uuid::Uuid) {
        self.entries.insert((revision, index), guid);
    }

    pub fn get(&self, revision: ExtendedGuid, index: u32) -> Option<uuid::Uuid> {
        self.entries.get(&(revision, index)).copied()
    }

    /// Resolve a [`CompactId`] to the GUID it refers to, under the revision
    /// it was decoded in. `None` means `MissingGidtEntry` (§7): callers
    /// render a `"<missing>"` placeholder rather than aborting.
    pub fn resolve(&self, id: &CompactId) -> Option<uuid::Uuid> {
        self.get(id.revision, id.guid_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn resolves_entry_inserted_under_same_revision() {
        let revision = ExtendedGuid {
            guid: Uuid::nil(),
            n: 1,
        };
        let mut table = GlobalIdTable::new();
        let guid = Uuid::new_v4();
        table.insert(revision, 7, guid);

        let id = CompactId {
            n: 1,
            guid_index: 7,
            revision,
        };
        assert_eq!(table.resolve(&id), Some(guid));
    }

    #[test]
    fn missing_entry_resolves_to_none() {
        let revision = ExtendedGuid {
            guid: Uuid::nil(),
            n: 1,
        };
        let table = GlobalIdTable::new();
        let id = CompactId {
            n: 0,
            guid_index: 9,
            revision,
        };
        assert_eq!(table.resolve(&id), None);
    }
}
