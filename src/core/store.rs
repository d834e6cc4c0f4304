// Per-context component store keyed by handle.
// Handles are allocated monotonically, so key order is insertion order.
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::component::ConnectedComponent;
use crate::core::error::{Error, ErrorKind};
use crate::core::flags::ComponentTypeFilter;
use crate::core::handle::{ComponentHandle, HandleAllocator};

#[derive(Debug)]
pub struct ComponentStore {
    ids: Arc<HandleAllocator>,
    records: BTreeMap<ComponentHandle, ConnectedComponent>,
}

impl ComponentStore {
    pub fn new(ids: Arc<HandleAllocator>) -> Self {
        Self {
            ids,
            records: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn insert(&mut self, record: ConnectedComponent) -> ComponentHandle {
        let handle = self.ids.next_component();
        self.records.insert(handle, record);
        handle
    }

    pub fn insert_all(&mut self, records: Vec<ConnectedComponent>) -> Vec<ComponentHandle> {
        records.into_iter().map(|record| self.insert(record)).collect()
    }

    pub fn get(&self, handle: ComponentHandle) -> Result<&ConnectedComponent, Error> {
        self.records.get(&handle).ok_or_else(|| unknown(handle))
    }

    pub fn get_mut(&mut self, handle: ComponentHandle) -> Result<&mut ConnectedComponent, Error> {
        self.records.get_mut(&handle).ok_or_else(|| unknown(handle))
    }

    pub fn enumerate(&self, filter: ComponentTypeFilter) -> Vec<ComponentHandle> {
        self.records
            .iter()
            .filter(|(_, record)| filter.contains(record.component_type().filter_bit()))
            .map(|(handle, _)| *handle)
            .collect()
    }

    /// Releases the named handles, or everything when `handles` is empty.
    /// Nothing is released unless every named handle belongs to this store.
    pub fn release(&mut self, handles: &[ComponentHandle]) -> Result<usize, Error> {
        if handles.is_empty() {
            let released = self.records.len();
            self.records.clear();
            return Ok(released);
        }
        if let Some(missing) = handles.iter().find(|h| !self.records.contains_key(*h)) {
            return Err(unknown(*missing));
        }
        Ok(handles
            .iter()
            .filter(|h| self.records.remove(*h).is_some())
            .count())
    }
}

fn unknown(handle: ComponentHandle) -> Error {
    Error::new(ErrorKind::InvalidHandle)
        .with_message("unknown connected component")
        .with_handle(handle.to_raw())
}

#[cfg(test)]
mod tests {
    use super::ComponentStore;
    use crate::core::component::{ComponentKind, ConnectedComponent};
    use crate::core::error::ErrorKind;
    use crate::core::flags::{ComponentTypeFilter, InputOrigin, PatchLocation};
    use crate::core::handle::HandleAllocator;
    use crate::core::mesh::IndexArrayMesh;
    use std::sync::Arc;

    fn record(kind: ComponentKind) -> ConnectedComponent {
        let mesh = IndexArrayMesh::from_faces(vec![0.0; 9], vec![0, 1, 2], vec![3]).expect("mesh");
        ConnectedComponent::new(kind, mesh)
    }

    fn input() -> ConnectedComponent {
        record(ComponentKind::Input {
            origin: InputOrigin::SrcMesh,
        })
    }

    fn patch() -> ConnectedComponent {
        record(ComponentKind::Patch {
            location: PatchLocation::Inside,
        })
    }

    #[test]
    fn enumerate_keeps_insertion_order_and_filters() {
        let mut store = ComponentStore::new(Arc::new(HandleAllocator::new()));
        let a = store.insert(input());
        let b = store.insert(patch());
        let c = store.insert(input());
        assert_eq!(store.enumerate(ComponentTypeFilter::ALL), vec![a, b, c]);
        assert_eq!(store.enumerate(ComponentTypeFilter::INPUT), vec![a, c]);
        assert_eq!(
            store.enumerate(ComponentTypeFilter::PATCH | ComponentTypeFilter::INPUT),
            vec![a, b, c]
        );
        assert!(store.enumerate(ComponentTypeFilter::FRAGMENT).is_empty());
    }

    #[test]
    fn release_is_all_or_nothing() {
        let ids = Arc::new(HandleAllocator::new());
        let mut other = ComponentStore::new(Arc::clone(&ids));
        let foreign = other.insert(input());

        let mut store = ComponentStore::new(ids);
        let a = store.insert(input());
        let b = store.insert(patch());

        let err = store.release(&[a, foreign]).expect_err("foreign handle");
        assert_eq!(err.kind(), ErrorKind::InvalidHandle);
        assert_eq!(store.len(), 2);

        assert_eq!(store.release(&[a]).expect("release"), 1);
        let err = store.release(&[a]).expect_err("double release");
        assert_eq!(err.kind(), ErrorKind::InvalidHandle);
        assert!(store.get(b).is_ok());
    }

    #[test]
    fn empty_release_clears_store() {
        let mut store = ComponentStore::new(Arc::new(HandleAllocator::new()));
        store.insert(input());
        store.insert(patch());
        assert_eq!(store.release(&[]).expect("release all"), 2);
        assert!(store.is_empty());
    }
}
