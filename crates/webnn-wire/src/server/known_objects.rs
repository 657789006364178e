use std::collections::BTreeMap;
use std::num::NonZeroU64;

use ahash::AHashMap;
use webnn_structures::{ObjectGeneration, ObjectHandle, ObjectId, ObjectType};

/// Opaque handle of a native object, as returned by the [`WebnnProcs`] creation entry points.
///
/// [`WebnnProcs`]: crate::server::WebnnProcs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub NonZeroU64);

impl NativeHandle {
    /// `None` for zero.
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationState {
    Free,
    Allocated,
    /// Freed at the last generation. Never allocated again.
    Retired,
}

/// One server table slot.
#[derive(Debug)]
pub struct ObjectData<T> {
    pub handle: Option<NativeHandle>,
    pub generation: ObjectGeneration,
    pub state: AllocationState,
    /// Context that created the object, for context children.
    pub context_id: Option<ObjectId>,
    pub extra: T,
}

impl<T: Default> ObjectData<T> {
    fn free_slot(generation: ObjectGeneration) -> Self {
        Self {
            handle: None,
            generation,
            state: AllocationState::Free,
            context_id: None,
            extra: T::default(),
        }
    }
}

/// Server side object table for one object type.
///
/// Unlike the client, the server never picks ids. It allocates at whatever `{id, generation}`
/// the client chose, refusing anything that would alias a live object or resurrect an old
/// generation of a freed one.
#[derive(Debug)]
pub struct KnownObjects<T> {
    objects: Vec<ObjectData<T>>,
}

impl<T: Default> Default for KnownObjects<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> KnownObjects<T> {
    pub fn new() -> Self {
        // Slot 0 is the null object and stays free forever.
        Self {
            objects: vec![ObjectData::free_slot(0)],
        }
    }

    /// True if `allocate(handle, ...)` would succeed.
    pub fn can_allocate(&self, handle: ObjectHandle) -> bool {
        if handle.id == 0 {
            return false;
        }
        let id = handle.id as usize;
        match self.objects.get(id) {
            Some(data) => {
                data.state == AllocationState::Free && handle.generation >= data.generation
            }
            None => true,
        }
    }

    /// Allocates the slot `handle.id` at `handle.generation`. Returns `None` for id 0, a slot
    /// that is already allocated, or a generation older than the slot has already seen.
    pub fn allocate(
        &mut self,
        handle: ObjectHandle,
        native: NativeHandle,
        context_id: Option<ObjectId>,
        extra: T,
    ) -> Option<&mut ObjectData<T>> {
        if !self.can_allocate(handle) {
            return None;
        }
        let id = handle.id as usize;
        if id >= self.objects.len() {
            self.objects.resize_with(id + 1, || ObjectData::free_slot(0));
        }
        let data = &mut self.objects[id];
        data.handle = Some(native);
        data.generation = handle.generation;
        data.state = AllocationState::Allocated;
        data.context_id = context_id;
        data.extra = extra;
        Some(data)
    }

    /// The allocated object at `id`, whatever its generation.
    pub fn get(&self, id: ObjectId) -> Option<&ObjectData<T>> {
        if id == 0 {
            return None;
        }
        self.objects
            .get(id as usize)
            .filter(|data| data.state == AllocationState::Allocated)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut ObjectData<T>> {
        if id == 0 {
            return None;
        }
        self.objects
            .get_mut(id as usize)
            .filter(|data| data.state == AllocationState::Allocated)
    }

    /// The allocated object named by `handle`. A generation mismatch resolves to `None`.
    pub fn get_with_handle(&self, handle: ObjectHandle) -> Option<&ObjectData<T>> {
        self.get(handle.id)
            .filter(|data| data.generation == handle.generation)
    }

    pub fn get_generation(&self, id: ObjectId) -> Option<ObjectGeneration> {
        self.get(id).map(|data| data.generation)
    }

    /// Frees `id`. Only a later generation may allocate the slot again, so a slot freed at
    /// `u32::MAX` is retired.
    pub fn free(&mut self, id: ObjectId) -> Option<ObjectData<T>> {
        let data = self.get_mut(id)?;
        let replacement = match data.generation.checked_add(1) {
            Some(next_generation) => ObjectData::free_slot(next_generation),
            None => ObjectData {
                state: AllocationState::Retired,
                ..ObjectData::free_slot(data.generation)
            },
        };
        Some(std::mem::replace(data, replacement))
    }

    /// Native handles of every allocated object.
    pub fn get_all_handles(&self) -> Vec<NativeHandle> {
        self.objects
            .iter()
            .filter(|data| data.state == AllocationState::Allocated)
            .filter_map(|data| data.handle)
            .collect()
    }

    /// Frees every allocated object and returns their native handles.
    pub fn acquire_all_handles(&mut self) -> Vec<NativeHandle> {
        let ids: Vec<ObjectId> = (1..self.objects.len() as ObjectId)
            .filter(|id| self.get(*id).is_some())
            .collect();
        ids.into_iter()
            .filter_map(|id| self.free(id).and_then(|data| data.handle))
            .collect()
    }
}

/// Per context bookkeeping: the objects it created, in creation order.
#[derive(Debug, Default)]
pub struct ContextInfo {
    next_order: u64,
    children: BTreeMap<u64, (ObjectType, ObjectId)>,
    order_of: AHashMap<(ObjectType, ObjectId), u64>,
}

impl ContextInfo {
    /// Records a child. Returns `false` if it was already tracked.
    pub fn track_child(&mut self, object_type: ObjectType, id: ObjectId) -> bool {
        if self.order_of.contains_key(&(object_type, id)) {
            return false;
        }
        let order = self.next_order;
        self.next_order += 1;
        self.children.insert(order, (object_type, id));
        self.order_of.insert((object_type, id), order);
        true
    }

    /// Forgets a child. Returns `false` if it was not tracked.
    pub fn untrack_child(&mut self, object_type: ObjectType, id: ObjectId) -> bool {
        match self.order_of.remove(&(object_type, id)) {
            Some(order) => {
                self.children.remove(&order);
                true
            }
            None => false,
        }
    }

    /// Tracked children, newest first.
    pub fn children_newest_first(&self) -> Vec<(ObjectType, ObjectId)> {
        self.children.values().rev().copied().collect()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(value: u64) -> NativeHandle {
        NativeHandle::new(value).unwrap()
    }

    #[test]
    fn test_id_zero_is_never_allocated() {
        let mut objects: KnownObjects<()> = KnownObjects::new();
        assert!(objects
            .allocate(ObjectHandle::new(0, 0), native(1), None, ())
            .is_none());
        assert!(objects.get(0).is_none());
        assert!(objects.free(0).is_none());
    }

    #[test]
    fn test_allocate_at_client_chosen_handle() {
        let mut objects: KnownObjects<()> = KnownObjects::new();
        let handle = ObjectHandle::new(5, 3);
        objects.allocate(handle, native(42), Some(1), ()).unwrap();
        let data = objects.get_with_handle(handle).unwrap();
        assert_eq!(data.handle, Some(native(42)));
        assert_eq!(data.context_id, Some(1));
        assert!(objects.get_with_handle(ObjectHandle::new(5, 2)).is_none());
        assert!(objects.get(4).is_none());
    }

    #[test]
    fn test_double_allocation_is_refused() {
        let mut objects: KnownObjects<()> = KnownObjects::new();
        let handle = ObjectHandle::new(1, 0);
        objects.allocate(handle, native(1), None, ()).unwrap();
        assert!(objects.allocate(handle, native(2), None, ()).is_none());
        assert_eq!(objects.get(1).unwrap().handle, Some(native(1)));
    }

    #[test]
    fn test_freed_slot_needs_a_newer_generation() {
        let mut objects: KnownObjects<()> = KnownObjects::new();
        objects
            .allocate(ObjectHandle::new(1, 4), native(1), None, ())
            .unwrap();
        objects.free(1).unwrap();
        assert!(!objects.can_allocate(ObjectHandle::new(1, 4)));
        assert!(objects
            .allocate(ObjectHandle::new(1, 3), native(2), None, ())
            .is_none());
        assert!(objects
            .allocate(ObjectHandle::new(1, 5), native(3), None, ())
            .is_some());
    }

    #[test]
    fn test_table_grows_to_the_chosen_id() {
        let mut objects: KnownObjects<()> = KnownObjects::new();
        let far = ObjectHandle::new(70_000, 0);
        assert!(objects.can_allocate(far));
        objects.allocate(far, native(7), None, ()).unwrap();
        assert_eq!(objects.get_with_handle(far).unwrap().handle, Some(native(7)));
        assert!(objects.get(69_999).is_none());
    }

    #[test]
    fn test_slot_freed_at_last_generation_is_retired() {
        let mut objects: KnownObjects<()> = KnownObjects::new();
        let last = ObjectHandle::new(2, u32::MAX);
        objects.allocate(last, native(1), None, ()).unwrap();
        objects.free(2).unwrap();
        assert!(!objects.can_allocate(last));
        assert!(objects.allocate(last, native(2), None, ()).is_none());
        assert!(objects.get_with_handle(last).is_none());
        assert!(objects
            .allocate(ObjectHandle::new(3, u32::MAX), native(3), None, ())
            .is_some());
    }

    #[test]
    fn test_acquire_all_handles_frees_everything() {
        let mut objects: KnownObjects<()> = KnownObjects::new();
        objects
            .allocate(ObjectHandle::new(1, 0), native(10), None, ())
            .unwrap();
        objects
            .allocate(ObjectHandle::new(3, 0), native(30), None, ())
            .unwrap();
        assert_eq!(objects.get_all_handles(), vec![native(10), native(30)]);
        assert_eq!(objects.acquire_all_handles(), vec![native(10), native(30)]);
        assert!(objects.get_all_handles().is_empty());
    }

    #[test]
    fn test_context_children_come_back_newest_first() {
        let mut info = ContextInfo::default();
        assert!(info.track_child(ObjectType::GraphBuilder, 1));
        assert!(info.track_child(ObjectType::Operand, 1));
        assert!(info.track_child(ObjectType::Operand, 2));
        assert!(!info.track_child(ObjectType::Operand, 1));
        assert!(info.untrack_child(ObjectType::Operand, 1));
        assert!(!info.untrack_child(ObjectType::Operand, 1));
        assert_eq!(
            info.children_newest_first(),
            vec![(ObjectType::Operand, 2), (ObjectType::GraphBuilder, 1)]
        );
    }
}
