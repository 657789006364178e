use webnn_structures::{ObjectGeneration, ObjectHandle, ObjectId};

struct ObjectSlot<T> {
    generation: ObjectGeneration,
    state: Option<T>,
}

/// Client side object table for one object type.
///
/// The client picks ids for every object it creates. Freed ids are reused at a bumped
/// generation, so a handle kept from before the free no longer resolves. Id `0` is the null
/// object and is never handed out.
///
/// # Example
/// ```
/// use webnn_wire::client::ObjectAllocator;
///
/// let mut allocator = ObjectAllocator::new();
/// let first = allocator.new_object("first");
/// allocator.free(first).unwrap();
/// let second = allocator.new_object("second");
///
/// assert_eq!(first.id, second.id);
/// assert!(second.generation > first.generation);
/// assert!(allocator.get(first).is_none());
/// assert_eq!(allocator.get(second), Some(&"second"));
/// ```
pub struct ObjectAllocator<T> {
    /// Index 0 stays empty so ids and indices line up.
    slots: Vec<ObjectSlot<T>>,
    free_ids: Vec<ObjectId>,
}

impl<T> Default for ObjectAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObjectAllocator<T> {
    pub fn new() -> Self {
        Self {
            slots: vec![ObjectSlot {
                generation: 0,
                state: None,
            }],
            free_ids: Vec::new(),
        }
    }

    /// Stores `state` in a free slot and returns the handle naming it.
    pub fn new_object(&mut self, state: T) -> ObjectHandle {
        if let Some(id) = self.free_ids.pop() {
            let slot = &mut self.slots[id as usize];
            slot.state = Some(state);
            return ObjectHandle::new(id, slot.generation);
        }
        let id = self.slots.len() as ObjectId;
        self.slots.push(ObjectSlot {
            generation: 0,
            state: Some(state),
        });
        ObjectHandle::new(id, 0)
    }

    fn live_slot(&self, handle: ObjectHandle) -> Option<&ObjectSlot<T>> {
        if handle.is_null() {
            return None;
        }
        self.slots
            .get(handle.id as usize)
            .filter(|slot| slot.generation == handle.generation && slot.state.is_some())
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&T> {
        self.live_slot(handle)?.state.as_ref()
    }

    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut T> {
        self.live_slot(handle)?;
        self.slots[handle.id as usize].state.as_mut()
    }

    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.live_slot(handle).is_some()
    }

    /// Current generation of `id`, whether or not the slot is live.
    pub fn get_generation(&self, id: ObjectId) -> Option<ObjectGeneration> {
        if id == 0 {
            return None;
        }
        self.slots.get(id as usize).map(|slot| slot.generation)
    }

    /// Frees the slot named by `handle` and returns its state. Stale handles free nothing.
    pub fn free(&mut self, handle: ObjectHandle) -> Option<T> {
        self.live_slot(handle)?;
        let slot = &mut self.slots[handle.id as usize];
        let state = slot.state.take();
        match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                self.free_ids.push(handle.id);
            }
            // A slot that ran out of generations is retired for good.
            None => {}
        }
        state
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.state.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectHandle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(id, slot)| {
                let generation = slot.generation;
                slot.state
                    .as_mut()
                    .map(|state| (ObjectHandle::new(id as ObjectId, generation), state))
            })
    }

    /// Frees every live slot, returning the handles they had and their states.
    pub fn drain_all(&mut self) -> Vec<(ObjectHandle, T)> {
        let handles: Vec<ObjectHandle> = self.iter_mut().map(|(handle, _)| handle).collect();
        handles
            .into_iter()
            .filter_map(|handle| self.free(handle).map(|state| (handle, state)))
            .collect()
    }
}
