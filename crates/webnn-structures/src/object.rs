//! Object identity on the wire.
//!
//! Objects are never named by address. Each side keeps one table per [`ObjectType`] and refers
//! to entries with an [`ObjectHandle`]: a slot id plus the generation of that slot.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::define_wire_enum;

/// Slot index inside a per-type object table. `0` is the null object and is never allocated.
pub type ObjectId = u32;

/// Counter bumped every time a slot is freed, so stale handles stop resolving.
pub type ObjectGeneration = u32;

/// Reference to a remote object: the slot id and the generation it was allocated at.
///
/// # Example
/// ```
/// use webnn_structures::ObjectHandle;
///
/// let handle = ObjectHandle::new(3, 1);
/// assert!(!handle.is_null());
/// assert!(ObjectHandle::NULL.is_null());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ObjectHandle {
    pub id: ObjectId,
    pub generation: ObjectGeneration,
}

impl ObjectHandle {
    pub const NULL: ObjectHandle = ObjectHandle {
        id: 0,
        generation: 0,
    };

    /// Number of bytes a handle occupies on the wire (id + generation).
    pub const NUMBER_BYTES: usize = 8;

    pub const fn new(id: ObjectId, generation: ObjectGeneration) -> Self {
        Self { id, generation }
    }

    pub const fn is_null(&self) -> bool {
        self.id == 0
    }
}

impl Display for ObjectHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}@{}", self.id, self.generation)
    }
}

define_wire_enum! {
    /// Every kind of object that can live in a wire object table.
    pub enum ObjectType {
        Instance = 0,
        Context = 1,
        GraphBuilder = 2,
        Graph = 3,
        Operand = 4,
        OperandArray = 5,
        NamedInputs = 6,
        NamedOperands = 7,
        NamedOutputs = 8,
    }
}

impl ObjectType {
    /// True for objects that are created, directly or transitively, by a context and so are
    /// torn down with it.
    pub const fn is_context_child(self) -> bool {
        !matches!(self, ObjectType::Instance | ObjectType::Context)
    }
}
