//! Wire slot arena
//!
//! Every bound or targeted expression owns exactly one slot in the outgoing
//! wire message. Slots are identified by a stable integer id assigned at
//! allocation time and reused on re-bind, so a column never occupies two
//! slots no matter how many times it is logically bound.

use crate::catalog::ColumnId;
use crate::types::Value;

/// Stable identifier of one wire-message slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

/// One slot of the outgoing wire message: the column it addresses (if any)
/// and the evaluated value that will be sent.
#[derive(Clone, Debug)]
pub struct WireSlot {
    pub column: Option<ColumnId>,
    pub value: Value,
}

/// Arena-indexed slot table. Slot ids are indices into the arena and stay
/// valid for the lifetime of the statement.
#[derive(Debug, Default)]
pub struct SlotArena {
    slots: Vec<WireSlot>,
}

impl SlotArena {
    pub fn new() -> Self {
        SlotArena::default()
    }

    pub fn alloc(&mut self, column: Option<ColumnId>) -> SlotId {
        let id = SlotId(self.slots.len());
        self.slots.push(WireSlot {
            column,
            value: Value::Null,
        });
        id
    }

    pub fn set_value(&mut self, id: SlotId, value: Value) {
        self.slots[id.0].value = value;
    }

    pub fn slot(&self, id: SlotId) -> &WireSlot {
        &self.slots[id.0]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_assigns_sequential_ids() {
        let mut arena = SlotArena::new();
        let a = arena.alloc(Some(1));
        let b = arena.alloc(None);
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.slot(a).column, Some(1));
        assert_eq!(arena.slot(b).column, None);
    }

    #[test]
    fn test_set_value_overwrites_in_place() {
        let mut arena = SlotArena::new();
        let id = arena.alloc(Some(3));
        arena.set_value(id, Value::I32(7));
        arena.set_value(id, Value::I32(9));
        assert_eq!(arena.slot(id).value, Value::I32(9));
        assert_eq!(arena.len(), 1);
    }
}
