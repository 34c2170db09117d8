use crate::id::ItemKindId;
use serde::{Deserialize, Serialize};

/// A stack of identical items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: ItemKindId,
    pub count: u32,
}

impl ItemStack {
    pub fn new(kind: ItemKindId, count: u32) -> Self {
        Self { kind, count }
    }
}

/// Error from putting an extracted unit back into its slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestoreError {
    #[error("slot {0} does not exist")]
    NoSuchSlot(usize),
    #[error("slot {slot} now holds a different item kind")]
    KindMismatch { slot: usize },
    #[error("slot {slot} is full")]
    SlotFull { slot: usize },
}

/// An ordered list of item slots. Each slot holds at most `stack_limit` items
/// of a single kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
    stack_limit: u32,
}

impl Inventory {
    pub fn new(slot_count: usize, stack_limit: u32) -> Self {
        Self {
            slots: vec![None; slot_count],
            stack_limit,
        }
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    pub fn stack_limit(&self) -> u32 {
        self.stack_limit
    }

    /// Put a stack directly into a slot, replacing its contents. Used to
    /// seed inventories; counts above the stack limit are clamped.
    pub fn set_slot(&mut self, slot: usize, stack: Option<ItemStack>) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = stack
                .filter(|st| st.count > 0)
                .map(|st| ItemStack::new(st.kind, st.count.min(self.stack_limit)));
        }
    }

    /// Remove one item from the first non-empty slot.
    ///
    /// Returns the slot index and a one-unit stack, or `None` if empty.
    #[must_use = "the extracted unit must be inserted somewhere or restored"]
    pub fn take_one(&mut self) -> Option<(usize, ItemStack)> {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if let Some(stack) = slot {
                let kind = stack.kind;
                stack.count -= 1;
                if stack.count == 0 {
                    *slot = None;
                }
                return Some((idx, ItemStack::new(kind, 1)));
            }
        }
        None
    }

    /// Put a previously extracted stack back into the slot it came from.
    pub fn restore(&mut self, slot: usize, stack: ItemStack) -> Result<(), RestoreError> {
        let limit = self.stack_limit;
        let entry = self.slots.get_mut(slot).ok_or(RestoreError::NoSuchSlot(slot))?;
        let Some(existing) = entry.as_mut() else {
            *entry = Some(stack);
            return Ok(());
        };
        if existing.kind != stack.kind {
            return Err(RestoreError::KindMismatch { slot });
        }
        if existing.count + stack.count > limit {
            return Err(RestoreError::SlotFull { slot });
        }
        existing.count += stack.count;
        Ok(())
    }

    /// Whether a stack of this kind can take the full `count` somewhere:
    /// an empty slot, or a same-kind stack with room.
    pub fn can_accept(&self, stack: &ItemStack) -> bool {
        self.slots.iter().any(|slot| match slot {
            None => stack.count <= self.stack_limit,
            Some(existing) => {
                existing.kind == stack.kind && existing.count + stack.count <= self.stack_limit
            }
        })
    }

    /// Insert a stack, merging into same-kind stacks first, then empty slots.
    /// Returns the amount that didn't fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn insert(&mut self, stack: ItemStack) -> u32 {
        let mut remaining = stack.count;
        for existing in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if existing.kind == stack.kind && existing.count < self.stack_limit {
                let room = self.stack_limit - existing.count;
                let moved = room.min(remaining);
                existing.count += moved;
                remaining -= moved;
            }
        }
        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let moved = self.stack_limit.min(remaining);
                *slot = Some(ItemStack::new(stack.kind, moved));
                remaining -= moved;
            }
        }
        remaining
    }

    /// Quantity of a specific item kind across all slots.
    pub fn quantity(&self, kind: ItemKindId) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.kind == kind)
            .map(|s| s.count)
            .sum()
    }

    /// Total items across all slots.
    pub fn total(&self) -> u32 {
        self.slots.iter().flatten().map(|s| s.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cobble() -> ItemKindId {
        ItemKindId(0)
    }
    fn iron() -> ItemKindId {
        ItemKindId(1)
    }

    #[test]
    fn take_one_uses_first_non_empty_slot() {
        let mut inv = Inventory::new(3, 64);
        inv.set_slot(1, Some(ItemStack::new(cobble(), 2)));
        inv.set_slot(2, Some(ItemStack::new(iron(), 5)));

        let (slot, stack) = inv.take_one().unwrap();
        assert_eq!(slot, 1);
        assert_eq!(stack, ItemStack::new(cobble(), 1));
        assert_eq!(inv.quantity(cobble()), 1);
        assert_eq!(inv.total(), 6);
    }

    #[test]
    fn take_one_clears_exhausted_slot() {
        let mut inv = Inventory::new(1, 64);
        inv.set_slot(0, Some(ItemStack::new(cobble(), 1)));
        assert!(inv.take_one().is_some());
        assert!(inv.is_empty());
        assert!(inv.take_one().is_none());
    }

    #[test]
    fn restore_returns_unit_to_origin_slot() {
        let mut inv = Inventory::new(2, 64);
        inv.set_slot(0, Some(ItemStack::new(cobble(), 1)));
        let (slot, stack) = inv.take_one().unwrap();
        assert!(inv.is_empty());
        inv.restore(slot, stack).unwrap();
        assert_eq!(inv.slots()[0], Some(ItemStack::new(cobble(), 1)));
    }

    #[test]
    fn restore_rejects_kind_conflict() {
        let mut inv = Inventory::new(1, 64);
        inv.set_slot(0, Some(ItemStack::new(iron(), 3)));
        let err = inv.restore(0, ItemStack::new(cobble(), 1)).unwrap_err();
        assert_eq!(err, RestoreError::KindMismatch { slot: 0 });
        assert_eq!(inv.restore(9, ItemStack::new(iron(), 1)), Err(RestoreError::NoSuchSlot(9)));
    }

    #[test]
    fn can_accept_checks_stack_limit() {
        let mut inv = Inventory::new(1, 4);
        inv.set_slot(0, Some(ItemStack::new(cobble(), 4)));
        assert!(!inv.can_accept(&ItemStack::new(cobble(), 1)));
        assert!(!inv.can_accept(&ItemStack::new(iron(), 1)));

        inv.set_slot(0, Some(ItemStack::new(cobble(), 3)));
        assert!(inv.can_accept(&ItemStack::new(cobble(), 1)));
    }

    #[test]
    fn insert_merges_then_fills_empty() {
        let mut inv = Inventory::new(3, 10);
        inv.set_slot(1, Some(ItemStack::new(cobble(), 8)));
        let overflow = inv.insert(ItemStack::new(cobble(), 5));
        assert_eq!(overflow, 0);
        assert_eq!(inv.slots()[1], Some(ItemStack::new(cobble(), 10)));
        assert_eq!(inv.slots()[0], Some(ItemStack::new(cobble(), 3)));
    }

    #[test]
    fn insert_reports_overflow() {
        let mut inv = Inventory::new(1, 10);
        let overflow = inv.insert(ItemStack::new(iron(), 15));
        assert_eq!(overflow, 5);
        assert_eq!(inv.total(), 10);
    }

    #[test]
    fn set_slot_clamps_to_stack_limit() {
        let mut inv = Inventory::new(1, 16);
        inv.set_slot(0, Some(ItemStack::new(iron(), 100)));
        assert_eq!(inv.total(), 16);
        inv.set_slot(0, Some(ItemStack::new(iron(), 0)));
        assert!(inv.is_empty());
    }
}
