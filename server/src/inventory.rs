//! Fixed-slot stack inventory.
//!
//! Each item type occupies at most one slot. Emptied slots are compacted so
//! occupied slots always form a prefix. Changes are reported as a diff against
//! the snapshot taken when the previous diff was emitted.

use shared::{item_to_wire, Item, SlotPayload, INVENTORY_SLOTS};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slot {
    item: Option<Item>,
    amount: u32,
}

impl Slot {
    pub fn item(&self) -> Option<Item> {
        self.item
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn is_empty(&self) -> bool {
        self.item.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    slots: [Slot; INVENTORY_SLOTS],
    snapshot: [Slot; INVENTORY_SLOTS],
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self {
            slots: [Slot::default(); INVENTORY_SLOTS],
            snapshot: [Slot::default(); INVENTORY_SLOTS],
        }
    }

    pub fn slots(&self) -> &[Slot; INVENTORY_SLOTS] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Amount of `item` held, zero if absent.
    pub fn count(&self, item: Item) -> u32 {
        self.find(item).map_or(0, |index| self.slots[index].amount)
    }

    pub fn contains(&self, item: Item) -> bool {
        self.find(item).is_some()
    }

    fn find(&self, item: Item) -> Option<usize> {
        self.slots.iter().position(|slot| slot.item == Some(item))
    }

    /// Merges `amount` of `item` into its slot or the first empty one.
    ///
    /// Returns false, leaving the inventory untouched, when the item is not
    /// already held and every slot is taken.
    pub fn add(&mut self, item: Item, amount: u32) -> bool {
        if amount == 0 {
            return true;
        }

        let index = match self.find(item) {
            Some(index) => index,
            None => match self.slots.iter().position(Slot::is_empty) {
                Some(index) => index,
                None => return false,
            },
        };

        let slot = &mut self.slots[index];
        slot.item = Some(item);
        slot.amount = slot.amount.saturating_add(amount);
        true
    }

    /// Removes up to `amount` of `item` and returns how much was taken.
    ///
    /// A slot that reaches zero is cleared and later slots shift left by one.
    pub fn remove(&mut self, item: Item, amount: u32) -> u32 {
        let Some(index) = self.find(item) else {
            return 0;
        };

        let slot = &mut self.slots[index];
        let taken = amount.min(slot.amount);
        slot.amount -= taken;

        if slot.amount == 0 {
            self.slots[index..].rotate_left(1);
            self.slots[INVENTORY_SLOTS - 1] = Slot::default();
        }

        taken
    }

    pub fn has_changes(&self) -> bool {
        self.slots != self.snapshot
    }

    /// Returns every slot that differs from the last snapshot and takes a new one.
    pub fn take_changes(&mut self) -> Vec<SlotPayload> {
        let changes = self
            .slots
            .iter()
            .zip(self.snapshot.iter())
            .enumerate()
            .filter(|(_, (current, previous))| current != previous)
            .map(|(index, (current, _))| SlotPayload {
                index: index as u8,
                item: item_to_wire(current.item),
                amount: current.amount,
            })
            .collect();

        self.snapshot = self.slots;
        changes
    }
}
