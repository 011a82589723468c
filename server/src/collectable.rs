//! Static resource nodes with a depletable, regenerating stock.

use crate::items::CollectRank;
use crate::physics::{BodyHandle, Vector2};
use shared::Item;

/// Resource node templates placed by the world layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectableKind {
    Tree,
    Rock,
    Bush,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectableTemplate {
    pub item: Item,
    pub rank: CollectRank,
    pub radius: f32,
    pub storage_amount: u32,
    pub regeneration_amount: u32,
}

impl CollectableKind {
    pub fn template(self) -> CollectableTemplate {
        match self {
            CollectableKind::Tree => CollectableTemplate {
                item: Item::Wood,
                rank: CollectRank::R1,
                radius: 60.0,
                storage_amount: 60,
                regeneration_amount: 4,
            },
            CollectableKind::Rock => CollectableTemplate {
                item: Item::Stone,
                rank: CollectRank::R2,
                radius: 80.0,
                storage_amount: 40,
                regeneration_amount: 2,
            },
            CollectableKind::Bush => CollectableTemplate {
                item: Item::Apple,
                rank: CollectRank::R1,
                radius: 40.0,
                storage_amount: 10,
                regeneration_amount: 1,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Collectable {
    pub id: usize,
    pub item: Item,
    pub rank: CollectRank,
    amount: u32,
    storage_amount: u32,
    regeneration_amount: u32,
    pub body: BodyHandle,
    pub position: Vector2,
}

impl Collectable {
    /// A full node built from `kind`'s template.
    pub fn new(id: usize, kind: CollectableKind, body: BodyHandle, position: Vector2) -> Self {
        let template = kind.template();
        Self {
            id,
            item: template.item,
            rank: template.rank,
            amount: template.storage_amount,
            storage_amount: template.storage_amount,
            regeneration_amount: template.regeneration_amount,
            body,
            position,
        }
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn storage_amount(&self) -> u32 {
        self.storage_amount
    }

    pub fn regeneration_amount(&self) -> u32 {
        self.regeneration_amount
    }

    /// Sets the stock, clamped to `[0, storage_amount]`.
    pub fn set_amount(&mut self, amount: u32) {
        self.amount = amount.min(self.storage_amount);
    }

    pub fn set_regeneration_amount(&mut self, amount: u32) {
        self.regeneration_amount = amount;
    }

    /// Harvests with a tool of `rank`.
    ///
    /// Yields `min(stock, rank - node_rank + 1)` of the node's item, or
    /// nothing when the tool rank is too low or the node is empty.
    pub fn collect(&mut self, rank: CollectRank) -> Option<(Item, u32)> {
        if rank < self.rank || self.amount == 0 {
            return None;
        }

        let collected = self.amount.min(rank.value() - self.rank.value() + 1);
        self.amount -= collected;
        Some((self.item, collected))
    }

    /// Applies one cycle of regeneration, never past `storage_amount`.
    pub fn regenerate(&mut self) {
        self.amount = self
            .amount
            .saturating_add(self.regeneration_amount)
            .min(self.storage_amount);
    }
}
