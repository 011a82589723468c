//! Reasons a client intent was turned into a no-op.
//!
//! None of these reach the client; the game state logs them at debug level
//! and carries on.

use shared::Item;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    #[error("no recipe produces item {0}")]
    UnknownItem(u8),
    #[error("no recipe for {0:?}")]
    RecipeNotFound(Item),
    #[error("missing ingredient {0:?}")]
    MissingIngredient(Item),
    #[error("need {required} of {item:?}, have {available}")]
    InsufficientIngredient {
        item: Item,
        required: u32,
        available: u32,
    },
    #[error("no room for {0:?}")]
    InventoryFull(Item),
    #[error("inventory slot {0} is empty")]
    EmptySlot(u8),
    #[error("{0:?} cannot be used")]
    NotUsable(Item),
    #[error("attack on cooldown")]
    OnCooldown,
    #[error("chat rate limited")]
    RateLimited,
}
