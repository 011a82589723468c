//! Static item tables: categories, tool/weapon stats, helmet resistance and
//! food values.

use shared::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCategory {
    Resource,
    Food,
    Helmet,
    Pickaxe,
    Weapon,
}

/// Tier gating which collectables a tool can harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CollectRank {
    R1 = 1,
    R2 = 2,
    R3 = 3,
}

impl CollectRank {
    pub fn value(self) -> u32 {
        self as u32
    }
}

pub fn category(item: Item) -> ItemCategory {
    match item {
        Item::Wood | Item::Stone | Item::WolfFur => ItemCategory::Resource,
        Item::Apple | Item::RawMeat => ItemCategory::Food,
        Item::WoodHelmet | Item::StoneHelmet => ItemCategory::Helmet,
        Item::WoodPickaxe | Item::StonePickaxe => ItemCategory::Pickaxe,
        Item::WoodSword | Item::StoneSword => ItemCategory::Weapon,
    }
}

/// How the item held in the weapon/tool slot behaves in an attack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolStats {
    /// Health drained from another avatar before helmet resistance.
    pub avatar_damage: f32,
    /// Health drained from a creature.
    pub creature_damage: f32,
    pub collect_rank: CollectRank,
    /// Distance from the attacker's centre to the centre of the hit region.
    pub reach: f32,
    /// Radius of the hit region.
    pub radius: f32,
    /// Multiplier applied to the avatar's movement speed while equipped.
    pub speed_multiplier: f32,
}

pub const BARE_HANDS: ToolStats = ToolStats {
    avatar_damage: 5.0,
    creature_damage: 5.0,
    collect_rank: CollectRank::R1,
    reach: 40.0,
    radius: 40.0,
    speed_multiplier: 1.0,
};

pub fn tool_stats(item: Option<Item>) -> ToolStats {
    match item {
        Some(Item::WoodPickaxe) => ToolStats {
            avatar_damage: 5.0,
            creature_damage: 8.0,
            collect_rank: CollectRank::R2,
            reach: 45.0,
            ..BARE_HANDS
        },
        Some(Item::StonePickaxe) => ToolStats {
            avatar_damage: 7.0,
            creature_damage: 10.0,
            collect_rank: CollectRank::R3,
            reach: 45.0,
            ..BARE_HANDS
        },
        Some(Item::WoodSword) => ToolStats {
            avatar_damage: 10.0,
            creature_damage: 20.0,
            reach: 55.0,
            radius: 45.0,
            speed_multiplier: 0.9,
            ..BARE_HANDS
        },
        Some(Item::StoneSword) => ToolStats {
            avatar_damage: 20.0,
            creature_damage: 35.0,
            reach: 60.0,
            radius: 45.0,
            speed_multiplier: 0.85,
            ..BARE_HANDS
        },
        _ => BARE_HANDS,
    }
}

pub fn helmet_resistance(helmet: Option<Item>) -> f32 {
    match helmet {
        Some(Item::WoodHelmet) => 5.0,
        Some(Item::StoneHelmet) => 10.0,
        _ => 0.0,
    }
}

/// Hunger restored by eating one unit, if the item is food.
pub fn food_restore(item: Item) -> Option<f32> {
    match item {
        Item::Apple => Some(10.0),
        Item::RawMeat => Some(2.0),
        _ => None,
    }
}
