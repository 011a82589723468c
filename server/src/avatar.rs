//! The per-connection player avatar: vitals, equipment, inventory and the
//! movement/attack state driven by client intents.

use crate::error::IntentError;
use crate::inventory::Inventory;
use crate::items::{self, ItemCategory};
use crate::physics::{BodyHandle, Vector2};
use shared::{
    decode_direction, item_to_wire, AvatarIntro, AvatarPayload, Item, Species, MAX_CHAT_LEN,
    MAX_USERNAME_LEN,
};
use std::f32::consts::TAU;
use std::time::Duration;

/// Movement speed in world units per second before equipment modifiers.
pub const AVATAR_SPEED: f32 = 240.0;
pub const AVATAR_RADIUS: f32 = 30.0;
/// Minimum time between two accepted attacks.
pub const ATTACK_DELAY: Duration = Duration::from_millis(500);
/// Minimum time between two relayed chat messages.
pub const CHAT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vital {
    Health,
    Temperature,
    Hunger,
}

impl Vital {
    pub fn max(self) -> f32 {
        match self {
            Vital::Health => 200.0,
            Vital::Temperature => 100.0,
            Vital::Hunger => 100.0,
        }
    }
}

/// Three bounded stats, each kept within `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    health: f32,
    temperature: f32,
    hunger: f32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            health: Vital::Health.max(),
            temperature: Vital::Temperature.max(),
            hunger: Vital::Hunger.max(),
        }
    }
}

impl Vitals {
    pub fn get(&self, vital: Vital) -> f32 {
        match vital {
            Vital::Health => self.health,
            Vital::Temperature => self.temperature,
            Vital::Hunger => self.hunger,
        }
    }

    fn slot(&mut self, vital: Vital) -> &mut f32 {
        match vital {
            Vital::Health => &mut self.health,
            Vital::Temperature => &mut self.temperature,
            Vital::Hunger => &mut self.hunger,
        }
    }

    pub fn set(&mut self, vital: Vital, value: f32) {
        *self.slot(vital) = value.clamp(0.0, vital.max());
    }

    /// Lowers a vital, never below zero. Negative amounts are ignored.
    pub fn drain(&mut self, vital: Vital, amount: f32) {
        let value = self.get(vital) - amount.max(0.0);
        self.set(vital, value);
    }

    /// Raises a vital, never above its max. Negative amounts are ignored.
    pub fn fill(&mut self, vital: Vital, amount: f32) {
        let value = self.get(vital) + amount.max(0.0);
        self.set(vital, value);
    }

    /// Applies one cycle of hunger/temperature decay and its health effect.
    ///
    /// Hunger and temperature both decay. Health regenerates while both stay
    /// at or above 70; otherwise an empty temperature and an empty stomach
    /// each cost health, and both penalties apply in the same cycle.
    pub fn apply_cycle(&mut self) {
        self.drain(Vital::Hunger, 1.5);
        self.drain(Vital::Temperature, 2.0);

        if self.temperature >= 70.0 && self.hunger >= 70.0 {
            self.fill(Vital::Health, 10.0);
        } else {
            if self.temperature == 0.0 {
                self.drain(Vital::Health, 10.0);
            }
            if self.hunger == 0.0 {
                self.drain(Vital::Health, 20.0);
            }
        }
    }
}

/// What a successful use-item intent did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemUse {
    Ate(Item),
    Helmet(Option<Item>),
    Weapon(Option<Item>),
}

#[derive(Debug, Clone)]
pub struct Avatar {
    pub id: u16,
    pub username: String,
    pub body: BodyHandle,
    pub spawn_index: u8,
    /// Input direction, each axis in `-1..=1`.
    pub direction: (i8, i8),
    /// Facing angle in radians; zero faces up the screen.
    pub angle: f32,
    pub vitals: Vitals,
    pub helmet: Option<Item>,
    pub weapon: Option<Item>,
    pub inventory: Inventory,
    /// Attack button held; attacks repeat whenever the cooldown allows.
    pub attacking: bool,
    last_attack: Option<Duration>,
    last_chat: Option<Duration>,
    pub nearby_avatars: Vec<u16>,
    pub nearby_creatures: Vec<(Species, u16)>,
}

impl Avatar {
    pub fn new(id: u16, username: &str, body: BodyHandle, spawn_index: u8) -> Self {
        Self {
            id,
            username: truncate(username, MAX_USERNAME_LEN),
            body,
            spawn_index,
            direction: (0, 0),
            angle: 0.0,
            vitals: Vitals::default(),
            helmet: None,
            weapon: None,
            inventory: Inventory::new(),
            attacking: false,
            last_attack: None,
            last_chat: None,
            nearby_avatars: Vec::new(),
            nearby_creatures: Vec::new(),
        }
    }

    pub fn set_username(&mut self, username: &str) {
        self.username = truncate(username, MAX_USERNAME_LEN);
    }

    pub fn set_direction(&mut self, packed: u8) {
        self.direction = decode_direction(packed);
    }

    /// Non-finite angles are ignored.
    pub fn set_angle(&mut self, angle: f32) {
        if angle.is_finite() {
            self.angle = angle;
        }
    }

    pub fn speed(&self) -> f32 {
        AVATAR_SPEED * items::tool_stats(self.weapon).speed_multiplier
    }

    /// Velocity implied by the input direction; diagonals are normalized.
    pub fn velocity(&self) -> Vector2 {
        let (x, y) = self.direction;
        Vector2::new(x as f32, y as f32)
            .normalize()
            .scale(self.speed())
    }

    /// Direction the avatar is facing as a unit vector.
    pub fn facing(&self) -> Vector2 {
        Vector2::from_angle(self.angle - std::f32::consts::FRAC_PI_2)
    }

    pub fn is_dead(&self) -> bool {
        self.vitals.get(Vital::Health) <= 0.0
    }

    /// Claims the attack cooldown at game time `now`.
    pub fn try_begin_attack(&mut self, now: Duration) -> Result<(), IntentError> {
        if let Some(last) = self.last_attack {
            if now.saturating_sub(last) < ATTACK_DELAY {
                return Err(IntentError::OnCooldown);
            }
        }
        self.last_attack = Some(now);
        Ok(())
    }

    /// Truncates chat text and applies the per-avatar rate limit.
    pub fn prepare_chat(&mut self, text: &str, now: Duration) -> Result<String, IntentError> {
        if let Some(last) = self.last_chat {
            if now.saturating_sub(last) < CHAT_DELAY {
                return Err(IntentError::RateLimited);
            }
        }
        self.last_chat = Some(now);
        Ok(truncate(text, MAX_CHAT_LEN))
    }

    /// Uses the item in inventory slot `index`.
    ///
    /// Food is eaten; helmets, pickaxes and weapons toggle the matching
    /// equipment slot.
    pub fn use_item(&mut self, index: u8) -> Result<ItemUse, IntentError> {
        let item = self
            .inventory
            .slot(index as usize)
            .and_then(|slot| slot.item())
            .ok_or(IntentError::EmptySlot(index))?;

        match items::category(item) {
            ItemCategory::Food => {
                let restore = items::food_restore(item).ok_or(IntentError::NotUsable(item))?;
                self.inventory.remove(item, 1);
                self.vitals.fill(Vital::Hunger, restore);
                Ok(ItemUse::Ate(item))
            }
            ItemCategory::Helmet => {
                self.helmet = toggle(self.helmet, item);
                Ok(ItemUse::Helmet(self.helmet))
            }
            ItemCategory::Pickaxe | ItemCategory::Weapon => {
                self.weapon = toggle(self.weapon, item);
                Ok(ItemUse::Weapon(self.weapon))
            }
            ItemCategory::Resource => Err(IntentError::NotUsable(item)),
        }
    }

    /// Unequips anything no longer held in the inventory.
    pub fn sync_equipment(&mut self) -> (bool, bool) {
        let mut helmet_changed = false;
        let mut weapon_changed = false;
        if let Some(helmet) = self.helmet {
            if !self.inventory.contains(helmet) {
                self.helmet = None;
                helmet_changed = true;
            }
        }
        if let Some(weapon) = self.weapon {
            if !self.inventory.contains(weapon) {
                self.weapon = None;
                weapon_changed = true;
            }
        }
        (helmet_changed, weapon_changed)
    }

    /// Quantized state for the wire, given the avatar's body position.
    pub fn payload(&self, position: Vector2) -> AvatarPayload {
        AvatarPayload {
            id: self.id,
            x: position.x.floor() as i32,
            y: position.y.floor() as i32,
            angle: (self.angle.rem_euclid(TAU) * 100.0).round() as i16,
            helmet: item_to_wire(self.helmet),
            weapon: item_to_wire(self.weapon),
            health: self.vitals.get(Vital::Health).round() as u16,
            temperature: self.vitals.get(Vital::Temperature).round() as u16,
            hunger: self.vitals.get(Vital::Hunger).round() as u16,
        }
    }

    pub fn intro(&self, position: Vector2) -> AvatarIntro {
        AvatarIntro::new(&self.username, &self.payload(position))
    }
}

fn toggle(current: Option<Item>, item: Item) -> Option<Item> {
    if current == Some(item) {
        None
    } else {
        Some(item)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyOwner, World};
    use assert_approx_eq::assert_approx_eq;
    use std::f32::consts::FRAC_PI_2;

    fn avatar() -> Avatar {
        let mut world = World::new(1000.0, 1000.0);
        let body = world.create_circle(Vector2::new(500.0, 500.0), AVATAR_RADIUS, false, BodyOwner::Avatar(1));
        Avatar::new(1, "tester", body, 0)
    }

    fn assert_in_bounds(vitals: &Vitals) {
        for vital in [Vital::Health, Vital::Temperature, Vital::Hunger] {
            let value = vitals.get(vital);
            assert!((0.0..=vital.max()).contains(&value), "{:?} = {}", vital, value);
        }
    }

    #[test]
    fn test_vitals_start_full() {
        let vitals = Vitals::default();
        assert_eq!(vitals.get(Vital::Health), 200.0);
        assert_eq!(vitals.get(Vital::Temperature), 100.0);
        assert_eq!(vitals.get(Vital::Hunger), 100.0);
    }

    #[test]
    fn test_drain_and_fill_stay_in_bounds() {
        let mut vitals = Vitals::default();
        let amounts = [30.0, 250.0, 0.5, 1000.0, -20.0, 75.0];
        for vital in [Vital::Health, Vital::Temperature, Vital::Hunger] {
            for amount in amounts {
                vitals.drain(vital, amount);
                assert_in_bounds(&vitals);
                vitals.fill(vital, amount);
                assert_in_bounds(&vitals);
            }
        }
        vitals.drain(Vital::Health, 500.0);
        assert_eq!(vitals.get(Vital::Health), 0.0);
        vitals.fill(Vital::Health, 500.0);
        assert_eq!(vitals.get(Vital::Health), 200.0);
    }

    #[test]
    fn test_cycle_regenerates_when_warm_and_fed() {
        let mut vitals = Vitals::default();
        vitals.set(Vital::Health, 100.0);
        vitals.apply_cycle();
        assert_approx_eq!(vitals.get(Vital::Hunger), 98.5);
        assert_approx_eq!(vitals.get(Vital::Temperature), 98.0);
        assert_approx_eq!(vitals.get(Vital::Health), 110.0);
    }

    #[test]
    fn test_cycle_no_regeneration_below_threshold() {
        let mut vitals = Vitals::default();
        vitals.set(Vital::Health, 100.0);
        vitals.set(Vital::Hunger, 50.0);
        vitals.apply_cycle();
        assert_approx_eq!(vitals.get(Vital::Health), 100.0);
    }

    #[test]
    fn test_cycle_cold_and_starving_penalties_stack() {
        let mut vitals = Vitals::default();
        vitals.set(Vital::Temperature, 1.0);
        vitals.set(Vital::Hunger, 1.0);
        vitals.apply_cycle();
        assert_eq!(vitals.get(Vital::Temperature), 0.0);
        assert_eq!(vitals.get(Vital::Hunger), 0.0);
        assert_approx_eq!(vitals.get(Vital::Health), 170.0);
    }

    #[test]
    fn test_cycle_starving_only() {
        let mut vitals = Vitals::default();
        vitals.set(Vital::Hunger, 0.0);
        vitals.apply_cycle();
        assert_approx_eq!(vitals.get(Vital::Health), 180.0);
    }

    #[test]
    fn test_cycle_health_floors_at_zero() {
        let mut vitals = Vitals::default();
        vitals.set(Vital::Health, 15.0);
        vitals.set(Vital::Temperature, 0.0);
        vitals.set(Vital::Hunger, 0.0);
        vitals.apply_cycle();
        assert_eq!(vitals.get(Vital::Health), 0.0);
    }

    #[test]
    fn test_diagonal_velocity_is_normalized() {
        let mut avatar = avatar();
        avatar.set_direction(shared::encode_direction(1, 1));
        assert_approx_eq!(avatar.velocity().magnitude(), AVATAR_SPEED, 0.01);

        avatar.set_direction(shared::encode_direction(-1, 0));
        assert_approx_eq!(avatar.velocity().x, -AVATAR_SPEED);

        avatar.set_direction(0);
        assert_eq!(avatar.velocity(), Vector2::ZERO);
    }

    #[test]
    fn test_weapon_slows_movement() {
        let mut avatar = avatar();
        avatar.weapon = Some(Item::StoneSword);
        assert!(avatar.speed() < AVATAR_SPEED);
    }

    #[test]
    fn test_attack_cooldown() {
        let mut avatar = avatar();
        assert!(avatar.try_begin_attack(Duration::from_millis(1000)).is_ok());
        assert_eq!(
            avatar.try_begin_attack(Duration::from_millis(1200)),
            Err(IntentError::OnCooldown)
        );
        assert!(avatar.try_begin_attack(Duration::from_millis(1500)).is_ok());
    }

    #[test]
    fn test_chat_truncated_and_rate_limited() {
        let mut avatar = avatar();
        let long = "x".repeat(200);
        let text = avatar.prepare_chat(&long, Duration::ZERO).unwrap();
        assert_eq!(text.chars().count(), MAX_CHAT_LEN);
        assert_eq!(
            avatar.prepare_chat("hi", Duration::from_millis(300)),
            Err(IntentError::RateLimited)
        );
        assert!(avatar.prepare_chat("hi", Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_use_food() {
        let mut avatar = avatar();
        avatar.vitals.set(Vital::Hunger, 50.0);
        avatar.inventory.add(Item::Apple, 2);

        assert_eq!(avatar.use_item(0), Ok(ItemUse::Ate(Item::Apple)));
        assert_eq!(avatar.vitals.get(Vital::Hunger), 60.0);
        assert_eq!(avatar.inventory.count(Item::Apple), 1);
    }

    #[test]
    fn test_use_toggles_equipment() {
        let mut avatar = avatar();
        avatar.inventory.add(Item::WoodHelmet, 1);
        avatar.inventory.add(Item::WoodPickaxe, 1);

        assert_eq!(avatar.use_item(0), Ok(ItemUse::Helmet(Some(Item::WoodHelmet))));
        assert_eq!(avatar.use_item(1), Ok(ItemUse::Weapon(Some(Item::WoodPickaxe))));
        assert_eq!(avatar.use_item(0), Ok(ItemUse::Helmet(None)));
        assert_eq!(avatar.helmet, None);
        assert_eq!(avatar.weapon, Some(Item::WoodPickaxe));
    }

    #[test]
    fn test_use_invalid_slots() {
        let mut avatar = avatar();
        avatar.inventory.add(Item::Wood, 5);
        assert_eq!(avatar.use_item(0), Err(IntentError::NotUsable(Item::Wood)));
        assert_eq!(avatar.use_item(3), Err(IntentError::EmptySlot(3)));
        assert_eq!(avatar.use_item(200), Err(IntentError::EmptySlot(200)));
    }

    #[test]
    fn test_sync_equipment_drops_missing_items() {
        let mut avatar = avatar();
        avatar.inventory.add(Item::WoodSword, 1);
        avatar.use_item(0).unwrap();
        avatar.inventory.remove(Item::WoodSword, 1);

        assert_eq!(avatar.sync_equipment(), (false, true));
        assert_eq!(avatar.weapon, None);
    }

    #[test]
    fn test_payload_quantization() {
        let mut avatar = avatar();
        avatar.set_angle(1.5708);
        avatar.set_angle(f32::NAN);
        avatar.vitals.set(Vital::Hunger, 98.5);
        let payload = avatar.payload(Vector2::new(10.9, -3.2));
        assert_eq!(payload.x, 10);
        assert_eq!(payload.y, -4);
        assert_eq!(payload.angle, 157);
        assert_eq!(payload.hunger, 99);
        assert_eq!(payload.health, 200);
    }

    #[test]
    fn test_large_angles_wrap_on_the_wire() {
        let mut avatar = avatar();
        avatar.set_angle(1000.0 * TAU + 1.5708);
        let wrapped = avatar.payload(Vector2::ZERO).angle;
        assert!((156..=158).contains(&wrapped), "angle = {}", wrapped);

        avatar.set_angle(-FRAC_PI_2);
        assert_eq!(avatar.payload(Vector2::ZERO).angle, 471);

        avatar.set_angle(5.0e6);
        let angle = avatar.payload(Vector2::ZERO).angle;
        assert!((0..=629).contains(&angle), "angle = {}", angle);
    }

    #[test]
    fn test_username_truncated() {
        let mut avatar = avatar();
        avatar.set_username("a-very-long-player-name-indeed");
        assert_eq!(avatar.username.chars().count(), MAX_USERNAME_LEN);
    }
}
