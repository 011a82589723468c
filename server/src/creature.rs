//! AI-controlled creatures and their per-species templates.
//!
//! A creature is either idle, wandering along a random heading that changes
//! every few seconds, or pursuing the nearest avatar inside its vision radius.

use crate::physics::{BodyHandle, Vector2};
use rand::Rng;
use shared::{CreaturePayload, Item, Species};
use std::f32::consts::TAU;
use std::time::Duration;

/// Static description of a species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesTemplate {
    pub species: Species,
    pub health: f32,
    pub radius: f32,
    pub vision_radius: f32,
    /// Wandering speed in units per second.
    pub idle_speed: f32,
    /// Pursuit speed in units per second.
    pub action_speed: f32,
    /// Centre-to-centre distance at which the creature stops and bites.
    pub attack_radius: f32,
    pub damage: f32,
    pub attack_cooldown: Duration,
    pub wander_interval: Duration,
    pub drops: &'static [(Item, u32)],
    pub population_cap: usize,
    pub respawn_interval: Duration,
    pub spawn_at_start: bool,
}

pub const WOLF: SpeciesTemplate = SpeciesTemplate {
    species: Species::Wolf,
    health: 300.0,
    radius: 40.0,
    vision_radius: 350.0,
    idle_speed: 40.0,
    action_speed: 120.0,
    attack_radius: 90.0,
    damage: 48.0,
    attack_cooldown: Duration::from_secs(1),
    wander_interval: Duration::from_secs(2),
    drops: &[(Item::WolfFur, 1), (Item::RawMeat, 2)],
    population_cap: 2,
    respawn_interval: Duration::from_secs(5),
    spawn_at_start: true,
};

pub fn template(species: Species) -> &'static SpeciesTemplate {
    match species {
        Species::Wolf => &WOLF,
    }
}

#[derive(Debug, Clone)]
pub struct Creature {
    pub species: Species,
    pub id: u16,
    pub body: BodyHandle,
    health: f32,
    /// Avatar currently pursued, recomputed every simulation tick.
    pub target: Option<u16>,
    heading: Vector2,
    next_wander: Duration,
    last_attack: Option<Duration>,
}

impl Creature {
    pub fn new(species: Species, id: u16, body: BodyHandle) -> Self {
        Self {
            species,
            id,
            body,
            health: template(species).health,
            target: None,
            heading: Vector2::ZERO,
            next_wander: Duration::ZERO,
            last_attack: None,
        }
    }

    pub fn template(&self) -> &'static SpeciesTemplate {
        template(self.species)
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Picks the nearest candidate within vision range.
    ///
    /// Equal distances keep the first candidate seen.
    pub fn select_target<I>(&mut self, position: Vector2, candidates: I) -> Option<u16>
    where
        I: IntoIterator<Item = (u16, Vector2)>,
    {
        let vision = self.template().vision_radius;
        let mut best: Option<(u16, f32)> = None;

        for (id, candidate) in candidates {
            let distance = position.distance(&candidate);
            if distance > vision {
                continue;
            }
            if best.map_or(true, |(_, nearest)| distance < nearest) {
                best = Some((id, distance));
            }
        }

        self.target = best.map(|(id, _)| id);
        self.target
    }

    /// Velocity for this tick.
    ///
    /// Pursues `target` at action speed until within attack radius; without a
    /// target, walks the current wander heading and re-rolls it once the wander
    /// interval has passed.
    pub fn steer<R: Rng>(
        &mut self,
        position: Vector2,
        target: Option<Vector2>,
        now: Duration,
        rng: &mut R,
    ) -> Vector2 {
        let template = self.template();

        if let Some(target) = target {
            let offset = target.sub(&position);
            if offset.magnitude() <= template.attack_radius {
                return Vector2::ZERO;
            }
            return offset.normalize().scale(template.action_speed);
        }

        if now >= self.next_wander {
            self.heading = Vector2::from_angle(rng.gen_range(0.0..TAU));
            self.next_wander = now + template.wander_interval;
        }
        self.heading.scale(template.idle_speed)
    }

    /// Claims the attack cooldown at game time `now`.
    pub fn try_attack(&mut self, now: Duration) -> bool {
        let cooldown = self.template().attack_cooldown;
        if let Some(last) = self.last_attack {
            if now.saturating_sub(last) < cooldown {
                return false;
            }
        }
        self.last_attack = Some(now);
        true
    }

    /// Drains health, floored at zero. Returns true only for the hit that
    /// kills, so drops are granted once.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.is_dead() {
            return false;
        }
        self.health = (self.health - amount.max(0.0)).max(0.0);
        self.is_dead()
    }

    /// Wire state; the target position falls back to the creature's own.
    pub fn payload(&self, position: Vector2, target: Option<Vector2>) -> CreaturePayload {
        let target = target.unwrap_or(position);
        CreaturePayload {
            species: self.species.as_u8(),
            id: self.id,
            x: position.x.floor() as i32,
            y: position.y.floor() as i32,
            target_x: target.x.floor() as i32,
            target_y: target.y.floor() as i32,
            health: self.health.round() as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyOwner, World};
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn wolf() -> Creature {
        let mut world = World::new(1000.0, 1000.0);
        let body = world.create_circle(Vector2::new(100.0, 100.0), WOLF.radius, false, BodyOwner::Creature(Species::Wolf, 0));
        Creature::new(Species::Wolf, 0, body)
    }

    #[test]
    fn test_selects_nearest_in_vision() {
        let mut wolf = wolf();
        let origin = Vector2::new(0.0, 0.0);
        let target = wolf.select_target(
            origin,
            [(1, Vector2::new(400.0, 0.0)), (2, Vector2::new(0.0, 100.0))],
        );
        assert_eq!(target, Some(2));
    }

    #[test]
    fn test_nothing_in_vision() {
        let mut wolf = wolf();
        wolf.target = Some(9);
        let target = wolf.select_target(Vector2::ZERO, [(1, Vector2::new(351.0, 0.0))]);
        assert_eq!(target, None);
        assert_eq!(wolf.target, None);
    }

    #[test]
    fn test_tie_keeps_first_found() {
        let mut wolf = wolf();
        let target = wolf.select_target(
            Vector2::ZERO,
            [(4, Vector2::new(100.0, 0.0)), (3, Vector2::new(0.0, 100.0))],
        );
        assert_eq!(target, Some(4));
    }

    #[test]
    fn test_pursuit_and_stop_in_attack_range() {
        let mut wolf = wolf();
        let mut rng = StdRng::seed_from_u64(1);

        let velocity = wolf.steer(Vector2::ZERO, Some(Vector2::new(300.0, 0.0)), Duration::ZERO, &mut rng);
        assert_approx_eq!(velocity.x, WOLF.action_speed);
        assert_approx_eq!(velocity.y, 0.0);

        let velocity = wolf.steer(Vector2::ZERO, Some(Vector2::new(50.0, 0.0)), Duration::ZERO, &mut rng);
        assert_eq!(velocity, Vector2::ZERO);
    }

    #[test]
    fn test_wander_keeps_heading_until_interval() {
        let mut wolf = wolf();
        let mut rng = StdRng::seed_from_u64(7);

        let first = wolf.steer(Vector2::ZERO, None, Duration::ZERO, &mut rng);
        assert_approx_eq!(first.magnitude(), WOLF.idle_speed, 0.01);

        let same = wolf.steer(Vector2::ZERO, None, Duration::from_secs(1), &mut rng);
        assert_eq!(first, same);

        let next = wolf.steer(Vector2::ZERO, None, Duration::from_secs(2), &mut rng);
        assert_approx_eq!(next.magnitude(), WOLF.idle_speed, 0.01);
    }

    #[test]
    fn test_attack_cooldown() {
        let mut wolf = wolf();
        assert!(wolf.try_attack(Duration::from_secs(3)));
        assert!(!wolf.try_attack(Duration::from_millis(3500)));
        assert!(wolf.try_attack(Duration::from_secs(4)));
    }

    #[test]
    fn test_killing_blow_reported_once() {
        let mut wolf = wolf();
        assert!(!wolf.take_damage(200.0));
        assert!(wolf.take_damage(150.0));
        assert_eq!(wolf.health(), 0.0);
        assert!(!wolf.take_damage(50.0));
    }

    #[test]
    fn test_payload_without_target_points_at_self() {
        let wolf = wolf();
        let payload = wolf.payload(Vector2::new(10.5, 20.5), None);
        assert_eq!((payload.target_x, payload.target_y), (10, 20));
        assert_eq!(payload.health, 300);
        assert_eq!(payload.species, Species::Wolf.as_u8());
    }
}
