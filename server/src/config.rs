//! Runtime settings and the static world layout.

use crate::collectable::CollectableKind;
use crate::physics::Vector2;
use std::time::Duration;

/// Runtime settings, filled from command-line arguments by the binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Interval of the vitals/regeneration cycle.
    pub cycle_interval: Duration,
    pub max_clients: usize,
    /// Straight-line distance within which entities are part of a nearby-set.
    pub interest_radius: f32,
    /// Seed for the game RNG; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Spawn creatures at startup and on their respawn timers.
    pub creatures_enabled: bool,
    pub world: WorldLayout,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 15,
            cycle_interval: Duration::from_secs(5),
            max_clients: 100,
            interest_radius: 1000.0,
            seed: None,
            creatures_enabled: true,
            world: WorldLayout::default(),
        }
    }
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    /// Upper bound on live avatars, also the size of the avatar id pool.
    pub fn avatar_capacity(&self) -> u16 {
        self.max_clients.min(u16::MAX as usize - 1) as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectableSpec {
    pub kind: CollectableKind,
    pub position: Vector2,
}

/// Map dimensions and the fixed placements loaded at startup.
#[derive(Debug, Clone)]
pub struct WorldLayout {
    pub width: f32,
    pub height: f32,
    /// Avatar spawn points; one is chosen at random per spawn.
    pub spawn_points: Vec<Vector2>,
    /// Creature spawn anchors; one is chosen at random per spawn.
    pub creature_anchors: Vec<Vector2>,
    pub collectables: Vec<CollectableSpec>,
}

impl Default for WorldLayout {
    fn default() -> Self {
        let tree = |x, y| CollectableSpec {
            kind: CollectableKind::Tree,
            position: Vector2::new(x, y),
        };
        let rock = |x, y| CollectableSpec {
            kind: CollectableKind::Rock,
            position: Vector2::new(x, y),
        };
        let bush = |x, y| CollectableSpec {
            kind: CollectableKind::Bush,
            position: Vector2::new(x, y),
        };

        Self {
            width: 3000.0,
            height: 3000.0,
            spawn_points: vec![
                Vector2::new(1500.0, 1500.0),
                Vector2::new(900.0, 1100.0),
                Vector2::new(2100.0, 1900.0),
            ],
            creature_anchors: vec![Vector2::new(400.0, 400.0), Vector2::new(2600.0, 2600.0)],
            collectables: vec![
                rock(1850.0, 1050.0),
                tree(2000.0, 1250.0),
                tree(2150.0, 1150.0),
                tree(1200.0, 1700.0),
                tree(700.0, 900.0),
                rock(600.0, 1400.0),
                rock(2400.0, 2300.0),
                bush(1650.0, 1800.0),
                bush(1100.0, 1300.0),
                tree(2500.0, 700.0),
            ],
        }
    }
}

impl WorldLayout {
    /// An empty map with a single spawn point, for deterministic scenarios.
    pub fn single_spawn(width: f32, height: f32, spawn: Vector2) -> Self {
        Self {
            width,
            height,
            spawn_points: vec![spawn],
            creature_anchors: vec![spawn],
            collectables: Vec::new(),
        }
    }
}
