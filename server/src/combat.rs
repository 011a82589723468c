//! Attack resolution against everything inside the attacker's hit region.

use crate::avatar::{Avatar, Vital};
use crate::collectable::Collectable;
use crate::items;
use crate::physics::{BodyOwner, Vector2, World};
use crate::registry::CreatureRegistry;
use shared::{Item, Species};
use std::collections::BTreeMap;

/// Circle in front of the attacker that an attack lands in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRegion {
    pub center: Vector2,
    pub radius: f32,
}

/// Places the hit region `reach` units along the facing angle of an attacker
/// at `position`, sized by the equipped tool.
pub fn hit_region(position: Vector2, angle: f32, weapon: Option<Item>) -> HitRegion {
    let stats = items::tool_stats(weapon);
    let facing = Vector2::from_angle(angle - std::f32::consts::FRAC_PI_2);
    HitRegion {
        center: position.add(&facing.scale(stats.reach)),
        radius: stats.radius,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hit {
    Collected { collectable: usize, item: Item, amount: u32 },
    Avatar { id: u16, damage: f32 },
    Creature { species: Species, id: u16, damage: f32, killed: bool },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttackReport {
    pub hits: Vec<Hit>,
}

impl AttackReport {
    /// Creatures brought to zero health by this attack.
    pub fn killed(&self) -> impl Iterator<Item = (Species, u16)> + '_ {
        self.hits.iter().filter_map(|hit| match *hit {
            Hit::Creature { species, id, killed: true, .. } => Some((species, id)),
            _ => None,
        })
    }
}

/// Resolves one accepted attack by `attacker_id`.
///
/// Collectables in range are harvested at the attacker's collect rank, other
/// avatars lose weapon damage minus helmet resistance, and creatures lose the
/// weapon's creature damage. Harvested items and the drops of any creature
/// killed are credited to the attacker's inventory.
pub fn resolve_attack(
    attacker_id: u16,
    world: &World,
    avatars: &mut BTreeMap<u16, Avatar>,
    creatures: &mut CreatureRegistry,
    collectables: &mut [Collectable],
) -> AttackReport {
    let mut report = AttackReport::default();
    let Some(attacker) = avatars.get(&attacker_id) else {
        return report;
    };

    let stats = items::tool_stats(attacker.weapon);
    let own_body = attacker.body;
    let region = hit_region(world.position(own_body), attacker.angle, attacker.weapon);
    let mut credit: Vec<(Item, u32)> = Vec::new();

    for (handle, owner) in world.query_circle(region.center, region.radius) {
        if handle == own_body {
            continue;
        }

        match owner {
            BodyOwner::Collectable(index) => {
                let Some(node) = collectables.get_mut(index) else {
                    continue;
                };
                if let Some((item, amount)) = node.collect(stats.collect_rank) {
                    credit.push((item, amount));
                    report.hits.push(Hit::Collected {
                        collectable: index,
                        item,
                        amount,
                    });
                }
            }
            BodyOwner::Avatar(id) => {
                let Some(defender) = avatars.get_mut(&id) else {
                    continue;
                };
                let damage = (stats.avatar_damage - items::helmet_resistance(defender.helmet)).max(0.0);
                defender.vitals.drain(Vital::Health, damage);
                report.hits.push(Hit::Avatar { id, damage });
            }
            BodyOwner::Creature(species, id) => {
                let Some(creature) = creatures.get_mut(species, id) else {
                    continue;
                };
                let killed = creature.take_damage(stats.creature_damage);
                if killed {
                    credit.extend_from_slice(creature.template().drops);
                }
                report.hits.push(Hit::Creature {
                    species,
                    id,
                    damage: stats.creature_damage,
                    killed,
                });
            }
        }
    }

    if let Some(attacker) = avatars.get_mut(&attacker_id) {
        for (item, amount) in credit {
            attacker.inventory.add(item, amount);
        }
    }

    report
}
