//! Authoritative game state.
//!
//! [`GameState`] owns the world and every entity and is only ever mutated
//! from the network loop's task. Client intents and elapsed time go in;
//! addressed [`Outbound`] events come out through [`GameState::drain_outbound`].

use crate::avatar::{Avatar, ItemUse, Vital, AVATAR_RADIUS};
use crate::collectable::Collectable;
use crate::combat;
use crate::config::ServerConfig;
use crate::crafting;
use crate::creature::{self, Creature};
use crate::error::IntentError;
use crate::ids::{IdAllocator, IdClass};
use crate::physics::{BodyOwner, Vector2, World};
use crate::registry::CreatureRegistry;
use crate::sync::{ChangeSet, DeltaTracker};
use crate::tick::{Scheduler, Ticks};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    item_to_wire, AvatarPayload, ClientMessage, CreaturePayload, DeltaPayload, InitPayload, Item,
    ServerEvent, Species,
};
use std::collections::BTreeMap;
use std::time::Duration;

/// An event addressed to avatars.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    To(u16, ServerEvent),
    Broadcast {
        event: ServerEvent,
        exclude: Option<u16>,
    },
}

pub struct GameState {
    config: ServerConfig,
    world: World,
    ids: IdAllocator,
    avatars: BTreeMap<u16, Avatar>,
    creatures: CreatureRegistry,
    collectables: Vec<Collectable>,
    tracker: DeltaTracker,
    scheduler: Scheduler,
    rng: StdRng,
    outbound: Vec<Outbound>,
    fallen: Vec<u16>,
}

impl GameState {
    /// Builds the world from the layout in `config` and spawns the starting
    /// creatures. Nothing is queued for clients.
    pub fn new(config: ServerConfig) -> Self {
        let layout = &config.world;
        let mut world = World::new(layout.width, layout.height);

        let collectables = layout
            .collectables
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let radius = spec.kind.template().radius;
                let body = world.create_circle(spec.position, radius, true, BodyOwner::Collectable(index));
                Collectable::new(index, spec.kind, body, world.position(body))
            })
            .collect();

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut state = Self {
            ids: IdAllocator::new(config.avatar_capacity()),
            scheduler: Scheduler::new(config.tick_duration(), config.cycle_interval),
            world,
            avatars: BTreeMap::new(),
            creatures: CreatureRegistry::new(),
            collectables,
            tracker: DeltaTracker::new(),
            rng,
            outbound: Vec::new(),
            fallen: Vec::new(),
            config,
        };

        if state.config.creatures_enabled {
            for species in Species::ALL {
                if !creature::template(species).spawn_at_start {
                    continue;
                }
                while state.creatures.has_room(species) {
                    if state.spawn_creature(species).is_none() {
                        break;
                    }
                }
            }
        }
        // Nobody is connected yet.
        state.outbound.clear();

        info!(
            "World loaded: {}x{}, {} collectables, {} creatures",
            state.world.width(),
            state.world.height(),
            state.collectables.len(),
            state.creatures.len()
        );
        state
    }

    /// Configuration the world was built from
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Current game time.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Spatial world holding every body
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Live avatar by id, None once it has been removed
    pub fn avatar(&self, id: u16) -> Option<&Avatar> {
        self.avatars.get(&id)
    }

    pub fn avatar_mut(&mut self, id: u16) -> Option<&mut Avatar> {
        self.avatars.get_mut(&id)
    }

    /// Ids of every live avatar in ascending order
    pub fn avatar_ids(&self) -> Vec<u16> {
        self.avatars.keys().copied().collect()
    }

    /// Number of live avatars
    pub fn avatar_count(&self) -> usize {
        self.avatars.len()
    }

    /// Position of an avatar's body in the world
    pub fn avatar_position(&self, id: u16) -> Option<Vector2> {
        self.avatars.get(&id).map(|avatar| self.world.position(avatar.body))
    }

    /// Teleports an avatar. Unknown ids are ignored.
    ///
    /// Nearby-sets are not refreshed until the next simulation tick.
    pub fn set_avatar_position(&mut self, id: u16, position: Vector2) {
        if let Some(avatar) = self.avatars.get(&id) {
            self.world.set_position(avatar.body, position);
        }
    }

    /// Every live creature, grouped by species
    pub fn creatures(&self) -> &CreatureRegistry {
        &self.creatures
    }

    /// Position of a creature's body in the world
    pub fn creature_position(&self, species: Species, id: u16) -> Option<Vector2> {
        self.creatures
            .get(species, id)
            .map(|creature| self.world.position(creature.body))
    }

    /// Teleports a creature. Unknown ids are ignored.
    pub fn set_creature_position(&mut self, species: Species, id: u16, position: Vector2) {
        if let Some(creature) = self.creatures.get(species, id) {
            self.world.set_position(creature.body, position);
        }
    }

    /// Collectables in layout order
    pub fn collectables(&self) -> &[Collectable] {
        &self.collectables
    }

    pub fn collectables_mut(&mut self) -> &mut [Collectable] {
        &mut self.collectables
    }

    /// Takes every event queued since the last call.
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbound)
    }

    /// Takes the ids of avatars that died since the last call.
    pub fn take_fallen(&mut self) -> Vec<u16> {
        std::mem::take(&mut self.fallen)
    }

    fn send(&mut self, id: u16, event: ServerEvent) {
        self.outbound.push(Outbound::To(id, event));
    }

    fn send_nearby(&mut self, id: u16, event: ServerEvent) {
        let Some(avatar) = self.avatars.get(&id) else {
            return;
        };
        for &peer in &avatar.nearby_avatars {
            self.outbound.push(Outbound::To(peer, event.clone()));
        }
    }

    fn broadcast(&mut self, event: ServerEvent, exclude: Option<u16>) {
        self.outbound.push(Outbound::Broadcast { event, exclude });
    }

    /// Spawns an avatar at a random spawn point.
    ///
    /// The new avatar receives the full world in an Init event and everyone
    /// else is told it joined. Returns `None` when the id pool is exhausted.
    pub fn spawn_avatar(&mut self, username: &str) -> Option<u16> {
        let id = self.ids.acquire(IdClass::Avatar)?;
        let center = Vector2::new(self.world.width() / 2.0, self.world.height() / 2.0);
        let (spawn_index, position) = pick(&mut self.rng, &self.config.world.spawn_points, center);

        let body = self
            .world
            .create_circle(position, AVATAR_RADIUS, false, BodyOwner::Avatar(id));
        self.avatars
            .insert(id, Avatar::new(id, username, body, spawn_index as u8));
        self.refresh_interest();

        let init = InitPayload {
            spawn_index: spawn_index as u8,
            avatar_id: id,
            avatars: self
                .avatars
                .values()
                .map(|avatar| avatar.intro(self.world.position(avatar.body)))
                .collect(),
            creatures: self.creature_payloads().into_iter().map(|(_, payload)| payload).collect(),
        };
        self.send(id, ServerEvent::Init(init));

        if let Some(avatar) = self.avatars.get(&id) {
            let intro = avatar.intro(self.world.position(body));
            self.broadcast(ServerEvent::PlayerJoin(intro), Some(id));
        }

        info!("Avatar {} spawned at point {} ({:.0}, {:.0})", id, spawn_index, position.x, position.y);
        Some(id)
    }

    /// Removes an avatar whose connection went away.
    pub fn remove_avatar(&mut self, id: u16) -> bool {
        self.despawn_avatar(id, false)
    }

    fn despawn_avatar(&mut self, id: u16, notify_self: bool) -> bool {
        let Some(avatar) = self.avatars.remove(&id) else {
            return false;
        };

        self.world.remove(avatar.body);
        self.ids.release(IdClass::Avatar, id);
        self.tracker.forget_avatar(id);

        for &peer in &avatar.nearby_avatars {
            if self.avatars.contains_key(&peer) {
                self.outbound
                    .push(Outbound::To(peer, ServerEvent::PlayerRemove { avatar_id: id }));
            }
        }
        if notify_self {
            self.send(id, ServerEvent::PlayerRemove { avatar_id: id });
        }

        for other in self.avatars.values_mut() {
            other.nearby_avatars.retain(|&peer| peer != id);
        }
        for creature in self.creatures.iter_mut() {
            if creature.target == Some(id) {
                creature.target = None;
            }
        }

        info!("Avatar {} ({}) removed", id, avatar.username);
        true
    }

    /// Spawns a creature at one of the configured anchors.
    pub fn spawn_creature(&mut self, species: Species) -> Option<u16> {
        let center = Vector2::new(self.world.width() / 2.0, self.world.height() / 2.0);
        let (_, anchor) = pick(&mut self.rng, &self.config.world.creature_anchors, center);
        self.spawn_creature_at(species, anchor)
    }

    /// Spawns a creature at `position` and announces it to every client.
    /// Returns `None` when the species is at its cap.
    pub fn spawn_creature_at(&mut self, species: Species, position: Vector2) -> Option<u16> {
        if !self.creatures.has_room(species) {
            return None;
        }
        let id = self.ids.acquire(IdClass::Creature(species))?;
        let template = creature::template(species);
        let body = self
            .world
            .create_circle(position, template.radius, false, BodyOwner::Creature(species, id));

        let creature = Creature::new(species, id, body);
        let payload = creature.payload(self.world.position(body), None);
        if let Err(rejected) = self.creatures.insert(creature) {
            self.world.remove(rejected.body);
            self.ids.release(IdClass::Creature(species), id);
            return None;
        }

        info!("{:?} {} spawned at ({:.0}, {:.0})", species, id, position.x, position.y);
        self.broadcast(ServerEvent::CreatureSpawn(payload), None);
        Some(id)
    }

    fn remove_creature(&mut self, species: Species, id: u16) {
        let Some(creature) = self.creatures.remove(species, id) else {
            return;
        };

        self.world.remove(creature.body);
        self.ids.release(IdClass::Creature(species), id);
        self.tracker.forget_creature(species, id);
        for avatar in self.avatars.values_mut() {
            avatar.nearby_creatures.retain(|&key| key != (species, id));
        }

        self.broadcast(
            ServerEvent::CreatureRemove {
                species: species.as_u8(),
                id,
            },
            None,
        );
    }

    /// Applies a client intent, logging rejected ones.
    pub fn handle_intent(&mut self, id: u16, message: ClientMessage) {
        if let Err(err) = self.apply_intent(id, message) {
            debug!("Ignored intent from avatar {}: {}", id, err);
        }
    }

    /// Applies a client intent. Intents for unknown avatars are no-ops.
    pub fn apply_intent(&mut self, id: u16, message: ClientMessage) -> Result<(), IntentError> {
        let now = self.scheduler.now();

        match message {
            ClientMessage::Move { direction } => {
                if let Some(avatar) = self.avatars.get_mut(&id) {
                    avatar.set_direction(direction);
                }
            }
            ClientMessage::Rotate { angle } => {
                if let Some(avatar) = self.avatars.get_mut(&id) {
                    avatar.set_angle(angle);
                }
            }
            ClientMessage::AttackStart => {
                let Some(avatar) = self.avatars.get_mut(&id) else {
                    return Ok(());
                };
                avatar.attacking = true;
                self.attack(id)?;
            }
            ClientMessage::AttackStop => {
                if let Some(avatar) = self.avatars.get_mut(&id) {
                    avatar.attacking = false;
                }
            }
            ClientMessage::Craft { item } => {
                let item = Item::from_u8(item).ok_or(IntentError::UnknownItem(item))?;
                let Some(avatar) = self.avatars.get_mut(&id) else {
                    return Ok(());
                };
                crafting::craft(&mut avatar.inventory, item)?;
                debug!("Avatar {} crafted {:?}", id, item);
                self.flush_inventory(id);
            }
            ClientMessage::UseItem { slot } => {
                let Some(avatar) = self.avatars.get_mut(&id) else {
                    return Ok(());
                };
                let used = avatar.use_item(slot)?;
                self.announce_use(id, used);
                self.flush_inventory(id);
            }
            ClientMessage::Chat { text } => {
                let Some(avatar) = self.avatars.get_mut(&id) else {
                    return Ok(());
                };
                let text = avatar.prepare_chat(&text, now)?;
                self.send_nearby(id, ServerEvent::Chat { avatar_id: id, text });
            }
            ClientMessage::Join { username } => {
                let Some(avatar) = self.avatars.get_mut(&id) else {
                    return Ok(());
                };
                avatar.set_username(&username);
                let intro = avatar.intro(self.world.position(avatar.body));
                info!("Avatar {} joined as {}", id, intro.name);
                self.broadcast(ServerEvent::PlayerJoin(intro), Some(id));
            }
            ClientMessage::Connect { .. } | ClientMessage::Disconnect => {}
        }

        Ok(())
    }

    /// Performs one attack if the avatar's cooldown allows it.
    fn attack(&mut self, id: u16) -> Result<(), IntentError> {
        let now = self.scheduler.now();
        let Some(avatar) = self.avatars.get_mut(&id) else {
            return Ok(());
        };
        avatar.try_begin_attack(now)?;

        let report = combat::resolve_attack(
            id,
            &self.world,
            &mut self.avatars,
            &mut self.creatures,
            &mut self.collectables,
        );

        self.send(id, ServerEvent::Attack);
        self.send_nearby(id, ServerEvent::AttackOther { avatar_id: id });

        let killed: Vec<(Species, u16)> = report.killed().collect();
        for (species, creature_id) in killed {
            info!("Avatar {} killed {:?} {}", id, species, creature_id);
            self.remove_creature(species, creature_id);
        }

        self.flush_inventory(id);
        self.reap_dead();
        Ok(())
    }

    fn announce_use(&mut self, id: u16, used: ItemUse) {
        match used {
            ItemUse::Ate(item) => {
                self.send_nearby(
                    id,
                    ServerEvent::UseItemOther {
                        avatar_id: id,
                        item: item.as_u8(),
                    },
                );
            }
            ItemUse::Helmet(helmet) => {
                let item = item_to_wire(helmet);
                self.send(id, ServerEvent::HelmetUpdate { item });
                self.send_nearby(id, ServerEvent::HelmetUpdateOther { avatar_id: id, item });
            }
            ItemUse::Weapon(weapon) => {
                let item = item_to_wire(weapon);
                self.send(id, ServerEvent::WeaponUpdate { item });
                self.send_nearby(id, ServerEvent::WeaponUpdateOther { avatar_id: id, item });
            }
        }
    }

    /// Emits the single inventory diff for the last operation and unequips
    /// anything that left the inventory.
    fn flush_inventory(&mut self, id: u16) {
        let Some(avatar) = self.avatars.get_mut(&id) else {
            return;
        };
        let changes = avatar.inventory.take_changes();
        let (helmet_changed, weapon_changed) = avatar.sync_equipment();
        let (helmet, weapon) = (avatar.helmet, avatar.weapon);

        if !changes.is_empty() {
            self.send(id, ServerEvent::InventoryUpdate(changes));
        }
        if helmet_changed {
            self.announce_use(id, ItemUse::Helmet(helmet));
        }
        if weapon_changed {
            self.announce_use(id, ItemUse::Weapon(weapon));
        }
    }

    /// Advances game time by `elapsed` and runs every timer that came due.
    pub fn advance(&mut self, elapsed: Duration) -> Ticks {
        let ticks = self.scheduler.poll(elapsed);

        let held: Vec<u16> = self
            .avatars
            .values()
            .filter(|avatar| avatar.attacking)
            .map(|avatar| avatar.id)
            .collect();
        for id in held {
            // Cooldown rejections are expected while the button is held.
            let _ = self.attack(id);
        }

        if ticks.simulation {
            let dt = self.scheduler.tick_interval().as_secs_f32();
            self.simulate(dt);
        }
        if ticks.cycle {
            self.cycle();
        }
        if self.config.creatures_enabled {
            for &species in &ticks.respawns {
                if self.creatures.has_room(species) {
                    self.spawn_creature(species);
                }
            }
        }

        ticks
    }

    fn simulate(&mut self, dt: f32) {
        let now = self.scheduler.now();

        for avatar in self.avatars.values() {
            self.world.set_velocity(avatar.body, avatar.velocity());
        }

        let positions = self.avatar_positions();
        for creature in self.creatures.iter_mut() {
            let position = self.world.position(creature.body);
            let target = creature.select_target(position, positions.iter().copied());
            let target_position = target.and_then(|target| find_position(&positions, target));
            let velocity = creature.steer(position, target_position, now, &mut self.rng);
            self.world.set_velocity(creature.body, velocity);
        }

        self.world.step(dt);
        self.refresh_interest();
        self.creature_attacks(now);
        self.reap_dead();
        self.broadcast_deltas();

        if self.scheduler.simulation_ticks() % 150 == 0 {
            debug!(
                "Tick {}: {} avatars, {} creatures",
                self.scheduler.simulation_ticks(),
                self.avatars.len(),
                self.creatures.len()
            );
        }
    }

    fn avatar_positions(&self) -> Vec<(u16, Vector2)> {
        self.avatars
            .values()
            .map(|avatar| (avatar.id, self.world.position(avatar.body)))
            .collect()
    }

    /// Recomputes every avatar's nearby-set by straight-line distance.
    fn refresh_interest(&mut self) {
        let radius = self.config.interest_radius;
        let avatars = self.avatar_positions();
        let creatures: Vec<((Species, u16), Vector2)> = self
            .creatures
            .iter()
            .map(|creature| ((creature.species, creature.id), self.world.position(creature.body)))
            .collect();

        for avatar in self.avatars.values_mut() {
            let position = self.world.position(avatar.body);
            avatar.nearby_avatars = avatars
                .iter()
                .filter(|(id, other)| *id != avatar.id && position.distance(other) < radius)
                .map(|(id, _)| *id)
                .collect();
            avatar.nearby_creatures = creatures
                .iter()
                .filter(|(_, other)| position.distance(other) < radius)
                .map(|(key, _)| *key)
                .collect();
        }
    }

    /// Each creature bites the closest avatar within its attack radius,
    /// subject to its cooldown.
    fn creature_attacks(&mut self, now: Duration) {
        let positions = self.avatar_positions();

        for creature in self.creatures.iter_mut() {
            let template = creature.template();
            let position = self.world.position(creature.body);
            let victim = positions
                .iter()
                .map(|(id, other)| (*id, position.distance(other)))
                .filter(|(_, distance)| *distance <= template.attack_radius)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            let Some((victim, _)) = victim else {
                continue;
            };
            if !creature.try_attack(now) {
                continue;
            }
            if let Some(avatar) = self.avatars.get_mut(&victim) {
                avatar.vitals.drain(Vital::Health, template.damage);
            }
        }
    }

    fn cycle(&mut self) {
        for avatar in self.avatars.values_mut() {
            avatar.vitals.apply_cycle();
        }
        for node in &mut self.collectables {
            node.regenerate();
        }
        self.reap_dead();
    }

    /// Removes every avatar at zero health. The owner is told too, and its
    /// connection stays open so it can join again.
    fn reap_dead(&mut self) {
        let dead: Vec<u16> = self
            .avatars
            .values()
            .filter(|avatar| avatar.is_dead())
            .map(|avatar| avatar.id)
            .collect();

        for id in dead {
            info!("Avatar {} died", id);
            self.despawn_avatar(id, true);
            self.fallen.push(id);
        }
    }

    fn creature_payloads(&self) -> Vec<(Species, CreaturePayload)> {
        self.creatures
            .iter()
            .map(|creature| {
                let target = creature
                    .target
                    .and_then(|target| self.avatar_position(target));
                let payload = creature.payload(self.world.position(creature.body), target);
                (creature.species, payload)
            })
            .collect()
    }

    /// Diffs every entity against its last snapshot and queues one delta per
    /// avatar whose interest set changed.
    fn broadcast_deltas(&mut self) {
        let avatars: Vec<AvatarPayload> = self
            .avatars
            .values()
            .map(|avatar| avatar.payload(self.world.position(avatar.body)))
            .collect();
        let creatures = self.creature_payloads();

        let mut changes = ChangeSet::default();
        for payload in avatars {
            self.tracker.observe_avatar(payload, &mut changes);
        }
        for (species, payload) in creatures {
            self.tracker.observe_creature(species, payload, &mut changes);
        }
        if changes.is_empty() {
            return;
        }

        let packets: Vec<(u16, DeltaPayload)> = self
            .avatars
            .values()
            .filter_map(|avatar| {
                changes
                    .packet_for(avatar.id, &avatar.nearby_avatars, &avatar.nearby_creatures)
                    .map(|delta| (avatar.id, delta))
            })
            .collect();
        for (id, delta) in packets {
            self.send(id, ServerEvent::StateDelta(delta));
        }
    }
}

/// Picks a random entry of `points`, falling back to `fallback` when empty.
fn pick<R: Rng>(rng: &mut R, points: &[Vector2], fallback: Vector2) -> (usize, Vector2) {
    if points.is_empty() {
        return (0, fallback);
    }
    let index = rng.gen_range(0..points.len());
    (index, points[index])
}

fn find_position(positions: &[(u16, Vector2)], id: u16) -> Option<Vector2> {
    positions
        .iter()
        .find(|(candidate, _)| *candidate == id)
        .map(|(_, position)| *position)
}
