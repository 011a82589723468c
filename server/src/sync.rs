//! Delta state synchronization.
//!
//! The tracker keeps the last payload computed for every entity. Each
//! simulation tick the current payloads are compared against those snapshots
//! and only the entities that differ make it into the tick's [`ChangeSet`].
//! Every viewer then receives the changed entities in its own interest set,
//! or nothing at all.

use shared::{AvatarPayload, CreaturePayload, DeltaPayload, Species};
use std::collections::{BTreeMap, HashMap};

/// Last computed payload per entity. Shared by all viewers.
#[derive(Debug, Clone, Default)]
pub struct DeltaTracker {
    avatars: HashMap<u16, AvatarPayload>,
    creatures: HashMap<(Species, u16), CreaturePayload>,
}

/// Entities whose payload changed during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    avatars: BTreeMap<u16, AvatarPayload>,
    creatures: BTreeMap<(Species, u16), CreaturePayload>,
}

impl DeltaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an avatar's current payload, noting it in `changes` when it
    /// differs from the snapshot.
    pub fn observe_avatar(&mut self, payload: AvatarPayload, changes: &mut ChangeSet) {
        if self.avatars.get(&payload.id) != Some(&payload) {
            self.avatars.insert(payload.id, payload);
            changes.avatars.insert(payload.id, payload);
        }
    }

    pub fn observe_creature(&mut self, species: Species, payload: CreaturePayload, changes: &mut ChangeSet) {
        let key = (species, payload.id);
        if self.creatures.get(&key) != Some(&payload) {
            self.creatures.insert(key, payload);
            changes.creatures.insert(key, payload);
        }
    }

    /// Drops a removed avatar so a recycled id is reported as new.
    pub fn forget_avatar(&mut self, id: u16) {
        self.avatars.remove(&id);
    }

    pub fn forget_creature(&mut self, species: Species, id: u16) {
        self.creatures.remove(&(species, id));
    }

    pub fn tracked(&self) -> (usize, usize) {
        (self.avatars.len(), self.creatures.len())
    }
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty() && self.creatures.is_empty()
    }

    pub fn avatar(&self, id: u16) -> Option<&AvatarPayload> {
        self.avatars.get(&id)
    }

    pub fn creature(&self, species: Species, id: u16) -> Option<&CreaturePayload> {
        self.creatures.get(&(species, id))
    }

    /// Builds the delta for one viewer: its own payload first, then nearby
    /// avatars and creatures. `None` when nothing in its interest set changed.
    pub fn packet_for(
        &self,
        viewer: u16,
        nearby_avatars: &[u16],
        nearby_creatures: &[(Species, u16)],
    ) -> Option<DeltaPayload> {
        let avatars: Vec<AvatarPayload> = std::iter::once(&viewer)
            .chain(nearby_avatars.iter().filter(|&&id| id != viewer))
            .filter_map(|id| self.avatars.get(id).copied())
            .collect();
        let creatures: Vec<CreaturePayload> = nearby_creatures
            .iter()
            .filter_map(|key| self.creatures.get(key).copied())
            .collect();

        let delta = DeltaPayload { avatars, creatures };
        (!delta.is_empty()).then_some(delta)
    }
}
