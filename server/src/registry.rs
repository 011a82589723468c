//! Live creatures grouped by species, with a population cap per species.

use crate::creature::{self, Creature};
use shared::Species;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct CreatureRegistry {
    creatures: BTreeMap<Species, Vec<Creature>>,
}

impl CreatureRegistry {
    pub fn new() -> Self {
        Self {
            creatures: Species::ALL
                .iter()
                .map(|&species| (species, Vec::new()))
                .collect(),
        }
    }

    pub fn cap(&self, species: Species) -> usize {
        creature::template(species).population_cap
    }

    pub fn count(&self, species: Species) -> usize {
        self.creatures.get(&species).map_or(0, Vec::len)
    }

    pub fn has_room(&self, species: Species) -> bool {
        self.count(species) < self.cap(species)
    }

    /// Adds a creature unless its species is at the cap, in which case the
    /// creature is handed back.
    pub fn insert(&mut self, creature: Creature) -> Result<(), Creature> {
        if !self.has_room(creature.species) {
            return Err(creature);
        }
        self.creatures
            .entry(creature.species)
            .or_default()
            .push(creature);
        Ok(())
    }

    pub fn get(&self, species: Species, id: u16) -> Option<&Creature> {
        self.creatures.get(&species)?.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, species: Species, id: u16) -> Option<&mut Creature> {
        self.creatures
            .get_mut(&species)?
            .iter_mut()
            .find(|c| c.id == id)
    }

    pub fn remove(&mut self, species: Species, id: u16) -> Option<Creature> {
        let list = self.creatures.get_mut(&species)?;
        let index = list.iter().position(|c| c.id == id)?;
        Some(list.remove(index))
    }

    /// Every live creature, grouped by species in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Creature> {
        self.creatures.values().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Creature> {
        self.creatures.values_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.creatures.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
