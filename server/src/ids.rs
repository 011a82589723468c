//! Compact numeric id allocation.
//!
//! Each entity class draws from its own pool so wire payloads can reference
//! entities with small integers. Released ids go back to the front of the pool
//! and are handed out again first.

use crate::creature;
use shared::Species;
use std::collections::{HashMap, VecDeque};

/// Scope of an id. Avatars share one pool, every creature species has its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdClass {
    Avatar,
    Creature(Species),
}

impl IdClass {
    /// Avatar ids start at 1, creature ids at 0.
    fn first_id(self) -> u16 {
        match self {
            IdClass::Avatar => 1,
            IdClass::Creature(_) => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdAllocator {
    pools: HashMap<IdClass, VecDeque<u16>>,
    avatar_capacity: u16,
}

impl IdAllocator {
    /// Creates an allocator issuing at most `avatar_capacity` live avatar ids.
    /// Creature pools hold as many ids as their species' population cap.
    pub fn new(avatar_capacity: u16) -> Self {
        Self {
            pools: HashMap::new(),
            avatar_capacity,
        }
    }

    /// Number of ids in the pool of `class`.
    pub fn capacity(&self, class: IdClass) -> u16 {
        match class {
            IdClass::Avatar => self.avatar_capacity,
            IdClass::Creature(species) => {
                let cap = creature::template(species).population_cap;
                cap.min(u16::MAX as usize) as u16
            }
        }
    }

    fn pool(&mut self, class: IdClass) -> &mut VecDeque<u16> {
        let capacity = self.capacity(class);
        self.pools.entry(class).or_insert_with(|| {
            let first = class.first_id();
            (first..first.saturating_add(capacity)).collect()
        })
    }

    /// Takes the next free id of `class`, or `None` when the pool is exhausted.
    pub fn acquire(&mut self, class: IdClass) -> Option<u16> {
        self.pool(class).pop_front()
    }

    /// Returns an id to its pool. Ids outside the pool range or already free
    /// are ignored.
    pub fn release(&mut self, class: IdClass, id: u16) {
        let first = class.first_id();
        let last = first.saturating_add(self.capacity(class));
        let pool = self.pool(class);
        if id < first || id >= last || pool.contains(&id) {
            return;
        }
        pool.push_front(id);
    }

    pub fn available(&mut self, class: IdClass) -> usize {
        self.pool(class).len()
    }
}
