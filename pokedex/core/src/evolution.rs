use crate::creature;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The evolution tree a species belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub id: Id,
    pub root: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub species: creature::Id,
    #[serde(default)]
    pub evolves_to: Vec<Stage>,
}

impl Chain {
    pub fn find(&self, species: creature::Id) -> Option<&Stage> {
        self.root.find(species)
    }

    pub fn members(&self) -> Vec<creature::Id> {
        let mut members = Vec::new();
        self.root.collect(&mut members);
        members
    }
}

impl Stage {
    pub fn leaf(species: creature::Id) -> Self {
        Self {
            species,
            evolves_to: Vec::new(),
        }
    }

    pub fn is_final(&self) -> bool {
        self.evolves_to.is_empty()
    }

    fn find(&self, species: creature::Id) -> Option<&Stage> {
        if self.species == species {
            return Some(self);
        }

        self.evolves_to.iter().find_map(|stage| stage.find(species))
    }

    fn collect(&self, members: &mut Vec<creature::Id>) {
        members.push(self.species);

        for stage in &self.evolves_to {
            stage.collect(members);
        }
    }
}

/// Whether `species` has no further stage in `chain`.
///
/// Species without a chain, or missing from it, count as fully evolved.
pub fn is_fully_evolved(chain: Option<&Chain>, species: creature::Id) -> bool {
    chain
        .and_then(|chain| chain.find(species))
        .is_none_or(Stage::is_final)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub u32);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
