use crate::creature::{self, Creature, Type};
use crate::evolution::{self, Chain};
use crate::{Generation, Species};

use std::collections::BTreeSet;
use std::fmt;

/// The filters a random team is drawn under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    generations: BTreeSet<Generation>,
    pub unique_types: bool,
    pub fully_evolved: bool,
    pub exclude_legendary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("at least one generation must be selected")]
    NoGenerations,
}

impl Criteria {
    pub fn new(generations: impl IntoIterator<Item = Generation>) -> Result<Self, Error> {
        let generations = BTreeSet::from_iter(generations);

        if generations.is_empty() {
            return Err(Error::NoGenerations);
        }

        Ok(Self {
            generations,
            unique_types: false,
            fully_evolved: false,
            exclude_legendary: false,
        })
    }

    pub fn all() -> Self {
        Self {
            generations: BTreeSet::from(Generation::ALL),
            unique_types: false,
            fully_evolved: false,
            exclude_legendary: false,
        }
    }

    pub fn unique_types(self, unique_types: bool) -> Self {
        Self {
            unique_types,
            ..self
        }
    }

    pub fn fully_evolved(self, fully_evolved: bool) -> Self {
        Self {
            fully_evolved,
            ..self
        }
    }

    pub fn exclude_legendary(self, exclude_legendary: bool) -> Self {
        Self {
            exclude_legendary,
            ..self
        }
    }

    pub fn generations(&self) -> &BTreeSet<Generation> {
        &self.generations
    }

    /// Every identifier allowed by the selected generations.
    pub fn ids(&self) -> impl Iterator<Item = creature::Id> + '_ {
        self.generations.iter().flat_map(|generation| generation.ids())
    }

    pub fn check_legendary(&self, species: &Species) -> Result<(), Rejection> {
        if self.exclude_legendary && species.is_legendary_or_mythical() {
            return Err(Rejection::Legendary);
        }

        Ok(())
    }

    pub fn check_types(
        &self,
        creature: &Creature,
        excluded: &BTreeSet<Type>,
    ) -> Result<(), Rejection> {
        if !self.unique_types {
            return Ok(());
        }

        match creature.types.iter().find(|type_| excluded.contains(type_)) {
            Some(type_) => Err(Rejection::SharedType(*type_)),
            None => Ok(()),
        }
    }

    pub fn check_evolution(
        &self,
        chain: Option<&Chain>,
        species: creature::Id,
    ) -> Result<(), Rejection> {
        if self.fully_evolved && !evolution::is_fully_evolved(chain, species) {
            return Err(Rejection::NotFullyEvolved);
        }

        Ok(())
    }
}

impl Default for Criteria {
    fn default() -> Self {
        Self::all()
    }
}

/// Why a candidate failed the active filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Legendary,
    SharedType(Type),
    NotFullyEvolved,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legendary => f.write_str("legendary or mythical"),
            Self::SharedType(type_) => write!(f, "{type_} type already in team"),
            Self::NotFullyEvolved => f.write_str("not fully evolved"),
        }
    }
}
