use crate::creature;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// One of the nine ranges partitioning the national Pokédex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Generation(u8);

const BOUNDS: [(u32, u32); 9] = [
    (1, 151),
    (152, 251),
    (252, 386),
    (387, 493),
    (494, 649),
    (650, 721),
    (722, 809),
    (810, 905),
    (906, 1025),
];

impl Generation {
    pub const ALL: [Self; 9] = [
        Self(1),
        Self(2),
        Self(3),
        Self(4),
        Self(5),
        Self(6),
        Self(7),
        Self(8),
        Self(9),
    ];

    pub fn new(number: u8) -> Option<Self> {
        (1..=9).contains(&number).then_some(Self(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn range(self) -> RangeInclusive<u32> {
        let (start, end) = BOUNDS[usize::from(self.0 - 1)];

        start..=end
    }

    pub fn ids(self) -> impl Iterator<Item = creature::Id> {
        self.range().filter_map(creature::Id::new)
    }

    pub fn of(id: creature::Id) -> Self {
        let number = BOUNDS
            .iter()
            .position(|(_, end)| id.number() <= *end)
            .unwrap_or(BOUNDS.len() - 1);

        Self(number as u8 + 1)
    }
}

impl TryFrom<u8> for Generation {
    type Error = String;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::new(number).ok_or_else(|| format!("invalid generation: {number}"))
    }
}

impl From<Generation> for u8 {
    fn from(generation: Generation) -> Self {
        generation.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gen {}", self.0)
    }
}
