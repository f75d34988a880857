//! Filtered random selection.
//!
//! Candidates are drawn uniformly without replacement from the identifiers
//! of the allowed generations and validated against their records. The
//! first candidate that passes every active filter wins.
use crate::creature::{self, Creature, Type};
use crate::criteria::Rejection;
use crate::{Criteria, Error, Generation, Session, Species};

use futures_util::future;
use rand::Rng;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub const MAX_TEAM_SIZE: usize = 6;

/// A candidate that passed validation.
#[derive(Debug, Clone)]
pub struct Entry {
    pub creature: Arc<Creature>,
    pub species: Arc<Species>,
}

impl Entry {
    pub fn id(&self) -> creature::Id {
        self.creature.id
    }
}

/// The identifiers that have not been drawn yet.
#[derive(Debug, Clone)]
pub struct Pool {
    remaining: Vec<creature::Id>,
}

impl Pool {
    /// Creates a pool with every identifier of the given generations.
    pub fn new<'a>(generations: impl IntoIterator<Item = &'a Generation>) -> Self {
        let mut remaining: Vec<_> = generations
            .into_iter()
            .flat_map(|generation| generation.ids())
            .collect();

        remaining.sort_unstable();
        remaining.dedup();

        Self { remaining }
    }

    /// Removes and returns a uniformly random identifier.
    pub fn draw(&mut self, rng: &mut impl Rng) -> Option<creature::Id> {
        if self.remaining.is_empty() {
            return None;
        }

        let i = rng.random_range(0..self.remaining.len());

        Some(self.remaining.swap_remove(i))
    }

    pub fn remove(&mut self, id: creature::Id) -> bool {
        match self.remaining.iter().position(|candidate| *candidate == id) {
            Some(i) => {
                let _ = self.remaining.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    Sampled(creature::Id),
    Rejected(creature::Id, Reason),
    Accepted(creature::Id),
}

#[derive(Debug, Clone)]
pub enum Reason {
    Filtered(Rejection),
    Unavailable(Error),
}

impl From<Rejection> for Reason {
    fn from(rejection: Rejection) -> Self {
        Self::Filtered(rejection)
    }
}

impl From<Error> for Reason {
    fn from(error: Error) -> Self {
        Self::Unavailable(error)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filtered(rejection) => rejection.fmt(f),
            Self::Unavailable(error) => write!(f, "unavailable ({error})"),
        }
    }
}

/// Draws candidates from `pool` until one passes every active filter.
///
/// Candidates whose records cannot be fetched are rejected like any other.
/// Returns `None` once the pool is exhausted.
pub async fn select_one(
    session: &Session,
    criteria: &Criteria,
    excluded: &BTreeSet<Type>,
    pool: &mut Pool,
    rng: &mut impl Rng,
    on_event: &mut impl FnMut(Event),
) -> Option<Entry> {
    while let Some(id) = pool.draw(rng) {
        on_event(Event::Sampled(id));

        match validate(session, criteria, excluded, id).await {
            Ok(entry) => {
                on_event(Event::Accepted(id));

                return Some(entry);
            }
            Err(reason) => {
                log::debug!("Rejected {id}: {reason}");

                on_event(Event::Rejected(id, reason));
            }
        }
    }

    None
}

/// Selects up to a full team, stopping early when no candidate is left.
///
/// Identifiers are never repeated, and with unique types enabled each
/// member's types are excluded for the following ones.
pub async fn select_team(
    session: &Session,
    criteria: &Criteria,
    rng: &mut impl Rng,
) -> Vec<Entry> {
    let mut draft = Draft::new(criteria);

    while draft.len() < MAX_TEAM_SIZE {
        if draft.select(session, rng, &mut |_| {}).await.is_none() {
            break;
        }
    }

    draft.into_entries()
}

/// A team being assembled: the remaining pool, the excluded types and the
/// members so far.
#[derive(Debug, Clone)]
pub struct Draft {
    criteria: Criteria,
    pool: Pool,
    excluded: BTreeSet<Type>,
    entries: Vec<Entry>,
}

impl Draft {
    pub fn new(criteria: &Criteria) -> Self {
        Self {
            criteria: criteria.clone(),
            pool: Pool::new(criteria.generations()),
            excluded: BTreeSet::new(),
            entries: Vec::new(),
        }
    }

    pub fn contains(&self, id: creature::Id) -> bool {
        self.entries.iter().any(|entry| entry.id() == id)
    }

    /// Adds a member chosen outside of the pool.
    pub fn push(&mut self, entry: Entry) {
        let _ = self.pool.remove(entry.id());

        if self.criteria.unique_types {
            self.excluded.extend(entry.creature.types.iter().copied());
        }

        self.entries.push(entry);
    }

    /// Selects the next member at random.
    pub async fn select(
        &mut self,
        session: &Session,
        rng: &mut impl Rng,
        on_event: &mut impl FnMut(Event),
    ) -> Option<Entry> {
        let entry = select_one(
            session,
            &self.criteria,
            &self.excluded,
            &mut self.pool,
            rng,
            on_event,
        )
        .await?;

        self.push(entry.clone());

        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

async fn validate(
    session: &Session,
    criteria: &Criteria,
    excluded: &BTreeSet<Type>,
    id: creature::Id,
) -> Result<Entry, Reason> {
    let (creature, species) =
        future::try_join(session.fetch_creature(id), session.fetch_species(id)).await?;

    criteria.check_legendary(&species)?;
    criteria.check_types(&creature, excluded)?;

    if criteria.fully_evolved {
        let chain = session.fetch_evolution(&species).await?;

        criteria.check_evolution(chain.as_deref(), species.id)?;
    }

    Ok(Entry { creature, species })
}
