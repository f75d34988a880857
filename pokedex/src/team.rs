//! Team generation.
use crate::creature::{self, Type};
use crate::criteria::Rejection;
use crate::selector::{self, Draft, Entry, MAX_TEAM_SIZE};
use crate::{Criteria, Error, Locale, Session};

use futures_util::future;
use rand::Rng;

pub const SHINY_PROBABILITY: f64 = 0.10;

/// Rolls whether a filled slot shows its shiny variant.
pub fn roll_shiny(rng: &mut impl Rng) -> bool {
    rng.random_bool(SHINY_PROBABILITY)
}

/// A team to generate.
#[derive(Debug, Clone)]
pub struct Request {
    pub criteria: Criteria,
    pub manual: Vec<creature::Id>,
    size: usize,
}

impl Request {
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            manual: Vec::new(),
            size: MAX_TEAM_SIZE,
        }
    }

    pub fn manual(self, manual: impl IntoIterator<Item = creature::Id>) -> Self {
        Self {
            manual: manual.into_iter().collect(),
            ..self
        }
    }

    /// Sets the team size, clamped to `1..=6`.
    pub fn with_size(self, size: usize) -> Self {
        Self {
            size: size.clamp(1, MAX_TEAM_SIZE),
            ..self
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub entry: Entry,
    pub shiny: bool,
    pub manual: bool,
}

impl Slot {
    pub fn id(&self) -> creature::Id {
        self.entry.id()
    }

    /// The localized name, marked with a sparkle when shiny.
    pub fn name(&self, locale: &Locale) -> String {
        let name = self
            .entry
            .species
            .name
            .localized(locale)
            .unwrap_or_else(|| self.entry.creature.name(locale));

        if self.shiny {
            format!("{name} ✨")
        } else {
            name.to_owned()
        }
    }

    pub fn types(&self) -> &[Type] {
        &self.entry.creature.types
    }

    pub fn types_label(&self) -> String {
        self.types()
            .iter()
            .map(|type_| type_.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }

    pub fn height(&self) -> String {
        format!("{:.1} m", self.entry.creature.height)
    }

    pub fn weight(&self) -> String {
        format!("{:.1} kg", self.entry.creature.weight)
    }
}

/// Something worth telling the user that did not stop generation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Warning {
    #[error("{id} was picked manually despite being {rejection}")]
    Override { id: creature::Id, rejection: Rejection },
    #[error("{id} could not be loaded: {error}")]
    Unavailable { id: creature::Id, error: Error },
    #[error("evolution status of {id} could not be checked: {error}")]
    Unchecked { id: creature::Id, error: Error },
    #[error("{count} random candidates could not be loaded: {error}")]
    Skipped { count: usize, error: Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no matching creature found")]
pub struct Exhausted {
    pub filled: usize,
    pub requested: usize,
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub slots: Vec<Slot>,
    pub warnings: Vec<Warning>,
    pub exhausted: Option<Exhausted>,
}

#[derive(Debug, Clone)]
pub enum Event {
    Sampled(creature::Id),
    Rejected(creature::Id, selector::Reason),
    Filled { index: usize, slot: Slot },
    Warning(Warning),
    Finished(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Sampling,
    Validating,
    Done,
    Exhausted,
}

impl Phase {
    pub fn advance(self, event: &Event) -> Self {
        match event {
            Event::Sampled(_) => Self::Validating,
            Event::Rejected(..) | Event::Filled { .. } => Self::Sampling,
            Event::Warning(_) => self,
            Event::Finished(outcome) => {
                if outcome.exhausted.is_some() {
                    Self::Exhausted
                } else {
                    Self::Done
                }
            }
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, Self::Sampling | Self::Validating)
    }
}

/// Identifies a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u64);

/// Hands out tokens and remembers the latest one.
#[derive(Debug, Default)]
pub struct Tracker {
    current: u64,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> Token {
        self.current += 1;

        Token(self.current)
    }

    pub fn is_current(&self, token: Token) -> bool {
        token.0 == self.current
    }
}

/// Generates a team, reporting progress to `on_event`.
///
/// Manual picks fill the first slots. They are kept even when they break
/// the legendary or evolution filters, with a warning. The remaining slots
/// are drawn at random; candidates that could not be loaded are reported in
/// a single warning.
pub async fn generate(
    session: &Session,
    request: &Request,
    rng: &mut impl Rng,
    mut on_event: impl FnMut(Event),
) -> Outcome {
    let mut draft = Draft::new(&request.criteria);
    let mut slots = Vec::with_capacity(request.size);
    let mut warnings = Vec::new();

    for &id in &request.manual {
        if slots.len() >= request.size {
            break;
        }

        if draft.contains(id) {
            continue;
        }

        match pick(session, &request.criteria, id).await {
            Ok((entry, problems)) => {
                for warning in problems {
                    warn(warning, &mut warnings, &mut on_event);
                }

                draft.push(entry.clone());

                let shiny = roll_shiny(rng);

                fill(
                    Slot {
                        entry,
                        shiny,
                        manual: true,
                    },
                    &mut slots,
                    &mut on_event,
                );
            }
            Err(error) => {
                warn(
                    Warning::Unavailable { id, error },
                    &mut warnings,
                    &mut on_event,
                );
            }
        }
    }

    let mut exhausted = None;
    let mut skipped = 0;
    let mut last_error = None;

    while slots.len() < request.size {
        let selected = {
            let mut forward = |event: selector::Event| match event {
                selector::Event::Sampled(id) => on_event(Event::Sampled(id)),
                selector::Event::Rejected(id, reason) => {
                    if let selector::Reason::Unavailable(error) = &reason {
                        skipped += 1;
                        last_error = Some(error.clone());
                    }

                    on_event(Event::Rejected(id, reason));
                }
                selector::Event::Accepted(_) => {}
            };

            draft.select(session, rng, &mut forward).await
        };

        let Some(entry) = selected else {
            log::info!(
                "No matching creature left ({} of {} slots filled)",
                slots.len(),
                request.size
            );

            exhausted = Some(Exhausted {
                filled: slots.len(),
                requested: request.size,
            });

            break;
        };

        let shiny = roll_shiny(rng);

        fill(
            Slot {
                entry,
                shiny,
                manual: false,
            },
            &mut slots,
            &mut on_event,
        );
    }

    if let Some(error) = last_error {
        warn(
            Warning::Skipped {
                count: skipped,
                error,
            },
            &mut warnings,
            &mut on_event,
        );
    }

    let outcome = Outcome {
        slots,
        warnings,
        exhausted,
    };

    on_event(Event::Finished(outcome.clone()));

    outcome
}

/// Loads a manual pick and lists the filters it breaks.
///
/// Only the creature and its species are required. A chain that cannot be
/// loaded leaves the pick in place with a warning.
async fn pick(
    session: &Session,
    criteria: &Criteria,
    id: creature::Id,
) -> Result<(Entry, Vec<Warning>), Error> {
    let (creature, species) =
        future::try_join(session.fetch_creature(id), session.fetch_species(id)).await?;

    let mut warnings = Vec::new();

    if let Err(rejection) = criteria.check_legendary(&species) {
        warnings.push(Warning::Override { id, rejection });
    }

    if criteria.fully_evolved {
        match session.fetch_evolution(&species).await {
            Ok(chain) => {
                if let Err(rejection) = criteria.check_evolution(chain.as_deref(), species.id) {
                    warnings.push(Warning::Override { id, rejection });
                }
            }
            Err(error) => {
                warnings.push(Warning::Unchecked { id, error });
            }
        }
    }

    Ok((Entry { creature, species }, warnings))
}

fn fill(slot: Slot, slots: &mut Vec<Slot>, on_event: &mut impl FnMut(Event)) {
    let index = slots.len();

    log::info!("Slot {index}: {} ({})", slot.id(), slot.types_label());

    slots.push(slot.clone());
    on_event(Event::Filled { index, slot });
}

fn warn(warning: Warning, warnings: &mut Vec<Warning>, on_event: &mut impl FnMut(Event)) {
    log::warn!("{warning}");

    warnings.push(warning.clone());
    on_event(Event::Warning(warning));
}
