//! Background warming of the cache.
use crate::cache::Kind;
use crate::creature;
use crate::session::Priority;
use crate::{Error, Generation, Session};

use futures_util::{StreamExt, future, stream};

/// Fetches up to `batch` uncached creatures of the given generations in the
/// background.
///
/// Failures are dropped. Creatures that fail for good are skipped for the
/// rest of the session. Returns how many creatures were warmed.
pub async fn warm<'a>(
    session: &Session,
    generations: impl IntoIterator<Item = &'a Generation>,
    batch: usize,
) -> usize {
    let cache = session.cache();

    let missing: Vec<_> = generations
        .into_iter()
        .flat_map(|generation| generation.ids())
        .filter(|id| {
            !cache.contains(Kind::Creature, id.number())
                || !cache.contains(Kind::Species, id.number())
        })
        .filter(|id| !session.is_unavailable(*id))
        .take(batch)
        .collect();

    if missing.is_empty() {
        return 0;
    }

    log::debug!("Warming {} creatures", missing.len());

    stream::iter(missing)
        .map(|id| async move {
            match warm_one(session, id).await {
                Ok(()) => true,
                Err(error) => {
                    log::debug!("Prefetch of {id} dropped: {error}");

                    if !error.is_retryable() {
                        session.mark_unavailable(id);
                    }

                    false
                }
            }
        })
        .buffer_unordered(session.config().concurrency.max(1))
        .filter(|warmed| future::ready(*warmed))
        .count()
        .await
}

async fn warm_one(session: &Session, id: creature::Id) -> Result<(), Error> {
    let (_creature, species) = future::try_join(
        session.fetch_creature_with(id, Priority::Background),
        session.fetch_species_with(id, Priority::Background),
    )
    .await?;

    let _chain = session
        .fetch_evolution_with(&species, Priority::Background)
        .await?;

    Ok(())
}
