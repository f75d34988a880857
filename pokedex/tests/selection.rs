mod common;

use common::{id, offline, seed_first_generation};

use pokedex::cache::Kind;
use pokedex::selector::{self, Event, Pool, Reason};
use pokedex::{Criteria, Error, Generation};

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeSet, HashSet};

fn first_generation() -> Criteria {
    Criteria::new([Generation::new(1).unwrap()]).unwrap()
}

#[tokio::test]
async fn picks_within_the_allowed_generations() {
    let root = tempfile::tempdir().unwrap();
    let session = offline(root.path()).await;
    seed_first_generation(session.cache()).await;

    let criteria = first_generation();

    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut pool = Pool::new(criteria.generations());

        let entry = selector::select_one(
            &session,
            &criteria,
            &BTreeSet::new(),
            &mut pool,
            &mut rng,
            &mut |_| {},
        )
        .await
        .expect("a creature is selected");

        assert!((1..=151).contains(&entry.id().number()));
        assert_eq!(entry.species.id, entry.id());
    }
}

#[tokio::test]
async fn legendary_creatures_are_excluded() {
    let root = tempfile::tempdir().unwrap();
    let session = offline(root.path()).await;
    seed_first_generation(session.cache()).await;

    let criteria = first_generation().exclude_legendary(true);
    let forbidden = [144, 145, 146, 150, 151];

    for seed in 0..30 {
        let mut rng = StdRng::seed_from_u64(seed);
        let team = selector::select_team(&session, &criteria, &mut rng).await;

        assert_eq!(team.len(), 6);

        for entry in team {
            assert!(!forbidden.contains(&entry.id().number()));
            assert!(!entry.species.is_legendary_or_mythical());
        }
    }
}

#[tokio::test]
async fn teams_have_no_duplicates_or_shared_types() {
    let root = tempfile::tempdir().unwrap();
    let session = offline(root.path()).await;
    seed_first_generation(session.cache()).await;

    let criteria = first_generation().unique_types(true);

    for seed in 0..30 {
        let mut rng = StdRng::seed_from_u64(seed);
        let team = selector::select_team(&session, &criteria, &mut rng).await;

        assert_eq!(team.len(), 6);

        let ids: HashSet<_> = team.iter().map(|entry| entry.id()).collect();
        assert_eq!(ids.len(), team.len());

        let types: HashSet<_> = team
            .iter()
            .flat_map(|entry| entry.creature.types.iter().copied())
            .collect();
        assert_eq!(types.len(), team.len());
    }
}

#[tokio::test]
async fn excluded_types_are_never_returned() {
    let root = tempfile::tempdir().unwrap();
    let session = offline(root.path()).await;
    seed_first_generation(session.cache()).await;

    let criteria = first_generation().unique_types(true);
    let excluded: BTreeSet<_> = (1..=10).map(common::type_of).collect();

    let mut rng = StdRng::seed_from_u64(11);
    let mut pool = Pool::new(criteria.generations());

    while let Some(entry) = selector::select_one(
        &session,
        &criteria,
        &excluded,
        &mut pool,
        &mut rng,
        &mut |_| {},
    )
    .await
    {
        assert!(
            entry
                .creature
                .types
                .iter()
                .all(|type_| !excluded.contains(type_))
        );
    }

    assert!(pool.is_empty());
}

#[tokio::test]
async fn only_fully_evolved_creatures_pass() {
    let root = tempfile::tempdir().unwrap();
    let session = offline(root.path()).await;
    seed_first_generation(session.cache()).await;

    let criteria = Criteria::new([Generation::new(1).unwrap()])
        .unwrap()
        .fully_evolved(true);

    let mut rng = StdRng::seed_from_u64(3);
    let mut pool = Pool::new(criteria.generations());
    let mut rejected = Vec::new();
    let mut selected = Vec::new();

    while let Some(entry) = selector::select_one(
        &session,
        &criteria,
        &BTreeSet::new(),
        &mut pool,
        &mut rng,
        &mut |event| {
            if let Event::Rejected(id, Reason::Filtered(_)) = event {
                rejected.push(id.number());
            }
        },
    )
    .await
    {
        selected.push(entry.id().number());
    }

    rejected.sort_unstable();

    assert_eq!(rejected, [1, 2, 4, 5]);
    assert!(selected.contains(&3));
    assert!(selected.contains(&6));
    assert_eq!(selected.len(), 147);
}

#[tokio::test]
async fn offline_without_cache_exhausts_the_pool() {
    let root = tempfile::tempdir().unwrap();
    let session = offline(root.path()).await;

    let error = session.fetch_creature(id(25)).await.unwrap_err();
    assert!(matches!(error, Error::RequestFailed(_)));

    let criteria = first_generation();
    let mut rng = StdRng::seed_from_u64(0);
    let mut pool = Pool::new(criteria.generations());
    let mut unavailable = 0;

    let entry = selector::select_one(
        &session,
        &criteria,
        &BTreeSet::new(),
        &mut pool,
        &mut rng,
        &mut |event| {
            if let Event::Rejected(_, Reason::Unavailable(_)) = event {
                unavailable += 1;
            }
        },
    )
    .await;

    assert!(entry.is_none());
    assert!(pool.is_empty());
    assert_eq!(unavailable, 151);
}

#[tokio::test]
async fn corrupt_records_are_evicted() {
    let root = tempfile::tempdir().unwrap();
    let session = offline(root.path()).await;

    session
        .cache()
        .put(Kind::Creature, 7, bytes::Bytes::from_static(b"not json"))
        .await
        .unwrap();

    assert!(session.fetch_creature(id(7)).await.is_err());
    assert!(!session.cache().contains(Kind::Creature, 7));
    assert!(!root.path().join("pokemon/7.json").exists());
}

#[tokio::test]
async fn cached_records_are_served_offline() {
    let root = tempfile::tempdir().unwrap();
    let session = offline(root.path()).await;
    seed_first_generation(session.cache()).await;

    let species = session.fetch_species(id(2)).await.unwrap();
    let chain = session
        .fetch_evolution(&species)
        .await
        .unwrap()
        .expect("chain is cached");

    assert_eq!(chain.members(), [id(1), id(2), id(3)]);
    assert_eq!(
        species.name.localized(&pokedex::Locale::new("de")),
        Some("Kreatur 2")
    );

    let lonely = session.fetch_species(id(100)).await.unwrap();
    assert_eq!(session.fetch_evolution(&lonely).await.unwrap(), None);
}
