//! Decoding of PokéAPI responses into typed records.
//!
//! Only the fields we use are read. Missing optional fields get explicit
//! defaults, and anything that breaks a record invariant is rejected here.
use crate::creature::{self, Creature, Sprites, Type};
use crate::evolution::{self, Chain, Stage};
use crate::index::{self, Index};
use crate::locale::{self, Locale};
use crate::{Error, Species};

use serde::Deserialize;

#[derive(Deserialize)]
struct Resource {
    name: String,
    #[serde(default)]
    url: String,
}

pub fn creature(bytes: &[u8]) -> Result<Creature, Error> {
    #[derive(Deserialize)]
    struct Pokemon {
        id: u32,
        name: String,
        #[serde(default)]
        height: u32,
        #[serde(default)]
        weight: u32,
        types: Vec<Slot>,
        #[serde(default)]
        sprites: PokemonSprites,
    }

    #[derive(Deserialize)]
    struct Slot {
        slot: u8,
        #[serde(rename = "type")]
        type_: Resource,
    }

    #[derive(Default, Deserialize)]
    struct PokemonSprites {
        #[serde(default)]
        front_default: Option<String>,
        #[serde(default)]
        front_shiny: Option<String>,
    }

    let mut pokemon: Pokemon = serde_json::from_slice(bytes)?;
    pokemon.types.sort_by_key(|slot| slot.slot);

    let id = parse_id(pokemon.id)?;

    let types = pokemon
        .types
        .iter()
        .map(|slot| {
            Type::parse(&slot.type_.name).ok_or_else(|| {
                Error::InvalidRecord(format!("{id} has unknown type {}", slot.type_.name))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if !(1..=2).contains(&types.len()) {
        return Err(Error::InvalidRecord(format!(
            "{id} has {} types",
            types.len()
        )));
    }

    Ok(Creature {
        id,
        name: locale::Map::from_iter([(Locale::english(), capitalize(&pokemon.name))]),
        types,
        height: pokemon.height as f32 / 10.0,
        weight: pokemon.weight as f32 / 10.0,
        sprites: Sprites {
            normal: pokemon.sprites.front_default,
            shiny: pokemon.sprites.front_shiny,
        },
    })
}

pub fn species(bytes: &[u8]) -> Result<Species, Error> {
    #[derive(Deserialize)]
    struct PokemonSpecies {
        id: u32,
        #[serde(default)]
        names: Vec<Name>,
        #[serde(default)]
        is_legendary: bool,
        #[serde(default)]
        is_mythical: bool,
        #[serde(default)]
        evolution_chain: Option<ChainReference>,
    }

    #[derive(Deserialize)]
    struct Name {
        name: String,
        language: Resource,
    }

    #[derive(Deserialize)]
    struct ChainReference {
        url: String,
    }

    let species: PokemonSpecies = serde_json::from_slice(bytes)?;

    Ok(Species {
        id: parse_id(species.id)?,
        name: species
            .names
            .into_iter()
            .map(|name| (Locale::new(name.language.name), name.name))
            .collect(),
        is_legendary: species.is_legendary,
        is_mythical: species.is_mythical,
        evolution_chain: species
            .evolution_chain
            .and_then(|chain| resource_id(&chain.url))
            .map(evolution::Id),
    })
}

pub fn evolution(bytes: &[u8]) -> Result<Chain, Error> {
    #[derive(Deserialize)]
    struct EvolutionChain {
        id: u32,
        chain: Link,
    }

    #[derive(Deserialize)]
    struct Link {
        species: Resource,
        #[serde(default)]
        evolves_to: Vec<Link>,
    }

    fn stage(link: Link) -> Result<Stage, Error> {
        let species = resource_id(&link.species.url)
            .and_then(creature::Id::new)
            .ok_or_else(|| {
                Error::InvalidRecord(format!("unknown species in chain: {}", link.species.url))
            })?;

        Ok(Stage {
            species,
            evolves_to: link
                .evolves_to
                .into_iter()
                .map(stage)
                .collect::<Result<_, _>>()?,
        })
    }

    let chain: EvolutionChain = serde_json::from_slice(bytes)?;

    Ok(Chain {
        id: evolution::Id(chain.id),
        root: stage(chain.chain)?,
    })
}

pub fn index(bytes: &[u8]) -> Result<Index, Error> {
    #[derive(Deserialize)]
    struct List {
        results: Vec<Resource>,
    }

    let list: List = serde_json::from_slice(bytes)?;

    Ok(Index::new(
        list.results
            .into_iter()
            .filter_map(|resource| {
                let id = resource_id(&resource.url).and_then(creature::Id::new)?;

                Some(index::Name {
                    id,
                    name: capitalize(&resource.name),
                })
            })
            .collect::<Vec<_>>(),
    ))
}

/// Extracts the trailing numeric id of a resource URL, like
/// `https://pokeapi.co/api/v2/evolution-chain/67/`.
fn resource_id(url: &str) -> Option<u32> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn parse_id(number: u32) -> Result<creature::Id, Error> {
    creature::Id::new(number)
        .ok_or_else(|| Error::InvalidRecord(format!("identifier out of range: {number}")))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creature_converts_units_and_orders_types() {
        let json = br#"{
            "id": 6,
            "name": "charizard",
            "height": 17,
            "weight": 905,
            "types": [
                {"slot": 2, "type": {"name": "flying", "url": "https://pokeapi.co/api/v2/type/3/"}},
                {"slot": 1, "type": {"name": "fire", "url": "https://pokeapi.co/api/v2/type/10/"}}
            ],
            "sprites": {"front_default": "https://sprites/6.png", "front_shiny": null},
            "moves": []
        }"#;

        let creature = creature(json).unwrap();

        assert_eq!(creature.id.number(), 6);
        assert_eq!(creature.name(&Locale::english()), "Charizard");
        assert_eq!(creature.types, vec![Type::Fire, Type::Flying]);
        assert!((creature.height - 1.7).abs() < f32::EPSILON);
        assert!((creature.weight - 90.5).abs() < 0.001);
        assert_eq!(creature.sprites.url(true), Some("https://sprites/6.png"));
    }

    #[test]
    fn creature_without_types_is_invalid() {
        let json = br#"{"id": 1, "name": "bulbasaur", "types": []}"#;

        assert!(matches!(creature(json), Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn creature_out_of_range_is_invalid() {
        let json = br#"{"id": 10034, "name": "charizard-mega-x", "types": [
            {"slot": 1, "type": {"name": "fire"}}
        ]}"#;

        assert!(matches!(creature(json), Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn species_reads_flags_names_and_chain() {
        let json = br#"{
            "id": 150,
            "is_legendary": true,
            "is_mythical": false,
            "names": [
                {"name": "Mewtu", "language": {"name": "de", "url": ""}},
                {"name": "Mewtwo", "language": {"name": "en", "url": ""}}
            ],
            "evolution_chain": {"url": "https://pokeapi.co/api/v2/evolution-chain/77/"}
        }"#;

        let species = species(json).unwrap();

        assert!(species.is_legendary_or_mythical());
        assert_eq!(species.name.localized(&Locale::new("de")), Some("Mewtu"));
        assert_eq!(species.evolution_chain, Some(evolution::Id(77)));
    }

    #[test]
    fn species_defaults_missing_fields() {
        let species = species(br#"{"id": 132}"#).unwrap();

        assert!(!species.is_legendary_or_mythical());
        assert!(species.name.is_empty());
        assert_eq!(species.evolution_chain, None);
    }

    #[test]
    fn evolution_builds_the_stage_tree() {
        let json = br#"{
            "id": 1,
            "chain": {
                "species": {"name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon-species/1/"},
                "evolves_to": [{
                    "species": {"name": "ivysaur", "url": "https://pokeapi.co/api/v2/pokemon-species/2/"},
                    "evolves_to": [{
                        "species": {"name": "venusaur", "url": "https://pokeapi.co/api/v2/pokemon-species/3/"},
                        "evolves_to": []
                    }]
                }]
            }
        }"#;

        let chain = evolution(json).unwrap();
        let id = |n| creature::Id::new(n).unwrap();

        assert_eq!(chain.members(), vec![id(1), id(2), id(3)]);
        assert!(!evolution::is_fully_evolved(Some(&chain), id(2)));
        assert!(evolution::is_fully_evolved(Some(&chain), id(3)));
    }

    #[test]
    fn index_skips_unknown_resources() {
        let json = br#"{"count": 3, "results": [
            {"name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon-species/1/"},
            {"name": "broken", "url": "https://pokeapi.co/api/v2/pokemon-species/"},
            {"name": "pikachu", "url": "https://pokeapi.co/api/v2/pokemon-species/25/"}
        ]}"#;

        let index = index(json).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.names().get(1).map(|name| (name.id.number(), name.name.as_str())),
            Some((25, "Pikachu"))
        );
    }
}
