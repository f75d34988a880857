pub mod cache;
pub mod config;
pub mod index;
pub mod prefetch;
pub mod selector;
pub mod session;
pub mod sprite;
pub mod team;

mod error;

pub use pokedex_core::{creature, criteria, evolution, generation, locale, species};
pub use pokedex_core::{Creature, Criteria, Generation, Locale, Species, Type};

pub use cache::Cache;
pub use config::Config;
pub use error::Error;
pub use index::Index;
pub use selector::Entry;
pub use session::Session;
pub use sprite::Sprite;
