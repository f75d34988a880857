pub mod creature;
pub mod criteria;
pub mod evolution;
pub mod generation;
pub mod locale;
pub mod species;

pub use creature::{Creature, Type};
pub use criteria::Criteria;
pub use generation::Generation;
pub use locale::Locale;
pub use species::Species;
