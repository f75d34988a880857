use crate::creature;
use crate::evolution;
use crate::locale;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub id: creature::Id,
    #[serde(default)]
    pub name: locale::Map,
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default)]
    pub is_mythical: bool,
    #[serde(default)]
    pub evolution_chain: Option<evolution::Id>,
}

impl Species {
    pub fn is_legendary_or_mythical(&self) -> bool {
        self.is_legendary || self.is_mythical
    }
}
