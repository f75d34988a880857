use crate::creature;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The name of every creature, for manual picks.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    names: Arc<[Name]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    pub id: creature::Id,
    pub name: String,
}

impl Index {
    pub fn new(names: impl Into<Arc<[Name]>>) -> Self {
        Self {
            names: names.into(),
        }
    }

    pub fn names(&self) -> &[Name] {
        &self.names
    }

    pub fn search(&self, query: &str) -> impl Iterator<Item = &Name> {
        let query = query.to_lowercase();

        self.names
            .iter()
            .filter(move |name| name.name.to_lowercase().contains(&query))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("names", &self.names.len())
            .finish()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.name)
    }
}
