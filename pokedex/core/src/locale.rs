use serde::{Deserialize, Serialize};

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub const ENGLISH: &'static str = "en";

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn english() -> Self {
        Self::new(Self::ENGLISH)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::english()
    }
}

/// Names of a record, keyed by locale.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Map<T = String>(BTreeMap<Locale, T>);

impl<T> Map<T> {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, locale: Locale, value: T) -> Option<T> {
        self.0.insert(locale, value)
    }

    pub fn get<Q>(&self, locale: &Q) -> Option<&T>
    where
        Locale: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.0.get(locale)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the name in `locale`, falling back to English and then to
    /// whatever is available.
    pub fn localized(&self, locale: &Locale) -> Option<&str>
    where
        T: AsRef<str>,
    {
        self.get(locale.as_str())
            .or_else(|| self.get(Locale::ENGLISH))
            .or_else(|| self.0.values().next())
            .map(AsRef::as_ref)
    }
}

impl Borrow<str> for Locale {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<T> FromIterator<(Locale, T)> for Map<T> {
    fn from_iter<I: IntoIterator<Item = (Locale, T)>>(iter: I) -> Self {
        Self(BTreeMap::from_iter(iter))
    }
}
