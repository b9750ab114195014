//! Ledger categories and operator-curated manual rules.

use serde::{Deserialize, Serialize};

/// Category names as known by the ledger, mapped to the ledger's identifiers.
///
/// Names keep the ledger's canonical casing; insertion order is preserved so
/// the list handed to the classifier is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    entries: Vec<(String, String)>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the identifier for `name` (exact, case-sensitive).
    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<String>) {
        let name = name.into();
        let id = id.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = id,
            None => self.entries.push((name, id)),
        }
    }

    /// Identifier for an exact category name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.as_str())
    }

    /// Canonical name and identifier for a case-insensitive name lookup.
    pub fn find_ignore_case(&self, name: &str) -> Option<(&str, &str)> {
        let wanted = name.to_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| n.to_lowercase() == wanted)
            .map(|(n, id)| (n.as_str(), id.as_str()))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, I: Into<String>> FromIterator<(N, I)> for CategoryMap {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        let mut map = CategoryMap::new();
        for (name, id) in iter {
            map.insert(name, id);
        }
        map
    }
}

/// One manual override: descriptions containing `transaction_contains`
/// are assigned `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualRule {
    pub transaction_contains: String,
    pub category: String,
}

impl ManualRule {
    pub fn new(transaction_contains: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            transaction_contains: transaction_contains.into(),
            category: category.into(),
        }
    }

    /// Case-insensitive substring test. Empty patterns never match.
    pub fn matches(&self, description: &str) -> bool {
        !self.transaction_contains.is_empty()
            && description
                .to_lowercase()
                .contains(&self.transaction_contains.to_lowercase())
    }
}

/// Ordered manual rule table; the first matching rule wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualRules {
    #[serde(default)]
    pub categories: Vec<ManualRule>,
}

impl ManualRules {
    pub fn new(categories: Vec<ManualRule>) -> Self {
        Self { categories }
    }

    /// Parse the `{"categories": [...]}` configuration document.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// First rule whose pattern occurs in `description`.
    pub fn find(&self, description: &str) -> Option<&ManualRule> {
        self.categories.iter().find(|rule| rule.matches(description))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
