use crate::catalog::{CanonicalItem, Catalog};
use crate::resolver::tokenize::tokenize;
use serde::Serialize;
use std::collections::BTreeSet;

/// Normalized word stems of a label or catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TokenSet(BTreeSet<String>);

impl TokenSet {
    pub fn from_text(text: &str) -> Self {
        Self(tokenize(text))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    /// Every token of `self` also appears in `other`.
    pub fn is_subset(&self, other: &TokenSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn overlap(&self, other: &TokenSet) -> usize {
        self.0.intersection(&other.0).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for TokenSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", token)?;
        }
        write!(f, "}}")
    }
}

/// Token index over a catalog, in catalog order.
///
/// Built once and then only read, so it can be shared freely between threads.
#[derive(Debug, Clone, Default)]
pub struct VocabularyIndex {
    entries: Vec<(CanonicalItem, TokenSet)>,
}

impl VocabularyIndex {
    /// Tokenize every catalog entry. An empty catalog yields an empty index.
    pub fn build(catalog: &Catalog) -> Self {
        let entries = catalog
            .items()
            .iter()
            .map(|item| {
                let tokens = TokenSet::from_text(item.as_str());
                log::trace!("indexed {:?} as {}", item.as_str(), tokens);
                (item.clone(), tokens)
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, item: &str) -> Option<&TokenSet> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate.as_str() == item)
            .map(|(_, tokens)| tokens)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalItem, &TokenSet)> {
        self.entries.iter().map(|(item, tokens)| (item, tokens))
    }
}
