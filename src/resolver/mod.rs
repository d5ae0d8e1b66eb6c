//! Label resolution: map a free-form model label onto at most one pantry item.
//!
//! Resolution runs in three tiers:
//!
//! 1. an exact alias lookup on the trimmed, lowercased label,
//! 2. a subset match, where every label token appears in the item's tokens
//!    (the item with the fewest tokens wins, then catalog order),
//! 3. an overlap fallback picking the first item sharing the most tokens.
//!
//! A label that survives none of these is [`Resolution::Unresolved`], which is
//! an ordinary outcome rather than an error.

pub mod index;
pub mod tokenize;

use crate::catalog::{AliasTable, CanonicalItem, Vocabulary};
use index::{TokenSet, VocabularyIndex};
use serde::Serialize;

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MatchKind {
    Alias,
    Subset,
    Overlap { shared: usize },
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKind::Alias => write!(f, "alias"),
            MatchKind::Subset => write!(f, "subset"),
            MatchKind::Overlap { shared } => write!(f, "overlap ({} shared)", shared),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched { item: CanonicalItem, via: MatchKind },
    Unresolved,
}

impl Resolution {
    pub fn item(&self) -> Option<&CanonicalItem> {
        match self {
            Resolution::Matched { item, .. } => Some(item),
            Resolution::Unresolved => None,
        }
    }

    pub fn into_item(self) -> Option<CanonicalItem> {
        match self {
            Resolution::Matched { item, .. } => Some(item),
            Resolution::Unresolved => None,
        }
    }

    pub fn match_kind(&self) -> Option<MatchKind> {
        match self {
            Resolution::Matched { via, .. } => Some(*via),
            Resolution::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Matched { .. })
    }
}

/// Resolves raw labels against an index and alias table fixed at construction.
#[derive(Debug, Clone)]
pub struct Resolver {
    index: VocabularyIndex,
    aliases: AliasTable,
}

impl Resolver {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        Self {
            index: VocabularyIndex::build(&vocabulary.catalog),
            aliases: vocabulary.aliases.clone(),
        }
    }

    pub fn index(&self) -> &VocabularyIndex {
        &self.index
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn resolve(&self, label: &str) -> Resolution {
        let clean = label.trim().to_lowercase();
        if clean.is_empty() {
            return Resolution::Unresolved;
        }

        if let Some(item) = self.aliases.get(&clean) {
            log::debug!("{:?} -> {:?} via alias", label, item.as_str());
            return Resolution::Matched {
                item: item.clone(),
                via: MatchKind::Alias,
            };
        }

        let tokens = TokenSet::from_text(&clean);
        log::trace!("{:?} tokenized as {}", label, tokens);
        if tokens.is_empty() {
            log::debug!("{:?} has no matchable tokens", label);
            return Resolution::Unresolved;
        }

        let resolution = self
            .subset_match(&tokens)
            .or_else(|| self.overlap_match(&tokens))
            .unwrap_or(Resolution::Unresolved);
        match &resolution {
            Resolution::Matched { item, via } => {
                log::debug!("{:?} -> {:?} via {}", label, item.as_str(), via)
            }
            Resolution::Unresolved => log::debug!("{:?} is not a pantry item", label),
        }
        resolution
    }

    /// Smallest item whose tokens contain all of `tokens`; earliest on ties.
    fn subset_match(&self, tokens: &TokenSet) -> Option<Resolution> {
        let mut best: Option<(&CanonicalItem, usize)> = None;
        for (item, item_tokens) in self.index.iter() {
            if !tokens.is_subset(item_tokens) {
                continue;
            }
            if best.is_none_or(|(_, size)| item_tokens.len() < size) {
                best = Some((item, item_tokens.len()));
            }
        }
        best.map(|(item, _)| Resolution::Matched {
            item: item.clone(),
            via: MatchKind::Subset,
        })
    }

    /// First item sharing the most tokens with the label, if it shares any.
    fn overlap_match(&self, tokens: &TokenSet) -> Option<Resolution> {
        let mut best: Option<(&CanonicalItem, usize)> = None;
        for (item, item_tokens) in self.index.iter() {
            let shared = tokens.overlap(item_tokens);
            if shared > best.map_or(0, |(_, score)| score) {
                best = Some((item, shared));
            }
        }
        best.map(|(item, shared)| Resolution::Matched {
            item: item.clone(),
            via: MatchKind::Overlap { shared },
        })
    }
}
