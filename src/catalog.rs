use crate::resolver::tokenize::tokenize;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Pantry items surfaced to users, in the order the selector shows them.
///
/// Order matters: resolution ties are broken by the first item encountered.
pub const PANTRY_ITEMS: &[&str] = &[
    "Barilla Ready Pasta Elbows",
    "Iceberg Salad",
    "Eggs",
    "Green Onions",
    "Basil",
    "Sweet Corn",
    "Canned Tuna",
    "Tomatoes",
    "Cilantro",
    "Cucumber",
    "Lemon",
    "Lime",
    "Bread",
    "Beans",
    "Pasta Noodles",
    "Spinach",
    "Oregano",
    "Bell Pepper",
    "Arugula",
    "Canned Chickpea",
    "Garlic Powder",
    "Onion Powder",
    "Smoked Paprika",
    "Salt",
    "Pepper",
    "Ginger",
    "Hot Pepper",
    "Broccoli",
    "Rice",
    "Green Beans",
    "Chicken Broth",
    "Bokchoy",
    "Poblano Peppers",
    "Leeks",
    "Turnips",
    "Garlic",
    "Parsely",
    "Daikon",
    "Persimmons",
    "Avocado",
    "Eggplants",
    "Scallion",
    "Mushroom",
    "Pomegranate",
    "Pear",
    "Red Pepper",
    "Radish",
    "Jalapenos",
    "Potatoes",
    "Celery",
    "Carrot",
    "Butternut Squash",
    "Sweet Potato",
    "Black Beans",
    "Cumin",
    "Vegetable Stock",
];

/// Known model labels whose token match would land on the wrong item.
pub const PANTRY_ALIASES: &[(&str, &str)] = &[
    ("green onion", "Green Onions"),
    ("green onions", "Green Onions"),
    ("eggplant", "Eggplants"),
    ("scallions", "Scallion"),
    ("jalapeno", "Jalapenos"),
    ("red bell pepper", "Red Pepper"),
    ("corn", "Sweet Corn"),
    ("chickpeas", "Canned Chickpea"),
    ("chickpea", "Canned Chickpea"),
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog entry #{index} is empty")]
    EmptyEntry { index: usize },
    #[error("catalog entry {item:?} has no matchable words")]
    NoTokens { item: String },
    #[error("catalog entry {item:?} appears more than once")]
    DuplicateEntry { item: String },
    #[error("alias with an empty label")]
    EmptyAlias,
    #[error("alias {alias:?} points at {target:?}, which is not in the catalog")]
    UnknownAliasTarget { alias: String, target: String },
    #[error("failed to read vocabulary file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse vocabulary file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One pantry ingredient, named as it should be shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct CanonicalItem(String);

impl CanonicalItem {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for CanonicalItem {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Ordered, validated list of pantry items.
///
/// Every entry is non-empty, unique and yields at least one token, so a
/// catalog that exists can always be indexed.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CanonicalItem>,
}

impl Catalog {
    pub fn new<I, S>(items: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut validated = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            let item = item.into().trim().to_string();
            if item.is_empty() {
                return Err(CatalogError::EmptyEntry { index });
            }
            if tokenize(&item).is_empty() {
                return Err(CatalogError::NoTokens { item });
            }
            if !seen.insert(item.clone()) {
                return Err(CatalogError::DuplicateEntry { item });
            }
            validated.push(CanonicalItem(item));
        }

        Ok(Self { items: validated })
    }

    pub fn pantry() -> Result<Self, CatalogError> {
        Self::new(PANTRY_ITEMS.iter().copied())
    }

    pub fn items(&self) -> &[CanonicalItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CanonicalItem> {
        self.items.iter().find(|item| item.as_str() == name)
    }
}

/// Exact lowercase label overrides, checked before any token matching.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, CanonicalItem>,
}

impl AliasTable {
    /// Build the table against `catalog`. Labels are trimmed and lowercased;
    /// targets must name catalog items.
    pub fn new<I, K, V>(catalog: &Catalog, aliases: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut table = HashMap::new();
        for (alias, target) in aliases {
            let alias = alias.as_ref().trim().to_lowercase();
            if alias.is_empty() {
                return Err(CatalogError::EmptyAlias);
            }
            let Some(item) = catalog.get(target.as_ref()) else {
                return Err(CatalogError::UnknownAliasTarget {
                    alias,
                    target: target.as_ref().to_string(),
                });
            };
            table.insert(alias, item.clone());
        }
        Ok(Self { aliases: table })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up an already trimmed, lowercased label.
    pub fn get(&self, label: &str) -> Option<&CanonicalItem> {
        self.aliases.get(label)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Aliases sorted by label.
    pub fn entries(&self) -> Vec<(&str, &CanonicalItem)> {
        let mut entries: Vec<_> = self
            .aliases
            .iter()
            .map(|(alias, item)| (alias.as_str(), item))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// On-disk vocabulary: `items = [...]` plus an optional `[aliases]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyFile {
    pub items: Vec<String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// A catalog together with the alias table validated against it.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub catalog: Catalog,
    pub aliases: AliasTable,
}

impl Vocabulary {
    pub fn new(catalog: Catalog, aliases: AliasTable) -> Self {
        Self { catalog, aliases }
    }

    /// The embedded pantry catalog and its aliases.
    pub fn pantry() -> Result<Self, CatalogError> {
        let catalog = Catalog::pantry()?;
        let aliases = AliasTable::new(&catalog, PANTRY_ALIASES.iter().copied())?;
        Ok(Self { catalog, aliases })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: VocabularyFile = toml::from_str(content)?;
        let catalog = Catalog::new(file.items)?;
        let aliases = AliasTable::new(&catalog, file.aliases)?;
        Ok(Self { catalog, aliases })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let vocabulary = Self::from_toml_str(&content)?;
        log::warn!(
            "using vocabulary from {} ({} items, {} aliases) instead of the embedded pantry",
            path.display(),
            vocabulary.catalog.len(),
            vocabulary.aliases.len()
        );
        Ok(vocabulary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pantry_catalog_is_valid() {
        let vocabulary = Vocabulary::pantry().unwrap();
        assert_eq!(vocabulary.catalog.len(), PANTRY_ITEMS.len());
        assert_eq!(vocabulary.aliases.len(), PANTRY_ALIASES.len());
        assert_eq!(vocabulary.catalog.items()[0], "Barilla Ready Pasta Elbows");
    }

    #[test]
    fn every_pantry_item_has_tokens() {
        for item in PANTRY_ITEMS {
            assert!(!tokenize(item).is_empty(), "{item} has no tokens");
        }
    }

    #[test]
    fn rejects_empty_entry() {
        let err = Catalog::new(["Eggs", "  "]).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyEntry { index: 1 }));
    }

    #[test]
    fn rejects_entry_without_tokens() {
        let err = Catalog::new(["Eggs", "Chopped 2"]).unwrap_err();
        assert!(matches!(err, CatalogError::NoTokens { ref item } if item == "Chopped 2"));
    }

    #[test]
    fn rejects_duplicate_entry() {
        let err = Catalog::new(["Eggs", "Rice", "Eggs"]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateEntry { ref item } if item == "Eggs"));
    }

    #[test]
    fn alias_labels_are_normalized() {
        let catalog = Catalog::new(["Sweet Corn"]).unwrap();
        let aliases = AliasTable::new(&catalog, [("  CORN ", "Sweet Corn")]).unwrap();
        assert_eq!(aliases.get("corn").unwrap(), &"Sweet Corn");
    }

    #[test]
    fn alias_target_must_exist() {
        let catalog = Catalog::new(["Sweet Corn"]).unwrap();
        let err = AliasTable::new(&catalog, [("corn", "Corn Flakes")]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownAliasTarget { .. }));
        assert!(err.to_string().contains("Corn Flakes"));
    }

    #[test]
    fn parses_vocabulary_toml() {
        let vocabulary = Vocabulary::from_toml_str(
            r#"
items = ["Green Onions", "Sweet Corn"]

[aliases]
corn = "Sweet Corn"
"#,
        )
        .unwrap();
        assert_eq!(vocabulary.catalog.len(), 2);
        assert_eq!(vocabulary.aliases.entries(), vec![("corn", &vocabulary.catalog.items()[1])]);
    }

    #[test]
    fn vocabulary_toml_without_aliases() {
        let vocabulary = Vocabulary::from_toml_str(r#"items = ["Rice"]"#).unwrap();
        assert!(vocabulary.aliases.is_empty());
    }

    #[test]
    fn malformed_vocabulary_toml_fails() {
        let err = Vocabulary::from_toml_str("items = 3").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }
}
