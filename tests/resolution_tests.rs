use pantrysense::catalog::{AliasTable, Catalog, CatalogError, PANTRY_ITEMS, Vocabulary};
use pantrysense::resolver::index::TokenSet;
use pantrysense::resolver::tokenize::{normalize_token, tokenize};
use pantrysense::resolver::{MatchKind, Resolution, Resolver};

fn pantry() -> Resolver {
    Resolver::new(&Vocabulary::pantry().unwrap())
}

fn mapped(resolver: &Resolver, label: &str) -> Option<String> {
    resolver.resolve(label).into_item().map(|item| item.to_string())
}

#[test]
fn every_catalog_entry_tokenizes() {
    for item in PANTRY_ITEMS {
        assert!(!tokenize(item).is_empty(), "{item} has no tokens");
    }
}

#[test]
fn catalog_without_tokens_is_rejected() {
    assert!(matches!(
        Catalog::new(["Rice", "Fresh, Chopped"]),
        Err(CatalogError::NoTokens { .. })
    ));
    assert!(matches!(
        Catalog::new(["Rice", ""]),
        Err(CatalogError::EmptyEntry { index: 1 })
    ));
}

#[test]
fn normalize_token_is_idempotent_on_catalog_words() {
    for item in PANTRY_ITEMS {
        for word in item.split_whitespace() {
            let once = normalize_token(&word.to_lowercase());
            assert_eq!(normalize_token(&once), once, "{word}");
        }
    }
}

#[test]
fn alias_short_circuits_token_matching() {
    let resolver = pantry();
    let resolution = resolver.resolve("corn");
    assert_eq!(resolution.item().unwrap(), &"Sweet Corn");
    assert_eq!(resolution.match_kind(), Some(MatchKind::Alias));

    let catalog = Catalog::new(["Corn Starch", "Sweet Corn"]).unwrap();
    let aliased = Resolver::new(&Vocabulary::new(
        catalog.clone(),
        AliasTable::new(&catalog, [("corn", "Sweet Corn")]).unwrap(),
    ));
    let plain = Resolver::new(&Vocabulary::new(catalog, AliasTable::empty()));
    assert_eq!(mapped(&aliased, "corn").as_deref(), Some("Sweet Corn"));
    assert_eq!(mapped(&plain, "corn").as_deref(), Some("Corn Starch"));
}

#[test]
fn subset_match_prefers_fewer_tokens() {
    let catalog = Catalog::new(["Pea Soup", "Pea"]).unwrap();
    let resolver = Resolver::new(&Vocabulary::new(catalog, AliasTable::empty()));
    assert_eq!(TokenSet::from_text("peas").iter().collect::<Vec<_>>(), vec!["pea"]);
    assert_eq!(mapped(&resolver, "peas").as_deref(), Some("Pea"));
}

#[test]
fn overlap_fallback_on_pantry() {
    let resolver = pantry();
    let resolution = resolver.resolve("red bell peppers with seeds");
    assert_eq!(resolution.item().unwrap(), &"Bell Pepper");
    assert_eq!(resolution.match_kind(), Some(MatchKind::Overlap { shared: 2 }));

    assert_eq!(resolver.resolve("wireless keyboard"), Resolution::Unresolved);
}

#[test]
fn pantry_labels_resolve_as_expected() {
    let resolver = pantry();
    let cases = [
        ("green onion", "Green Onions"),
        ("Green Onions", "Green Onions"),
        ("egg", "Eggs"),
        ("tomato", "Tomatoes"),
        ("jalapeno", "Jalapenos"),
        ("eggplant", "Eggplants"),
        ("scallions", "Scallion"),
        ("chickpeas", "Canned Chickpea"),
        ("red bell pepper", "Red Pepper"),
        ("pepper", "Pepper"),
        ("potato", "Potatoes"),
        ("sweet potato", "Sweet Potato"),
        ("garlic", "Garlic"),
        ("2 cloves garlic, minced", "Garlic"),
        ("beans", "Beans"),
        ("black beans", "Black Beans"),
        ("leek", "Leeks"),
        ("rice", "Rice"),
        ("tuna", "Canned Tuna"),
        ("squash", "Butternut Squash"),
    ];
    for (label, expected) in cases {
        assert_eq!(mapped(&resolver, label).as_deref(), Some(expected), "label {label:?}");
    }
}

#[test]
fn labels_without_signal_are_unresolved() {
    let resolver = pantry();
    for label in ["", "   ", "chopped", "1 cup, diced", "42"] {
        assert_eq!(resolver.resolve(label), Resolution::Unresolved, "label {label:?}");
    }
}

#[test]
fn resolution_is_repeatable() {
    let resolver = pantry();
    let first = resolver.resolve("onion");
    for _ in 0..10 {
        assert_eq!(resolver.resolve("onion"), first);
    }
}

#[test]
fn concurrent_resolution_agrees_with_sequential() {
    let resolver = pantry();
    let labels = ["egg", "corn", "basil", "laptop", "green onion", "lime"];
    let expected: Vec<Resolution> = labels.iter().map(|l| resolver.resolve(l)).collect();

    let shared = &resolver;
    std::thread::scope(|scope| {
        let handles: Vec<_> = labels
            .iter()
            .map(|label| scope.spawn(move || shared.resolve(label)))
            .collect();
        let actual: Vec<Resolution> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(actual, expected);
    });
}
