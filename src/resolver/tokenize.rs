use std::collections::BTreeSet;

/// Words that carry no signal about which ingredient a label names.
///
/// Labels sometimes arrive as recipe-style phrases ("2 cloves garlic, minced"),
/// so this covers articles and prepositions, units of measure and preparation
/// adjectives.
pub const STOP_WORDS: &[&str] = &[
    "a",
    "an",
    "and",
    "at",
    "the",
    "of",
    "or",
    "to",
    "in",
    "into",
    "on",
    "for",
    "from",
    "with",
    "without",
    "per",
    "cup",
    "cups",
    "clove",
    "cloves",
    "can",
    "cans",
    "oz",
    "ounce",
    "ounces",
    "lb",
    "lbs",
    "pound",
    "pounds",
    "tbsp",
    "tsp",
    "teaspoon",
    "teaspoons",
    "tablespoon",
    "tablespoons",
    "pinch",
    "pouch",
    "medium",
    "small",
    "large",
    "ripe",
    "fresh",
    "chopped",
    "diced",
    "sliced",
    "shredded",
    "grated",
    "minced",
    "taste",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Normalize a single word into a matching token.
///
/// Lowercases, drops every non-alphabetic character and folds simple plurals:
/// `"Tomatoes"` and `"tomato"` both become `"tomato"`, `"Eggs"` becomes `"egg"`.
/// Short words are left alone (`"rice"`, `"bus"`), a trailing `"ss"` is never
/// stripped, and suffix stripping repeats until the token is stable so that
/// `normalize_token(normalize_token(w)) == normalize_token(w)`.
pub fn normalize_token(word: &str) -> String {
    let mut token: String = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();

    while let Some(stem) = strip_plural(&token) {
        token.truncate(stem);
    }
    token
}

/// Byte length of `token` with one plural suffix removed, if any applies.
fn strip_plural(token: &str) -> Option<usize> {
    let len = token.chars().count();
    if len > 4 && token.ends_with("es") {
        return Some(token.len() - 2);
    }
    if len > 3 && token.ends_with('s') && !token.ends_with("ss") {
        return Some(token.len() - 1);
    }
    None
}

/// Split `text` on whitespace and collect the normalized, non-stop-word tokens.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .filter_map(|part| {
            let word: String = part
                .chars()
                .filter(|c| c.is_alphabetic())
                .flat_map(char::to_lowercase)
                .collect();
            if word.is_empty() || is_stop_word(&word) {
                return None;
            }
            let token = normalize_token(&word);
            if token.is_empty() || is_stop_word(&token) {
                None
            } else {
                Some(token)
            }
        })
        .collect()
}
