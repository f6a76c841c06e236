//! Fuzzy column-name resolution.
//!
//! User questions and model output rarely spell column names exactly; this
//! module maps name fragments onto real dataset columns. Resolution order:
//! exact normalized match, column-contains-fragment, fragment-contains-column.

/// Lowercases a name and strips whitespace, underscores, and hyphens so
/// `"Order ID"`, `order_id`, and `ORDER-ID` all normalize identically.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase()
}

/// Resolves a name fragment against the available columns; `None` means
/// "column not found" and callers surface the available names to the user.
pub fn resolve_column<'a>(fragment: &str, columns: &'a [String]) -> Option<&'a str> {
    let needle = normalize(fragment);
    if needle.is_empty() {
        return None;
    }
    if let Some(exact) = columns.iter().find(|c| normalize(c) == needle) {
        return Some(exact.as_str());
    }
    if let Some(containing) = columns.iter().find(|c| normalize(c).contains(&needle)) {
        return Some(containing.as_str());
    }
    columns
        .iter()
        .find(|c| {
            let normalized = normalize(c);
            !normalized.is_empty() && needle.contains(&normalized)
        })
        .map(|c| c.as_str())
}

/// Last-resort repair for a requested column that failed to resolve: match
/// the first word of the request (case-insensitive, only when longer than
/// two characters) as a substring of a normalized column name.
pub fn fallback_column<'a>(requested: &str, columns: &'a [String]) -> Option<&'a str> {
    let first_word = requested.split_whitespace().next()?;
    if first_word.len() <= 2 {
        return None;
    }
    let token = normalize(first_word);
    columns
        .iter()
        .find(|c| normalize(c).contains(&token))
        .map(|c| c.as_str())
}

/// Domain abbreviation mismatches seen in model output. Applied to the
/// requested name before fuzzy resolution.
const SYNONYMS: &[(&str, &str)] = &[
    ("ngrp", "grp"),
    ("adstocked", "adstock"),
    ("spends", "spend"),
    ("impression", "impressions"),
];

pub fn apply_synonyms(name: &str) -> String {
    let normalized = normalize(name);
    for (from, to) in SYNONYMS {
        if normalized == *from {
            return (*to).to_string();
        }
    }
    name.to_string()
}
