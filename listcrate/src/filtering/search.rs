use crate::config::SEARCH_TERM_SEPARATOR;

/// Split a search string into terms and each term into words.
///
/// Every term must match (AND), a term matches when any search field contains
/// all of its words. Terms without words are dropped.
#[must_use]
pub fn search_terms(search: &str) -> Vec<Vec<String>> {
    search
        .split(SEARCH_TERM_SEPARATOR)
        .map(|term| term.split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .filter(|words| !words.is_empty())
        .collect()
}

/// Case-insensitive substring test used by in-memory search.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Split `assoc.field` into its association and field parts.
#[must_use]
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    path.split_once('.')
}
