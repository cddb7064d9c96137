use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

static SET_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"images/extensions/([^/]+)/").expect("set code regex"));
static CLAUSE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;,.]").expect("clause regex"));
static KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z\- ]{2,}$").expect("keyword regex"));
static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+").expect("integer regex"));

/// Text of a node with each text run trimmed and runs joined by one space.
pub fn extract_text(node: ElementRef) -> String {
    node.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every trimmed, non-empty text run under `node`, in document order.
pub fn text_tokens<'a>(node: ElementRef<'a>) -> impl Iterator<Item = &'a str> + 'a {
    node.text().map(str::trim).filter(|s| !s.is_empty())
}

/// `".../images/extensions/orig/012-mini.jpg"` -> `"orig"`.
pub fn set_code_from_path(path: &str) -> Option<String> {
    SET_CODE
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Capitalised clauses of the rules text. Heuristic: false positives and
/// misses are expected.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for clause in CLAUSE_SPLIT.split(text) {
        let clause = clause.trim();
        if clause.is_empty() || !KEYWORD.is_match(clause) {
            continue;
        }
        if !keywords.iter().any(|k| k == clause) {
            keywords.push(clause.to_string());
        }
    }
    keywords
}

/// First signed integer in a stat box: `"Cost: 3"` -> `3`, `"-1"` -> `-1`.
pub fn parse_int(text: &str) -> Option<i64> {
    INTEGER.find(text)?.as_str().parse().ok()
}

/// Lowercased, trimmed name used for identity lookups.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
