//! Token-level matching helpers shared by resolution and query linking.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").expect("valid token regex"));
static LUCENE_SPECIAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([+\-!(){}\[\]^"~*?:\\/]|&&|\|\|)"#).expect("valid lucene regex")
});

/// Lower-cased ASCII alphanumeric runs of `text`.
pub fn tokens(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Jaccard similarity (intersection over union) of two token sets.
///
/// Two empty sets are identical (1.0); one empty set shares nothing (0.0).
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Best Jaccard similarity between a name and any of a candidate's aliases.
///
/// When the candidate has more than one alias, single-token aliases are
/// ignored: a short generic alias alone must not cause a merge.
pub fn alias_overlap<S: AsRef<str>>(name_tokens: &BTreeSet<String>, aliases: &[S]) -> f64 {
    let multiple = aliases.len() > 1;
    aliases
        .iter()
        .map(|alias| tokens(alias.as_ref()))
        .filter(|alias_tokens| !(multiple && alias_tokens.len() == 1))
        .map(|alias_tokens| jaccard(name_tokens, &alias_tokens))
        .fold(0.0, f64::max)
}

/// Escapes Lucene query syntax so user text is searched literally.
pub fn escape_lucene(text: &str) -> String {
    LUCENE_SPECIAL.replace_all(text, r"\$1").into_owned()
}
