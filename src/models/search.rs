//! Accent-folded search keys
//!
//! Names and titles are stored alongside a folded key so a search for
//! "munoz" finds "Muñoz". Queries are folded the same way before matching.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Lowercase, strip diacritics and collapse whitespace
pub fn fold(text: &str) -> String {
    let stripped: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build a search key from several optional parts
pub fn search_key<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    let joined = parts
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    fold(&joined)
}

/// `LIKE` pattern for a folded query, escaping SQL wildcards
pub fn like_pattern(query: &str) -> String {
    let folded = fold(query)
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_accents() {
        assert_eq!(fold("  José  MUÑOZ "), "jose munoz");
        assert_eq!(fold("Cien años de soledad"), "cien anos de soledad");
    }

    #[test]
    fn test_search_key_skips_empty_parts() {
        let key = search_key([Some("Ana"), None, Some("  "), Some("Pérez")]);
        assert_eq!(key, "ana perez");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("100%_x"), "%100\\%\\_x%");
    }
}
