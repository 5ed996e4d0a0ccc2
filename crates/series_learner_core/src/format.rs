//! Small text helpers shared by the tracker operations.

use std::cmp::Ordering;

/// Trims and lowercases a language code. An empty result means "no code".
pub fn normalize_language_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Display label for a language code that has no entry in the language table.
///
/// Each hyphen-delimited segment gets an uppercase first letter: `pt-br` becomes `Pt-Br`.
pub fn fallback_language_label(code: &str) -> String {
    code.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Orders display strings the way a person would: case-insensitively first,
/// then by exact value so the order stays total.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_language_code() {
        assert_eq!(normalize_language_code("  DA "), "da");
        assert_eq!(normalize_language_code("   "), "");
    }

    #[test]
    fn test_fallback_language_label() {
        assert_eq!(fallback_language_label("fr"), "Fr");
        assert_eq!(fallback_language_label("pt-br"), "Pt-Br");
        assert_eq!(fallback_language_label("zh--hant"), "Zh--Hant");
        assert_eq!(fallback_language_label(""), "");
    }

    #[test]
    fn test_compare_labels_ignores_case_first() {
        assert_eq!(compare_labels("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_labels("Banana", "apple"), Ordering::Greater);
        assert_eq!(compare_labels("same", "same"), Ordering::Equal);
        // Lowercase sorts before uppercase on an otherwise equal string.
        assert_eq!(compare_labels("danish", "Danish"), Ordering::Less);
    }
}
