//! Edit-distance based string similarity used to compare track metadata.

use strsim::normalized_levenshtein;

/// Case-insensitive similarity in `[0, 1]`.
///
/// `(max_len - distance) / max_len`. Two empty strings are identical (1.0);
/// an empty string against a non-empty one shares nothing (0.0).
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strsim::levenshtein;

    #[test]
    fn test_similarity_counts_chars_not_bytes() {
        assert!((similarity("Café", "cafe") - 0.75).abs() < 1e-9);
        assert_eq!(similarity("東京", "京都"), 0.0);
    }

    #[test]
    fn test_similarity_is_case_insensitive() {
        assert!((similarity("The Weeknd", "the weeknd") - 1.0).abs() < f64::EPSILON);
        assert!((similarity("ABBA", "abba") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_similarity_empty_strings() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("", "Queen"), 0.0);
        assert_eq!(similarity("Queen", ""), 0.0);
    }

    #[test]
    fn test_similarity_values() {
        // one substitution over six chars
        assert!((similarity("Hello!", "Hallo!") - 5.0 / 6.0).abs() < 1e-9);
        assert!(similarity("Bohemian Rhapsody", "Stairway to Heaven") < 0.3);
    }

    proptest! {
        #[test]
        fn prop_similarity_reflexive(a in ".{0,40}") {
            prop_assert_eq!(similarity(&a, &a), 1.0);
        }

        #[test]
        fn prop_similarity_symmetric(a in ".{0,30}", b in ".{0,30}") {
            prop_assert_eq!(similarity(&a, &b), similarity(&b, &a));
        }

        #[test]
        fn prop_similarity_in_range(a in ".{0,30}", b in ".{0,30}") {
            let s = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
        }

        #[test]
        fn prop_similarity_matches_distance_ratio(a in "[a-zA-Z ]{0,25}", b in "[a-zA-Z ]{0,25}") {
            let (la, lb) = (a.to_lowercase(), b.to_lowercase());
            let max_len = la.chars().count().max(lb.chars().count());
            let expected = if max_len == 0 {
                1.0
            } else {
                1.0 - levenshtein(&la, &lb) as f64 / max_len as f64
            };
            prop_assert!((similarity(&a, &b) - expected).abs() < 1e-12);
        }
    }
}
