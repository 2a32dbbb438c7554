//! Known corrections for corrupted `original_response` keys
//!
//! A few responses in the grounded-dialogue corpus differ byte-for-byte from
//! the knowledge-corpus text they were taken from. Only these exact strings
//! are rewritten; every other key passes through untouched.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static KNOWN_CORRECTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // knowledge corpus spells it 'sure'
        (
            "I absolutely love to surf, just riding on the forward face of a moving wave is so exhilarating. Are there a lot of sharks near you?",
            "I absolutely love to sure, just riding on the forward face of a moving wave is so exhilarating. Are there a lot of sharks near you?",
        ),
        // knowledge corpus spells it 'rusain'
        (
            "Yes, my uncle was russain and effected by the chernobyl disaster. He had a hard time trying to have a kid because of the radiation cancer he had to deal with.",
            "Yes, my uncle was rusain and effected by the chernobyl disaster. He had a hard time trying to have a kid because of the radiation cancer he had to deal with.",
        ),
        // trailing sentence dropped
        (
            "Let's see. If memory serves me correctly,  Hans Heinrich Josef Meyer  was a geographer and geologist from Germany who also climbed mountains and volcanic peaks?  ",
            "Let's see. If memory serves me correctly,  Hans Heinrich Josef Meyer  was a geographer and geologist from Germany who also climbed mountains and volcanic peaks?  I hope that is correct.",
        ),
    ])
});

/// Map a known-corrupted key to its knowledge-corpus form, identity otherwise
pub fn correct(key: &str) -> &str {
    KNOWN_CORRECTIONS.get(key).copied().unwrap_or(key)
}

/// Iterate over the (corrupted, corrected) pairs
pub fn known_corrections() -> impl Iterator<Item = (&'static str, &'static str)> {
    KNOWN_CORRECTIONS.iter().map(|(from, to)| (*from, *to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_outside_table() {
        assert_eq!(correct("Hello world"), "Hello world");
        assert_eq!(correct(""), "");
    }

    #[test]
    fn test_known_typo_is_corrected() {
        let fixed = correct(
            "I absolutely love to surf, just riding on the forward face of a moving wave is so exhilarating. Are there a lot of sharks near you?",
        );
        assert!(fixed.contains("love to sure,"));
    }

    #[test]
    fn test_corrections_are_not_chained() {
        assert_eq!(known_corrections().count(), 3);
        for (from, to) in known_corrections() {
            assert_eq!(correct(from), to);
            assert_eq!(correct(correct(from)), correct(from));
            assert_eq!(correct(to), to);
        }
    }
}
