/// Pure, deterministic sentence tokenizer: lowercase, split on Unicode
/// whitespace. Workers call this and nothing else, which is what makes them
/// interchangeable.
pub fn tokenize(sentence: &str) -> Vec<String> {
    sentence
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(tokenize("The CAT sat"), vec!["the", "cat", "sat"]);
    }

    #[test]
    fn test_tokenize_collapses_whitespace() {
        assert_eq!(tokenize("  a \t b\u{00a0}c  "), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tokenize_empty_sentence() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_tokenize_is_deterministic() {
        let sentence = "Some Mixed CASE input";
        assert_eq!(tokenize(sentence), tokenize(sentence));
    }
}
