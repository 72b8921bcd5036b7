use crate::error::ThresherError;
use itertools::Itertools;
use rustc_hash::FxHashMap;

pub const UNK_WORD: &str = "<unk>";
pub const BOS_WORD: &str = "<s>";
pub const EOS_WORD: &str = "</s>";
pub const RESERVED_WORDS: [&str; 3] = [UNK_WORD, BOS_WORD, EOS_WORD];
pub const UNK_ID: u32 = 0;

/// Frequency counter that remembers the order words were first seen. That
/// order is the documented tie-break when equal counts are ranked.
#[derive(Debug, Default)]
pub struct WordCounter {
    index: FxHashMap<String, usize>,
    entries: Vec<(String, u64)>,
    total: u64,
}

impl WordCounter {
    pub fn new() -> Self {
        WordCounter::default()
    }

    pub fn observe(&mut self, word: String) {
        self.total += 1;
        if let Some(&i) = self.index.get(&word) {
            self.entries[i].1 += 1;
        } else {
            self.index.insert(word.clone(), self.entries.len());
            self.entries.push((word, 1));
        }
    }

    /// Number of distinct words seen.
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    /// Total number of word occurrences seen.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn into_entries(self) -> Vec<(String, u64)> {
        self.entries
    }
}

impl Extend<String> for WordCounter {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for word in iter {
            self.observe(word);
        }
    }
}

/// `(word, count)` pairs in final id order: the three reserved tokens first,
/// then the kept words by descending count. Length equals the vocabulary size.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTable {
    entries: Vec<(String, u64)>,
}

impl FrequencyTable {
    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, id: u32) -> Option<u64> {
        self.entries.get(id as usize).map(|(_, c)| *c)
    }
}

/// Immutable word → id table. Ids 0, 1, 2 are `<unk>`, `<s>`, `</s>`; all
/// other ids follow descending frequency rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    words: Vec<String>,
    index: FxHashMap<String, u32>,
}

impl Vocabulary {
    /// Id assignment is first-wins, so the reserved head keeps ids 0-2 even
    /// if the corpus contains those literal strings.
    pub fn from_words(words: Vec<String>) -> Self {
        let mut index = FxHashMap::default();
        for (id, word) in words.iter().enumerate() {
            index.entry(word.clone()).or_insert(id as u32);
        }
        Vocabulary { words, index }
    }

    pub fn id_of(&self, word: &str) -> Option<u32> {
        self.index.get(word).copied()
    }

    pub fn id_or_unk(&self, word: &str) -> u32 {
        self.id_of(word).unwrap_or(UNK_ID)
    }

    pub fn word(&self, id: u32) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

// Persisted form is just the id-ordered word list; the lookup map is rebuilt
// on decode.
impl bincode::Encode for Vocabulary {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        self.words.encode(encoder)
    }
}

impl<Context> bincode::Decode<Context> for Vocabulary {
    fn decode<D: bincode::de::Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        Ok(Vocabulary::from_words(Vec::<String>::decode(decoder)?))
    }
}

/// Rank the counted words and assign ids. The `top_words` cap includes the
/// three reserved slots; equal counts keep the counter's first-seen order
/// (stable sort). A natural occurrence of a reserved token folds its count
/// into the reserved head entry instead of adding a duplicate row.
pub fn build_vocabulary(
    counter: WordCounter,
    top_words: usize,
) -> Result<(Vocabulary, FrequencyTable), ThresherError> {
    if top_words <= RESERVED_WORDS.len() {
        return Err(ThresherError::Config(format!(
            "top_words must be larger than {}",
            RESERVED_WORDS.len()
        )));
    }
    let mut entries: Vec<(String, u64)> = RESERVED_WORDS
        .iter()
        .map(|w| (w.to_string(), 0))
        .collect();
    let ranked = counter
        .into_entries()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(top_words - RESERVED_WORDS.len());
    for (word, count) in ranked {
        if let Some(slot) = entries[..RESERVED_WORDS.len()]
            .iter_mut()
            .find(|(w, _)| *w == word)
        {
            slot.1 += count;
        } else {
            entries.push((word, count));
        }
    }
    let words = entries.iter().map(|(w, _)| w.clone()).collect();
    Ok((Vocabulary::from_words(words), FrequencyTable { entries }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_of(words: &[&str]) -> WordCounter {
        let mut counter = WordCounter::new();
        counter.extend(words.iter().map(|w| w.to_string()));
        counter
    }

    #[test]
    fn test_counter_preserves_first_seen_order() {
        let counter = counter_of(&["b", "a", "b", "c", "a", "b"]);
        assert_eq!(counter.distinct(), 3);
        assert_eq!(counter.total(), 6);
        assert_eq!(
            counter.into_entries(),
            vec![
                ("b".to_string(), 3),
                ("a".to_string(), 2),
                ("c".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_reserved_ids_are_fixed() {
        let (vocab, freq) = build_vocabulary(counter_of(&["x", "y", "x"]), 10).unwrap();
        assert_eq!(vocab.id_of(UNK_WORD), Some(0));
        assert_eq!(vocab.id_of(BOS_WORD), Some(1));
        assert_eq!(vocab.id_of(EOS_WORD), Some(2));
        assert_eq!(freq.count(0), Some(0));
        assert_eq!(freq.count(1), Some(0));
        assert_eq!(freq.count(2), Some(0));
    }

    #[test]
    fn test_size_is_min_of_cap_and_distinct_plus_reserved() {
        let (small, _) = build_vocabulary(counter_of(&["a", "b", "c", "d"]), 100).unwrap();
        assert_eq!(small.len(), 4 + 3);

        let (capped, freq) = build_vocabulary(counter_of(&["a", "b", "c", "d"]), 5).unwrap();
        assert_eq!(capped.len(), 5);
        assert_eq!(freq.len(), capped.len());
    }

    #[test]
    fn test_ids_follow_descending_frequency() {
        let counter = counter_of(&["low", "high", "high", "high", "mid", "mid"]);
        let (vocab, freq) = build_vocabulary(counter, 10).unwrap();
        assert_eq!(vocab.id_of("high"), Some(3));
        assert_eq!(vocab.id_of("mid"), Some(4));
        assert_eq!(vocab.id_of("low"), Some(5));
        assert_eq!(freq.count(3), Some(3));
        assert_eq!(freq.count(4), Some(2));
        assert_eq!(freq.count(5), Some(1));
    }

    #[test]
    fn test_ties_break_by_first_seen_order() {
        let counter = counter_of(&["cat", "sat", "dog", "ran"]);
        let (vocab, _) = build_vocabulary(counter, 10).unwrap();
        assert_eq!(vocab.id_of("cat"), Some(3));
        assert_eq!(vocab.id_of("sat"), Some(4));
        assert_eq!(vocab.id_of("dog"), Some(5));
        assert_eq!(vocab.id_of("ran"), Some(6));
    }

    #[test]
    fn test_top_words_at_or_below_reserved_is_config_error() {
        let result = build_vocabulary(counter_of(&["a"]), 3);
        assert!(matches!(result, Err(ThresherError::Config(_))));
        let result = build_vocabulary(counter_of(&["a"]), 0);
        assert!(matches!(result, Err(ThresherError::Config(_))));
    }

    #[test]
    fn test_unknown_words_map_to_unk() {
        let (vocab, _) = build_vocabulary(counter_of(&["known"]), 10).unwrap();
        assert_eq!(vocab.id_or_unk("known"), 3);
        assert_eq!(vocab.id_or_unk("never-seen"), UNK_ID);
    }

    #[test]
    fn test_natural_reserved_occurrence_keeps_its_id() {
        let counter = counter_of(&["<unk>", "word", "<unk>"]);
        let (vocab, freq) = build_vocabulary(counter, 10).unwrap();
        assert_eq!(vocab.id_of(UNK_WORD), Some(0));
        assert_eq!(freq.count(0), Some(2));
        assert_eq!(vocab.len(), freq.len());
    }

    #[test]
    fn test_tight_cap_on_two_sentence_corpus() {
        // corpus: "the cat sat" / "the dog ran", top_words = 6
        let counter = counter_of(&["the", "cat", "sat", "the", "dog", "ran"]);
        let (vocab, freq) = build_vocabulary(counter, 6).unwrap();
        assert_eq!(vocab.len(), 6);
        assert_eq!(vocab.id_of("the"), Some(3));
        // 3 count-1 words competed for 2 remaining slots; first-seen wins
        assert_eq!(vocab.id_of("cat"), Some(4));
        assert_eq!(vocab.id_of("sat"), Some(5));
        assert_eq!(vocab.id_of("dog"), None);
        assert_eq!(freq.count(3), Some(2));
    }

    #[test]
    fn test_vocabulary_build_is_idempotent() {
        let words = ["one", "two", "two", "three", "three", "three"];
        let (first, _) = build_vocabulary(counter_of(&words), 5).unwrap();
        let (second, _) = build_vocabulary(counter_of(&words), 5).unwrap();
        assert_eq!(first, second);
    }
}
