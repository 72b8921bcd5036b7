use crate::vocab::FrequencyTable;

const PROGRESS_EVERY: usize = 10_000;

/// Expand the frequency table into the flat negative-sampling table: id `i`
/// (i != 0) appears `floor(count(i)^0.75)` times, in increasing id order.
/// Uniform random draws from the result approximate the 0.75-power-smoothed
/// unigram distribution without a cumulative-distribution search.
pub fn negative_sampling_table(frequency: &FrequencyTable) -> Vec<u32> {
    let mut table = Vec::new();
    for (id, (_, count)) in frequency.entries().iter().enumerate().skip(1) {
        let copies = (*count as f64).powf(0.75).floor() as usize;
        table.extend(std::iter::repeat(id as u32).take(copies));
        if id % PROGRESS_EVERY == 0 {
            tracing::info!(processed = id, table_len = table.len(), "negative table progress");
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{WordCounter, build_vocabulary};

    fn frequency_of(words: &[&str], top_words: usize) -> FrequencyTable {
        let mut counter = WordCounter::new();
        counter.extend(words.iter().map(|w| w.to_string()));
        build_vocabulary(counter, top_words).unwrap().1
    }

    #[test]
    fn test_copies_follow_smoothed_counts() {
        // "a" x16 -> floor(16^0.75) = 8, "b" x2 -> floor(2^0.75) = 1
        let mut words = vec!["a"; 16];
        words.extend(["b", "b"]);
        let freq = frequency_of(&words, 10);
        let table = negative_sampling_table(&freq);

        let count_of = |id: u32| table.iter().filter(|&&v| v == id).count();
        assert_eq!(count_of(3), 8);
        assert_eq!(count_of(4), 1);
        assert_eq!(table.len(), 9);
    }

    #[test]
    fn test_unk_never_appears() {
        let freq = frequency_of(&["<unk>", "<unk>", "word"], 10);
        let table = negative_sampling_table(&freq);
        assert!(!table.contains(&0));
    }

    #[test]
    fn test_reserved_zero_counts_contribute_nothing() {
        let freq = frequency_of(&["solo"], 10);
        let table = negative_sampling_table(&freq);
        // ids 1 and 2 have count 0; only "solo" (count 1 -> 1 copy) remains
        assert_eq!(table, vec![3]);
    }

    #[test]
    fn test_table_is_in_increasing_id_order() {
        let freq = frequency_of(&["x", "x", "x", "y", "y", "z"], 10);
        let table = negative_sampling_table(&freq);
        let mut sorted = table.clone();
        sorted.sort_unstable();
        assert_eq!(table, sorted);
    }
}
