use crate::error::ThresherError;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;

/// Lazy sentence iteration over an ordered list of corpus files, one sentence
/// per line. Blank lines are skipped so a sentence is non-empty when sent.
pub fn sentences(files: Vec<PathBuf>) -> SentenceIter {
    SentenceIter {
        files: files.into_iter(),
        current: None,
    }
}

pub struct SentenceIter {
    files: std::vec::IntoIter<PathBuf>,
    current: Option<Lines<BufReader<File>>>,
}

impl Iterator for SentenceIter {
    type Item = Result<String, ThresherError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(lines) = &mut self.current {
                match lines.next() {
                    Some(Ok(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        return Some(Ok(line.to_string()));
                    }
                    Some(Err(err)) => return Some(Err(err.into())),
                    None => self.current = None,
                }
            }
            let path = self.files.next()?;
            match File::open(&path) {
                Ok(file) => {
                    tracing::debug!(file = %path.display(), "reading corpus file");
                    self.current = Some(BufReader::new(file).lines());
                }
                Err(err) => {
                    return Some(Err(ThresherError::Io(err)));
                }
            }
        }
    }
}
