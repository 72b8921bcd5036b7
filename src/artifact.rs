use crate::error::ThresherError;
use crate::vocab::{RESERVED_WORDS, Vocabulary};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Persist a value with bincode, refusing to clobber an existing artifact
/// unless `overwrite` is set.
pub fn save<T: bincode::Encode>(
    value: &T,
    path: &Path,
    overwrite: bool,
) -> Result<(), ThresherError> {
    if path.exists() && !overwrite {
        return Err(ThresherError::ArtifactExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let bytes = bincode::encode_to_vec(value, bincode::config::standard())?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load<T: bincode::Decode<()>>(path: &Path) -> Result<T, ThresherError> {
    if !path.exists() {
        return Err(ThresherError::ArtifactMissing(path.to_path_buf()));
    }
    let data = fs::read(path)?;
    let (value, _) = bincode::decode_from_slice(&data, bincode::config::standard())?;
    Ok(value)
}

/// The three output locations a downstream trainer reads from.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub vocabulary: PathBuf,
    pub data_index: PathBuf,
    pub negative: PathBuf,
}

impl ArtifactSet {
    pub fn in_dir(dir: &Path) -> Self {
        ArtifactSet {
            vocabulary: dir.join("vocab.bin"),
            data_index: dir.join("data_index.bin"),
            negative: dir.join("negative.bin"),
        }
    }

    /// Load all three artifacts the way the downstream consumer would; any
    /// missing one is a fatal resource error.
    pub fn load_summary(&self, head: usize) -> Result<ArtifactSummary, ThresherError> {
        let vocabulary: Vocabulary = load(&self.vocabulary)?;
        let data_index: Vec<u32> = load(&self.data_index)?;
        let negative: Vec<u32> = load(&self.negative)?;
        let top_ranked = vocabulary
            .words()
            .iter()
            .skip(RESERVED_WORDS.len())
            .take(head)
            .cloned()
            .collect();
        Ok(ArtifactSummary {
            vocabulary_size: vocabulary.len(),
            data_index_len: data_index.len(),
            negative_len: negative.len(),
            top_ranked,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ArtifactSummary {
    pub vocabulary_size: usize,
    pub data_index_len: usize,
    pub negative_len: usize,
    pub top_ranked: Vec<String>,
}
