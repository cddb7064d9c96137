use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{info, warn};
use tempfile::NamedTempFile;

use crate::card::StoredRecord;

/// The card dataset: a JSON array read fully into memory and always
/// rewritten whole.
#[derive(Debug)]
pub struct Dataset {
    path: PathBuf,
    published: Option<PathBuf>,
    pub records: Vec<StoredRecord>,
}

impl Dataset {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset {}", path.display()))?;
        let records: Vec<StoredRecord> = serde_json::from_str(&contents)
            .with_context(|| format!("{} is not a JSON array of cards", path.display()))?;
        info!("loaded {} cards from {}", records.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            published: None,
            records,
        })
    }

    /// Also mirror every save to `path`, but only if that file already
    /// exists when saving.
    pub fn with_published_copy(mut self, path: Option<PathBuf>) -> Self {
        self.published = path;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn to_json(&self) -> anyhow::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(&self.records)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Rewrite the canonical file, then the published copy with the same
    /// bytes. Only the canonical write can fail the call.
    pub fn save(&self) -> anyhow::Result<()> {
        let bytes = self.to_json()?;
        write_atomically(&self.path, &bytes)
            .with_context(|| format!("failed to write dataset {}", self.path.display()))?;

        if let Some(published) = &self.published {
            if published.exists() {
                if let Err(e) = write_atomically(published, &bytes) {
                    warn!(
                        "couldn't update published copy {}: {:#}",
                        published.display(),
                        e
                    );
                }
            }
        }
        Ok(())
    }
}

/// The file either keeps its old contents or gets all of the new ones.
fn write_atomically(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn write_cards(dir: &Path, name: &str, cards: Value) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string(&cards).unwrap()).unwrap();
        path
    }

    #[test]
    fn load_and_save_preserve_records() {
        let dir = tempfile::tempdir().unwrap();
        let cards = json!([
            {"id": "b", "name": "Zed", "extra": {"z": 1, "a": 2}},
            {"id": "a", "name": "Ann", "set": {"number": 4}}
        ]);
        let path = write_cards(dir.path(), "cards.json", cards.clone());
        let dataset = Dataset::load(&path).unwrap();
        assert_eq!(dataset.records.len(), 2);
        dataset.save().unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("[\n  {\n    \"id\": \"b\""));
        let reread: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(reread, cards);
    }

    #[test]
    fn published_copy_follows_only_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cards(dir.path(), "cards.json", json!([{"id": "a"}]));
        let published = write_cards(dir.path(), "docs.json", json!([]));
        let missing = dir.path().join("missing.json");

        let dataset = Dataset::load(&path).unwrap().with_published_copy(Some(published.clone()));
        dataset.save().unwrap();
        assert_eq!(fs::read(&path).unwrap(), fs::read(&published).unwrap());

        let dataset = Dataset::load(&path).unwrap().with_published_copy(Some(missing.clone()));
        dataset.save().unwrap();
        assert!(!missing.exists());
    }

    #[test]
    fn published_copy_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cards(dir.path(), "cards.json", json!([{"id": "a"}]));
        // A directory exists but can't be replaced by a file.
        let published = dir.path().join("docs");
        fs::create_dir(&published).unwrap();
        fs::write(published.join("keep"), b"x").unwrap();

        let dataset = Dataset::load(&path).unwrap().with_published_copy(Some(published.clone()));
        dataset.save().unwrap();
        assert!(published.is_dir());
    }

    #[test]
    fn canonical_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cards(dir.path(), "cards.json", json!([]));
        let mut dataset = Dataset::load(&path).unwrap();
        dataset.path = dir.path().join("no_such_dir").join("cards.json");
        assert!(dataset.save().is_err());
    }

    #[test]
    fn non_array_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cards(dir.path(), "cards.json", json!({"id": "a"}));
        assert!(Dataset::load(&path).is_err());
    }
}
