//! Where documents come from.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::postings::DocId;

pub trait DocumentSource: Sync {
    /// All document ids, ascending.
    fn list_ids(&self) -> Result<Vec<DocId>>;
    fn read(&self, id: DocId) -> Result<String>;
}

/// A flat directory where every file is named by its numeric document id.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
}

impl DocumentSource for DirectorySource {
    fn list_ids(&self) -> Result<Vec<DocId>> {
        if !self.root.is_dir() {
            return Err(Error::input(format!("document directory {} does not exist", self.root.display())));
        }
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| Error::input(format!("cannot list {}: {e}", self.root.display())))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            let id = name
                .parse::<DocId>()
                .map_err(|_| Error::input(format!("document file name {name:?} is not a document id")))?;
            // `read` rebuilds the path from the id, so `07` or `+7` would not round-trip.
            if name != id.to_string() {
                return Err(Error::input(format!("document file name {name:?} is not in canonical form {id}")));
            }
            ids.push(id);
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn read(&self, id: DocId) -> Result<String> {
        let path = self.root.join(id.to_string());
        fs::read_to_string(&path)
            .map_err(|e| Error::input(format!("cannot read document {}: {e}", path.display())))
    }
}

impl DocumentSource for BTreeMap<DocId, String> {
    fn list_ids(&self) -> Result<Vec<DocId>> {
        Ok(self.keys().copied().collect())
    }

    fn read(&self, id: DocId) -> Result<String> {
        self.get(&id)
            .cloned()
            .ok_or_else(|| Error::input(format!("document {id} not found")))
    }
}
