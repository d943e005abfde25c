//! On-disk index stores.
//!
//! Four files make up an index:
//!
//! - postings: a 16-byte header (`SKPD`, format version, collection size) then
//!   length-prefixed bincode blocks, one per term. A block's locator is the
//!   byte offset of its length prefix.
//! - dictionary: one bincode block mapping term -> postings offset.
//! - lengths: one bincode block mapping doc id -> document vector norm.
//! - meta: a small JSON manifest.
//!
//! Postings are read lazily: each load opens its own handle, seeks to the
//! offset and decodes exactly one block, so concurrent queries never share a
//! file cursor.

use crate::error::{Error, Result};
use crate::postings::{DocId, PostingsList};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;
const MAGIC: &[u8; 4] = b"SKPD";
pub const HEADER_LEN: u64 = 16;
const LEN_PREFIX: u64 = 4;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u64,
    pub num_terms: u64,
    pub created_at: String,
    pub version: u32,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub dictionary: PathBuf,
    pub postings: PathBuf,
    pub lengths: PathBuf,
    pub meta: PathBuf,
}

impl IndexPaths {
    /// Doc lengths and the manifest live next to the dictionary file.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(dictionary: P, postings: Q) -> Self {
        let dictionary = dictionary.as_ref().to_path_buf();
        Self {
            lengths: with_suffix(&dictionary, ".lengths"),
            meta: with_suffix(&dictionary, ".meta.json"),
            postings: postings.as_ref().to_path_buf(),
            dictionary,
        }
    }

    pub fn with_lengths<P: AsRef<Path>>(mut self, lengths: P) -> Self {
        self.lengths = lengths.as_ref().to_path_buf();
        self
    }

    /// Scratch locations a build writes to before the index is complete.
    pub fn staging(&self) -> Self {
        Self {
            dictionary: with_suffix(&self.dictionary, ".tmp"),
            postings: with_suffix(&self.postings, ".tmp"),
            lengths: with_suffix(&self.lengths, ".tmp"),
            meta: with_suffix(&self.meta, ".tmp"),
        }
    }

    fn all(&self) -> [&Path; 4] {
        [&self.dictionary, &self.postings, &self.lengths, &self.meta]
    }

    /// Move every file onto the matching path of `target`. Any manifest
    /// already at the target is removed first and the new one goes last, so a
    /// present manifest means the other stores are in place. If a move fails,
    /// files already moved are removed again.
    pub fn promote_to(&self, target: &IndexPaths) -> Result<()> {
        match fs::remove_file(&target.meta) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        let mut moved: Vec<&Path> = Vec::with_capacity(4);
        for (from, to) in self.all().into_iter().zip(target.all()) {
            if let Err(e) = move_file(from, to) {
                for path in moved {
                    let _ = fs::remove_file(path);
                }
                return Err(e.into());
            }
            moved.push(to);
        }
        Ok(())
    }

    /// Best-effort removal of whatever files exist.
    pub fn remove_all(&self) {
        for path in self.all() {
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove index file");
                }
            }
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::rename(from, to)
}

fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// Append-only writer for the postings store.
pub struct PostingsWriter {
    out: BufWriter<File>,
    position: u64,
}

impl PostingsWriter {
    /// Create the store and write its header, collection size included.
    pub fn create<P: AsRef<Path>>(path: P, num_docs: u64) -> Result<Self> {
        let mut out = BufWriter::new(create_file(path.as_ref())?);
        out.write_all(MAGIC)?;
        out.write_all(&FORMAT_VERSION.to_le_bytes())?;
        out.write_all(&num_docs.to_le_bytes())?;
        Ok(Self { out, position: HEADER_LEN })
    }

    /// Append one block and return the offset it starts at.
    pub fn append_block(&mut self, bytes: &[u8]) -> Result<u64> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| Error::invariant(format!("postings block of {} bytes is too large", bytes.len())))?;
        let offset = self.position;
        self.out.write_all(&len.to_le_bytes())?;
        self.out.write_all(bytes)?;
        self.position += LEN_PREFIX + len as u64;
        Ok(offset)
    }

    pub fn append_postings(&mut self, list: &PostingsList) -> Result<u64> {
        let bytes = bincode::serialize(list)?;
        self.append_block(&bytes)
    }

    pub fn finish(self) -> Result<()> {
        let file = self.out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}

/// Positioned reader for the postings store.
#[derive(Debug, Clone)]
pub struct PostingsReader {
    path: PathBuf,
    len: u64,
    num_docs: u64,
}

impl PostingsReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut f = File::open(&path)?;
        let len = f.metadata()?.len();
        if len < HEADER_LEN {
            return Err(Error::invariant(format!("postings store {} has a truncated header", path.display())));
        }
        let mut header = [0u8; HEADER_LEN as usize];
        f.read_exact(&mut header)?;
        if &header[0..4] != MAGIC {
            return Err(Error::invariant(format!("{} is not a postings store", path.display())));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != FORMAT_VERSION {
            return Err(Error::invariant(format!(
                "postings store version {version}, expected {FORMAT_VERSION}"
            )));
        }
        let mut size = [0u8; 8];
        size.copy_from_slice(&header[8..16]);
        Ok(Self { path, len, num_docs: u64::from_le_bytes(size) })
    }

    /// Collection size recorded in the header.
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    /// Read the single block starting at `offset` through a fresh handle.
    pub fn read_block(&self, offset: u64) -> Result<Vec<u8>> {
        if offset < HEADER_LEN || offset.saturating_add(LEN_PREFIX) > self.len {
            return Err(Error::invariant(format!("corrupt offset {offset} in {}", self.path.display())));
        }
        let mut f = File::open(&self.path)?;
        f.seek(SeekFrom::Start(offset))?;
        let mut prefix = [0u8; LEN_PREFIX as usize];
        f.read_exact(&mut prefix)?;
        let block_len = u32::from_le_bytes(prefix) as u64;
        if offset + LEN_PREFIX + block_len > self.len {
            return Err(Error::invariant(format!(
                "corrupt offset {offset}: block of {block_len} bytes runs past end of {}",
                self.path.display()
            )));
        }
        let mut buf = vec![0u8; block_len as usize];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn load_postings(&self, offset: u64) -> Result<PostingsList> {
        let buf = self.read_block(offset)?;
        let list: PostingsList = bincode::deserialize(&buf)?;
        list.validate()?;
        Ok(list)
    }
}

pub fn save_dictionary(path: &Path, dict: &BTreeMap<String, u64>) -> Result<()> {
    let mut f = create_file(path)?;
    let bytes = bincode::serialize(dict)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_dictionary(path: &Path) -> Result<HashMap<String, u64>> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let dict = bincode::deserialize(&buf)?;
    Ok(dict)
}

pub fn save_doc_lengths(path: &Path, lengths: &BTreeMap<DocId, f64>) -> Result<()> {
    let mut f = create_file(path)?;
    let bytes = bincode::serialize(lengths)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_doc_lengths(path: &Path) -> Result<HashMap<DocId, f64>> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let lengths = bincode::deserialize(&buf)?;
    Ok(lengths)
}

pub fn save_meta(path: &Path, meta: &MetaFile) -> Result<()> {
    let mut f = create_file(path)?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(path: &Path) -> Result<MetaFile> {
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    if meta.version != FORMAT_VERSION {
        return Err(Error::invariant(format!(
            "index manifest version {}, expected {FORMAT_VERSION}",
            meta.version
        )));
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(docs: &[u32]) -> PostingsList {
        let mut list = PostingsList::new();
        for &d in docs {
            list.append(d).unwrap();
        }
        list.build_skip_pointers();
        list
    }

    #[test]
    fn blocks_round_trip_by_offset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("postings.bin");
        let lists = vec![sample(&[1, 1, 2]), sample(&(0..50).collect::<Vec<u32>>()), sample(&[7])];

        let mut w = PostingsWriter::create(&path, 42).unwrap();
        let offsets: Vec<u64> = lists.iter().map(|l| w.append_postings(l).unwrap()).collect();
        w.finish().unwrap();
        assert_eq!(offsets[0], HEADER_LEN);

        let r = PostingsReader::open(&path).unwrap();
        assert_eq!(r.num_docs(), 42);
        // Read in reverse to show blocks do not depend on each other.
        for (list, offset) in lists.iter().zip(&offsets).rev() {
            assert_eq!(&r.load_postings(*offset).unwrap(), list);
        }
    }

    #[test]
    fn corrupt_offsets_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("postings.bin");
        let mut w = PostingsWriter::create(&path, 1).unwrap();
        let offset = w.append_block(b"hello").unwrap();
        w.finish().unwrap();

        let r = PostingsReader::open(&path).unwrap();
        assert_eq!(r.read_block(offset).unwrap(), b"hello");
        for bad in [0, 3, offset + 2, offset + 100] {
            assert!(matches!(r.read_block(bad).unwrap_err(), Error::InvariantViolation(_)), "offset {bad}");
        }
    }

    #[test]
    fn rejects_foreign_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.bin");
        fs::write(&path, b"not a postings store at all").unwrap();
        assert!(matches!(PostingsReader::open(&path).unwrap_err(), Error::InvariantViolation(_)));
        fs::write(&path, b"SKPD").unwrap();
        assert!(matches!(PostingsReader::open(&path).unwrap_err(), Error::InvariantViolation(_)));
    }

    #[test]
    fn failed_promotion_drops_the_old_manifest() {
        let dir = tempdir().unwrap();
        let target = IndexPaths::new(dir.path().join("dict"), dir.path().join("post"));
        fs::write(&target.lengths, b"old lengths").unwrap();
        let old = MetaFile { num_docs: 3, num_terms: 5, created_at: String::new(), version: FORMAT_VERSION };
        save_meta(&target.meta, &old).unwrap();
        // A non-empty directory where the postings file should go makes the second move fail.
        fs::create_dir_all(target.postings.join("x")).unwrap();

        let staging = target.staging();
        for path in staging.all() {
            fs::write(path, b"new").unwrap();
        }
        assert!(staging.promote_to(&target).is_err());
        assert!(!target.meta.exists());
        assert!(!target.dictionary.exists());
    }

    #[test]
    fn sidecar_paths_follow_dictionary() {
        let paths = IndexPaths::new("out/dictionary.txt", "out/postings.txt");
        assert_eq!(paths.lengths, PathBuf::from("out/dictionary.txt.lengths"));
        assert_eq!(paths.meta, PathBuf::from("out/dictionary.txt.meta.json"));
        assert_eq!(paths.staging().postings, PathBuf::from("out/postings.txt.tmp"));
        let paths = paths.with_lengths("elsewhere.bin");
        assert_eq!(paths.lengths, PathBuf::from("elsewhere.bin"));
    }
}
