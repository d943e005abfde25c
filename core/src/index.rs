//! Index construction.
//!
//! `IndexBuilder` is the whole build context: term -> postings, doc id -> norm,
//! and the last document seen. Documents must arrive in strictly ascending id
//! order, which is what lets `PostingsList::append` treat "same as the last
//! posting" as "same document".

use rayon::prelude::*;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::persist::{save_dictionary, save_doc_lengths, save_meta, IndexPaths, MetaFile, PostingsWriter, FORMAT_VERSION};
use crate::postings::{DocId, PostingsList};
use crate::scoring::doc_norm;
use crate::source::DocumentSource;
use crate::tokenizer::Normalizer;

pub struct IndexBuilder<'n> {
    normalizer: &'n dyn Normalizer,
    postings: BTreeMap<String, PostingsList>,
    doc_norms: BTreeMap<DocId, f64>,
    last_doc: Option<DocId>,
}

impl<'n> IndexBuilder<'n> {
    pub fn new(normalizer: &'n dyn Normalizer) -> Self {
        Self {
            normalizer,
            postings: BTreeMap::new(),
            doc_norms: BTreeMap::new(),
            last_doc: None,
        }
    }

    pub fn num_docs(&self) -> u64 {
        self.doc_norms.len() as u64
    }

    /// Normalize `text` and fold every term occurrence into the index.
    pub fn add_document(&mut self, doc_id: DocId, text: &str) -> Result<()> {
        if let Some(last) = self.last_doc {
            if doc_id <= last {
                return Err(Error::invariant(format!("document {doc_id} added after document {last}")));
            }
        }
        let terms = self.normalizer.normalize(text);
        let mut tf_counts: BTreeMap<&str, u32> = BTreeMap::new();
        for term in &terms {
            *tf_counts.entry(term.as_str()).or_insert(0) += 1;
            match self.postings.get_mut(term.as_str()) {
                Some(list) => list.append(doc_id)?,
                None => {
                    let mut list = PostingsList::new();
                    list.append(doc_id)?;
                    self.postings.insert(term.clone(), list);
                }
            }
        }
        self.doc_norms.insert(doc_id, doc_norm(tf_counts.into_values()));
        self.last_doc = Some(doc_id);
        Ok(())
    }

    /// Fold in a builder that covered a later, disjoint range of documents.
    pub fn merge(&mut self, later: IndexBuilder<'_>) -> Result<()> {
        if let (Some(last), Some((&first, _))) = (self.last_doc, later.doc_norms.first_key_value()) {
            if first <= last {
                return Err(Error::invariant(format!(
                    "partial index starting at document {first} merged after document {last}"
                )));
            }
        }
        for (term, list) in later.postings {
            match self.postings.entry(term) {
                Entry::Occupied(mut e) => e.get_mut().merge(list)?,
                Entry::Vacant(e) => {
                    e.insert(list);
                }
            }
        }
        self.doc_norms.extend(later.doc_norms);
        self.last_doc = later.last_doc.or(self.last_doc);
        Ok(())
    }

    pub fn finish(mut self) -> BuiltIndex {
        for list in self.postings.values_mut() {
            list.build_skip_pointers();
        }
        BuiltIndex {
            num_docs: self.num_docs(),
            postings: self.postings,
            doc_norms: self.doc_norms,
        }
    }
}

/// A finished in-memory index, ready to be written out.
#[derive(Debug, Default)]
pub struct BuiltIndex {
    pub postings: BTreeMap<String, PostingsList>,
    pub doc_norms: BTreeMap<DocId, f64>,
    pub num_docs: u64,
}

impl BuiltIndex {
    /// Write all four stores. Files are staged next to their targets and only
    /// renamed into place once every store is written; on failure the staged
    /// files are removed and nothing at `paths` is touched.
    pub fn write(&self, paths: &IndexPaths) -> Result<()> {
        let staging = paths.staging();
        let result = self.write_stores(&staging).and_then(|_| staging.promote_to(paths));
        if result.is_err() {
            staging.remove_all();
        }
        result
    }

    fn write_stores(&self, paths: &IndexPaths) -> Result<()> {
        let mut writer = PostingsWriter::create(&paths.postings, self.num_docs)?;
        let mut dictionary: BTreeMap<String, u64> = BTreeMap::new();
        for (term, list) in &self.postings {
            let offset = writer.append_postings(list)?;
            dictionary.insert(term.clone(), offset);
        }
        writer.finish()?;

        save_dictionary(&paths.dictionary, &dictionary)?;
        save_doc_lengths(&paths.lengths, &self.doc_norms)?;
        let meta = MetaFile {
            num_docs: self.num_docs,
            num_terms: dictionary.len() as u64,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "".into()),
            version: FORMAT_VERSION,
        };
        save_meta(&paths.meta, &meta)?;
        tracing::info!(
            num_docs = self.num_docs,
            num_terms = dictionary.len(),
            postings = %paths.postings.display(),
            "index stores written"
        );
        Ok(())
    }
}

/// Build an index from every document in `source`, one document at a time in
/// ascending id order. Any unreadable document aborts the build.
pub fn build(source: &dyn DocumentSource, normalizer: &dyn Normalizer) -> Result<BuiltIndex> {
    let ids = source.list_ids()?;
    let mut builder = IndexBuilder::new(normalizer);
    for &id in &ids {
        let text = source.read(id)?;
        builder.add_document(id, &text)?;
    }
    tracing::info!(num_docs = builder.num_docs(), num_terms = builder.postings.len(), "ingested documents");
    Ok(builder.finish())
}

/// Like [`build`], but splits the ascending id list into up to `jobs`
/// contiguous chunks, accumulates each chunk into its own builder on the rayon
/// pool, then merges the partial builders in chunk order. The result is the
/// same as the sequential build.
pub fn build_parallel(source: &dyn DocumentSource, normalizer: &dyn Normalizer, jobs: usize) -> Result<BuiltIndex> {
    if jobs <= 1 {
        return build(source, normalizer);
    }
    let ids = source.list_ids()?;
    if ids.is_empty() {
        return Ok(IndexBuilder::new(normalizer).finish());
    }
    let chunk_len = (ids.len() + jobs - 1) / jobs;
    let partials = ids
        .par_chunks(chunk_len)
        .map(|chunk| {
            let mut builder = IndexBuilder::new(normalizer);
            for &id in chunk {
                let text = source.read(id)?;
                builder.add_document(id, &text)?;
            }
            Ok(builder)
        })
        .collect::<Result<Vec<IndexBuilder<'_>>>>()?;

    let mut merged = IndexBuilder::new(normalizer);
    for partial in partials {
        merged.merge(partial)?;
    }
    tracing::info!(
        num_docs = merged.num_docs(),
        num_terms = merged.postings.len(),
        chunks = (ids.len() + chunk_len - 1) / chunk_len,
        "ingested documents"
    );
    Ok(merged.finish())
}
