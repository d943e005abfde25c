//! Query execution over a written index.
//!
//! Ranking is lnc.ltc: documents weigh terms by `1 + log10(tf)` and are cosine
//! normalized by the norm stored at build time; queries weigh terms by
//! `(1 + log10(qtf)) * log10(N / df)`. The query vector is left
//! unnormalized; its length is the same for every document.

use rayon::prelude::*;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use crate::error::{Error, Result};
use crate::persist::{load_dictionary, load_doc_lengths, load_meta, IndexPaths, PostingsReader};
use crate::postings::{DocId, PostingsList};
use crate::scoring::{doc_weight, query_weight};

pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Maximum number of documents returned per query.
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K }
    }
}

/// A document and its cosine score.
///
/// Ordered so that the better-ranked document is the greater one: higher
/// score first, then lower doc id.
#[derive(Debug, Clone, Copy)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

impl Ord for ScoredDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.doc_id.cmp(&self.doc_id))
    }
}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScoredDoc {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredDoc {}

/// The `k` best documents, best first, without sorting the whole input.
///
/// Keeps a min-heap of at most `k` entries; a candidate replaces the current
/// worst only if it ranks strictly higher.
pub fn top_k<I: IntoIterator<Item = ScoredDoc>>(candidates: I, k: usize) -> Vec<ScoredDoc> {
    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<ScoredDoc>> = BinaryHeap::with_capacity(k);
    for doc in candidates {
        if heap.len() < k {
            heap.push(Reverse(doc));
        } else if let Some(mut worst) = heap.peek_mut() {
            if doc > worst.0 {
                *worst = Reverse(doc);
            }
        }
    }
    let mut ranked: Vec<ScoredDoc> = heap.into_iter().map(|Reverse(d)| d).collect();
    ranked.sort_unstable_by(|a, b| b.cmp(a));
    ranked
}

/// A read-only index session. Dictionary, document norms and collection size
/// are loaded once; postings are loaded per query term.
pub struct LoadedIndex {
    dictionary: HashMap<String, u64>,
    doc_norms: HashMap<DocId, f64>,
    postings: PostingsReader,
    num_docs: u64,
    config: SearchConfig,
}

impl LoadedIndex {
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        let postings = PostingsReader::open(&paths.postings)?;
        let num_docs = postings.num_docs();
        if paths.meta.exists() {
            let meta = load_meta(&paths.meta)?;
            if meta.num_docs != num_docs {
                return Err(Error::invariant(format!(
                    "manifest records {} documents but the postings store records {num_docs}",
                    meta.num_docs
                )));
            }
        }
        let dictionary = load_dictionary(&paths.dictionary)?;
        let doc_norms = load_doc_lengths(&paths.lengths)?;
        tracing::info!(num_docs, num_terms = dictionary.len(), "index loaded");
        Ok(Self {
            dictionary,
            doc_norms,
            postings,
            num_docs,
            config: SearchConfig::default(),
        })
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    /// The postings list of `term`, or `None` when the term was never indexed.
    pub fn postings_for(&self, term: &str) -> Result<Option<PostingsList>> {
        match self.dictionary.get(term) {
            Some(&offset) => Ok(Some(self.postings.load_postings(offset)?)),
            None => Ok(None),
        }
    }

    /// Rank documents against the query terms.
    pub fn execute_scored(&self, terms: &[String]) -> Result<Vec<ScoredDoc>> {
        let mut query_tf: BTreeMap<&str, u32> = BTreeMap::new();
        for term in terms {
            *query_tf.entry(term.as_str()).or_insert(0) += 1;
        }

        let mut scores: HashMap<DocId, f64> = HashMap::new();
        for (term, qtf) in query_tf {
            let Some(list) = self.postings_for(term)? else {
                tracing::debug!(term, "query term not in dictionary");
                continue;
            };
            let w_tq = query_weight(qtf, self.num_docs, list.doc_freq());
            for p in list.postings() {
                *scores.entry(p.doc_id).or_insert(0.0) += doc_weight(p.term_freq) * w_tq;
            }
        }

        let candidates = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(doc_id, score)| {
                let norm = self
                    .doc_norms
                    .get(&doc_id)
                    .copied()
                    .filter(|n| *n > 0.0)
                    .ok_or_else(|| Error::invariant(format!("document {doc_id} has no length norm")))?;
                Ok(ScoredDoc { doc_id, score: score / norm })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(top_k(candidates, self.config.top_k))
    }

    pub fn execute(&self, terms: &[String]) -> Result<Vec<DocId>> {
        Ok(self.execute_scored(terms)?.into_iter().map(|d| d.doc_id).collect())
    }

    /// Run independent queries in parallel. Results keep the input order.
    pub fn execute_batch(&self, queries: &[Vec<String>]) -> Result<Vec<Vec<DocId>>> {
        queries.par_iter().map(|terms| self.execute(terms)).collect()
    }

    /// Documents containing every term, ascending. Lists are intersected
    /// shortest first, following skip pointers.
    pub fn intersect(&self, terms: &[String]) -> Result<Vec<DocId>> {
        let mut lists = Vec::with_capacity(terms.len());
        for term in terms {
            match self.postings_for(term)? {
                Some(list) => lists.push(list),
                None => return Ok(Vec::new()),
            }
        }
        lists.sort_by_key(|l| l.doc_freq());
        let mut iter = lists.into_iter();
        let Some(first) = iter.next() else {
            return Ok(Vec::new());
        };
        let mut acc = first;
        for list in iter {
            let docs = acc.intersect(&list);
            if docs.is_empty() {
                return Ok(docs);
            }
            acc = PostingsList::new();
            for doc in docs {
                acc.append(doc)?;
            }
            acc.build_skip_pointers();
        }
        Ok(acc.postings().iter().map(|p| p.doc_id).collect())
    }
}
