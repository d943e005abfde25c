//! Postings lists with skip pointers.
//!
//! A list is an array of `(doc_id, term_freq)` pairs sorted by doc id plus a
//! sparse side table of skip pointers (`from` index -> `to` index). Skip
//! pointers are only ever a shortcut: every traversal is correct without them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type DocId = u32;
pub type TermFreq = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: TermFreq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipPointer {
    pub from: u32,
    pub to: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingsList {
    doc_freq: u32,
    postings: Vec<Posting>,
    /// Sorted by `from`.
    skips: Vec<SkipPointer>,
}

impl PostingsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn doc_freq(&self) -> u32 {
        self.doc_freq
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    pub fn skip_pointers(&self) -> &[SkipPointer] {
        &self.skips
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn last_doc(&self) -> Option<DocId> {
        self.postings.last().map(|p| p.doc_id)
    }

    /// Record one occurrence of the term in `doc_id`.
    ///
    /// Repeated calls for the document that was appended last bump its term
    /// frequency in place, so a single pass over a document's tokens stays
    /// linear in the number of occurrences.
    pub fn append(&mut self, doc_id: DocId) -> Result<()> {
        match self.postings.last_mut() {
            Some(last) if last.doc_id == doc_id => {
                last.term_freq += 1;
            }
            Some(last) if last.doc_id > doc_id => {
                return Err(Error::invariant(format!(
                    "doc {doc_id} appended after doc {}",
                    last.doc_id
                )));
            }
            _ => {
                self.postings.push(Posting { doc_id, term_freq: 1 });
                self.doc_freq += 1;
            }
        }
        Ok(())
    }

    /// Place `floor(sqrt(n))` evenly spaced skip pointers.
    ///
    /// Starting from index 0, each pointer jumps `n / floor(sqrt(n))` entries
    /// forward (clamped to the final index) and the next pointer starts where
    /// the previous one landed. The last pointer always lands on the final
    /// index. Lists of length 0 or 1 get no pointers.
    pub fn build_skip_pointers(&mut self) {
        self.skips.clear();
        let n = self.postings.len();
        if n <= 1 {
            return;
        }
        let skip_count = (n as f64).sqrt().floor() as usize;
        let interval = n / skip_count;
        let last = n - 1;

        let mut anchor = 0usize;
        for placed in 0..skip_count {
            let target = if placed + 1 == skip_count {
                last
            } else {
                (anchor + interval).min(last)
            };
            self.skips.push(SkipPointer {
                from: anchor as u32,
                to: target as u32,
            });
            anchor = target;
        }
    }

    /// Target of the skip pointer starting at `index`, if one exists.
    pub fn skip_target(&self, index: usize) -> Option<usize> {
        self.skips
            .binary_search_by_key(&(index as u32), |s| s.from)
            .ok()
            .map(|i| self.skips[i].to as usize)
    }

    /// Documents present in both lists, ascending.
    pub fn intersect(&self, other: &PostingsList) -> Vec<DocId> {
        let (a, b) = (&self.postings, &other.postings);
        let mut out = Vec::with_capacity(a.len().min(b.len()));
        let (mut i, mut j) = (0usize, 0usize);
        while i < a.len() && j < b.len() {
            let (da, db) = (a[i].doc_id, b[j].doc_id);
            if da == db {
                out.push(da);
                i += 1;
                j += 1;
            } else if da < db {
                i = self.advance(i, db);
            } else {
                j = other.advance(j, da);
            }
        }
        out
    }

    /// Move forward from `index` towards `target`, following skip pointers
    /// that do not overshoot it and stepping one entry otherwise.
    fn advance(&self, index: usize, target: DocId) -> usize {
        let mut pos = index;
        while let Some(to) = self.skip_target(pos) {
            if self.postings[to].doc_id <= target {
                pos = to;
            } else {
                break;
            }
        }
        if pos == index {
            index + 1
        } else {
            pos
        }
    }

    /// Append the postings of a list accumulated over a later, disjoint range
    /// of documents. Skip pointers are dropped and must be rebuilt.
    pub fn merge(&mut self, other: PostingsList) -> Result<()> {
        if let (Some(last), Some(first)) = (self.last_doc(), other.postings.first()) {
            if first.doc_id <= last {
                return Err(Error::invariant(format!(
                    "cannot merge postings starting at doc {} after doc {last}",
                    first.doc_id
                )));
            }
        }
        self.doc_freq += other.doc_freq;
        self.postings.extend(other.postings);
        self.skips.clear();
        Ok(())
    }

    /// Check the structural invariants of a list read back from disk.
    pub fn validate(&self) -> Result<()> {
        if self.doc_freq as usize != self.postings.len() {
            return Err(Error::invariant(format!(
                "doc_freq {} does not match {} postings",
                self.doc_freq,
                self.postings.len()
            )));
        }
        for pair in self.postings.windows(2) {
            if pair[0].doc_id >= pair[1].doc_id {
                return Err(Error::invariant(format!(
                    "postings out of order: doc {} before doc {}",
                    pair[0].doc_id, pair[1].doc_id
                )));
            }
        }
        if self.postings.iter().any(|p| p.term_freq == 0) {
            return Err(Error::invariant("posting with zero term frequency"));
        }
        let n = self.postings.len() as u32;
        for s in &self.skips {
            if s.to <= s.from || s.to >= n {
                return Err(Error::invariant(format!(
                    "skip pointer {} -> {} out of range for {n} postings",
                    s.from, s.to
                )));
            }
        }
        if let Some(last) = self.skips.last() {
            if last.to + 1 != n {
                return Err(Error::invariant("last skip pointer does not reach the final posting"));
            }
        }
        Ok(())
    }
}
