//! Weighting functions for lnc.ltc ranking.

/// Log-scaled term frequency, `1 + log10(tf)`; zero for `tf == 0`.
pub fn log_tf(tf: u32) -> f64 {
    if tf == 0 {
        0.0
    } else {
        1.0 + (tf as f64).log10()
    }
}

/// Inverse document frequency, `log10(N / df)`; zero when `df == 0`.
pub fn idf(num_docs: u64, doc_freq: u32) -> f64 {
    if doc_freq == 0 || num_docs == 0 {
        return 0.0;
    }
    (num_docs as f64 / doc_freq as f64).log10()
}

/// Query-side weight (ltc before normalization).
pub fn query_weight(query_tf: u32, num_docs: u64, doc_freq: u32) -> f64 {
    log_tf(query_tf) * idf(num_docs, doc_freq)
}

/// Document-side weight (lnc before normalization): no idf.
pub fn doc_weight(tf: u32) -> f64 {
    log_tf(tf)
}

/// Euclidean length of a document's log-tf vector, given the term frequency of
/// each distinct term it contains.
pub fn doc_norm<I: IntoIterator<Item = u32>>(term_freqs: I) -> f64 {
    term_freqs
        .into_iter()
        .map(|tf| {
            let w = log_tf(tf);
            w * w
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_tf_values() {
        assert_eq!(log_tf(0), 0.0);
        assert_eq!(log_tf(1), 1.0);
        assert!((log_tf(10) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn idf_is_zero_for_terms_in_every_document() {
        assert_eq!(idf(1, 1), 0.0);
        assert_eq!(idf(5, 5), 0.0);
        assert!((idf(100, 1) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn norm_counts_every_distinct_term() {
        assert_eq!(doc_norm([1, 1, 1, 1]), 2.0);
        let w = 1.0 + 2f64.log10();
        assert!((doc_norm([2, 1]) - (w * w + 1.0).sqrt()).abs() < 1e-12);
        assert_eq!(doc_norm(std::iter::empty()), 0.0);
    }
}
