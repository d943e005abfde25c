use anyhow::Result;
use skipdex_core::{DocId, Error, IndexPaths, LoadedIndex, Normalizer, SearchConfig};
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Read a query file: one query per line. A file that is not UTF-8 is an
/// input error.
pub fn load_queries(path: &Path) -> skipdex_core::Result<Vec<String>> {
    let bytes = fs::read(path).map_err(|e| Error::Input(format!("cannot read queries {}: {e}", path.display())))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| Error::Input(format!("query file {} is not valid UTF-8", path.display())))?;
    Ok(text.lines().map(|l| l.trim_end().to_string()).collect())
}

/// One line per query, doc ids separated by single spaces, no trailing
/// whitespace and no newline after the last line.
pub fn format_results(results: &[Vec<DocId>]) -> String {
    results
        .iter()
        .map(|ids| ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run every query in `queries_file` against the index and write the ranked
/// doc ids to `results_file`. Returns the number of queries answered.
pub fn run_search(
    paths: &IndexPaths,
    queries_file: &Path,
    results_file: &Path,
    config: SearchConfig,
    normalizer: &dyn Normalizer,
) -> Result<usize> {
    let start = Instant::now();
    let index = LoadedIndex::open(paths)?.with_config(config);
    let queries = load_queries(queries_file)?;
    tracing::info!(queries = queries.len(), top_k = config.top_k, "running queries");

    let parsed: Vec<Vec<String>> = queries.iter().map(|q| normalizer.normalize(q)).collect();
    let results = index.execute_batch(&parsed)?;
    fs::write(results_file, format_results(&results))?;

    let elapsed = start.elapsed();
    tracing::info!(
        queries = results.len(),
        took_s = elapsed.as_secs_f64(),
        results = %results_file.display(),
        "search complete"
    );
    Ok(results.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_without_trailing_whitespace() {
        let out = format_results(&[vec![3, 1, 2], vec![], vec![7]]);
        assert_eq!(out, "3 1 2\n\n7");
        assert_eq!(format_results(&[]), "");
    }
}
