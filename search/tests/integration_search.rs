use search::{load_queries, run_search};
use skipdex_core::{build, DirectorySource, Error, IndexPaths, SearchConfig, StemmingNormalizer};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn build_tiny_index(dir: &Path) -> IndexPaths {
    let docs = dir.join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("1"), "The cat sat.").unwrap();
    fs::write(docs.join("2"), "The cat sat on the mat.").unwrap();
    fs::write(docs.join("3"), "Dogs bark at the mailman.").unwrap();
    fs::write(docs.join("10"), "A cat and a dog, sitting.").unwrap();

    let paths = IndexPaths::new(dir.join("dictionary.txt"), dir.join("postings.txt"));
    build(&DirectorySource::new(&docs), &StemmingNormalizer::default())
        .unwrap()
        .write(&paths)
        .unwrap();
    paths
}

#[test]
fn search_writes_ranked_results() {
    let dir = tempdir().unwrap();
    let paths = build_tiny_index(dir.path());
    let queries = dir.path().join("queries.txt");
    fs::write(&queries, "cat sat\nunknownword\ndogs\n").unwrap();
    let output = dir.path().join("results.txt");

    let answered = run_search(&paths, &queries, &output, SearchConfig::default(), &StemmingNormalizer::default()).unwrap();
    assert_eq!(answered, 3);

    let results = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = results.split('\n').collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("1 2"));
    assert!(lines[0].split(' ').any(|id| id == "10"));
    assert!(!lines[0].split(' ').any(|id| id == "3"));
    assert_eq!(lines[1], "");
    assert_eq!(lines[2], "3 10");
    assert!(!results.ends_with('\n'));
    assert!(results.lines().all(|l| l == l.trim_end()));
}

#[test]
fn top_k_limits_each_line() {
    let dir = tempdir().unwrap();
    let paths = build_tiny_index(dir.path());
    let queries = dir.path().join("queries.txt");
    fs::write(&queries, "cat").unwrap();
    let output = dir.path().join("results.txt");

    run_search(&paths, &queries, &output, SearchConfig { top_k: 1 }, &StemmingNormalizer::default()).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), "1");
}

#[test]
fn malformed_query_file_is_an_input_error() {
    let dir = tempdir().unwrap();
    let queries = dir.path().join("queries.bin");
    fs::write(&queries, [0xff, 0xfe, 0x00, 0xc3]).unwrap();
    assert!(matches!(load_queries(&queries).unwrap_err(), Error::Input(_)));
    assert!(matches!(load_queries(&dir.path().join("absent")).unwrap_err(), Error::Input(_)));
}

#[test]
fn missing_index_fails() {
    let dir = tempdir().unwrap();
    let queries = dir.path().join("queries.txt");
    fs::write(&queries, "cat").unwrap();
    let paths = IndexPaths::new(dir.path().join("nope.dict"), dir.path().join("nope.post"));
    let output = dir.path().join("results.txt");
    assert!(run_search(&paths, &queries, &output, SearchConfig::default(), &StemmingNormalizer::default()).is_err());
    assert!(!output.exists());
}
