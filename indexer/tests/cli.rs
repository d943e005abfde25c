use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn indexer() -> Command {
    Command::new(env!("CARGO_BIN_EXE_indexer"))
}

#[test]
fn missing_arguments_print_usage_and_exit_2() {
    let out = indexer().output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("Usage: indexer"), "stdout was {stdout:?}");

    let out = indexer().args(["-i", "docs", "-d", "dict"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8(out.stdout).unwrap().contains("Usage:"));
}

#[test]
fn builds_an_index_from_a_directory() {
    let dir = tempdir().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("1"), "The cat sat.").unwrap();
    fs::write(docs.join("2"), "Dogs bark.").unwrap();
    let dict = dir.path().join("dictionary.txt");
    let post = dir.path().join("postings.txt");

    let status = indexer()
        .arg("-i")
        .arg(&docs)
        .arg("-d")
        .arg(&dict)
        .arg("-p")
        .arg(&post)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(dict.exists());
    assert!(post.exists());
    assert!(dir.path().join("dictionary.txt.lengths").exists());
}

#[test]
fn bad_input_directory_fails() {
    let dir = tempdir().unwrap();
    let status = indexer()
        .arg("-i")
        .arg(dir.path().join("absent"))
        .arg("-d")
        .arg(dir.path().join("dict"))
        .arg("-p")
        .arg(dir.path().join("post"))
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(!dir.path().join("dict").exists());
}
