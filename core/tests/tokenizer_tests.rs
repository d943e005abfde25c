use skipdex_core::tokenizer::{tokenize, Normalizer, NormalizerConfig, StemmingNormalizer};

#[test]
fn it_normalizes_and_stems() {
    let words = tokenize("Running Runners RUN! The ＣＡＴＳ' menu.", false);
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // NFKC folds fullwidth letters before lowercasing
    assert!(words.contains(&"cat".to_string()));
    assert!(words.contains(&"the".to_string()));
}

#[test]
fn it_filters_stopwords_when_asked() {
    let normalizer = StemmingNormalizer::new(NormalizerConfig { remove_stopwords: true });
    let words = normalizer.normalize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"fox".to_string()));
}

#[test]
fn it_is_deterministic_and_drops_punctuation() {
    let normalizer = StemmingNormalizer::default();
    let text = "Hello, world... -- ?! hello";
    assert_eq!(normalizer.normalize(text), normalizer.normalize(text));
    assert_eq!(normalizer.normalize(text), vec!["hello", "world", "hello"]);
}
