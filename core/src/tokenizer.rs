use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Turns raw document or query text into the normalized terms the index is
/// keyed by. Must be deterministic: the same text always yields the same
/// sequence.
pub trait Normalizer: Sync {
    fn normalize(&self, text: &str) -> Vec<String>;
}

impl<F> Normalizer for F
where
    F: Fn(&str) -> Vec<String> + Sync,
{
    fn normalize(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizerConfig {
    /// Drop common English function words before stemming.
    pub remove_stopwords: bool,
}

/// NFKC normalization, lowercasing, word extraction and English stemming.
#[derive(Debug, Clone, Copy, Default)]
pub struct StemmingNormalizer {
    config: NormalizerConfig,
}

impl StemmingNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }
}

impl Normalizer for StemmingNormalizer {
    fn normalize(&self, text: &str) -> Vec<String> {
        tokenize(text, self.config.remove_stopwords)
    }
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text into stemmed terms. Tokens made only of punctuation never
/// match the word pattern and are dropped.
pub fn tokenize(text: &str, remove_stopwords: bool) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut terms = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str().trim_end_matches('\'');
        if remove_stopwords && is_stopword(token) { continue; }
        terms.push(STEMMER.stem(token).into_owned());
    }
    terms
}
