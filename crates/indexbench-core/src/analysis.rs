//! Text analysis capability
//!
//! The analyze workload only needs a token count per record body. Analyzers
//! are built from tantivy's tokenizer pipeline and looked up by name, the
//! same names the index uses for its text fields.

use tantivy::tokenizer::{
    Language, LowerCaser, RawTokenizer, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer,
    TokenStream, WhitespaceTokenizer,
};

use crate::error::{BenchError, Result};

/// Names accepted by [`Analyzer::by_name`]
pub const ANALYZER_NAMES: &[&str] = &["standard", "whitespace", "en_stem", "keyword"];

/// Something that splits text into tokens.
///
/// Takes `&mut self` because tokenizers reuse internal buffers; every worker
/// owns its own clone.
pub trait Tokenize {
    fn token_count(&mut self, text: &str) -> usize;
}

/// Named tokenizer pipeline
#[derive(Clone)]
pub struct Analyzer {
    name: String,
    inner: TextAnalyzer,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer").field("name", &self.name).finish()
    }
}

impl Analyzer {
    /// Build an analyzer by name.
    ///
    /// `default` is an alias for `standard` and `raw` for `keyword`.
    pub fn by_name(name: &str) -> Result<Self> {
        let inner = match name {
            "standard" | "default" => TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(40))
                .filter(LowerCaser)
                .build(),
            "whitespace" => TextAnalyzer::builder(WhitespaceTokenizer::default()).build(),
            "en_stem" => TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(40))
                .filter(LowerCaser)
                .filter(Stemmer::new(Language::English))
                .build(),
            "keyword" | "raw" => TextAnalyzer::builder(RawTokenizer::default()).build(),
            other => {
                return Err(BenchError::config(
                    "analyzer",
                    format!(
                        "unknown analyzer '{}', expected one of {}",
                        other,
                        ANALYZER_NAMES.join(", ")
                    ),
                ))
            }
        };
        Ok(Self {
            name: name.to_string(),
            inner,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tokens(&mut self, text: &str) -> Vec<String> {
        let mut stream = self.inner.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        tokens
    }
}

impl Tokenize for Analyzer {
    fn token_count(&mut self, text: &str) -> usize {
        let mut stream = self.inner.token_stream(text);
        let mut count = 0;
        while stream.advance() {
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_lowercases_and_splits() {
        let mut analyzer = Analyzer::by_name("standard").unwrap();
        assert_eq!(
            analyzer.tokens("Water is a Transparent, fluid."),
            vec!["water", "is", "a", "transparent", "fluid"]
        );
        assert_eq!(analyzer.token_count("Water is a Transparent, fluid."), 5);
    }

    #[test]
    fn test_whitespace_keeps_punctuation() {
        let mut analyzer = Analyzer::by_name("whitespace").unwrap();
        assert_eq!(analyzer.tokens("Hello, World"), vec!["Hello,", "World"]);
    }

    #[test]
    fn test_stemming() {
        let mut analyzer = Analyzer::by_name("en_stem").unwrap();
        assert_eq!(analyzer.tokens("running dogs"), vec!["run", "dog"]);
    }

    #[test]
    fn test_keyword_is_one_token() {
        let mut analyzer = Analyzer::by_name("raw").unwrap();
        assert_eq!(analyzer.name(), "raw");
        assert_eq!(analyzer.token_count("the whole body"), 1);
    }

    #[test]
    fn test_clones_are_independent() {
        let mut a = Analyzer::by_name("default").unwrap();
        let mut b = a.clone();
        assert_eq!(a.token_count("one two"), 2);
        assert_eq!(b.token_count("one two three"), 3);
    }

    #[test]
    fn test_unknown_name() {
        let err = Analyzer::by_name("klingon").unwrap_err();
        assert!(err.to_string().contains("unknown analyzer 'klingon'"));
    }
}
