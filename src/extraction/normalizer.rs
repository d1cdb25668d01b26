//! Entity label canonicalization and concept validity filtering.
//!
//! Every word list the filter consults lives in a [`Lexicon`], so the
//! predicate can be retuned per domain through configuration alone.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

use crate::config::NormalizerConfig;

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-_/\\–—+&]+").expect("valid separator pattern"));
static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{Alphabetic}\p{N} ]").expect("valid strip pattern"));

const GENERAL_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his",
    "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "may", "might", "more",
    "most", "must", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or",
    "other", "our", "ours", "out", "over", "own", "same", "she", "should", "so", "some", "such",
    "than", "that", "the", "their", "theirs", "them", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "within", "without",
    "would", "you", "your", "yours", "yet", "via", "upon", "per", "whereas", "whether",
];

/// Words that show up constantly in papers but never name a concept.
const ACADEMIC_TERMS: &[&str] = &[
    "study", "studies", "result", "results", "analysis", "analyses", "method", "methods", "data",
    "figure", "fig", "table", "paper", "research", "approach", "effect", "effects", "however",
    "therefore", "thus", "also", "significant", "significantly", "observed", "showed", "shown",
    "found", "increase", "increases", "decrease", "decreases", "level", "levels", "value",
    "values", "use", "used", "using", "case", "number", "type", "types", "different", "various",
    "important", "present", "previous", "current", "total", "high", "higher", "low", "lower",
    "first", "second", "section", "example", "conclusion", "introduction", "discussion",
    "abstract", "experiment", "experiments", "sample", "samples", "group", "groups", "model",
    "models", "et", "al", "respectively", "including", "based", "compared", "related", "well",
    "new", "many", "several", "often", "further", "overall", "role", "effect", "factor",
    "factors", "condition", "conditions",
];

const DOMAIN_TERMS: &[&str] = &[
    "photosynthesis", "respiration", "transpiration", "germination", "fermentation",
    "absorption", "oxidation", "reduction", "regulation", "concentration", "nutrition",
    "pollination", "fertilization", "mutation", "evaporation", "precipitation", "radiation",
    "saturation", "irrigation", "fixation", "translation", "transcription", "signaling",
    "flowering", "ripening", "senescence", "phosphorylation", "carboxylation",
];

/// Stems that mark a term as scientific vocabulary.
const DOMAIN_STEMS: &[&str] = &[
    "photo", "chloro", "phyll", "synth", "enzym", "protein", "membran", "hormon", "respir",
    "transpir", "stomat", "oxid", "ferment", "germin", "nitro", "carbon", "metabol", "catal",
    "phosphor", "hydro", "molec", "genom", "mitochond", "chlorop", "thylak", "xylem", "phloem",
];

const GENERIC_SUFFIXES: &[&str] = &["ing", "ed", "ly", "tion", "ness", "ment", "able", "ible"];

/// Why a candidate label is not a valid concept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("label is empty after cleaning")]
    Empty,

    #[error("label has {len} characters, minimum is {min}")]
    TooShort { len: usize, min: usize },

    #[error("label has {len} characters, maximum is {max}")]
    TooLong { len: usize, max: usize },

    #[error("label is purely numeric")]
    Numeric,

    #[error("label contains non-alphabetic characters")]
    NonAlphabetic,

    #[error("'{0}' is a stopword")]
    Stopword(String),

    #[error("'{0}' is a generic derived word")]
    GenericTerm(String),
}

/// Word lists backing the validity predicate.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    stopwords: HashSet<String>,
    domain_terms: HashSet<String>,
    domain_stems: Vec<String>,
    generic_suffixes: Vec<String>,
}

impl Lexicon {
    /// English stopwords, academic filler and plant-science vocabulary.
    pub fn builtin() -> Self {
        Self {
            stopwords: GENERAL_STOPWORDS
                .iter()
                .chain(ACADEMIC_TERMS)
                .map(|w| w.to_string())
                .collect(),
            domain_terms: DOMAIN_TERMS.iter().map(|w| w.to_string()).collect(),
            domain_stems: DOMAIN_STEMS.iter().map(|w| w.to_string()).collect(),
            generic_suffixes: GENERIC_SUFFIXES.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Lexicon with no word lists at all; only length and character rules apply.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords
            .extend(words.into_iter().map(|w| clean_label(w.as_ref())));
        self
    }

    pub fn with_domain_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.domain_terms
            .extend(terms.into_iter().map(|w| clean_label(w.as_ref())));
        self
    }

    pub fn with_domain_stems<I, S>(mut self, stems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.domain_stems
            .extend(stems.into_iter().map(|w| w.as_ref().to_lowercase()));
        self
    }

    pub fn with_generic_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.generic_suffixes
            .extend(suffixes.into_iter().map(|w| w.as_ref().to_lowercase()));
        self
    }

    pub fn is_stopword(&self, cleaned: &str) -> bool {
        self.stopwords.contains(cleaned)
    }

    /// Recognised scientific term: listed outright or built on a known stem.
    pub fn is_domain_term(&self, cleaned: &str) -> bool {
        self.domain_terms.contains(cleaned)
            || self.domain_stems.iter().any(|stem| cleaned.contains(stem.as_str()))
    }

    fn generic_suffix(&self, token: &str) -> Option<&str> {
        self.generic_suffixes
            .iter()
            .find(|suffix| token.len() > suffix.len() + 2 && token.ends_with(suffix.as_str()))
            .map(String::as_str)
    }
}

/// Lower-case, turn separators into single spaces and strip everything else
/// that is not alphanumeric.
pub fn clean_label(raw: &str) -> String {
    let lowercase = raw.to_lowercase();
    let spaced = SEPARATORS.replace_all(&lowercase, " ");
    let stripped = NON_ALPHANUMERIC.replace_all(&spaced, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic identifier for a label: `"Chlorophyll a"` and
/// `"chlorophyll-a"` both become `chlorophyll_a`.
pub fn canonical_id(raw: &str) -> String {
    clean_label(raw).replace(' ', "_")
}

/// Canonicalizes raw labels and decides whether they name a concept.
#[derive(Debug, Clone)]
pub struct EntityNormalizer {
    lexicon: Lexicon,
    min_length: usize,
    max_length: usize,
}

impl Default for EntityNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityNormalizer {
    pub fn new() -> Self {
        Self::from_config(&NormalizerConfig::default())
    }

    pub fn from_config(config: &NormalizerConfig) -> Self {
        let lexicon = Lexicon::builtin()
            .with_stopwords(config.extra_stopwords.iter().chain(&config.extra_academic_terms))
            .with_domain_terms(&config.extra_domain_terms)
            .with_domain_stems(&config.extra_domain_stems);
        Self::with_lexicon(lexicon, config.min_length, config.max_length)
    }

    pub fn with_lexicon(lexicon: Lexicon, min_length: usize, max_length: usize) -> Self {
        Self {
            lexicon,
            min_length,
            max_length,
        }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn canonical_id(&self, raw: &str) -> String {
        canonical_id(raw)
    }

    /// Canonical id for a valid concept label, or the reason it was rejected.
    pub fn normalize(&self, raw: &str) -> Result<String, Rejection> {
        let cleaned = clean_label(raw);
        self.check(&cleaned)?;
        Ok(cleaned.replace(' ', "_"))
    }

    pub fn is_valid(&self, raw: &str) -> bool {
        self.normalize(raw).is_ok()
    }

    /// Token that should split a run of candidate words.
    pub fn is_stopword_token(&self, token: &str) -> bool {
        self.lexicon.is_stopword(&clean_label(token))
    }

    fn check(&self, cleaned: &str) -> Result<(), Rejection> {
        if cleaned.is_empty() {
            return Err(Rejection::Empty);
        }
        if cleaned.chars().all(|c| c.is_numeric() || c == ' ') {
            return Err(Rejection::Numeric);
        }

        let len = cleaned.chars().count();
        if len < self.min_length {
            return Err(Rejection::TooShort {
                len,
                min: self.min_length,
            });
        }
        if len > self.max_length {
            return Err(Rejection::TooLong {
                len,
                max: self.max_length,
            });
        }
        if !cleaned.chars().all(|c| c.is_alphabetic() || c == ' ') {
            return Err(Rejection::NonAlphabetic);
        }

        if self.lexicon.is_stopword(cleaned)
            || cleaned
                .split(' ')
                .all(|token| self.lexicon.is_stopword(token))
        {
            return Err(Rejection::Stopword(cleaned.to_string()));
        }

        if !cleaned.contains(' ')
            && self.lexicon.generic_suffix(cleaned).is_some()
            && !self.lexicon.is_domain_term(cleaned)
        {
            return Err(Rejection::GenericTerm(cleaned.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chlorophyll_variants_share_an_id() {
        let normalizer = EntityNormalizer::new();
        let a = normalizer.normalize("Chlorophyll a").unwrap();
        let b = normalizer.normalize("chlorophyll-a").unwrap();
        assert_eq!(a, "chlorophyll_a");
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_id_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(canonical_id("  Stomatal   Opening! "), "stomatal_opening");
        assert_eq!(canonical_id("plant's (leaf)"), "plants_leaf");
        assert_eq!(canonical_id("CO₂/O₂ ratio"), canonical_id("co₂ o₂ ratio"));
        assert_eq!(canonical_id("%%%"), "");
    }

    #[test]
    fn rejects_by_length() {
        let normalizer = EntityNormalizer::new();
        assert!(matches!(
            normalizer.normalize("ab"),
            Err(Rejection::TooShort { len: 2, min: 3 })
        ));
        assert!(matches!(
            normalizer.normalize("an extraordinarily long concept label"),
            Err(Rejection::TooLong { .. })
        ));
        assert!(normalizer.normalize("ABA").is_ok());
    }

    #[test]
    fn rejects_numbers_and_mixed_tokens() {
        let normalizer = EntityNormalizer::new();
        assert_eq!(normalizer.normalize("2024"), Err(Rejection::Numeric));
        assert_eq!(normalizer.normalize("12 34"), Err(Rejection::Numeric));
        assert_eq!(normalizer.normalize("PSII2"), Err(Rejection::NonAlphabetic));
        assert_eq!(normalizer.normalize(""), Err(Rejection::Empty));
        assert_eq!(normalizer.normalize("---"), Err(Rejection::Empty));
    }

    #[test]
    fn rejects_stopwords_and_academic_filler() {
        let normalizer = EntityNormalizer::new();
        assert!(matches!(normalizer.normalize("The"), Err(Rejection::Stopword(_))));
        assert!(matches!(normalizer.normalize("results"), Err(Rejection::Stopword(_))));
        assert!(matches!(normalizer.normalize("of the"), Err(Rejection::Stopword(_))));
        assert!(normalizer.normalize("the leaf").is_ok());
    }

    #[test]
    fn generic_morphology_needs_domain_recognition() {
        let normalizer = EntityNormalizer::new();
        assert!(matches!(
            normalizer.normalize("quickly"),
            Err(Rejection::GenericTerm(_))
        ));
        assert!(matches!(
            normalizer.normalize("happiness"),
            Err(Rejection::GenericTerm(_))
        ));
        // listed outright
        assert!(normalizer.normalize("Respiration").is_ok());
        // built on a known stem
        assert!(normalizer.normalize("oxidized").is_ok());
        // multi-word labels are not judged by suffix
        assert!(normalizer.normalize("stomatal opening").is_ok());
        // short words that merely end in a suffix
        assert!(normalizer.normalize("seed").is_ok());
    }

    #[test]
    fn configuration_extends_word_lists() {
        let config = NormalizerConfig {
            extra_stopwords: vec!["leaf".to_string()],
            extra_domain_terms: vec!["Blooming".to_string()],
            ..Default::default()
        };
        let normalizer = EntityNormalizer::from_config(&config);
        assert!(matches!(normalizer.normalize("Leaf"), Err(Rejection::Stopword(_))));
        assert!(normalizer.normalize("blooming").is_ok());
        assert!(EntityNormalizer::new().normalize("blooming").is_err());
    }

    #[test]
    fn swapped_lexicon_changes_predicate_only() {
        let normalizer = EntityNormalizer::with_lexicon(Lexicon::empty(), 2, 10);
        assert!(normalizer.normalize("the").is_ok());
        assert!(normalizer.normalize("running").is_ok());
        assert!(normalizer.normalize("ab").is_ok());
        assert_eq!(normalizer.canonical_id("Chlorophyll a"), "chlorophyll_a");
    }

    #[test]
    fn stopword_tokens_are_detected_case_insensitively() {
        let normalizer = EntityNormalizer::new();
        assert!(normalizer.is_stopword_token("The"));
        assert!(normalizer.is_stopword_token("However,"));
        assert!(!normalizer.is_stopword_token("stomata"));
    }
}
