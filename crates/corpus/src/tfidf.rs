//! Lexical retrieval over chunks with TF-IDF weighting.
//!
//! Features are lower-cased word unigrams plus adjacent bigrams, with English
//! stop words removed first. Weights use smoothed idf
//! (`ln((1 + n) / (1 + df)) + 1`) times raw term count, and every vector is
//! L2-normalized, so cosine similarity reduces to a sparse dot product.
//!
//! The vocabulary and idf are fixed at build time. Query terms the corpus
//! never used contribute nothing.

use std::collections::{BTreeMap, HashMap, HashSet};

use doppel_core::Chunk;

use crate::expansion;

pub const DEFAULT_MIN_SIMILARITY: f32 = 0.05;

/// A chunk together with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Sparse vector as (term id, weight), sorted by term id.
type SparseVector = Vec<(usize, f32)>;

#[derive(Debug, Clone)]
pub struct TfidfIndex {
    chunks: Vec<Chunk>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    vectors: Vec<SparseVector>,
    min_similarity: f32,
}

impl TfidfIndex {
    /// Fit the vocabulary and idf over `chunks` and vectorize each one.
    ///
    /// A chunk is indexed together with its source label, so a document
    /// named `hobbies` answers questions about hobbies even when its prose
    /// never uses the word.
    pub fn build(chunks: Vec<Chunk>) -> Self {
        let features: Vec<Vec<String>> = chunks
            .iter()
            .map(|c| features(&format!("{}\n{}", c.source.replace(['_', '-'], " "), c.text)))
            .collect();

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &features {
            let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        let n = chunks.len() as f32;
        let mut vocabulary = HashMap::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (term, df) in &document_frequency {
            vocabulary.insert((*term).to_string(), idf.len());
            idf.push(((1.0 + n) / (1.0 + *df as f32)).ln() + 1.0);
        }

        let mut index = Self {
            chunks: Vec::new(),
            vocabulary,
            idf,
            vectors: Vec::new(),
            min_similarity: DEFAULT_MIN_SIMILARITY,
        };
        index.vectors = features.iter().map(|f| index.vectorize(f)).collect();
        index.chunks = chunks;
        index
    }

    /// Set the score floor. Chunks scoring at or below it are never returned.
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    /// Return at most `k` chunks relevant to `text`, best first.
    ///
    /// Equal scores are ordered by chunk ordinal, so the result is fully
    /// determined by the query and the corpus.
    pub fn query(&self, text: &str, k: usize) -> Vec<ScoredChunk> {
        if k == 0 || self.chunks.is_empty() {
            return Vec::new();
        }

        let expanded = expansion::expand(text);
        let query = self.vectorize(&features(&expanded));
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .zip(&self.vectors)
            .filter_map(|(chunk, vector)| {
                let score = dot(&query, vector);
                (score > self.min_similarity).then(|| ScoredChunk {
                    chunk: chunk.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chunk.ordinal.cmp(&b.chunk.ordinal))
        });
        scored.truncate(k);
        scored
    }

    fn vectorize(&self, features: &[String]) -> SparseVector {
        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        for term in features {
            if let Some(&id) = self.vocabulary.get(term) {
                *counts.entry(id).or_default() += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(id, tf)| (id, tf * self.idf[id]))
            .collect();

        let norm = vector.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 1e-10 {
            for (_, w) in &mut vector {
                *w /= norm;
            }
        }
        vector
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn min_similarity(&self) -> f32 {
        self.min_similarity
    }
}

/// Dot product of two sorted sparse vectors.
fn dot(a: &SparseVector, b: &SparseVector) -> f32 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0f32;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

/// Unigrams and adjacent bigrams of the non-stop-word tokens.
fn features(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut out = Vec::with_capacity(tokens.len() * 2);
    for pair in tokens.windows(2) {
        out.push(format!("{} {}", pair[0], pair[1]));
    }
    out.extend(tokens);
    out
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty() && !is_stop_word(t))
        .map(String::from)
        .collect()
}

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// English stop words, sorted for binary search.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "be", "became", "because", "become", "becomes", "becoming", "been",
    "before", "beforehand", "behind", "being", "below", "beside", "besides", "between", "beyond",
    "both", "but", "by", "can", "cannot", "could", "d", "did", "do", "does", "doing", "done",
    "down", "during", "each", "either", "else", "elsewhere", "enough", "etc", "even", "ever",
    "every", "everyone", "everything", "everywhere", "except", "few", "for", "former",
    "formerly", "from", "further", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "i", "ie", "if", "in", "indeed", "into", "is", "it", "its", "itself",
    "just", "ll", "m", "may", "me", "meanwhile", "might", "mine", "more", "moreover", "most",
    "mostly", "much", "must", "my", "myself", "namely", "neither", "never", "nevertheless",
    "next", "no", "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of",
    "off", "often", "on", "once", "only", "onto", "or", "other", "others", "otherwise", "our",
    "ours", "ourselves", "out", "over", "own", "per", "perhaps", "please", "rather", "re", "s",
    "same", "seem", "seemed", "seeming", "seems", "several", "she", "should", "since", "so",
    "some", "somehow", "someone", "something", "sometime", "sometimes", "somewhere", "still",
    "such", "t", "tell", "than", "that", "the", "their", "them", "themselves", "then", "thence",
    "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they",
    "this", "those", "though", "through", "throughout", "thru", "thus", "to", "together", "too",
    "toward", "towards", "under", "until", "up", "upon", "us", "ve", "very", "via", "was", "we",
    "well", "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter",
    "whereas", "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while",
    "whither", "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within",
    "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(ordinal: usize, source: &str, text: &str) -> Chunk {
        Chunk {
            source: source.into(),
            ordinal,
            text: text.into(),
        }
    }

    fn sample_index() -> TfidfIndex {
        TfidfIndex::build(vec![
            chunk(0, "work", "Works as a software engineer building test automation in Rust."),
            chunk(1, "hobbies", "Enjoys rock climbing and chess on weekends."),
            chunk(2, "weaknesses", "Tends to struggle with delegating work early on."),
            chunk(3, "food", "Favorite food is green chile from Colorado."),
        ])
    }

    #[test]
    fn stop_words_are_sorted() {
        assert!(STOP_WORDS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn features_include_bigrams_without_stop_words() {
        let f = features("What is your favorite rock climbing spot?");
        assert!(f.contains(&"rock climbing".to_string()));
        assert!(f.contains(&"favorite".to_string()));
        assert!(!f.iter().any(|t| t == "your" || t == "what"));
    }

    #[test]
    fn relevant_chunk_ranks_first() {
        let index = sample_index();
        let results = index.query("Do you like climbing?", 3);
        assert_eq!(results[0].chunk.ordinal, 1);
    }

    #[test]
    fn results_bounded_and_non_increasing() {
        let index = sample_index();
        for k in 0..6 {
            let results = index.query("work engineer climbing chile struggle", k);
            assert!(results.len() <= k);
            assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn query_is_deterministic() {
        let index = sample_index();
        let a = index.query("rust engineer weekends", 4);
        let b = index.query("rust engineer weekends", 4);
        assert_eq!(a, b);
    }

    #[test]
    fn ties_break_by_ordinal() {
        let index = TfidfIndex::build(vec![
            chunk(0, "notes", "Loves hiking trails."),
            chunk(1, "notes", "Loves hiking trails."),
        ]);
        let results = index.query("hiking", 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].score, results[1].score);
        assert_eq!(results[0].chunk.ordinal, 0);
    }

    #[test]
    fn out_of_vocabulary_query_returns_nothing() {
        let index = sample_index();
        assert!(index.query("quantum zebra", 3).is_empty());
    }

    #[test]
    fn expansion_bridges_vocabulary_gap() {
        let index = sample_index();
        let results = index.query("What is your biggest weakness?", 1);
        assert_eq!(results[0].chunk.ordinal, 2);
    }

    #[test]
    fn source_label_is_searchable() {
        let index = sample_index();
        let results = index.query("What are your hobbies?", 1);
        assert_eq!(results[0].chunk.text, "Enjoys rock climbing and chess on weekends.");
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = TfidfIndex::build(vec![]);
        assert!(index.is_empty());
        assert!(index.query("anything", 3).is_empty());
    }

    #[test]
    fn floor_filters_weak_matches() {
        let index = sample_index().with_min_similarity(0.99);
        assert!(index.query("climbing", 3).is_empty());
    }
}
