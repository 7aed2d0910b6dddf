//! Okapi BM25 over a per-request candidate set
//!
//! The index is built from the handful of chunks the vector channels
//! returned, so it lives only for one ranking pass.

use std::collections::HashMap;

use crate::text::tokenize;

#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug)]
struct DocStats {
    term_freq: HashMap<String, u32>,
    len: usize,
}

/// In-memory BM25 index
#[derive(Debug)]
pub struct Bm25Index {
    docs: Vec<DocStats>,
    doc_freq: HashMap<String, usize>,
    avg_len: f32,
    params: Bm25Params,
}

impl Bm25Index {
    pub fn fit<'a>(documents: impl IntoIterator<Item = &'a str>, params: Bm25Params) -> Self {
        let mut docs = Vec::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let tokens = tokenize(doc);
            let mut term_freq: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *term_freq.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_freq.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            docs.push(DocStats {
                term_freq,
                len: tokens.len(),
            });
        }

        let avg_len = if docs.is_empty() {
            0.0
        } else {
            docs.iter().map(|d| d.len).sum::<usize>() as f32 / docs.len() as f32
        };

        Self {
            docs,
            doc_freq,
            avg_len,
            params,
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.docs.len() as f32;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// BM25 score of one document for already-tokenized query terms
    pub fn score(&self, query_terms: &[String], doc: usize) -> f32 {
        let Some(stats) = self.docs.get(doc) else {
            return 0.0;
        };
        let Bm25Params { k1, b } = self.params;
        let len_norm = if self.avg_len > 0.0 {
            stats.len as f32 / self.avg_len
        } else {
            1.0
        };

        query_terms
            .iter()
            .filter_map(|term| {
                let tf = *stats.term_freq.get(term)? as f32;
                let denom = tf + k1 * (1.0 - b + b * len_norm);
                Some(self.idf(term) * tf * (k1 + 1.0) / denom)
            })
            .sum()
    }

    /// Top `top_k` documents as `(doc index, score)`, best first.
    ///
    /// Documents that share no term with the query are left out, so they
    /// receive no BM25 rank at all.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(usize, f32)> {
        let terms = tokenize(query);
        let mut scored: Vec<(usize, f32)> = (0..self.docs.len())
            .map(|i| (i, self.score(&terms, i)))
            .filter(|(_, s)| *s > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> Bm25Index {
        Bm25Index::fit(
            [
                "dollar spot control on bentgrass greens",
                "brown patch in tall fescue lawns",
                "irrigation audit for sprinkler uniformity",
                "dollar spot dollar spot fungicide rotation",
            ],
            Bm25Params::default(),
        )
    }

    #[test]
    fn test_search_ranks_term_frequency() {
        let hits = index().search("dollar spot", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 3);
        assert_eq!(hits[1].0, 0);
        assert!(hits[0].1 > hits[1].1);
    }

    #[test]
    fn test_no_overlap_excluded() {
        let hits = index().search("nematode", 10);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let idx = index();
        assert!(idx.idf("irrigation") > idx.idf("dollar"));
    }

    #[test]
    fn test_empty_index() {
        let idx = Bm25Index::fit(Vec::<&str>::new(), Bm25Params::default());
        assert!(idx.is_empty());
        assert!(idx.search("anything", 5).is_empty());
    }
}
