//! Description feature block: TF-IDF over the batch vocabulary

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::Result;

/// Letter runs of length >= 2; digits (store numbers, reference IDs) never form tokens
const TOKEN_PATTERN: &str = r"\p{L}{2,}";

/// TF-IDF vectorizer fitted on one batch of descriptions
#[derive(Debug, Clone)]
pub struct DescriptionVectorizer {
    token_re: Regex,
    /// Vocabulary terms in column order
    terms: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f64>,
    width: usize,
}

impl DescriptionVectorizer {
    /// Fit on `descriptions`, keeping the `width` terms with the highest
    /// document frequency (ties broken alphabetically)
    pub fn fit<S: AsRef<str>>(descriptions: &[S], width: usize) -> Result<Self> {
        let token_re = Regex::new(TOKEN_PATTERN)?;
        let n_documents = descriptions.len();

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for desc in descriptions {
            let unique: BTreeSet<String> = tokenize_with(&token_re, desc.as_ref())
                .into_iter()
                .collect();
            for token in unique {
                *document_frequency.entry(token).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = document_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(width);

        let mut terms = Vec::with_capacity(ranked.len());
        let mut index = HashMap::with_capacity(ranked.len());
        let mut idf = Vec::with_capacity(ranked.len());
        for (i, (term, df)) in ranked.into_iter().enumerate() {
            // Smoothed IDF = ln((N + 1) / (df + 1)) + 1
            idf.push(((n_documents as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0);
            index.insert(term.clone(), i);
            terms.push(term);
        }

        Ok(Self {
            token_re,
            terms,
            index,
            idf,
            width,
        })
    }

    pub fn tokenize(&self, description: &str) -> Vec<String> {
        tokenize_with(&self.token_re, description)
    }

    /// L2-normalized TF-IDF row, zero-padded to the configured width
    pub fn transform(&self, description: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.width];
        let tokens = self.tokenize(description);
        if tokens.is_empty() {
            return row;
        }

        for token in &tokens {
            if let Some(&i) = self.index.get(token) {
                row[i] += 1.0;
            }
        }

        let doc_length = tokens.len() as f64;
        for (i, value) in row.iter_mut().enumerate().take(self.idf.len()) {
            *value = *value / doc_length * self.idf[i];
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut row {
                *value /= norm;
            }
        }
        row
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.terms
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

fn tokenize_with(re: &Regex, description: &str) -> Vec<String> {
    let upper = description.to_uppercase();
    re.find_iter(&upper).map(|m| m.as_str().to_string()).collect()
}
