//! Response statistics recomputed from scratch on every view. Nothing here is cached.

use indexmap::IndexMap;

/// Number of bars shown on the moderator chart.
pub const CHART_SIZE: usize = 15;

/// One distinct response and how many times it was submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCount {
    pub response: String,
    pub count: usize,
}

impl ResponseCount {
    /// Label used by the "most popular" metric, e.g. `Red (1x)`.
    pub fn label(&self) -> String {
        format!("{} ({}x)", self.response, self.count)
    }
}

/// Statistics derived from the responses of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregates {
    /// Number of responses, duplicates included.
    pub total: usize,
    /// Distinct responses sorted by descending count; ties keep first-seen order.
    pub ranked: Vec<ResponseCount>,
}

impl Aggregates {
    pub fn unique(&self) -> usize {
        self.ranked.len()
    }

    /// Highest-count response; on ties the first one seen wins.
    pub fn most_popular(&self) -> Option<&ResponseCount> {
        self.ranked.first()
    }

    /// The `n` most frequent responses.
    pub fn top(&self, n: usize) -> &[ResponseCount] {
        &self.ranked[..self.ranked.len().min(n)]
    }
}

/// Count exact, case-sensitive occurrences, remembering the order values first appeared.
pub fn frequency_table<S: AsRef<str>>(responses: &[S]) -> IndexMap<String, usize> {
    let mut table = IndexMap::new();
    for response in responses {
        *table.entry(response.as_ref().to_string()).or_insert(0) += 1;
    }
    table
}

/// Sort a frequency table by descending count. The sort is stable.
pub fn rank(table: IndexMap<String, usize>) -> Vec<ResponseCount> {
    let mut ranked: Vec<ResponseCount> = table
        .into_iter()
        .map(|(response, count)| ResponseCount { response, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// Compute every moderator statistic for `responses` (newest first, as stored).
pub fn aggregate<S: AsRef<str>>(responses: &[S]) -> Aggregates {
    Aggregates {
        total: responses.len(),
        ranked: rank(frequency_table(responses)),
    }
}
