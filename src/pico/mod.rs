//! PICO query combination.
//!
//! Expansion is pure: [`build_combinations`] turns the four term lists into
//! cumulative AND prefixes over the non-empty elements, and
//! [`individual_queries`] gives each non-empty element on its own.
//! [`PicoCombiner`] then resolves every query's publication count through an
//! [`EUtilsApi`], concurrently but keeping construction order.
//!
//! ```text
//! P = ["adults"], I = ["aspirin", "ASA"], C = [], O = ["stroke"]
//!
//! P            (adults)
//! P_AND_I      (adults) AND (aspirin OR ASA)
//! P_AND_I_AND_O (adults) AND (aspirin OR ASA) AND (stroke)
//! ```

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;

use crate::models::{PicoElement, PicoLabel, PicoQuery, PicoSearchResult, QueryCombination};
use crate::pubmed::{EUtilsApi, PubMedError};

fn non_empty_elements(query: &PicoQuery) -> Result<Vec<PicoElement>, PubMedError> {
    let elements: Vec<PicoElement> = query
        .elements()
        .into_iter()
        .filter(|e| !e.is_empty())
        .collect();

    match elements.first() {
        Some(first) if first.label == PicoLabel::Population => Ok(elements),
        _ => Err(PubMedError::InvalidInput(
            "p_terms must contain at least one non-blank term".to_string(),
        )),
    }
}

/// Cumulative AND-joined prefixes over the non-empty elements, in P, I, C, O order
pub fn build_combinations(query: &PicoQuery) -> Result<Vec<QueryCombination>, PubMedError> {
    let elements = non_empty_elements(query)?;

    let mut combinations = Vec::with_capacity(elements.len());
    let mut labels = Vec::new();
    let mut clauses = Vec::new();

    for element in &elements {
        let Some(clause) = element.clause() else {
            continue;
        };
        labels.push(element.label);
        clauses.push(clause);
        combinations.push(QueryCombination::new(labels.clone(), clauses.join(" AND ")));
    }

    Ok(combinations)
}

/// Each non-empty element's clause on its own
pub fn individual_queries(query: &PicoQuery) -> Result<Vec<QueryCombination>, PubMedError> {
    let elements = non_empty_elements(query)?;

    Ok(elements
        .iter()
        .filter_map(|e| {
            e.clause()
                .map(|clause| QueryCombination::new(vec![e.label], clause))
        })
        .collect())
}

/// Resolves PICO query counts against PubMed
#[derive(Debug, Clone)]
pub struct PicoCombiner {
    api: Arc<dyn EUtilsApi>,
    concurrency: usize,
}

impl PicoCombiner {
    pub fn new(api: Arc<dyn EUtilsApi>, concurrency: usize) -> Self {
        Self {
            api,
            concurrency: concurrency.max(1),
        }
    }

    /// Expand the query and count every individual element and combination.
    ///
    /// A count that fails terminally is recorded on its combination
    /// (`count: None`, `error: Some(..)`); the batch itself only fails on
    /// invalid input.
    pub async fn combine(&self, query: &PicoQuery) -> Result<PicoSearchResult, PubMedError> {
        let individual = individual_queries(query)?;
        let combinations = build_combinations(query)?;

        tracing::debug!(
            "PICO search: {} individual queries, {} combinations",
            individual.len(),
            combinations.len()
        );

        let split = individual.len();
        let mut resolved = self
            .resolve_all(individual.into_iter().chain(combinations).collect())
            .await;
        let combinations = resolved.split_off(split);

        let failed = resolved
            .iter()
            .chain(&combinations)
            .filter(|c| c.is_failed())
            .count();
        if failed > 0 {
            tracing::warn!("PICO search finished with {} failed sub-queries", failed);
        }

        Ok(PicoSearchResult {
            individual: resolved,
            combinations,
        })
    }

    async fn resolve_all(&self, pending: Vec<QueryCombination>) -> Vec<QueryCombination> {
        stream::iter(pending)
            .map(|combination| {
                let api = Arc::clone(&self.api);
                async move {
                    let outcome = api.count(&combination.query).await;
                    if let Err(e) = &outcome {
                        tracing::warn!(
                            "Count failed for {} '{}': {}",
                            combination.label,
                            combination.query,
                            e
                        );
                    }
                    combination.resolve(outcome)
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
