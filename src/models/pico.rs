//! PICO (Population, Intervention, Comparison, Outcome) query models.

use serde::{Deserialize, Serialize};

/// One of the four PICO elements, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PicoLabel {
    Population,
    Intervention,
    Comparison,
    Outcome,
}

impl PicoLabel {
    /// All labels in P, I, C, O order
    pub const ALL: [PicoLabel; 4] = [
        PicoLabel::Population,
        PicoLabel::Intervention,
        PicoLabel::Comparison,
        PicoLabel::Outcome,
    ];

    /// Single-letter code
    pub fn code(&self) -> &'static str {
        match self {
            PicoLabel::Population => "P",
            PicoLabel::Intervention => "I",
            PicoLabel::Comparison => "C",
            PicoLabel::Outcome => "O",
        }
    }
}

impl std::fmt::Display for PicoLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PicoLabel::Population => "Population",
            PicoLabel::Intervention => "Intervention",
            PicoLabel::Comparison => "Comparison",
            PicoLabel::Outcome => "Outcome",
        };
        f.write_str(name)
    }
}

/// Synonym terms for one PICO element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicoElement {
    pub label: PicoLabel,
    pub terms: Vec<String>,
}

impl PicoElement {
    /// Create an element; terms are trimmed and blank ones dropped
    pub fn new<I, S>(label: PicoLabel, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Self { label, terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// OR-joined parenthesized clause, e.g. `(term1 OR term2)`
    ///
    /// Returns `None` for an empty element so no `()` clause is ever emitted.
    pub fn clause(&self) -> Option<String> {
        if self.terms.is_empty() {
            return None;
        }
        Some(format!("({})", self.terms.join(" OR ")))
    }
}

/// The four PICO term lists of one question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicoQuery {
    #[serde(default)]
    pub p_terms: Vec<String>,
    #[serde(default)]
    pub i_terms: Vec<String>,
    #[serde(default)]
    pub c_terms: Vec<String>,
    #[serde(default)]
    pub o_terms: Vec<String>,
}

impl PicoQuery {
    /// Elements in canonical order, including empty ones
    pub fn elements(&self) -> [PicoElement; 4] {
        [
            PicoElement::new(PicoLabel::Population, &self.p_terms),
            PicoElement::new(PicoLabel::Intervention, &self.i_terms),
            PicoElement::new(PicoLabel::Comparison, &self.c_terms),
            PicoElement::new(PicoLabel::Outcome, &self.o_terms),
        ]
    }
}

/// A boolean query over one or more PICO elements, with its resolved count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCombination {
    /// Elements AND-ed together, canonical order
    pub elements: Vec<PicoLabel>,

    /// Short name such as `P_AND_I`
    pub label: String,

    /// Rendered query string
    pub query: String,

    /// Publication count; `None` until resolved or when the fetch failed
    pub count: Option<u64>,

    /// Failure description when the count could not be fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryCombination {
    /// An unresolved combination
    pub fn new(elements: Vec<PicoLabel>, query: impl Into<String>) -> Self {
        let label = elements
            .iter()
            .map(PicoLabel::code)
            .collect::<Vec<_>>()
            .join("_AND_");
        Self {
            elements,
            label,
            query: query.into(),
            count: None,
            error: None,
        }
    }

    /// Consume the combination and attach its count or failure
    pub fn resolve<E: std::fmt::Display>(mut self, outcome: Result<u64, E>) -> Self {
        match outcome {
            Ok(count) => {
                self.count = Some(count);
                self.error = None;
            }
            Err(e) => {
                self.count = None;
                self.error = Some(e.to_string());
            }
        }
        self
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of a PICO search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PicoSearchResult {
    /// Each non-empty element searched on its own
    pub individual: Vec<QueryCombination>,

    /// Cumulative AND prefixes: P, P∧I, P∧I∧C, P∧I∧C∧O (empty elements skipped)
    pub combinations: Vec<QueryCombination>,
}
