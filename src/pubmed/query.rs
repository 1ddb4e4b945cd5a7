//! PubMed query string construction.

use super::PubMedError;

/// Build the esearch term for a keyword search.
///
/// Each keyword is parenthesized and the keywords are AND-joined; an optional
/// journal restriction is appended as a `[Journal]` field tag.
pub fn build_search_query(keywords: &[String], journal: Option<&str>) -> Result<String, PubMedError> {
    let keywords: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();

    if keywords.is_empty() {
        return Err(PubMedError::InvalidInput(
            "keywords must contain at least one non-empty keyword".to_string(),
        ));
    }

    let mut query = keywords
        .iter()
        .map(|k| format!("({})", k))
        .collect::<Vec<_>>()
        .join(" AND ");

    if let Some(journal) = journal.map(str::trim).filter(|j| !j.is_empty()) {
        query.push_str(&format!(" AND \"{}\"[Journal]", journal.replace('"', "")));
    }

    Ok(query)
}

/// Whether a string looks like a PMID (ASCII digits only)
pub fn is_pubmed_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_keywords_are_and_joined() {
        let query = build_search_query(&kw(&["asthma", "inhaled corticosteroids"]), None).unwrap();
        assert_eq!(query, "(asthma) AND (inhaled corticosteroids)");
    }

    #[test]
    fn test_journal_filter() {
        let query = build_search_query(&kw(&["covid"]), Some(" The Lancet ")).unwrap();
        assert_eq!(query, "(covid) AND \"The Lancet\"[Journal]");
    }

    #[test]
    fn test_blank_journal_is_ignored() {
        let query = build_search_query(&kw(&["covid"]), Some("  ")).unwrap();
        assert_eq!(query, "(covid)");
    }

    #[test]
    fn test_empty_keywords_rejected() {
        let err = build_search_query(&kw(&[" ", ""]), Some("Nature")).unwrap_err();
        assert!(matches!(err, PubMedError::InvalidInput(_)));

        let err = build_search_query(&[], None).unwrap_err();
        assert!(matches!(err, PubMedError::InvalidInput(_)));
    }

    #[test]
    fn test_is_pubmed_id() {
        assert!(is_pubmed_id("31452104"));
        assert!(is_pubmed_id("0000000"));
        assert!(!is_pubmed_id(""));
        assert!(!is_pubmed_id("PMC123"));
        assert!(!is_pubmed_id("12 34"));
    }
}
