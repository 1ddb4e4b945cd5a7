//! Parsers for E-utilities response payloads.
//!
//! esearch counts and MeSH lookups come back as XML, ranked id pages as JSON,
//! MeSH records as plain text and article records as PubMed XML. Any payload
//! that does not have the expected shape is a terminal "malformed" error.

use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::LazyLock;

use super::PubMedError;
use crate::models::{Article, ArticleBuilder, IdPage};

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct ESearchResult {
    Count: Option<String>,
    IdList: Option<IdList>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdList {
    #[serde(rename = "Id", default)]
    ids: Vec<String>,
}

fn parse_esearch_xml(xml: &str) -> Result<ESearchResult, PubMedError> {
    let result: ESearchResult = from_str(xml)?;
    if let Some(error) = &result.error {
        return Err(PubMedError::TerminalFetch {
            status: None,
            message: format!("esearch error: {}", error.trim()),
            attempts: 1,
        });
    }
    Ok(result)
}

/// Extract the top-level `<Count>` of an esearch XML response
pub fn parse_count(xml: &str) -> Result<u64, PubMedError> {
    let result = parse_esearch_xml(xml)?;
    let count = result
        .Count
        .ok_or_else(|| PubMedError::malformed("Count element not found in esearch response"))?;

    count
        .trim()
        .parse::<u64>()
        .map_err(|e| PubMedError::malformed(format!("invalid Count '{}': {}", count, e)))
}

/// Extract the `<IdList>` of an esearch XML response
pub fn parse_id_list(xml: &str) -> Result<Vec<String>, PubMedError> {
    let result = parse_esearch_xml(xml)?;
    Ok(result.IdList.map(|list| list.ids).unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct ESearchJson {
    esearchresult: Option<ESearchJsonResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchJsonResult {
    count: Option<String>,
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

/// Parse an esearch JSON response into a page of identifiers
pub fn parse_id_page(json: &str) -> Result<IdPage, PubMedError> {
    let response: ESearchJson = serde_json::from_str(json)?;

    let result = match (response.esearchresult, response.error) {
        (Some(result), _) => result,
        (None, Some(error)) => {
            return Err(PubMedError::TerminalFetch {
                status: None,
                message: format!("esearch error: {}", error),
                attempts: 1,
            })
        }
        (None, None) => return Err(PubMedError::malformed("missing esearchresult")),
    };

    if let Some(error) = result.error {
        return Err(PubMedError::TerminalFetch {
            status: None,
            message: format!("esearch error: {}", error),
            attempts: 1,
        });
    }

    let total = match result.count {
        Some(count) => count
            .trim()
            .parse::<u64>()
            .map_err(|e| PubMedError::malformed(format!("invalid count '{}': {}", count, e)))?,
        None => 0,
    };

    Ok(IdPage {
        total,
        ids: result.idlist,
    })
}

static MESH_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+:\s+(.+?)\s*$").expect("MeSH heading pattern is valid"));

/// Inline formatting allowed inside titles and abstracts (`<i>`, `<sup>`, MathML, ...)
static INLINE_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?(?:b|i|u|sup|sub|mml:[A-Za-z]+)(?:\s[^>]*)?/?>")
        .expect("inline markup pattern is valid")
});

/// Extract record headings from a MeSH efetch text response.
///
/// Records look like `1: Diabetes Mellitus, Type 2` followed by free text; only
/// the numbered heading lines are kept.
pub fn parse_mesh_text(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| MESH_HEADING.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|h| !h.is_empty())
        .collect()
}

#[derive(Debug, Deserialize)]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticle>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubmedArticle {
    MedlineCitation: Option<MedlineCitation>,
    PubmedData: Option<PubmedData>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MedlineCitation {
    PMID: Option<Text>,
    Article: Option<ArticleXml>,
    MeshHeadingList: Option<MeshHeadingList>,
}

#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct ArticleXml {
    Journal: Option<Journal>,
    ArticleTitle: Option<Text>,
    Pagination: Option<Pagination>,
    #[serde(rename = "ELocationID", default)]
    elocation_ids: Vec<TypedId>,
    Abstract: Option<Abstract>,
    AuthorList: Option<AuthorList>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct Journal {
    Title: Option<String>,
    JournalIssue: Option<JournalIssue>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JournalIssue {
    Volume: Option<String>,
    Issue: Option<String>,
    PubDate: Option<PubDate>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubDate {
    Year: Option<String>,
    Month: Option<String>,
    Day: Option<String>,
    MedlineDate: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct Pagination {
    MedlinePgn: Option<String>,
}

/// `<ELocationID EIdType="doi">` and `<ArticleId IdType="doi">` share this shape
#[derive(Debug, Deserialize)]
struct TypedId {
    #[serde(rename = "@EIdType", alias = "@IdType")]
    id_type: Option<String>,
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Abstract {
    #[serde(rename = "AbstractText", default)]
    texts: Vec<AbstractText>,
}

#[derive(Debug, Deserialize)]
struct AbstractText {
    #[serde(rename = "@Label")]
    label: Option<String>,
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct Author {
    LastName: Option<String>,
    ForeName: Option<String>,
    Initials: Option<String>,
    CollectiveName: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeshHeadingList {
    #[serde(rename = "MeshHeading", default)]
    headings: Vec<MeshHeading>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MeshHeading {
    DescriptorName: Option<Text>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubmedData {
    ArticleIdList: Option<ArticleIdList>,
}

#[derive(Debug, Deserialize)]
struct ArticleIdList {
    #[serde(rename = "ArticleId", default)]
    ids: Vec<TypedId>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn format_author(author: &Author) -> Option<String> {
    let last = author.LastName.as_deref().map(str::trim).unwrap_or("");
    let fore = author.ForeName.as_deref().map(str::trim).unwrap_or("");
    let initials = author.Initials.as_deref().map(str::trim).unwrap_or("");

    if !last.is_empty() {
        return Some(if !fore.is_empty() {
            format!("{} {}", last, fore)
        } else if !initials.is_empty() {
            format!("{} {}", last, initials)
        } else {
            last.to_string()
        });
    }

    non_empty(author.CollectiveName.clone())
}

fn format_abstract(abstract_xml: &Abstract) -> Option<String> {
    let parts: Vec<String> = abstract_xml
        .texts
        .iter()
        .filter(|section| !section.text.trim().is_empty())
        .map(|section| match section.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => format!("{}: {}", label, section.text.trim()),
            _ => section.text.trim().to_string(),
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn format_pubdate(date: &PubDate) -> Option<String> {
    let parts: Vec<&str> = [&date.Year, &date.Month, &date.Day]
        .into_iter()
        .filter_map(|p| p.as_deref().map(str::trim))
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() {
        non_empty(date.MedlineDate.clone())
    } else {
        Some(parts.join("-"))
    }
}

fn find_doi(ids: &[TypedId]) -> Option<String> {
    ids.iter()
        .find(|id| id.id_type.as_deref() == Some("doi"))
        .and_then(|id| non_empty(Some(id.value.clone())))
}

fn convert_article(article: PubmedArticle) -> Option<Article> {
    let citation = article.MedlineCitation?;
    let pmid = citation
        .PMID
        .map(|p| p.value.trim().to_string())
        .filter(|p| !p.is_empty())?;

    let details = citation.Article;
    let journal = details.as_ref().and_then(|a| a.Journal.as_ref());
    let issue = journal.and_then(|j| j.JournalIssue.as_ref());

    let title = details
        .as_ref()
        .and_then(|a| a.ArticleTitle.as_ref())
        .map(|t| t.value.trim().to_string())
        .unwrap_or_default();

    let authors = details
        .as_ref()
        .and_then(|a| a.AuthorList.as_ref())
        .map(|list| list.authors.iter().filter_map(format_author).collect())
        .unwrap_or_default();

    let doi = details
        .as_ref()
        .and_then(|a| find_doi(&a.elocation_ids))
        .or_else(|| {
            article
                .PubmedData
                .as_ref()
                .and_then(|d| d.ArticleIdList.as_ref())
                .and_then(|list| find_doi(&list.ids))
        });

    let keywords = citation
        .MeshHeadingList
        .map(|list| {
            list.headings
                .into_iter()
                .filter_map(|h| h.DescriptorName)
                .map(|d| d.value.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Some(
        ArticleBuilder::new(pmid, title)
            .authors(authors)
            .journal(non_empty(journal.and_then(|j| j.Title.clone())))
            .volume(non_empty(issue.and_then(|i| i.Volume.clone())))
            .issue(non_empty(issue.and_then(|i| i.Issue.clone())))
            .pages(non_empty(
                details
                    .as_ref()
                    .and_then(|a| a.Pagination.as_ref())
                    .and_then(|p| p.MedlinePgn.clone()),
            ))
            .doi(doi)
            .pubdate(issue.and_then(|i| i.PubDate.as_ref()).and_then(format_pubdate))
            .abstract_text(
                details
                    .as_ref()
                    .and_then(|a| a.Abstract.as_ref())
                    .and_then(format_abstract),
            )
            .keywords(keywords)
            .build(),
    )
}

/// Drop inline formatting tags so mixed-content elements read as one text node
fn strip_inline_markup(xml: &str) -> Cow<'_, str> {
    INLINE_MARKUP.replace_all(xml, "")
}

/// Parse a PubMed efetch XML response into articles, in document order
pub fn parse_article_set(xml: &str) -> Result<Vec<Article>, PubMedError> {
    if xml.trim().is_empty() {
        return Ok(Vec::new());
    }

    let xml = strip_inline_markup(xml);
    let set: PubmedArticleSet = from_str(&xml)?;
    let mut articles = Vec::with_capacity(set.articles.len());

    for article in set.articles {
        match convert_article(article) {
            Some(a) => articles.push(a),
            None => tracing::debug!("Skipping PubMed record without PMID"),
        }
    }

    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<!DOCTYPE eSearchResult PUBLIC "-//NLM//DTD esearch 20060628//EN" "https://eutils.ncbi.nlm.nih.gov/eutils/dtd/20060628/esearch.dtd">
<eSearchResult><Count>1234</Count><RetMax>2</RetMax><RetStart>0</RetStart><IdList>
<Id>68003924</Id>
<Id>68003920</Id>
</IdList><TranslationSet/><TranslationStack>   <TermSet>    <Term>diabetes[All Fields]</Term>    <Field>All Fields</Field>    <Count>999</Count>    <Explode>N</Explode>   </TermSet>   <OP>GROUP</OP>  </TranslationStack><QueryTranslation>diabetes[All Fields]</QueryTranslation></eSearchResult>
"#;

    const ARTICLE_SET_XML: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
<PubmedArticle>
  <MedlineCitation Status="MEDLINE" Owner="NLM">
    <PMID Version="1">31452104</PMID>
    <Article PubModel="Print">
      <Journal>
        <ISSN IssnType="Electronic">1474-547X</ISSN>
        <JournalIssue CitedMedium="Internet">
          <Volume>394</Volume>
          <Issue>10200</Issue>
          <PubDate><Year>2019</Year><Month>Aug</Month><Day>24</Day></PubDate>
        </JournalIssue>
        <Title>Lancet (London, England)</Title>
      </Journal>
      <ArticleTitle>Metformin in type 2 diabetes.</ArticleTitle>
      <Pagination><MedlinePgn>639-651</MedlinePgn></Pagination>
      <ELocationID EIdType="pii" ValidYN="Y">S0140-6736(19)31000-0</ELocationID>
      <ELocationID EIdType="doi" ValidYN="Y">10.1016/S0140-6736(19)31000-0</ELocationID>
      <Abstract>
        <AbstractText Label="BACKGROUND" NlmCategory="BACKGROUND">Metformin is first line.</AbstractText>
        <AbstractText Label="METHODS" NlmCategory="METHODS">We reviewed trials.</AbstractText>
        <CopyrightInformation>Copyright 2019.</CopyrightInformation>
      </Abstract>
      <AuthorList CompleteYN="Y">
        <Author ValidYN="Y"><LastName>Smith</LastName><ForeName>Jane</ForeName><Initials>J</Initials>
          <AffiliationInfo><Affiliation>Somewhere University.</Affiliation></AffiliationInfo>
        </Author>
        <Author ValidYN="Y"><LastName>Doe</LastName><Initials>JD</Initials></Author>
        <Author ValidYN="Y"><CollectiveName>Diabetes Study Group</CollectiveName></Author>
      </AuthorList>
      <Language>eng</Language>
    </Article>
    <MeshHeadingList>
      <MeshHeading><DescriptorName UI="D003924" MajorTopicYN="N">Diabetes Mellitus, Type 2</DescriptorName></MeshHeading>
      <MeshHeading><DescriptorName UI="D008687" MajorTopicYN="Y">Metformin</DescriptorName><QualifierName UI="Q000627" MajorTopicYN="N">therapeutic use</QualifierName></MeshHeading>
    </MeshHeadingList>
  </MedlineCitation>
  <PubmedData>
    <ArticleIdList>
      <ArticleId IdType="pubmed">31452104</ArticleId>
      <ArticleId IdType="doi">10.9999/ignored-because-elocation-wins</ArticleId>
    </ArticleIdList>
  </PubmedData>
</PubmedArticle>
<PubmedArticle>
  <MedlineCitation Status="PubMed-not-MEDLINE" Owner="NLM">
    <PMID Version="1">27000001</PMID>
    <Article PubModel="Electronic">
      <Journal>
        <JournalIssue CitedMedium="Internet">
          <PubDate><MedlineDate>2016 Winter</MedlineDate></PubDate>
        </JournalIssue>
        <Title>Some Journal</Title>
      </Journal>
      <ArticleTitle>An article without abstract.</ArticleTitle>
    </Article>
  </MedlineCitation>
  <PubmedData>
    <ArticleIdList>
      <ArticleId IdType="doi">10.5555/fallback</ArticleId>
    </ArticleIdList>
  </PubmedData>
</PubmedArticle>
</PubmedArticleSet>
"#;

    #[test]
    fn test_parse_count_ignores_translation_counts() {
        assert_eq!(parse_count(COUNT_XML).unwrap(), 1234);
    }

    #[test]
    fn test_parse_count_missing_element() {
        let err = parse_count("<eSearchResult><RetMax>0</RetMax></eSearchResult>").unwrap_err();
        assert!(err.to_string().contains("Count element not found"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_parse_count_upstream_error() {
        let xml = "<eSearchResult><ERROR>Empty term and query_key - nothing todo</ERROR></eSearchResult>";
        let err = parse_count(xml).unwrap_err();
        assert!(matches!(err, PubMedError::TerminalFetch { .. }));
        assert!(err.to_string().contains("nothing todo"));
    }

    #[test]
    fn test_parse_count_not_xml() {
        assert!(parse_count("<html><body>oops").is_err());
    }

    #[test]
    fn test_parse_id_list() {
        let ids = parse_id_list(COUNT_XML).unwrap();
        assert_eq!(ids, vec!["68003924", "68003920"]);

        let empty = parse_id_list("<eSearchResult><Count>0</Count><IdList/></eSearchResult>").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_parse_id_page() {
        let json = r#"{"header":{"type":"esearch","version":"0.3"},
            "esearchresult":{"count":"2048","retmax":"3","retstart":"0",
            "idlist":["39000003","39000002","39000001"],"translationset":[]}}"#;
        let page = parse_id_page(json).unwrap();
        assert_eq!(page.total, 2048);
        assert_eq!(page.ids, vec!["39000003", "39000002", "39000001"]);
    }

    #[test]
    fn test_parse_id_page_error() {
        let json = r#"{"esearchresult":{"ERROR":"Invalid query"}}"#;
        assert!(matches!(
            parse_id_page(json),
            Err(PubMedError::TerminalFetch { .. })
        ));

        assert!(parse_id_page("not json").is_err());
        assert!(parse_id_page("{}").is_err());
    }

    #[test]
    fn test_parse_mesh_text() {
        let text = "1: Diabetes Mellitus, Type 2\nA subclass of DIABETES MELLITUS.\nYear introduced: 1995\n\n2: Diabetes Mellitus\r\nA heterogeneous group of disorders.\n\n3: Insulin Resistance\n";
        assert_eq!(
            parse_mesh_text(text),
            vec![
                "Diabetes Mellitus, Type 2",
                "Diabetes Mellitus",
                "Insulin Resistance"
            ]
        );
        assert!(parse_mesh_text("").is_empty());
    }

    #[test]
    fn test_parse_article_set() {
        let articles = parse_article_set(ARTICLE_SET_XML).unwrap();
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.pubmed_id, "31452104");
        assert_eq!(first.title, "Metformin in type 2 diabetes.");
        assert_eq!(
            first.authors,
            vec!["Smith Jane", "Doe JD", "Diabetes Study Group"]
        );
        assert_eq!(first.journal.as_deref(), Some("Lancet (London, England)"));
        assert_eq!(first.volume.as_deref(), Some("394"));
        assert_eq!(first.issue.as_deref(), Some("10200"));
        assert_eq!(first.pages.as_deref(), Some("639-651"));
        assert_eq!(first.doi.as_deref(), Some("10.1016/S0140-6736(19)31000-0"));
        assert_eq!(first.pubdate.as_deref(), Some("2019-Aug-24"));
        assert_eq!(
            first.r#abstract.as_deref(),
            Some("BACKGROUND: Metformin is first line. METHODS: We reviewed trials.")
        );
        assert_eq!(first.keywords, vec!["Diabetes Mellitus, Type 2", "Metformin"]);
        assert_eq!(first.link, "https://pubmed.ncbi.nlm.nih.gov/31452104/");

        let second = &articles[1];
        assert_eq!(second.pubmed_id, "27000001");
        assert_eq!(second.pubdate.as_deref(), Some("2016 Winter"));
        assert_eq!(second.doi.as_deref(), Some("10.5555/fallback"));
        assert_eq!(second.r#abstract, None);
        assert!(second.authors.is_empty());
        assert!(second.keywords.is_empty());
    }

    #[test]
    fn test_parse_article_set_with_inline_markup() {
        let xml = r#"<PubmedArticleSet>
<PubmedArticle><MedlineCitation><PMID Version="1">111</PMID>
<Article>
<ArticleTitle>Effect of <i>E. coli</i> on growth.</ArticleTitle>
<Abstract>
<AbstractText Label="RESULTS">CO<sub>2</sub> rose by 10<sup>3</sup>-fold in <b>all</b> samples.</AbstractText>
</Abstract>
</Article></MedlineCitation></PubmedArticle>
<PubmedArticle><MedlineCitation><PMID Version="1">222</PMID>
<Article><ArticleTitle>Plain title.</ArticleTitle></Article>
</MedlineCitation></PubmedArticle>
</PubmedArticleSet>"#;

        let articles = parse_article_set(xml).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Effect of E. coli on growth.");
        assert_eq!(
            articles[0].r#abstract.as_deref(),
            Some("RESULTS: CO2 rose by 103-fold in all samples.")
        );
        assert_eq!(articles[1].pubmed_id, "222");
        assert_eq!(articles[1].title, "Plain title.");
    }

    #[test]
    fn test_strip_inline_markup_keeps_structure() {
        let xml = "<Author><Suffix>Jr</Suffix></Author><i class=\"x\">a</i><mml:math><mml:mi>x</mml:mi></mml:math>";
        assert_eq!(
            strip_inline_markup(xml),
            "<Author><Suffix>Jr</Suffix></Author>ax"
        );
    }

    #[test]
    fn test_parse_empty_article_set() {
        assert!(parse_article_set("<PubmedArticleSet></PubmedArticleSet>")
            .unwrap()
            .is_empty());
        assert!(parse_article_set("   ").unwrap().is_empty());
    }
}
