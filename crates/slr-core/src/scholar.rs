//! Paper extraction from Google Scholar result pages.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::{GOOGLE_SCHOLAR, Paper};

pub const SCHOLAR_SEARCH_URL: &str = "https://scholar.google.com/scholar";

static RESULT: Lazy<Selector> = Lazy::new(|| Selector::parse(".gs_r.gs_or.gs_scl").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse(".gs_rt a").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(".gs_rt").unwrap());
static META: Lazy<Selector> = Lazy::new(|| Selector::parse(".gs_a").unwrap());
static SNIPPET: Lazy<Selector> = Lazy::new(|| Selector::parse(".gs_rs").unwrap());
static PDF_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse(".gs_or_ggsm a").unwrap());

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());
/// Leading type markers Scholar prints before unlinked titles, e.g. `[CITATION][C]`.
static TYPE_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\s*\[[A-Z]+\])+\s*").unwrap());

fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

/// Extract one paper from a single result block.
///
/// Returns `None` when the block has no usable title. The id is the first
/// non-empty of `data-cid`, `data-rp`, the title link URL and the title.
pub fn extract_paper(result: ElementRef<'_>) -> Option<Paper> {
    let title_link = result.select(&TITLE_LINK).next();
    let title = match title_link {
        Some(link) => text_of(link),
        None => {
            let heading = result.select(&TITLE).next()?;
            TYPE_TAG_RE.replace(&text_of(heading), "").into_owned()
        }
    };
    if title.is_empty() {
        return None;
    }

    let url = title_link
        .and_then(|l| non_empty(l.value().attr("href")))
        .unwrap_or_default();

    let meta = result.select(&META).next().map(text_of).unwrap_or_default();
    // "A Author, B Author - Venue, 2017 - publisher.org"; authors end at the first dash
    let authors = meta
        .split('-')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    let year = YEAR_RE
        .find(&meta)
        .and_then(|m| m.as_str().parse::<u16>().ok());

    let abstract_text = result.select(&SNIPPET).next().map(text_of).unwrap_or_default();
    let pdf_url = result
        .select(&PDF_LINK)
        .next()
        .and_then(|a| non_empty(a.value().attr("href")));

    let attrs = result.value();
    let id = non_empty(attrs.attr("data-cid"))
        .or_else(|| non_empty(attrs.attr("data-rp")))
        .or_else(|| non_empty(Some(url.as_str())))
        .unwrap_or_else(|| title.clone());

    let mut paper = Paper::new(id, title);
    paper.url = url;
    paper.authors = authors;
    paper.year = year;
    paper.abstract_text = abstract_text;
    paper.pdf_url = pdf_url;
    paper.source = GOOGLE_SCHOLAR.to_string();
    Some(paper)
}

/// Extract every paper on a results page, skipping blocks without a title.
pub fn extract_papers(html: &str) -> Vec<Paper> {
    let document = Html::parse_document(html);
    let mut papers = Vec::new();
    for (index, result) in document.select(&RESULT).enumerate() {
        match extract_paper(result) {
            Some(paper) => papers.push(paper),
            None => tracing::debug!(index, "skipping result without a title"),
        }
    }
    papers
}

/// Tracks which results already carry an "Add" affordance so repeated scans
/// of a changing page only yield the new ones.
#[derive(Debug, Default)]
pub struct ResultScanner {
    annotated: HashSet<String>,
}

impl ResultScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the papers on `html` that have not been annotated yet, and
    /// mark them as annotated.
    pub fn scan(&mut self, html: &str) -> Vec<Paper> {
        extract_papers(html)
            .into_iter()
            .filter(|p| self.annotated.insert(p.id.clone()))
            .collect()
    }

    pub fn is_annotated(&self, paper_id: &str) -> bool {
        self.annotated.contains(paper_id)
    }

    pub fn len(&self) -> usize {
        self.annotated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotated.is_empty()
    }
}

/// Scholar search URL for `query`.
pub fn scholar_search_url(query: &str) -> String {
    format!("{}?q={}", SCHOLAR_SEARCH_URL, urlencoding::encode(query))
}
