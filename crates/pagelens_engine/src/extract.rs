use ego_tree::NodeId;
use pagelens_core::{ExtractedContent, ExtractedLink, ExtractedTable};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::text::visible_text;

/// Regions that never count as page content.
const STRIPPED_REGIONS: &str = "header, footer, nav, aside, script, style, iframe";
/// Landmarks tried, in document order, before falling back to `<body>`.
const CONTENT_LANDMARKS: &str = "main, article, .main-content";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ExtractionError(String);

impl ExtractionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

pub trait Extractor: Send + Sync {
    /// Reads `html` into structured content. `base_url` resolves relative links.
    fn extract(&self, html: &str, base_url: Option<&Url>)
        -> Result<ExtractedContent, ExtractionError>;
}

/// Landmark-first extractor:
/// - parses its own copy of the document and drops chrome regions from it
/// - picks the first `main`/`article`/`.main-content`, else `<body>`
/// - reads visible text, every table, and every labelled link under that root.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomExtractor;

impl Extractor for DomExtractor {
    fn extract(
        &self,
        html: &str,
        base_url: Option<&Url>,
    ) -> Result<ExtractedContent, ExtractionError> {
        let mut doc = Html::parse_document(html);
        strip_regions(&mut doc)?;

        let body_sel = selector("body")?;
        let landmark_sel = selector(CONTENT_LANDMARKS)?;
        let scope = doc
            .select(&body_sel)
            .next()
            .unwrap_or_else(|| doc.root_element());
        let root = scope.select(&landmark_sel).next().unwrap_or(scope);

        Ok(ExtractedContent {
            text: visible_text(root),
            tables: extract_tables(root)?,
            links: extract_links(root, base_url)?,
        })
    }
}

fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|err| ExtractionError::new(format!("invalid selector {css}: {err}")))
}

fn strip_regions(doc: &mut Html) -> Result<(), ExtractionError> {
    let strip_sel = selector(STRIPPED_REGIONS)?;
    let doomed: Vec<NodeId> = doc.select(&strip_sel).map(|el| el.id()).collect();
    for id in doomed {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
    Ok(())
}

fn extract_tables(root: ElementRef) -> Result<Vec<ExtractedTable>, ExtractionError> {
    let table_sel = selector("table")?;
    let header_sel = selector("th")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    let tables = root
        .select(&table_sel)
        .map(|table| ExtractedTable {
            headers: table.select(&header_sel).map(text_content).collect(),
            rows: table
                .select(&row_sel)
                .map(|row| row.select(&cell_sel).map(text_content).collect::<Vec<_>>())
                .filter(|cells| !cells.is_empty())
                .collect(),
            text: text_content(table),
        })
        .collect();
    Ok(tables)
}

fn extract_links(
    root: ElementRef,
    base_url: Option<&Url>,
) -> Result<Vec<ExtractedLink>, ExtractionError> {
    let anchor_sel = selector("a")?;
    let links = root
        .select(&anchor_sel)
        .filter_map(|anchor| {
            let text = visible_text(anchor);
            let href = anchor
                .value()
                .attr("href")
                .and_then(|raw| resolve_href(raw, base_url))?;
            if text.is_empty() {
                return None;
            }
            Some(ExtractedLink { text, href })
        })
        .collect();
    Ok(links)
}

/// Full text of an element including hidden descendants, trimmed.
fn text_content(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Absolute references are kept as written; relative ones are joined to
/// `base` when there is one.
fn resolve_href(raw: &str, base: Option<&Url>) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if Url::parse(trimmed).is_ok() {
        return Some(trimmed.to_string());
    }
    match base {
        Some(base) => base.join(trimmed).ok().map(String::from),
        None => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_href;
    use url::Url;

    #[test]
    fn absolute_hrefs_are_verbatim() {
        assert_eq!(resolve_href(" http://x ", None).as_deref(), Some("http://x"));
    }

    #[test]
    fn relative_hrefs_join_base() {
        let base = Url::parse("https://example.com/docs/index.html").unwrap();
        assert_eq!(
            resolve_href("./a", Some(&base)).as_deref(),
            Some("https://example.com/docs/a")
        );
        assert_eq!(
            resolve_href("#top", Some(&base)).as_deref(),
            Some("https://example.com/docs/index.html#top")
        );
    }

    #[test]
    fn empty_hrefs_are_dropped() {
        assert_eq!(resolve_href("   ", None), None);
    }
}
