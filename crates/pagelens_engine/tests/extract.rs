use std::sync::Arc;

use pagelens_core::{ExtractedContent, ExtractedLink, PageRequest, PageResponse};
use pagelens_engine::{DomExtractor, ExtractionError, Extractor, PageContext};
use pretty_assertions::assert_eq;
use url::Url;

fn extract(html: &str) -> ExtractedContent {
    DomExtractor.extract(html, None).expect("extract ok")
}

#[test]
fn table_and_link_are_extracted() {
    let html = r#"<html><body><main>
        <table>
          <tr><th>h1</th><th>h2</th></tr>
          <tr><td>a</td><td>b</td></tr>
        </table>
        <a href="http://x">x</a>
    </main></body></html>"#;

    let content = extract(html);
    assert_eq!(content.tables.len(), 1);
    assert_eq!(content.tables[0].headers, vec!["h1", "h2"]);
    assert_eq!(content.tables[0].rows, vec![vec!["a", "b"]]);
    assert!(content.tables[0].text.contains("h1"));
    assert!(content.tables[0].text.contains("b"));
    assert_eq!(
        content.links,
        vec![ExtractedLink {
            text: "x".into(),
            href: "http://x".into()
        }]
    );
}

#[test]
fn chrome_regions_are_not_content() {
    let html = r#"<html><body>
        <header>Site header</header>
        <nav><a href="/home">Home</a></nav>
        <main><p>Article body</p></main>
        <aside>Sidebar</aside>
        <footer>Copyright</footer>
        <script>var secret = 1;</script>
    </body></html>"#;

    let content = extract(html);
    assert_eq!(content.text, "Article body");
    assert!(content.links.is_empty());
}

#[test]
fn first_landmark_wins() {
    let html = r#"<body>
        <p>outside</p>
        <article><p>first</p></article>
        <div class="main-content"><p>second</p></div>
    </body>"#;

    assert_eq!(extract(html).text, "first");
}

#[test]
fn falls_back_to_body_without_landmark() {
    let html = "<html><body><h1>Title</h1><p>Paragraph</p></body></html>";
    let text = extract(html).text;
    assert!(text.contains("Title"));
    assert!(text.contains("Paragraph"));
}

#[test]
fn hidden_text_is_skipped() {
    let html = r#"<body><main>
        <p>shown</p>
        <p hidden>hidden attr</p>
        <p style="display: none">no display</p>
        <p aria-hidden="true">aria</p>
    </main></body>"#;

    assert_eq!(extract(html).text, "shown");
}

#[test]
fn deeply_nested_markup_is_read_on_a_small_stack() {
    const DEPTH: usize = 25_000;
    let html = format!(
        r#"<body><main><a href="https://example.com/deep">{}deep text{}</a></main></body>"#,
        "<span>".repeat(DEPTH),
        "</span>".repeat(DEPTH)
    );

    // Same stack size as a tokio worker thread.
    let content = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || DomExtractor.extract(&html, None))
        .expect("spawn extraction thread")
        .join()
        .expect("extraction thread finished")
        .expect("extract ok");

    assert_eq!(content.text, "deep text");
    assert_eq!(
        content.links,
        vec![ExtractedLink {
            text: "deep text".into(),
            href: "https://example.com/deep".into()
        }]
    );
}

#[test]
fn rows_without_data_cells_are_dropped() {
    let html = r#"<body><table>
        <tr><th>only headers</th></tr>
        <tr></tr>
        <tr><td>1</td></tr>
    </table></body>"#;

    let content = extract(html);
    assert_eq!(content.tables[0].rows, vec![vec!["1"]]);
}

#[test]
fn unlabelled_and_hrefless_links_are_dropped() {
    let html = r#"<body><main>
        <a href="https://a.example/">A</a>
        <a href="https://b.example/"><img src="x.png"></a>
        <a name="anchor">No href</a>
    </main></body>"#;

    let content = extract(html);
    assert_eq!(content.links.len(), 1);
    assert_eq!(content.links[0].text, "A");
}

#[test]
fn relative_links_resolve_against_page_url() {
    let html = r#"<body><main><a href="/docs/intro">Intro</a></main></body>"#;
    let base = Url::parse("https://example.com/start").unwrap();

    let content = DomExtractor.extract(html, Some(&base)).unwrap();
    assert_eq!(content.links[0].href, "https://example.com/docs/intro");
}

#[test]
fn extraction_leaves_the_source_untouched() {
    let html = r#"<body><header>H</header><main><p>Body</p></main></body>"#;
    let first = extract(html);
    let second = extract(html);
    assert_eq!(first, second);
}

#[test]
fn empty_page_gives_empty_content() {
    let content = extract("");
    assert!(content.is_empty());
}

struct FailingExtractor;

impl Extractor for FailingExtractor {
    fn extract(
        &self,
        _html: &str,
        _base_url: Option<&Url>,
    ) -> Result<ExtractedContent, ExtractionError> {
        Err(ExtractionError::new("DOM read failed"))
    }
}

struct PanickingExtractor;

impl Extractor for PanickingExtractor {
    fn extract(
        &self,
        _html: &str,
        _base_url: Option<&Url>,
    ) -> Result<ExtractedContent, ExtractionError> {
        panic!("DOM read failed");
    }
}

#[test]
fn extractor_errors_become_error_replies() {
    let page = PageContext::new(None, Arc::from("<body></body>"), Arc::new(FailingExtractor));
    assert_eq!(
        page.handle(PageRequest::GetContent),
        PageResponse::error("DOM read failed")
    );
}

#[test]
fn extractor_panics_become_error_replies() {
    let page = PageContext::new(None, Arc::from("<body></body>"), Arc::new(PanickingExtractor));
    let wire = page.dispatch(r#"{"action":"getContent"}"#);
    assert_eq!(wire, r#"{"error":"DOM read failed"}"#);
}

#[test]
fn ping_and_unknown_actions() {
    let page = PageContext::new(None, Arc::from("<body></body>"), Arc::new(DomExtractor));
    assert_eq!(page.dispatch(r#"{"action":"ping"}"#), r#"{"alive":true}"#);

    let reply: PageResponse =
        serde_json::from_str(&page.dispatch(r#"{"action":"selfDestruct"}"#)).unwrap();
    assert!(matches!(reply, PageResponse::Error { .. }));
}

#[test]
fn paste_requires_a_compose_area() {
    let page = PageContext::new(None, Arc::from("<body><p>read only</p></body>"), Arc::new(DomExtractor));
    assert_eq!(
        page.handle(PageRequest::PasteIntoCompose {
            content: "hi".into()
        }),
        PageResponse::error("No compose area found on this page")
    );

    let page = PageContext::new(
        None,
        Arc::from(r#"<body><div contenteditable="true"></div></body>"#),
        Arc::new(DomExtractor),
    );
    assert_eq!(
        page.handle(PageRequest::PasteIntoCompose {
            content: "hi".into()
        }),
        PageResponse::pasted()
    );
}
