use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use lens_logging::{lens_debug, lens_warn};
use pagelens_core::{PageRequest, PageResponse};
use scraper::{Html, Selector};
use url::Url;

use crate::extract::Extractor;

const COMPOSE_AREAS: &str = r#"[contenteditable="true"], [contenteditable=""], textarea, [role="textbox"]"#;

/// Page-side message handler: what the injected script does once loaded.
///
/// It only reads the page source; every reply is built from a fresh parse.
pub struct PageContext {
    url: Option<Url>,
    source: Arc<str>,
    extractor: Arc<dyn Extractor>,
    compose: Arc<Mutex<String>>,
}

impl PageContext {
    pub fn new(url: Option<Url>, source: Arc<str>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            url,
            source,
            extractor,
            compose: Arc::new(Mutex::new(String::new())),
        }
    }

    /// Shares the compose buffer that `pasteIntoGmail` writes to.
    pub fn with_compose(mut self, compose: Arc<Mutex<String>>) -> Self {
        self.compose = compose;
        self
    }

    pub fn handle(&self, request: PageRequest) -> PageResponse {
        lens_debug!("page received {}", request.action_name());
        match request {
            PageRequest::Ping => PageResponse::alive(),
            PageRequest::GetContent => self.get_content(),
            PageRequest::PasteIntoCompose { content } => self.paste_into_compose(&content),
        }
    }

    /// Decodes a wire request, handles it, and encodes the reply.
    pub fn dispatch(&self, wire: &str) -> String {
        let response = match serde_json::from_str::<PageRequest>(wire) {
            Ok(request) => self.handle(request),
            Err(err) => PageResponse::error(format!("unsupported message: {err}")),
        };
        serde_json::to_string(&response)
            .unwrap_or_else(|err| serde_json::json!({ "error": err.to_string() }).to_string())
    }

    fn get_content(&self) -> PageResponse {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.extractor.extract(&self.source, self.url.as_ref())
        }));
        match outcome {
            Ok(Ok(content)) => PageResponse::Content(content),
            Ok(Err(err)) => {
                lens_warn!("extraction failed: {}", err);
                PageResponse::error(err.message())
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "extraction aborted".to_string());
                lens_warn!("extractor panicked: {}", message);
                PageResponse::error(message)
            }
        }
    }

    fn paste_into_compose(&self, content: &str) -> PageResponse {
        if !self.has_compose_area() {
            return PageResponse::error("No compose area found on this page");
        }
        match self.compose.lock() {
            Ok(mut draft) => {
                if !draft.is_empty() && !content.is_empty() {
                    draft.push('\n');
                }
                draft.push_str(content);
                PageResponse::pasted()
            }
            Err(_) => PageResponse::error("compose area is unavailable"),
        }
    }

    fn has_compose_area(&self) -> bool {
        let Ok(sel) = Selector::parse(COMPOSE_AREAS) else {
            return false;
        };
        let doc = Html::parse_document(&self.source);
        let found = doc.select(&sel).next().is_some();
        found
    }
}
