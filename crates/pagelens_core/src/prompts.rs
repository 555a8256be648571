use regex::Regex;
use serde::{Deserialize, Serialize};

/// Upper bound on stored custom prompts.
pub const MAX_CUSTOM_PROMPTS: usize = 10;

const SUMMARIZE_PROMPT: &str = "Please analyze and summarize this content in a structured format:

1. Main Points (2-3 bullet points)
2. Key Details (if any)
3. Context & Significance
4. Notable Quotes (if any)

Format the response with markdown-style headings using ### for sections.
Use bullet points for lists.
Put quotes in blockquote format using >.";

const TABLE_PROMPT: &str = "Analyze the table data in the following content and provide insights. \
Format your response as a bullet list, with each insight on a new line starting with \"• \".";

const LINKS_PROMPT: &str = "From the following content, identify at most 5 relevant links and \
provide their descriptions in JSON format as an array of objects with \"text\" and \"href\" properties.";

const REPLY_PROMPT: &str = "Draft a concise, friendly reply to the email thread below.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub label: String,
    pub prompt: String,
    /// Wildcard URL prefix; empty means every page.
    #[serde(default)]
    pub url_pattern: String,
}

impl PromptTemplate {
    pub fn new(
        label: impl Into<String>,
        prompt: impl Into<String>,
        url_pattern: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            prompt: prompt.into(),
            url_pattern: url_pattern.into(),
        }
    }

    pub fn applies_to(&self, url: &str) -> bool {
        prompt_matches_url(&self.url_pattern, url)
    }
}

pub fn default_prompts() -> Vec<PromptTemplate> {
    vec![
        PromptTemplate::new("Summarize", SUMMARIZE_PROMPT, ""),
        PromptTemplate::new("Table insights", TABLE_PROMPT, ""),
        PromptTemplate::new("Key links", LINKS_PROMPT, ""),
        PromptTemplate::new("Draft reply", REPLY_PROMPT, "https://mail.google.com/*"),
    ]
}

/// Matches `url` against a wildcard pattern.
///
/// `*` matches any run of characters, everything else is literal. The match
/// is anchored at the start of the URL only, and the URL's query and
/// fragment are ignored. A trailing `.*` also accepts the bare prefix, so
/// `https://docs.google.com/document.*` matches `.../document/d/...`.
pub fn prompt_matches_url(pattern: &str, url: &str) -> bool {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return true;
    }

    let mut source = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*?");
    if let Some(prefix) = source.strip_suffix(r"\..*?") {
        source = format!("{prefix}.*?");
    }

    let target = url.split(['?', '#']).next().unwrap_or_default();
    match Regex::new(&format!("^{source}")) {
        Ok(re) => re.is_match(target),
        Err(_) => false,
    }
}

/// Prompts whose pattern accepts `url`, in their stored order.
pub fn visible_prompts<'a>(prompts: &'a [PromptTemplate], url: &str) -> Vec<&'a PromptTemplate> {
    prompts.iter().filter(|p| p.applies_to(url)).collect()
}
