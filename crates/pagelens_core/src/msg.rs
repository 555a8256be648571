use crate::{ExtractedContent, PromptTemplate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Settings were (re)loaded from the store.
    SettingsLoaded {
        prompts: Vec<PromptTemplate>,
        max_length: usize,
    },
    /// Background reported a new active URL.
    TabChanged { url: String },
    /// User edited the analysis input.
    InputChanged(String),
    /// User clicked a prompt button.
    PromptSelected { label: String },
    /// User clicked Analyze.
    AnalyzeClicked,
    /// Page content arrived for the pending analysis.
    ContentExtracted(ExtractedContent),
    /// Page content could not be obtained.
    ExtractionFailed(String),
    /// Model reply (or its user-facing error) arrived.
    AnalysisFinished(Result<String, String>),
    /// User clicked Copy to paste the result into the page.
    CopyClicked,
    /// Outcome of the paste request.
    PasteFinished(Result<(), String>),
    /// Fallback for placeholder wiring.
    NoOp,
}
