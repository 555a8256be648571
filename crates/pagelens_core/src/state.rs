use crate::view_model::{PanelDisplay, PanelViewModel, PasteStatus};
use crate::{visible_prompts, PromptTemplate, DEFAULT_MAX_LENGTH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pending {
    Idle,
    Extracting { prompt: String },
    Analyzing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelState {
    current_url: String,
    prompts: Vec<PromptTemplate>,
    max_length: usize,
    input: String,
    pending: Pending,
    display: PanelDisplay,
    paste_status: Option<PasteStatus>,
    dirty: bool,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            current_url: String::new(),
            prompts: Vec::new(),
            max_length: DEFAULT_MAX_LENGTH,
            input: String::new(),
            pending: Pending::Idle,
            display: PanelDisplay::Empty,
            paste_status: None,
            dirty: false,
        }
    }
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> PanelViewModel {
        PanelViewModel {
            current_url: self.current_url.clone(),
            prompt_buttons: visible_prompts(&self.prompts, &self.current_url)
                .into_iter()
                .map(|p| p.label.clone())
                .collect(),
            input: self.input.clone(),
            loading: self.pending != Pending::Idle,
            display: self.display.clone(),
            paste_status: self.paste_status.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_busy(&self) -> bool {
        self.pending != Pending::Idle
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn input(&self) -> &str {
        &self.input
    }

    pub(crate) fn max_length(&self) -> usize {
        self.max_length
    }

    pub(crate) fn pending(&self) -> &Pending {
        &self.pending
    }

    pub(crate) fn set_pending(&mut self, pending: Pending) {
        self.pending = pending;
        self.mark_dirty();
    }

    pub(crate) fn apply_settings(&mut self, prompts: Vec<PromptTemplate>, max_length: usize) {
        self.prompts = prompts;
        self.max_length = max_length.max(1);
        self.mark_dirty();
    }

    pub(crate) fn set_current_url(&mut self, url: String) {
        if self.current_url != url {
            self.current_url = url;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_input(&mut self, input: String) {
        if self.input != input {
            self.input = input;
            self.mark_dirty();
        }
    }

    /// Prompt text for a visible button, if `label` names one.
    pub(crate) fn visible_prompt(&self, label: &str) -> Option<String> {
        visible_prompts(&self.prompts, &self.current_url)
            .into_iter()
            .find(|p| p.label == label)
            .map(|p| p.prompt.clone())
    }

    pub(crate) fn show(&mut self, display: PanelDisplay) {
        self.display = display;
        self.mark_dirty();
    }

    pub(crate) fn show_error(&mut self, message: &str) {
        self.show(PanelDisplay::Error(format!("Error: {message}")));
    }

    pub(crate) fn result_text(&self) -> Option<&str> {
        match &self.display {
            PanelDisplay::Result(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }

    pub(crate) fn set_paste_status(&mut self, status: Option<PasteStatus>) {
        self.paste_status = status;
        self.mark_dirty();
    }
}
