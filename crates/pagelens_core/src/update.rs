use crate::state::Pending;
use crate::view_model::{PanelDisplay, PasteStatus};
use crate::{truncate_content, Effect, Msg, PanelState};

const EMPTY_PROMPT_MESSAGE: &str = "Please enter an analysis request.";
const EMPTY_PAGE_MESSAGE: &str = "No text content found on this page";

/// Pure update function: applies a message to panel state and returns any effects.
pub fn update(mut state: PanelState, msg: Msg) -> (PanelState, Vec<Effect>) {
    let effects = match msg {
        Msg::SettingsLoaded {
            prompts,
            max_length,
        } => {
            state.apply_settings(prompts, max_length);
            Vec::new()
        }
        Msg::TabChanged { url } => {
            state.set_current_url(url);
            Vec::new()
        }
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::PromptSelected { label } => match state.visible_prompt(&label) {
            Some(prompt) => {
                state.set_input(prompt);
                begin_analysis(&mut state)
            }
            None => Vec::new(),
        },
        Msg::AnalyzeClicked => begin_analysis(&mut state),
        Msg::ContentExtracted(content) => {
            // Late replies for an abandoned request are dropped.
            let Pending::Extracting { prompt } = state.pending().clone() else {
                return (state, Vec::new());
            };
            if content.is_empty() {
                state.set_pending(Pending::Idle);
                state.show_error(EMPTY_PAGE_MESSAGE);
                return (state, Vec::new());
            }
            match serde_json::to_string(&content) {
                Ok(json) => {
                    let content = truncate_content(&json, state.max_length());
                    state.set_pending(Pending::Analyzing);
                    vec![Effect::Analyze { prompt, content }]
                }
                Err(err) => {
                    state.set_pending(Pending::Idle);
                    state.show_error(&err.to_string());
                    Vec::new()
                }
            }
        }
        Msg::ExtractionFailed(message) => {
            if matches!(state.pending(), Pending::Extracting { .. }) {
                state.set_pending(Pending::Idle);
                state.show_error(&message);
            }
            Vec::new()
        }
        Msg::AnalysisFinished(result) => {
            if *state.pending() == Pending::Analyzing {
                state.set_pending(Pending::Idle);
                match result {
                    Ok(text) => state.show(PanelDisplay::Result(text)),
                    Err(message) => state.show_error(&message),
                }
            }
            Vec::new()
        }
        Msg::CopyClicked => match state.result_text().map(str::to_string) {
            Some(content) => {
                state.set_paste_status(None);
                vec![Effect::PasteIntoPage { content }]
            }
            None => Vec::new(),
        },
        Msg::PasteFinished(result) => {
            let status = match result {
                Ok(()) => PasteStatus::Pasted,
                Err(message) => PasteStatus::Failed(message),
            };
            state.set_paste_status(Some(status));
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn begin_analysis(state: &mut PanelState) -> Vec<Effect> {
    if state.is_busy() {
        return Vec::new();
    }
    let prompt = state.input().trim().to_string();
    if prompt.is_empty() {
        state.show_error(EMPTY_PROMPT_MESSAGE);
        return Vec::new();
    }
    state.show(PanelDisplay::Empty);
    state.set_pending(Pending::Extracting { prompt });
    vec![Effect::ExtractContent]
}
