//! Terminal rendering of the panel view model.

use pagelens_core::{PanelDisplay, PanelViewModel, PasteStatus, PromptTemplate};

/// One line per visible panel element, for the progress stream.
pub(crate) fn status_lines(view: &PanelViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    if !view.current_url.is_empty() {
        lines.push(format!("page: {}", view.current_url));
    }
    if view.loading {
        lines.push(format!("analyzing: {}", first_line(&view.input)));
    }
    match &view.paste_status {
        Some(PasteStatus::Pasted) => lines.push("pasted into compose area".to_string()),
        Some(PasteStatus::Failed(message)) => lines.push(format!("paste failed: {message}")),
        None => {}
    }
    lines
}

/// The final answer: the model's reply, or the error shown in its place.
pub(crate) fn outcome(view: &PanelViewModel) -> Result<Option<&str>, &str> {
    match &view.display {
        PanelDisplay::Empty => Ok(None),
        PanelDisplay::Result(text) => Ok(Some(text.as_str())),
        PanelDisplay::Error(message) => Err(message.as_str()),
    }
}

pub(crate) fn prompt_table(prompts: &[&PromptTemplate]) -> String {
    let width = prompts
        .iter()
        .map(|p| p.label.chars().count())
        .max()
        .unwrap_or(0);
    prompts
        .iter()
        .map(|p| {
            let scope = if p.url_pattern.is_empty() { "*" } else { p.url_pattern.as_str() };
            format!("{:<width$}  [{scope}]  {}", p.label, first_line(&p.prompt))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}
