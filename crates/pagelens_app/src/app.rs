use std::sync::Arc;

use lens_logging::lens_debug;
use pagelens_core::{update, Msg, PanelState, PanelViewModel};
use pagelens_engine::{ApiError, Browser, ContentCoordinator, LlmClient};
use tokio::sync::mpsc;

use crate::effects::EffectRunner;
use crate::render;

/// Drives the panel state machine: messages in, effects out, renders on change.
pub struct PanelSession {
    state: PanelState,
    runner: EffectRunner,
    msg_rx: mpsc::UnboundedReceiver<Msg>,
    show_progress: bool,
}

impl PanelSession {
    pub fn new(
        browser: Arc<Browser>,
        coordinator: ContentCoordinator,
        llm: Result<Arc<dyn LlmClient>, ApiError>,
        system_message: Option<String>,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let runner = EffectRunner::new(browser, coordinator, llm, msg_tx)
            .with_system_message(system_message);
        Self {
            state: PanelState::new(),
            runner,
            msg_rx,
            show_progress: false,
        }
    }

    /// Print status lines on stderr whenever the panel changes.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn view(&self) -> PanelViewModel {
        self.state.view()
    }

    pub fn dispatch(&mut self, msg: Msg) {
        lens_debug!("panel <- {:?}", msg_name(&msg));
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;

        if was_dirty && self.show_progress {
            for line in render::status_lines(&self.state.view()) {
                eprintln!("{line}");
            }
        }
        self.runner.enqueue(effects);
    }

    /// Processes incoming messages until `done` holds for the current view.
    /// Returns false if every sender went away first.
    pub async fn run_until(&mut self, done: impl Fn(&PanelViewModel) -> bool) -> bool {
        while !done(&self.state.view()) {
            match self.msg_rx.recv().await {
                Some(msg) => self.dispatch(msg),
                None => return false,
            }
        }
        true
    }
}

fn msg_name(msg: &Msg) -> &'static str {
    match msg {
        Msg::SettingsLoaded { .. } => "SettingsLoaded",
        Msg::TabChanged { .. } => "TabChanged",
        Msg::InputChanged(_) => "InputChanged",
        Msg::PromptSelected { .. } => "PromptSelected",
        Msg::AnalyzeClicked => "AnalyzeClicked",
        Msg::ContentExtracted(_) => "ContentExtracted",
        Msg::ExtractionFailed(_) => "ExtractionFailed",
        Msg::AnalysisFinished(_) => "AnalysisFinished",
        Msg::CopyClicked => "CopyClicked",
        Msg::PasteFinished(_) => "PasteFinished",
        Msg::NoOp => "NoOp",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use pagelens_core::{default_prompts, PanelDisplay, PasteStatus, RetryPolicy};
    use pagelens_engine::PageLoad;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Echoes what it was asked, so tests can see the request.
    #[derive(Default)]
    struct EchoModel {
        calls: Mutex<Vec<(String, String, Option<String>)>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for EchoModel {
        async fn analyze(
            &self,
            prompt: &str,
            content: &str,
            system_message: Option<&str>,
        ) -> Result<String, ApiError> {
            self.calls.lock().unwrap().push((
                prompt.to_string(),
                content.to_string(),
                system_message.map(str::to_string),
            ));
            Ok(format!("reply to {prompt}"))
        }
    }

    fn session_for(
        browser: &Arc<Browser>,
        llm: Result<Arc<dyn LlmClient>, ApiError>,
    ) -> PanelSession {
        let policy = RetryPolicy {
            retry_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let coordinator = ContentCoordinator::new(browser.clone(), browser.clone(), policy);
        let mut session = PanelSession::new(browser.clone(), coordinator, llm, Some("Be brief.".into()));
        session.dispatch(Msg::SettingsLoaded {
            prompts: default_prompts(),
            max_length: 40,
        });
        session
    }

    #[tokio::test]
    async fn prompt_button_runs_full_analysis() {
        let browser = Arc::new(Browser::default());
        let model = Arc::new(EchoModel::default());
        let mut session = session_for(&browser, Ok(model.clone()));

        browser.open_tab(PageLoad::new(
            "https://example.com/news",
            "<body><main><p>Rates rose again this quarter across every region.</p></main></body>",
        ));
        assert!(session.run_until(|v| v.current_url == "https://example.com/news").await);

        session.dispatch(Msg::PromptSelected {
            label: "Summarize".into(),
        });
        assert!(session.view().loading);
        assert!(session.run_until(|v| !v.loading).await);

        let view = session.view();
        assert!(matches!(view.display, PanelDisplay::Result(ref text) if text.starts_with("reply to Please analyze")));

        let calls = model.calls.lock().unwrap();
        let (_, content, system) = &calls[0];
        assert_eq!(content.chars().count(), 43);
        assert!(content.starts_with(r#"{"text":"Rates rose"#));
        assert!(content.ends_with("..."));
        assert_eq!(system.as_deref(), Some("Be brief."));
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_with_advice() {
        let browser = Arc::new(Browser::default());
        let mut session = session_for(&browser, Err(ApiError::missing_api_key()));
        browser.open_tab(PageLoad::new("https://example.com/", "<body><p>hi</p></body>"));

        session.dispatch(Msg::InputChanged("What is this?".into()));
        session.dispatch(Msg::AnalyzeClicked);
        assert!(session.run_until(|v| !v.loading).await);

        assert_eq!(
            session.view().display,
            PanelDisplay::Error(
                "Error: OpenAI API error: Please set your OpenAI API key in the settings. \
                 Run `pagelens settings set --api-key <KEY>` to configure it."
                    .into()
            )
        );
    }

    #[tokio::test]
    async fn copy_pastes_result_into_compose_area() {
        let browser = Arc::new(Browser::default());
        let mut session = session_for(&browser, Ok(Arc::new(EchoModel::default())));
        let tab = browser.open_tab(PageLoad::new(
            "https://mail.google.com/mail/u/0/",
            r#"<body><main><p>Can we meet Tuesday?</p><div contenteditable="true"></div></main></body>"#,
        ));
        assert!(session.run_until(|v| v.prompt_buttons.contains(&"Draft reply".to_string())).await);

        session.dispatch(Msg::PromptSelected {
            label: "Draft reply".into(),
        });
        assert!(session.run_until(|v| !v.loading).await);
        session.dispatch(Msg::CopyClicked);
        assert!(session.run_until(|v| v.paste_status.is_some()).await);

        assert_eq!(session.view().paste_status, Some(PasteStatus::Pasted));
        assert_eq!(
            browser.compose_text(tab).as_deref(),
            Some("reply to Draft a concise, friendly reply to the email thread below.")
        );
    }
}
