use std::sync::Arc;

use lens_logging::{lens_info, lens_warn};
use pagelens_core::{Effect, Msg, UiNotification};
use pagelens_engine::{ApiError, Browser, ContentCoordinator, LlmClient};
use tokio::sync::{broadcast, mpsc};

/// Executes panel effects and reports their outcomes as [`Msg`]s.
pub struct EffectRunner {
    browser: Arc<Browser>,
    coordinator: ContentCoordinator,
    llm: Result<Arc<dyn LlmClient>, ApiError>,
    system_message: Option<String>,
    msg_tx: mpsc::UnboundedSender<Msg>,
}

impl EffectRunner {
    pub fn new(
        browser: Arc<Browser>,
        coordinator: ContentCoordinator,
        llm: Result<Arc<dyn LlmClient>, ApiError>,
        msg_tx: mpsc::UnboundedSender<Msg>,
    ) -> Self {
        let runner = Self {
            browser,
            coordinator,
            llm,
            system_message: None,
            msg_tx,
        };
        runner.spawn_notification_loop();
        runner
    }

    pub fn with_system_message(mut self, system_message: Option<String>) -> Self {
        self.system_message = system_message;
        self
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ExtractContent => self.spawn_extract(),
                Effect::Analyze { prompt, content } => {
                    lens_info!("Analyze prompt_len={} content_len={}", prompt.len(), content.len());
                    self.spawn_analyze(prompt, content);
                }
                Effect::PasteIntoPage { content } => self.spawn_paste(content),
            }
        }
    }

    fn spawn_extract(&self) {
        let tab = self.browser.active_tab();
        let coordinator = self.coordinator.clone();
        let msg_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let msg = match tab {
                Some(tab) => match coordinator.extract(tab).await {
                    Ok(content) => Msg::ContentExtracted(content),
                    Err(err) => Msg::ExtractionFailed(err.to_string()),
                },
                None => Msg::ExtractionFailed("No active tab".to_string()),
            };
            let _ = msg_tx.send(msg);
        });
    }

    fn spawn_analyze(&self, prompt: String, content: String) {
        let llm = self.llm.clone();
        let system_message = self.system_message.clone();
        let msg_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let result = match llm {
                Ok(client) => {
                    client
                        .analyze(&prompt, &content, system_message.as_deref())
                        .await
                }
                Err(err) => Err(err),
            };
            let result = result.map_err(|err| {
                lens_warn!("Analysis failed: {}", err);
                let message = err.to_string();
                format!("{}. {}", message.trim_end_matches('.'), err.remediation())
            });
            let _ = msg_tx.send(Msg::AnalysisFinished(result));
        });
    }

    fn spawn_paste(&self, content: String) {
        let tab = self.browser.active_tab();
        let coordinator = self.coordinator.clone();
        let msg_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let result = match tab {
                Some(tab) => coordinator.paste(tab, &content).await,
                None => Err("No active tab".to_string()),
            };
            let _ = msg_tx.send(Msg::PasteFinished(result));
        });
    }

    /// Forwards `tabChanged` notifications from the browser to the panel.
    fn spawn_notification_loop(&self) {
        let mut notifications = self.browser.subscribe();
        let msg_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(UiNotification::TabChanged { url }) => {
                        if msg_tx.send(Msg::TabChanged { url }).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        lens_warn!("Dropped {} tab notifications", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
