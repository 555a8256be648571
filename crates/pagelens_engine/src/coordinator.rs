use std::sync::Arc;

use lens_logging::{lens_debug, lens_info, lens_warn};
use pagelens_core::{
    step, Coordination, CoordinatorEffect, CoordinatorError, CoordinatorMsg, ExtractedContent,
    PageRequest, PageResponse, RetryPolicy, TabId,
};

use crate::channel::{PageChannel, ScriptInjector};
use crate::inject::InjectionManager;

/// Runs the extraction handshake against real pages.
///
/// The decisions live in [`pagelens_core::step`]; this type only carries out
/// the effects it asks for.
#[derive(Clone)]
pub struct ContentCoordinator {
    channel: Arc<dyn PageChannel>,
    injection: InjectionManager,
    policy: RetryPolicy,
}

impl ContentCoordinator {
    pub fn new(
        channel: Arc<dyn PageChannel>,
        injector: Arc<dyn ScriptInjector>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            channel,
            injection: InjectionManager::new(injector),
            policy,
        }
    }

    /// Fetches the content of `tab`, injecting and retrying as needed.
    pub async fn extract(&self, tab: TabId) -> Result<ExtractedContent, CoordinatorError> {
        let (mut state, mut effects) = step(Coordination::new(self.policy), CoordinatorMsg::Start);
        loop {
            let Some(effect) = effects.pop() else {
                // Every non-terminal phase emits exactly one effect.
                return Err(CoordinatorError::Connection {
                    attempts: state.sends(),
                    last_failure: format!("handshake stalled in {:?}", state.phase()),
                });
            };
            let msg = match effect {
                CoordinatorEffect::Probe { timeout } => {
                    match self.channel.send(tab, PageRequest::Ping, timeout).await {
                        Ok(_) => CoordinatorMsg::ProbeAnswered,
                        Err(err) => {
                            lens_debug!("probe of tab {} unanswered: {}", tab, err);
                            CoordinatorMsg::ProbeUnanswered
                        }
                    }
                }
                CoordinatorEffect::Inject => match self.injection.ensure_injected(tab).await {
                    Ok(()) => CoordinatorMsg::InjectionSucceeded,
                    Err(err) => CoordinatorMsg::InjectionRefused {
                        reason: err.to_string(),
                    },
                },
                CoordinatorEffect::Wait(delay) => {
                    tokio::time::sleep(delay).await;
                    CoordinatorMsg::DelayElapsed
                }
                CoordinatorEffect::Send { timeout } => {
                    match self.channel.send(tab, PageRequest::GetContent, timeout).await {
                        Ok(PageResponse::Content(content)) => CoordinatorMsg::ContentReceived(content),
                        Ok(PageResponse::Error { error }) => {
                            lens_warn!("tab {} extractor reported: {}", tab, error);
                            CoordinatorMsg::ExtractorFailed { message: error }
                        }
                        Ok(other) => CoordinatorMsg::ChannelFailed {
                            reason: format!("unexpected reply {other:?}"),
                        },
                        Err(err) => {
                            lens_warn!(
                                "getContent attempt {} on tab {} failed: {}",
                                state.sends(),
                                tab,
                                err
                            );
                            CoordinatorMsg::ChannelFailed {
                                reason: err.to_string(),
                            }
                        }
                    }
                }
                CoordinatorEffect::Finish(result) => {
                    match &result {
                        Ok(content) => lens_info!(
                            "extracted tab {} ({} chars, {} tables, {} links) after {} attempt(s)",
                            tab,
                            content.text.len(),
                            content.tables.len(),
                            content.links.len(),
                            state.sends()
                        ),
                        Err(err) => lens_warn!("extraction from tab {} failed: {:?}", tab, err),
                    }
                    return result;
                }
            };
            (state, effects) = step(state, msg);
        }
    }

    /// Pastes `content` into the compose area of `tab`.
    pub async fn paste(&self, tab: TabId, content: &str) -> Result<(), String> {
        self.injection
            .ensure_injected(tab)
            .await
            .map_err(|err| err.to_string())?;
        let request = PageRequest::PasteIntoCompose {
            content: content.to_string(),
        };
        match self
            .channel
            .send(tab, request, self.policy.request_timeout)
            .await
        {
            Ok(PageResponse::Pasted { success: true }) => Ok(()),
            Ok(PageResponse::Error { error }) => Err(error),
            Ok(other) => Err(format!("unexpected reply {other:?}")),
            Err(err) => Err(err.to_string()),
        }
    }
}
