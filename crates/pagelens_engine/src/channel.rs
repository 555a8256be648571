use std::time::Duration;

use pagelens_core::{PageRequest, PageResponse, TabId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("no tab with id {0}")]
    NoSuchTab(TabId),
    #[error("could not establish connection: receiving end does not exist")]
    NoListener,
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("the message channel closed before a response was received")]
    Closed,
    #[error("malformed message: {0}")]
    Codec(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectionError {
    #[error("no tab with id {0}")]
    NoSuchTab(TabId),
    #[error("cannot access contents of restricted page {url}")]
    Restricted { url: String },
}

/// Request/response transport between the orchestration side and a page.
#[async_trait::async_trait]
pub trait PageChannel: Send + Sync {
    /// Sends one request and waits at most `timeout` for its reply.
    async fn send(
        &self,
        tab: TabId,
        request: PageRequest,
        timeout: Duration,
    ) -> Result<PageResponse, ChannelError>;
}

/// Loads the extractor into a page.
#[async_trait::async_trait]
pub trait ScriptInjector: Send + Sync {
    /// Succeeds without side effects when the extractor is already loaded.
    async fn inject(&self, tab: TabId) -> Result<(), InjectionError>;
}
