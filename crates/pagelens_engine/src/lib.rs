//! PageLens engine: page hosting, extraction, and the IO side of every effect.
mod browser;
mod channel;
mod coordinator;
mod extract;
mod inject;
mod llm;
mod loader;
mod page;
mod settings;
mod text;

pub use browser::{Browser, PageLoad};
pub use channel::{ChannelError, InjectionError, PageChannel, ScriptInjector};
pub use coordinator::ContentCoordinator;
pub use extract::{DomExtractor, ExtractionError, Extractor};
pub use inject::InjectionManager;
pub use llm::{ApiError, LlmClient, LlmSettings, OpenAiClient, OPENAI_CHAT_ENDPOINT};
pub use loader::{FailureKind, LoadError, LoaderSettings, PageLoader};
pub use page::PageContext;
pub use settings::{SettingsStore, StoreError, SETTINGS_FILENAME};
pub use text::visible_text;
