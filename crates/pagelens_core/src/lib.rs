//! PageLens core: wire types and pure state machines.
//!
//! Nothing in this crate performs IO. The engine crate executes the effects
//! produced here and feeds the outcomes back in as messages.
mod content;
mod coordinator;
mod effect;
mod msg;
mod prompts;
mod protocol;
mod settings;
mod state;
mod truncate;
mod update;
mod view_model;

pub use content::{ExtractedContent, ExtractedLink, ExtractedTable};
pub use coordinator::{
    step, Coordination, CoordinatorEffect, CoordinatorError, CoordinatorMsg, Phase, Presence,
    RetryPolicy,
};
pub use effect::Effect;
pub use msg::Msg;
pub use prompts::{
    default_prompts, prompt_matches_url, visible_prompts, PromptTemplate, MAX_CUSTOM_PROMPTS,
};
pub use protocol::{PageRequest, PageResponse, TabId, UiNotification};
pub use settings::{Settings, SettingsError, DEFAULT_MAX_LENGTH, DEFAULT_MODEL};
pub use state::PanelState;
pub use truncate::{truncate_content, TRUNCATION_MARKER};
pub use update::update;
pub use view_model::{PanelDisplay, PanelViewModel, PasteStatus};
