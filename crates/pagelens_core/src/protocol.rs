//! Messages exchanged across the page boundary.
//!
//! Every value here is serialized to JSON before it crosses between the
//! orchestration side and a page, so nothing is shared by reference.
use serde::{Deserialize, Serialize};

use crate::ExtractedContent;

pub type TabId = u32;

/// Requests a page context answers. The set is closed; adding an action
/// means adding a variant and a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageRequest {
    /// Liveness probe used before injecting the extractor.
    Ping,
    /// Extract the page's visible content.
    GetContent,
    /// Insert text into the page's compose area.
    #[serde(rename = "pasteIntoGmail")]
    PasteIntoCompose { content: String },
}

impl PageRequest {
    /// The wire name of the request's `action` tag.
    pub fn action_name(&self) -> &'static str {
        match self {
            PageRequest::Ping => "ping",
            PageRequest::GetContent => "getContent",
            PageRequest::PasteIntoCompose { .. } => "pasteIntoGmail",
        }
    }
}

/// Replies from a page context.
///
/// Variant order matters for decoding: an `error` key always wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageResponse {
    Error { error: String },
    Content(ExtractedContent),
    Pasted { success: bool },
    Alive { alive: bool },
}

impl PageResponse {
    pub fn error(message: impl Into<String>) -> Self {
        PageResponse::Error {
            error: message.into(),
        }
    }

    pub fn alive() -> Self {
        PageResponse::Alive { alive: true }
    }

    pub fn pasted() -> Self {
        PageResponse::Pasted { success: true }
    }
}

/// Notifications pushed from the background side to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum UiNotification {
    TabChanged { url: String },
}
