#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run the extraction handshake against the active tab.
    ExtractContent,
    /// Send the prompt and the serialized page content to the model.
    Analyze { prompt: String, content: String },
    /// Paste text into the active tab's compose area.
    PasteIntoPage { content: String },
}
