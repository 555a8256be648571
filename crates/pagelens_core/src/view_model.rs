#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PanelDisplay {
    #[default]
    Empty,
    Result(String),
    /// Already prefixed with `Error: `.
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteStatus {
    Pasted,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelViewModel {
    pub current_url: String,
    /// Labels of the prompt buttons visible for `current_url`.
    pub prompt_buttons: Vec<String>,
    pub input: String,
    pub loading: bool,
    pub display: PanelDisplay,
    pub paste_status: Option<PasteStatus>,
    pub dirty: bool,
}
