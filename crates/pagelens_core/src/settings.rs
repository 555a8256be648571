use serde::{Deserialize, Serialize};

use crate::prompts::{default_prompts, PromptTemplate, MAX_CUSTOM_PROMPTS};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_LENGTH: usize = 10_000;

/// User settings as persisted by the settings store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    /// Maximum characters of page content sent to the model.
    pub max_length: usize,
    pub custom_prompts: Vec<PromptTemplate>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_length: DEFAULT_MAX_LENGTH,
            custom_prompts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("maximum content length must be greater than zero")]
    ZeroMaxLength,
    #[error("at most {max} prompts can be stored, got {actual}")]
    TooManyPrompts { max: usize, actual: usize },
}

impl Settings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Stored prompts, or the built-in set when none are stored.
    pub fn prompts(&self) -> Vec<PromptTemplate> {
        if self.custom_prompts.is_empty() {
            default_prompts()
        } else {
            self.custom_prompts.clone()
        }
    }

    /// Normalizes fields before saving.
    ///
    /// Prompt fields are trimmed and prompts missing a label or a body are
    /// dropped. A blank model falls back to the default.
    pub fn validated(mut self) -> Result<Self, SettingsError> {
        if self.max_length == 0 {
            return Err(SettingsError::ZeroMaxLength);
        }
        self.api_key = self.api_key.trim().to_string();
        self.model = match self.model.trim() {
            "" => DEFAULT_MODEL.to_string(),
            model => model.to_string(),
        };
        self.custom_prompts = self
            .custom_prompts
            .into_iter()
            .map(|p| PromptTemplate::new(p.label.trim(), p.prompt.trim(), p.url_pattern.trim()))
            .filter(|p| !p.label.is_empty() && !p.prompt.is_empty())
            .collect();
        if self.custom_prompts.len() > MAX_CUSTOM_PROMPTS {
            return Err(SettingsError::TooManyPrompts {
                max: MAX_CUSTOM_PROMPTS,
                actual: self.custom_prompts.len(),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_drops_incomplete_prompts() {
        let settings = Settings {
            model: "  ".into(),
            custom_prompts: vec![
                PromptTemplate::new(" Mine ", " do it ", ""),
                PromptTemplate::new("", "orphan", ""),
                PromptTemplate::new("label only", "   ", ""),
            ],
            ..Settings::default()
        };
        let validated = settings.validated().unwrap();
        assert_eq!(validated.model, DEFAULT_MODEL);
        assert_eq!(
            validated.custom_prompts,
            vec![PromptTemplate::new("Mine", "do it", "")]
        );
    }

    #[test]
    fn validation_rejects_prompt_overflow() {
        let settings = Settings {
            custom_prompts: (0..=MAX_CUSTOM_PROMPTS)
                .map(|i| PromptTemplate::new(format!("p{i}"), "x", ""))
                .collect(),
            ..Settings::default()
        };
        assert_eq!(
            settings.validated(),
            Err(SettingsError::TooManyPrompts {
                max: MAX_CUSTOM_PROMPTS,
                actual: MAX_CUSTOM_PROMPTS + 1
            })
        );
    }

    #[test]
    fn empty_prompt_list_falls_back_to_defaults() {
        assert_eq!(Settings::default().prompts(), default_prompts());
    }

    #[test]
    fn missing_fields_take_defaults_when_decoding() {
        let settings: Settings = serde_json::from_str(r#"{"apiKey":"sk-1"}"#).unwrap();
        assert_eq!(settings.api_key, "sk-1");
        assert_eq!(settings.max_length, DEFAULT_MAX_LENGTH);
        assert_eq!(settings.model, DEFAULT_MODEL);
    }
}
