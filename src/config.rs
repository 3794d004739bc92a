use thiserror::Error;

/// Environment variable holding the service credential.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
/// Environment variable overriding the service base URL.
pub const API_BASE_VAR: &str = "GEMINI_API_BASE";

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Instruction sent when no prompt is given on the command line.
pub const DEFAULT_PROMPT: &str = r#"
Kuasimi is an advanced visual assistant designed to analyze and understand the content of input images, which are likely to be screenshots. Its primary goal is to provide users with concise, contextual answers based on the information detected within the image.
When a user submits an image, Kuasimi employs sophisticated computer vision and image recognition techniques to examine the image thoroughly. It identifies and extracts key elements, such as text, objects, symbols, and any other relevant visual components that contribute to the overall context of the image.
Kuasimi processes the extracted information to determine the most relevant and meaningful aspects in relation to the user's intended query. This involves analyzing the relationships between the identified elements and understanding the context in which they appear within the image.
Based on its understanding of the image's content and context, Kuasimi formulates a concise response that directly addresses the user's needs. The response is tailored to provide the most pertinent information while maintaining clarity and brevity. Kuasimi's replies focus on delivering essential insights without unnecessary elaboration, ensuring that users can quickly obtain the information they seek.
The generated response is presented in a clear and easily understandable format, taking into consideration the user's presumed level of knowledge and the complexity of the image's content. Kuasimi strives to provide accurate and helpful information, enabling users to gain valuable insights from the input image efficiently.
Throughout its interactions, Kuasimi prioritizes delivering concise and relevant answers, making it an ideal tool for users who require quick and accurate information based on visual input.
"#;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),
}

/// Settings read from the environment once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingCredential(API_KEY_VAR))?;

        let api_base = lookup(API_BASE_VAR)
            .filter(|base| !base.trim().is_empty())
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self { api_key, api_base })
    }
}
