use crate::config::{DEFAULT_MODEL, DEFAULT_PROMPT};
use argh::FromArgs;
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
/// Kua Simi? Ask a vision model about an image and watch the answer
/// stream into a desktop notification.
pub struct Args {
    /// path to the image file
    #[argh(option, short = 'f')]
    pub file: PathBuf,

    /// prompt string for the API call (overrides the default)
    #[argh(option, short = 'p', default = "DEFAULT_PROMPT.to_string()")]
    pub prompt: String,

    /// model to run
    #[argh(option, short = 'm', default = "DEFAULT_MODEL.to_string()")]
    pub model: String,
}
