use thiserror::Error;

use crate::config::ConfigError;
use crate::organizer::OrganizerError;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("IO/Terminal error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Organizer error: {0}")]
    OrganizerError(#[from] OrganizerError),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Key binding error: {0}")]
    KeyBindingError(String),

    #[error("Render error: {0}")]
    RenderError(String),
}
