//! Application-level errors.

use thiserror::Error;

use crate::ai::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not open visualizer window: {0}")]
    Window(String),

    #[error("invalid color \"{0}\" (expected #rrggbb)")]
    Color(String),

    #[error("point-cloud generator: {0}")]
    Provider(#[from] ProviderError),
}

pub type AppResult<T> = Result<T, AppError>;
