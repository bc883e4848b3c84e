//! Error types for the rendering engine.

use std::error::Error;

/// Boxed error carried by fallible callbacks such as the highlight hook.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Errors raised while configuring or running the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A theme stylesheet did not declare an `@theme` name.
    #[error("theme stylesheet is missing an `@theme` name declaration")]
    UnnamedTheme,

    /// A theme with the same name was already registered.
    #[error("theme `{0}` is already registered")]
    DuplicateTheme(String),

    /// A theme name was referenced but never registered.
    #[error("theme `{0}` is not registered")]
    UnknownTheme(String),

    /// Rendering was attempted with no default theme to fall back on.
    #[error("no default theme is registered")]
    NoDefaultTheme,

    /// The highlight callback failed for a fenced code block.
    #[error("highlighting failed for language `{language}`")]
    Highlight {
        /// Language token from the code fence.
        language: String,
        /// Underlying callback error.
        #[source]
        source: BoxError,
    },

    /// A stylesheet hook rejected the packed CSS.
    #[error("stylesheet post-processing failed: {0}")]
    Style(String),
}
