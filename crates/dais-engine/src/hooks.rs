//! Extension hooks for layers wrapping the engine.

use crate::error::EngineError;
use crate::style::PackOptions;

/// Hooks a wrapping layer implements to influence stylesheet assembly.
///
/// Both hooks default to pass-through, so a bare engine renders theme CSS
/// unmodified.
pub trait EngineHooks {
    /// Adjust the options used when packing the resolved theme.
    ///
    /// Receives the engine's base options, which carry the slide
    /// scaffolding styles.
    fn pack_options(&self, base: PackOptions) -> PackOptions {
        base
    }

    /// Post-process the packed stylesheet.
    fn render_style(&self, css: String) -> Result<String, EngineError> {
        Ok(css)
    }
}

/// Pass-through hooks for using the engine on its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughHooks;

impl EngineHooks for PassthroughHooks {}
