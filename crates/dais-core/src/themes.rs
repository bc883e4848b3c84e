//! Bundled presentation themes.

use dais_engine::{EngineError, MetaKind, ThemeRegistry};

/// Metadata keys bundled and user themes may carry.
///
/// `auto-scaling` is single-valued and read by the fitting rule; `size` is
/// repeatable, one entry per canvas preset.
pub const META_SCHEMA: &[(&str, MetaKind)] = &[
    ("auto-scaling", MetaKind::String),
    ("size", MetaKind::Array),
];

/// Plain light theme, registered as the fallback.
pub const DEFAULT_THEME: &str = include_str!("../themes/default.css");

/// Warm two-tone theme.
pub const GAIA_THEME: &str = include_str!("../themes/gaia.css");

/// Centered minimal theme.
pub const UNCOVER_THEME: &str = include_str!("../themes/uncover.css");

/// Install the metadata schema and the bundled themes.
///
/// `default` is registered first and becomes the fallback for documents
/// that request no theme or an unknown one.
pub(crate) fn bootstrap(registry: &mut ThemeRegistry) -> Result<(), EngineError> {
    registry.set_meta_schema(META_SCHEMA);
    let default = registry.add(DEFAULT_THEME)?;
    registry.set_default(&default)?;
    registry.add(GAIA_THEME)?;
    registry.add(UNCOVER_THEME)?;
    tracing::debug!(themes = registry.len(), "bundled themes registered");
    Ok(())
}
