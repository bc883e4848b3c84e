//! Deck rules applied to the rendering pipeline.
//!
//! Every rule registers unconditionally so the chain keeps a fixed shape;
//! features disabled in the configuration turn their rule into a
//! passthrough instead of removing it.

pub mod emoji;
pub mod fitting;
pub mod html;
pub mod math;
pub mod script;
pub mod size;

use dais_engine::MarkdownPipeline;

use crate::config::Config;

/// Register every deck rule in dependency order.
///
/// `html` sanitizes author markup before other rules inject their own,
/// `size` publishes the directive handler the canvas depends on, and
/// `script` runs last so the helper tag lands after all slide content.
pub(crate) fn register_all(pipeline: &mut MarkdownPipeline, config: &Config) {
    html::register(pipeline, config);
    emoji::register(pipeline, config);
    math::register(pipeline, config);
    fitting::register(pipeline, config);
    size::register(pipeline, config);
    script::register(pipeline, config);
}
