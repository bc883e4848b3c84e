//! Slide canvas presets from theme metadata.
//!
//! Themes declare presets through repeatable `@size` metadata entries,
//! each shaped like `16:9 1280 720`. The `size` global directive picks one
//! by name and expands into the `width`/`height` directives the canvas is
//! sized from.

use std::sync::{Arc, LazyLock};

use dais_engine::{DirectiveHandler, MarkdownPipeline, Theme};
use regex::Regex;

use crate::config::Config;

static PRESET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+(\d+)(?:px)?\s+(\d+)(?:px)?$").unwrap());

/// Register the `size` rule and the `size` directive handler.
///
/// The rule itself is a passthrough; the work happens in the directive
/// handler before parsing starts.
pub(crate) fn register(pipeline: &mut MarkdownPipeline, _config: &Config) {
    pipeline.add_rule("size", Box::new(|events, _ctx| events));
    pipeline.add_directive("size", preset_handler());
}

fn preset_handler() -> DirectiveHandler {
    Arc::new(|value, theme| match find_preset(theme, value) {
        Some((width, height)) => Ok(vec![
            ("width".to_owned(), width),
            ("height".to_owned(), height),
        ]),
        None => Err(format!(
            "unknown size preset `{value}` for theme `{}`",
            theme.name()
        )),
    })
}

/// Look up a named preset in the theme's `@size` entries.
fn find_preset(theme: &Theme, name: &str) -> Option<(String, String)> {
    for entry in theme.meta_array("size").unwrap_or_default() {
        let Some(caps) = PRESET.captures(entry) else {
            continue;
        };
        if &caps[1] == name {
            return Some((caps[2].to_owned(), caps[3].to_owned()));
        }
    }
    None
}
