//! Stylesheet packing.
//!
//! A render pass resolves one theme; `pack` surrounds its CSS with the
//! engine scaffolding styles and any fragments contributed by hooks, in a
//! fixed order: `before` fragments, the theme, the canvas size rule, then
//! `after` fragments.

use crate::theme::Theme;

/// Default slide canvas size in pixels.
pub const DEFAULT_SIZE: (u32, u32) = (1280, 720);

/// Scaffolding styles packed ahead of every theme.
pub(crate) const BASE_BEFORE: &str = "svg.slide-wrapper{display:block;}\n\
section.slide{box-sizing:border-box;overflow:hidden;position:relative;}\n";

/// Extra CSS packed around the resolved theme.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackOptions {
    /// CSS placed before the theme stylesheet.
    pub before: Option<String>,
    /// CSS placed after the theme stylesheet.
    pub after: Option<String>,
}

impl PackOptions {
    /// Place `css` ahead of everything currently in `before`.
    pub fn prepend_before(&mut self, css: &str) {
        let existing = self.before.take().unwrap_or_default();
        self.before = Some(format!("{css}\n{existing}"));
    }
}

/// Pack the resolved theme into a single deck stylesheet.
pub(crate) fn pack(theme: &Theme, options: &PackOptions, size: (u32, u32)) -> String {
    let mut css = String::new();
    if let Some(before) = &options.before {
        css.push_str(before);
        if !before.ends_with('\n') {
            css.push('\n');
        }
    }
    css.push_str(theme.css());
    if !theme.css().ends_with('\n') {
        css.push('\n');
    }
    let (width, height) = size;
    css.push_str(&format!(
        "section.slide{{width:{width}px;height:{height}px;}}\n"
    ));
    if let Some(after) = &options.after {
        css.push_str(after);
        if !after.ends_with('\n') {
            css.push('\n');
        }
    }
    css
}
