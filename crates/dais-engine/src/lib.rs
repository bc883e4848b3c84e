//! Slide deck rendering engine.
//!
//! Turns markdown into per-slide HTML plus a packed theme stylesheet.
//! Documents are split into slides at top-level thematic breaks, and a
//! leading YAML front matter block supplies global directives such as
//! `theme`.
//!
//! # Architecture
//!
//! The engine is deliberately small and meant to be wrapped:
//! - [`MarkdownPipeline`]: parser options plus named post-parse event rules
//! - [`ThemeRegistry`]: CSS themes indexed by `@theme` name with a default
//!   fallback
//! - [`EngineHooks`]: stylesheet packing and post-processing hooks
//!
//! Wrapping layers customize behavior through [`Engine::pipeline_mut`],
//! [`Engine::themes_mut`], and a hooks implementation passed to
//! [`Engine::render`].
//!
//! # Example
//!
//! ```
//! use dais_engine::{Engine, EngineOptions, PassthroughHooks};
//!
//! let mut engine = Engine::new(EngineOptions::default());
//! engine
//!     .themes_mut()
//!     .add("/* @theme plain */\nsection { padding: 40px; }")
//!     .unwrap();
//! engine.themes_mut().set_default("plain").unwrap();
//!
//! let deck = engine
//!     .render("# Hello\n\n---\n\n# World", &PassthroughHooks)
//!     .unwrap();
//! assert_eq!(deck.theme, "plain");
//! assert!(deck.html.contains("data-slide=\"2\""));
//! ```

mod directives;
mod error;
mod hooks;
mod markdown;
mod render;
mod style;
mod theme;

pub use directives::DirectiveMap;
pub use error::{BoxError, EngineError};
pub use hooks::{EngineHooks, PassthroughHooks};
pub use markdown::{
    AttrPolicy, AttrTransform, Dialect, DirectiveHandler, HighlightFn, HtmlPolicy,
    MarkdownOptions, MarkdownPipeline, RenderContext, Rule, RuleFamily, TagPolicy,
};
pub use render::escape_html;
pub use style::{DEFAULT_SIZE, PackOptions};
pub use theme::{MetaKind, MetaValue, Theme, ThemeRegistry};

use pulldown_cmark::{Event, Parser};

/// Engine-level options.
#[derive(Clone, Debug, Default)]
pub struct EngineOptions {
    /// Wrap each slide in an inline SVG scaffold.
    pub inline_svg: bool,
    /// Recover directives from malformed front matter.
    pub loose_yaml: bool,
    /// Markdown processor options.
    pub markdown: MarkdownOptions,
}

/// A rendered deck.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderArtifact {
    /// Slide markup, one section (or SVG-wrapped section) per slide.
    pub html: String,
    /// Packed stylesheet for the deck.
    pub css: String,
    /// Name of the theme the deck resolved to.
    pub theme: String,
    /// Non-fatal problems encountered while rendering.
    pub warnings: Vec<String>,
}

/// The rendering engine: a markdown pipeline plus a theme registry.
pub struct Engine {
    inline_svg: bool,
    loose_yaml: bool,
    pipeline: MarkdownPipeline,
    themes: ThemeRegistry,
}

impl Engine {
    /// Build an engine with no themes and an empty rule chain.
    #[must_use]
    pub fn new(options: EngineOptions) -> Self {
        Self {
            inline_svg: options.inline_svg,
            loose_yaml: options.loose_yaml,
            pipeline: MarkdownPipeline::new(options.markdown),
            themes: ThemeRegistry::default(),
        }
    }

    /// The markdown pipeline.
    pub fn pipeline(&self) -> &MarkdownPipeline {
        &self.pipeline
    }

    /// Mutable access for registering rules, families, and directives.
    pub fn pipeline_mut(&mut self) -> &mut MarkdownPipeline {
        &mut self.pipeline
    }

    /// The theme registry.
    pub fn themes(&self) -> &ThemeRegistry {
        &self.themes
    }

    /// Mutable access for registering themes.
    pub fn themes_mut(&mut self) -> &mut ThemeRegistry {
        &mut self.themes
    }

    /// Whether slides are wrapped in the inline SVG scaffold.
    pub fn inline_svg(&self) -> bool {
        self.inline_svg
    }

    /// Pack options carrying the engine's slide scaffolding styles.
    #[must_use]
    pub fn base_pack_options(&self) -> PackOptions {
        PackOptions {
            before: Some(style::BASE_BEFORE.to_owned()),
            after: None,
        }
    }

    /// Render a markdown document into a deck.
    ///
    /// # Errors
    ///
    /// Fails when no theme can be resolved, when the highlight callback
    /// fails, or when a stylesheet hook rejects the packed CSS.
    pub fn render(
        &self,
        source: &str,
        hooks: &dyn EngineHooks,
    ) -> Result<RenderArtifact, EngineError> {
        let (front_matter, body) = directives::split_front_matter(source);
        let mut directives = match front_matter {
            Some(yaml) => directives::parse(yaml, self.loose_yaml),
            None => DirectiveMap::new(),
        };

        let requested = directives.get("theme").cloned();
        let Some((theme, fell_back)) = self.themes.resolve(requested.as_deref()) else {
            return Err(EngineError::NoDefaultTheme);
        };

        let mut warnings = Vec::new();
        if fell_back {
            if let Some(requested) = &requested {
                warnings.push(format!(
                    "unknown theme `{requested}`, falling back to `{}`",
                    theme.name()
                ));
            }
        }

        // Custom directive handlers derive extra directives from raw values.
        let mut derived = Vec::new();
        for (name, handler) in self.pipeline.directive_handlers() {
            if let Some(value) = directives.get(name) {
                match handler(value, theme) {
                    Ok(entries) => derived.extend(entries),
                    Err(warning) => warnings.push(warning),
                }
            }
        }
        directives.extend(derived);

        let size = canvas_size(&directives);
        let ctx = RenderContext::new(theme, &directives);
        for warning in warnings {
            ctx.warn(warning);
        }

        let events: Vec<Event<'_>> =
            Parser::new_ext(body, self.pipeline.parser_options()).collect();
        let events = self.pipeline.apply_rules(events, &ctx);
        let html = render::render_deck(events, self.pipeline.options(), self.inline_svg, size)?;

        let pack_options = hooks.pack_options(self.base_pack_options());
        let css = style::pack(theme, &pack_options, size);
        let css = hooks.render_style(css)?;

        tracing::debug!(theme = %theme.name(), "rendered deck");
        Ok(RenderArtifact {
            html,
            css,
            theme: theme.name().to_owned(),
            warnings: ctx.take_warnings(),
        })
    }
}

/// Canvas size from the resolved `width`/`height` directives, in pixels.
fn canvas_size(directives: &DirectiveMap) -> (u32, u32) {
    let width = directives.get("width").and_then(|value| value.parse().ok());
    let height = directives.get("height").and_then(|value| value.parse().ok());
    match (width, height) {
        (Some(width), Some(height)) => (width, height),
        _ => DEFAULT_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;

    const PLAIN: &str = "/* @theme plain */\nsection { padding: 40px; }\n";
    const DARK: &str = "/* @theme dark */\nsection { background: #000; }\n";

    fn engine() -> Engine {
        let mut engine = Engine::new(EngineOptions::default());
        engine.themes_mut().add(PLAIN).unwrap();
        engine.themes_mut().add(DARK).unwrap();
        engine.themes_mut().set_default("plain").unwrap();
        engine
    }

    #[test]
    fn test_render_packs_theme_css() {
        let deck = engine().render("# Hi", &PassthroughHooks).unwrap();
        assert_eq!(deck.theme, "plain");
        assert!(deck.css.contains("section { padding: 40px; }"));
        assert!(deck.css.starts_with("svg.slide-wrapper"));
        assert!(deck.html.contains("<h1>Hi</h1>"));
        assert!(deck.warnings.is_empty());
    }

    #[test]
    fn test_theme_directive_selects_theme() {
        let deck = engine()
            .render("---\ntheme: dark\n---\n# Hi", &PassthroughHooks)
            .unwrap();
        assert_eq!(deck.theme, "dark");
        assert!(deck.css.contains("background: #000;"));
    }

    #[test]
    fn test_unknown_theme_falls_back_with_warning() {
        let deck = engine()
            .render("---\ntheme: ghost\n---\n# Hi", &PassthroughHooks)
            .unwrap();
        assert_eq!(deck.theme, "plain");
        assert_eq!(deck.warnings.len(), 1);
        assert!(deck.warnings[0].contains("ghost"));
    }

    #[test]
    fn test_render_without_themes_fails() {
        let engine = Engine::new(EngineOptions::default());
        let result = engine.render("# Hi", &PassthroughHooks);
        assert!(matches!(result, Err(EngineError::NoDefaultTheme)));
    }

    #[test]
    fn test_loose_yaml_recovers_directives() {
        let source = "---\ntheme: dark\nbroken: [oops\n---\n# Hi";

        let strict = engine().render(source, &PassthroughHooks).unwrap();
        assert_eq!(strict.theme, "plain");

        let mut loose = Engine::new(EngineOptions {
            loose_yaml: true,
            ..EngineOptions::default()
        });
        loose.themes_mut().add(PLAIN).unwrap();
        loose.themes_mut().add(DARK).unwrap();
        loose.themes_mut().set_default("plain").unwrap();
        let deck = loose.render(source, &PassthroughHooks).unwrap();
        assert_eq!(deck.theme, "dark");
    }

    #[test]
    fn test_custom_directive_handler_derives_directives() {
        let mut engine = engine();
        engine.pipeline_mut().add_directive(
            "size",
            Arc::new(|value, _theme| {
                if value == "4:3" {
                    Ok(vec![
                        ("width".to_owned(), "960".to_owned()),
                        ("height".to_owned(), "720".to_owned()),
                    ])
                } else {
                    Err(format!("unknown size preset `{value}`"))
                }
            }),
        );

        let deck = engine
            .render("---\nsize: 4:3\n---\n# Hi", &PassthroughHooks)
            .unwrap();
        assert!(deck.css.contains("section.slide{width:960px;height:720px;}"));
        assert!(deck.warnings.is_empty());

        let deck = engine
            .render("---\nsize: cinema\n---\n# Hi", &PassthroughHooks)
            .unwrap();
        assert!(deck.css.contains("section.slide{width:1280px;height:720px;}"));
        assert_eq!(deck.warnings.len(), 1);
        assert!(deck.warnings[0].contains("cinema"));
    }

    #[test]
    fn test_pipeline_rule_transforms_events() {
        let mut engine = engine();
        engine.pipeline_mut().add_rule(
            "shout",
            Box::new(|events, _ctx| {
                events
                    .into_iter()
                    .map(|event| match event {
                        Event::Text(text) => Event::Text(text.to_uppercase().into()),
                        other => other,
                    })
                    .collect()
            }),
        );

        let deck = engine.render("quiet words", &PassthroughHooks).unwrap();
        assert!(deck.html.contains("QUIET WORDS"));
        assert_eq!(engine.pipeline().rule_names(), vec!["shout"]);
    }

    #[test]
    fn test_rule_warnings_surface_in_artifact() {
        let mut engine = engine();
        engine.pipeline_mut().add_rule(
            "grumble",
            Box::new(|events, ctx| {
                ctx.warn("something looked off");
                events
            }),
        );

        let deck = engine.render("# Hi", &PassthroughHooks).unwrap();
        assert_eq!(deck.warnings, vec!["something looked off".to_owned()]);
    }

    #[test]
    fn test_raw_html_escaped_by_default_policy() {
        let deck = engine()
            .render("hello <mark>there</mark>", &PassthroughHooks)
            .unwrap();
        assert!(deck.html.contains("&lt;mark&gt;"));
        assert!(!deck.html.contains("<mark>"));
    }

    #[test]
    fn test_raw_html_allowed_when_policy_opens() {
        let mut engine = Engine::new(EngineOptions {
            markdown: MarkdownOptions {
                html: HtmlPolicy::All(true),
                ..MarkdownOptions::default()
            },
            ..EngineOptions::default()
        });
        engine.themes_mut().add(PLAIN).unwrap();
        engine.themes_mut().set_default("plain").unwrap();

        let deck = engine
            .render("hello <mark>there</mark>", &PassthroughHooks)
            .unwrap();
        assert!(deck.html.contains("<mark>there</mark>"));
    }

    #[test]
    fn test_inline_svg_scaffold_enabled() {
        let mut engine = Engine::new(EngineOptions {
            inline_svg: true,
            ..EngineOptions::default()
        });
        engine.themes_mut().add(PLAIN).unwrap();
        engine.themes_mut().set_default("plain").unwrap();

        let deck = engine.render("# Hi", &PassthroughHooks).unwrap();
        assert!(deck.html.starts_with(r#"<svg class="slide-wrapper" viewBox="0 0 1280 720">"#));
    }

    struct PrependHooks;

    impl EngineHooks for PrependHooks {
        fn pack_options(&self, mut base: PackOptions) -> PackOptions {
            base.prepend_before("extra{}");
            base
        }

        fn render_style(&self, css: String) -> Result<String, EngineError> {
            Ok(css.replace("40px", "48px"))
        }
    }

    #[test]
    fn test_hooks_shape_the_stylesheet() {
        let deck = engine().render("# Hi", &PrependHooks).unwrap();
        assert!(deck.css.starts_with("extra{}\nsvg.slide-wrapper"));
        assert!(deck.css.contains("padding: 48px;"));
    }

    struct FailingHooks;

    impl EngineHooks for FailingHooks {
        fn render_style(&self, _css: String) -> Result<String, EngineError> {
            Err(EngineError::Style("parse error at 1:1".to_owned()))
        }
    }

    #[test]
    fn test_render_style_failure_propagates() {
        let result = engine().render("# Hi", &FailingHooks);
        assert!(matches!(result, Err(EngineError::Style(_))));
    }
}
