//! Markdown to presentation deck rendering.
//!
//! This crate layers slide-deck conveniences over the [`dais_engine`]
//! rendering engine: bundled themes, class-based syntax highlighting, a
//! fixed chain of deck rules (raw HTML filtering, emoji, math, auto
//! scaling, canvas presets, the browser helper script), and stylesheet
//! minification.
//!
//! # Architecture
//!
//! [`DeckRenderer::new`] resolves [`DeckOptions`] into a [`Config`], builds
//! an engine from it, installs the bundled themes and the deck rules, and
//! binds the syntect-backed [`Highlighter`] as the engine's code block
//! callback. Rendering then delegates to the engine with the deck's
//! stylesheet hooks attached.
//!
//! # Example
//!
//! ```
//! use dais_core::{DeckOptions, DeckRenderer};
//!
//! # fn main() -> Result<(), dais_core::EngineError> {
//! let renderer = DeckRenderer::new(DeckOptions::default())?;
//! let deck = renderer.render("# Title\n\n---\n\n## Second slide\n")?;
//! assert_eq!(deck.theme, "default");
//! assert!(deck.html.contains("data-slide=\"2\""));
//! # Ok(())
//! # }
//! ```

mod config;
mod highlight;
mod plugins;
mod style;
mod themes;

pub use config::{
    Config, DeckOptions, EmojiConfig, EmojiMode, EmojiOptions, MarkdownOverrides, MathLib,
    MathOptions, ScriptOptions, ScriptSource,
};
pub use dais_engine::{
    AttrPolicy, BoxError, Dialect, EngineError, HtmlPolicy, MetaKind, MetaValue, RenderArtifact,
    TagPolicy, Theme, ThemeRegistry,
};
pub use highlight::Highlighter;
pub use plugins::script::CDN_URL;
pub use style::minify;
pub use themes::{DEFAULT_THEME, GAIA_THEME, META_SCHEMA, UNCOVER_THEME};

use std::sync::Arc;

use dais_engine::{Engine, HighlightFn, RuleFamily};

use crate::style::DeckHooks;

/// Renders markdown documents into slide decks.
pub struct DeckRenderer {
    config: Config,
    engine: Engine,
    hooks: DeckHooks,
}

impl DeckRenderer {
    /// Build a renderer for the given options.
    ///
    /// # Errors
    ///
    /// Fails when a bundled theme does not register, which indicates a
    /// packaging defect rather than bad input.
    pub fn new(options: DeckOptions) -> Result<Self, EngineError> {
        let highlighter = Arc::new(Highlighter::new());
        let highlight: HighlightFn =
            Arc::new(move |code, language| highlighter.highlight(code, language));
        let config = Config::resolve(&options, highlight);

        let mut engine = Engine::new(config.engine_options());
        themes::bootstrap(engine.themes_mut())?;
        plugins::register_all(engine.pipeline_mut(), &config);

        let mut families = vec![RuleFamily::Table, RuleFamily::Strikethrough];
        if config.markdown.linkify {
            families.push(RuleFamily::Linkify);
        }
        engine.pipeline_mut().enable(&families);

        let hooks = DeckHooks::from_config(&config);
        Ok(Self {
            config,
            engine,
            hooks,
        })
    }

    /// Render one markdown document.
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be rendered, for example when the
    /// stylesheet does not survive minification.
    pub fn render(&self, source: &str) -> Result<RenderArtifact, EngineError> {
        self.engine.render(source, &self.hooks)
    }

    /// The resolved configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Registered themes, bundled ones included.
    pub fn themes(&self) -> &ThemeRegistry {
        self.engine.themes()
    }

    /// Register a user theme, returning its name.
    ///
    /// # Errors
    ///
    /// Fails when the stylesheet carries no `@theme` name or the name is
    /// already taken.
    pub fn add_theme(&mut self, css: &str) -> Result<String, EngineError> {
        self.engine.themes_mut().add(css)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn renderer() -> DeckRenderer {
        DeckRenderer::new(DeckOptions::default()).expect("build renderer")
    }

    fn render(source: &str) -> RenderArtifact {
        renderer().render(source).expect("render")
    }

    #[test]
    fn test_defaults_render_svg_wrapped_slides() {
        let deck = render("# One\n\n---\n\n# Two\n");
        assert!(
            deck.html
                .contains(r#"<svg class="slide-wrapper" viewBox="0 0 1280 720">"#),
            "{}",
            deck.html
        );
        assert!(deck.html.contains(r#"data-slide="1""#));
        assert!(deck.html.contains(r#"data-slide="2""#));
        assert_eq!(deck.theme, "default");
        assert!(deck.warnings.is_empty(), "{:?}", deck.warnings);
    }

    #[test]
    fn test_css_is_minified_by_default() {
        let deck = render("hello\n");
        assert!(
            deck.css
                .contains("section.slide{width:1280px;height:720px}"),
            "{}",
            deck.css
        );
        assert!(!deck.css.contains("/* @theme"), "{}", deck.css);
    }

    #[test]
    fn test_css_fragment_order_survives_minification() {
        let plain = DeckRenderer::new(DeckOptions {
            minify_css: Some(false),
            ..DeckOptions::default()
        })
        .expect("build renderer");
        let minified = renderer();

        // Same fragments in the same order, whichever way they are printed.
        for deck in [
            plain.render("hi\n").expect("render"),
            minified.render("hi\n").expect("render"),
        ] {
            let math_at = deck.css.find(".math").expect("math style");
            let fitting_at = deck.css.find("[data-auto-scaling]").expect("fitting style");
            let emoji_at = deck.css.find("img.emoji").expect("emoji style");
            let theme_at = deck.css.find("section.slide").expect("scaffolding");
            let size_at = deck.css.find("width:1280px").expect("canvas rule");
            assert!(math_at < fitting_at, "{}", deck.css);
            assert!(fitting_at < emoji_at, "{}", deck.css);
            assert!(emoji_at < theme_at, "{}", deck.css);
            assert!(theme_at < size_at, "{}", deck.css);
        }
    }

    #[test]
    fn test_minify_disabled_keeps_theme_comments() {
        let options = DeckOptions {
            minify_css: Some(false),
            ..DeckOptions::default()
        };
        let renderer = DeckRenderer::new(options).expect("build renderer");
        let deck = renderer.render("hello\n").expect("render");
        assert!(deck.css.contains("@theme default"), "{}", deck.css);
    }

    #[test]
    fn test_rule_chain_order_is_fixed() {
        let everything_off = DeckOptions {
            emoji: EmojiOptions {
                shortcode: Some(EmojiMode::Ignore),
                unicode: Some(EmojiMode::Ignore),
            },
            math: Some(MathOptions {
                enabled: false,
                lib: MathLib::Katex,
            }),
            script: Some(ScriptOptions {
                enabled: false,
                source: ScriptSource::Inline,
                nonce: None,
            }),
            html: Some(HtmlPolicy::All(false)),
            ..DeckOptions::default()
        };
        for options in [DeckOptions::default(), everything_off] {
            let renderer = DeckRenderer::new(options).expect("build renderer");
            assert_eq!(
                renderer.engine().pipeline().rule_names(),
                vec!["html", "emoji", "math", "fitting", "size", "script"]
            );
        }
    }

    #[test]
    fn test_theme_directive_selects_bundled_theme() {
        let deck = render("---\ntheme: gaia\n---\n\n# Hi\n");
        assert_eq!(deck.theme, "gaia");
        assert!(deck.css.contains("#fff8e1"), "{}", deck.css);
    }

    #[test]
    fn test_unknown_theme_falls_back_with_warning() {
        let deck = render("---\ntheme: sparkle\n---\n\n# Hi\n");
        assert_eq!(deck.theme, "default");
        assert_eq!(deck.warnings.len(), 1, "{:?}", deck.warnings);
        assert!(deck.warnings[0].contains("sparkle"), "{:?}", deck.warnings);
    }

    #[test]
    fn test_size_directive_resizes_canvas() {
        let deck = render("---\nsize: 4:3\n---\n\n# Hi\n");
        assert!(
            deck.html.contains(r#"viewBox="0 0 960 720""#),
            "{}",
            deck.html
        );
        assert!(
            deck.css.contains("section.slide{width:960px;height:720px}"),
            "{}",
            deck.css
        );
    }

    #[test]
    fn test_unknown_size_preset_warns_and_keeps_default() {
        let deck = render("---\nsize: cinema\n---\n\n# Hi\n");
        assert!(deck.html.contains(r#"viewBox="0 0 1280 720""#));
        assert_eq!(deck.warnings.len(), 1, "{:?}", deck.warnings);
        assert!(deck.warnings[0].contains("cinema"), "{:?}", deck.warnings);
    }

    #[test]
    fn test_default_html_policy_keeps_br_only() {
        let deck = render("line<br>break and <b>bold</b>\n");
        assert!(deck.html.contains("<br>"), "{}", deck.html);
        assert!(deck.html.contains("&lt;b&gt;"), "{}", deck.html);
    }

    #[test]
    fn test_raw_tag_split_across_lines_is_escaped() {
        let options = DeckOptions {
            script: Some(ScriptOptions {
                enabled: false,
                source: ScriptSource::Inline,
                nonce: None,
            }),
            ..DeckOptions::default()
        };
        let renderer = DeckRenderer::new(options).expect("build renderer");
        let deck = renderer
            .render("<script\n>alert(1)</script\n>\n")
            .expect("render");
        assert!(!deck.html.contains("<script"), "{}", deck.html);
        assert!(deck.html.contains("&lt;script"), "{}", deck.html);
    }

    #[test]
    fn test_html_all_policy_trusts_markup() {
        let options = DeckOptions {
            html: Some(HtmlPolicy::All(true)),
            ..DeckOptions::default()
        };
        let renderer = DeckRenderer::new(options).expect("build renderer");
        let deck = renderer.render("<b>bold</b>\n").expect("render");
        assert!(deck.html.contains("<b>bold</b>"), "{}", deck.html);
    }

    #[test]
    fn test_emoji_shortcode_becomes_image() {
        let deck = render("Hello :smile:\n");
        assert!(deck.html.contains(r#"<img class="emoji""#), "{}", deck.html);
    }

    #[test]
    fn test_math_span_rendered() {
        let deck = render("Euler: $e^{i\\pi} + 1 = 0$\n");
        assert!(
            deck.html.contains(r#"class="math math-inline""#),
            "{}",
            deck.html
        );
    }

    #[test]
    fn test_fitting_marker_on_default_theme_heading() {
        let deck = render("# Big title\n");
        assert!(
            deck.html.contains(r#"<span data-auto-scaling="fit">"#),
            "{}",
            deck.html
        );
    }

    #[test]
    fn test_code_block_is_highlighted() {
        let deck = render("```rust\nlet x = 1;\n```\n");
        assert!(
            deck.html.contains(r#"<code class="language-rust">"#),
            "{}",
            deck.html
        );
        assert!(deck.html.contains("<span"), "{}", deck.html);
    }

    #[test]
    fn test_helper_script_lands_on_last_slide() {
        let deck = render("# One\n\n---\n\n# Two\n");
        let script_at = deck.html.find("<script>").expect("script tag");
        let last_slide_at = deck.html.find(r#"data-slide="2""#).expect("last slide");
        assert!(script_at > last_slide_at, "{}", deck.html);
    }

    #[test]
    fn test_script_disabled_omits_helper() {
        let options = DeckOptions {
            script: Some(ScriptOptions {
                enabled: false,
                source: ScriptSource::Inline,
                nonce: None,
            }),
            ..DeckOptions::default()
        };
        let renderer = DeckRenderer::new(options).expect("build renderer");
        let deck = renderer.render("# Hi\n").expect("render");
        assert!(!deck.html.contains("<script"), "{}", deck.html);
    }

    #[test]
    fn test_inline_svg_disabled_renders_bare_sections() {
        let options = DeckOptions {
            inline_svg: Some(false),
            ..DeckOptions::default()
        };
        let renderer = DeckRenderer::new(options).expect("build renderer");
        let deck = renderer.render("# Hi\n").expect("render");
        assert!(!deck.html.contains("<svg"), "{}", deck.html);
        assert!(deck.html.contains(r#"<section class="slide""#), "{}", deck.html);
    }

    #[test]
    fn test_user_theme_registration_and_use() {
        let mut renderer = renderer();
        let name = renderer
            .add_theme("/* @theme midnight */\nsection.slide { background: #001; }\n")
            .expect("register theme");
        assert_eq!(name, "midnight");
        let deck = renderer
            .render("---\ntheme: midnight\n---\n\n# Hi\n")
            .expect("render");
        assert_eq!(deck.theme, "midnight");
        assert!(deck.css.contains("#001"), "{}", deck.css);
    }

    #[test]
    fn test_loose_yaml_recovers_directives() {
        let deck = render("---\ntheme: gaia\nbroken yaml [\n---\n\n# Hi\n");
        assert_eq!(deck.theme, "gaia");
    }

    #[test]
    fn test_strict_yaml_drops_malformed_front_matter() {
        let options = DeckOptions {
            loose_yaml: Some(false),
            ..DeckOptions::default()
        };
        let renderer = DeckRenderer::new(options).expect("build renderer");
        let deck = renderer
            .render("---\ntheme: gaia\nbroken yaml [\n---\n\n# Hi\n")
            .expect("render");
        assert_eq!(deck.theme, "default");
    }
}
