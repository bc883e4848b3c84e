//! Deck options and their resolution into a full configuration.
//!
//! [`DeckOptions`] is what callers construct: every field is optional and
//! unset fields fall back to the deck renderer's opinionated defaults.
//! [`Config`] is the fully resolved form used everywhere else.

use std::collections::HashMap;

use dais_engine::{
    Dialect, EngineOptions, HighlightFn, HtmlPolicy, MarkdownOptions, TagPolicy,
};

/// Emoji conversion target for one source kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmojiMode {
    /// Leave the source untouched.
    Ignore,
    /// Convert to plain Unicode glyphs.
    Plain,
    /// Convert to twemoji SVG images.
    Twemoji,
}

/// Emoji handling, per source kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmojiOptions {
    /// How `:shortcode:` tokens are converted. Defaults to twemoji images.
    pub shortcode: Option<EmojiMode>,
    /// How Unicode emoji are converted. Defaults to twemoji images.
    pub unicode: Option<EmojiMode>,
}

/// Resolved emoji handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmojiConfig {
    /// Conversion applied to `:shortcode:` tokens.
    pub shortcode: EmojiMode,
    /// Conversion applied to Unicode emoji.
    pub unicode: EmojiMode,
}

/// Math typesetting library the rendered spans are annotated for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MathLib {
    /// KaTeX.
    #[default]
    Katex,
    /// MathJax.
    Mathjax,
}

/// Math typesetting configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MathOptions {
    /// Whether `$...$` and `$$...$$` spans are parsed and rendered.
    pub enabled: bool,
    /// Typesetting library the output targets.
    pub lib: MathLib,
}

impl Default for MathOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            lib: MathLib::default(),
        }
    }
}

/// Where the browser helper script is loaded from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScriptSource {
    /// Embed the bundled script in the rendered deck.
    #[default]
    Inline,
    /// Reference the published bundle from a CDN.
    Cdn,
}

/// Browser helper script injection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptOptions {
    /// Whether the script tag is appended to the deck at all.
    pub enabled: bool,
    /// Script delivery mechanism.
    pub source: ScriptSource,
    /// Optional CSP nonce attribute for the emitted tag.
    pub nonce: Option<String>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            source: ScriptSource::default(),
            nonce: None,
        }
    }
}

/// Markdown processor overrides, merged over the deck defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MarkdownOverrides {
    /// Base dialect. Defaults to CommonMark.
    pub dialect: Option<Dialect>,
    /// Render single newlines as `<br />`. Defaults to `true`.
    pub breaks: Option<bool>,
    /// Turn bare URLs into links. Defaults to `true`.
    pub linkify: Option<bool>,
}

/// Options for building a [`crate::DeckRenderer`].
///
/// Unset fields resolve to the deck defaults; see [`Config`] for the
/// resolved form.
#[derive(Clone, Debug, Default)]
pub struct DeckOptions {
    /// Emoji handling.
    pub emoji: EmojiOptions,
    /// Raw HTML policy. Defaults to an allowlist holding only `<br>`.
    pub html: Option<HtmlPolicy>,
    /// Wrap slides in the inline SVG scaffold. Defaults to `true`.
    pub inline_svg: Option<bool>,
    /// Recover directives from malformed front matter. Defaults to `true`.
    pub loose_yaml: Option<bool>,
    /// Math typesetting. Defaults to enabled, targeting KaTeX.
    pub math: Option<MathOptions>,
    /// Minify the packed stylesheet. Defaults to `true`.
    pub minify_css: Option<bool>,
    /// Browser helper script injection. Defaults to an inline tag.
    pub script: Option<ScriptOptions>,
    /// Markdown processor overrides.
    pub markdown: Option<MarkdownOverrides>,
}

/// The fully resolved deck configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Resolved emoji handling.
    pub emoji: EmojiConfig,
    /// Resolved raw HTML policy.
    pub html: HtmlPolicy,
    /// Whether slides are wrapped in the inline SVG scaffold.
    pub inline_svg: bool,
    /// Whether malformed front matter is recovered line by line.
    pub loose_yaml: bool,
    /// Resolved math configuration.
    pub math: MathOptions,
    /// Whether the packed stylesheet is minified.
    pub minify_css: bool,
    /// Resolved script injection.
    pub script: ScriptOptions,
    /// Resolved markdown processor options, highlight callback included.
    pub markdown: MarkdownOptions,
}

impl Config {
    /// Resolve user options against the deck defaults, binding `highlight`
    /// as the processor's code block callback.
    pub(crate) fn resolve(options: &DeckOptions, highlight: HighlightFn) -> Self {
        let overrides = options.markdown.unwrap_or_default();
        let html = options.html.clone().unwrap_or_else(default_html_policy);
        let markdown = MarkdownOptions {
            dialect: overrides.dialect.unwrap_or_default(),
            breaks: overrides.breaks.unwrap_or(true),
            linkify: overrides.linkify.unwrap_or(true),
            html: html.clone(),
            highlight: Some(highlight),
        };

        Self {
            emoji: EmojiConfig {
                shortcode: options.emoji.shortcode.unwrap_or(EmojiMode::Twemoji),
                unicode: options.emoji.unicode.unwrap_or(EmojiMode::Twemoji),
            },
            html,
            inline_svg: options.inline_svg.unwrap_or(true),
            loose_yaml: options.loose_yaml.unwrap_or(true),
            math: options.math.unwrap_or_default(),
            minify_css: options.minify_css.unwrap_or(true),
            script: options.script.clone().unwrap_or_default(),
            markdown,
        }
    }

    /// Turn the resolved configuration back into fully specified options.
    ///
    /// Resolving the result yields an identical configuration.
    #[must_use]
    pub fn to_options(&self) -> DeckOptions {
        DeckOptions {
            emoji: EmojiOptions {
                shortcode: Some(self.emoji.shortcode),
                unicode: Some(self.emoji.unicode),
            },
            html: Some(self.html.clone()),
            inline_svg: Some(self.inline_svg),
            loose_yaml: Some(self.loose_yaml),
            math: Some(self.math),
            minify_css: Some(self.minify_css),
            script: Some(self.script.clone()),
            markdown: Some(MarkdownOverrides {
                dialect: Some(self.markdown.dialect),
                breaks: Some(self.markdown.breaks),
                linkify: Some(self.markdown.linkify),
            }),
        }
    }

    /// Engine options derived from this configuration.
    pub(crate) fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            inline_svg: self.inline_svg,
            loose_yaml: self.loose_yaml,
            markdown: self.markdown.clone(),
        }
    }
}

/// The default raw HTML policy: only `<br>` survives, with no attributes.
fn default_html_policy() -> HtmlPolicy {
    let mut tags = HashMap::new();
    tags.insert("br".to_owned(), TagPolicy::Attributes(Vec::new()));
    HtmlPolicy::Allowlist(tags)
}
