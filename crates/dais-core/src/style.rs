//! Deck stylesheet assembly.

use dais_engine::{EngineError, EngineHooks, PackOptions};
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};

use crate::config::{Config, EmojiMode};
use crate::plugins::{emoji, fitting, math};

/// Stylesheet hooks contributed by the deck layer.
///
/// Rule styles are prepended emoji first and math last, so the packed
/// sheet opens with math, then fitting, then emoji, ahead of the engine
/// scaffolding and the theme. The emoji fragment styles twemoji images
/// and is contributed only when a twemoji mode is active.
pub(crate) struct DeckHooks {
    twemoji: bool,
    math_enabled: bool,
    minify: bool,
}

impl DeckHooks {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            twemoji: config.emoji.shortcode == EmojiMode::Twemoji
                || config.emoji.unicode == EmojiMode::Twemoji,
            math_enabled: config.math.enabled,
            minify: config.minify_css,
        }
    }
}

impl EngineHooks for DeckHooks {
    fn pack_options(&self, mut base: PackOptions) -> PackOptions {
        if self.twemoji {
            base.prepend_before(emoji::STYLE);
        }
        base.prepend_before(fitting::STYLE);
        if self.math_enabled {
            base.prepend_before(math::STYLE);
        }
        base
    }

    fn render_style(&self, css: String) -> Result<String, EngineError> {
        if self.minify { minify(&css) } else { Ok(css) }
    }
}

/// Minify a stylesheet without reordering or merging its rules.
///
/// # Errors
///
/// Returns [`EngineError::Style`] when the stylesheet does not parse or
/// cannot be printed back.
pub fn minify(css: &str) -> Result<String, EngineError> {
    let sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|err| EngineError::Style(err.to_string()))?;
    let out = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|err| EngineError::Style(err.to_string()))?;
    Ok(out.code)
}
