//! Fenced code block highlighting.

use dais_engine::BoxError;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Class-based syntax highlighter backed by syntect's bundled grammars.
///
/// The output carries `class` attributes only, leaving the palette to the
/// active theme. A fence naming an unrecognized language yields an empty
/// string, which tells the writer to fall back to escaped plain text; the
/// dispatcher itself never fails on unknown input.
pub struct Highlighter {
    syntaxes: SyntaxSet,
}

impl Highlighter {
    /// Load the bundled grammar set.
    #[must_use]
    pub fn new() -> Self {
        let syntaxes = SyntaxSet::load_defaults_newlines();
        tracing::debug!(
            grammars = syntaxes.syntaxes().len(),
            "loaded highlighting grammars"
        );
        Self { syntaxes }
    }

    /// Highlight `code` fenced with `language`.
    ///
    /// An empty `language` auto-detects from the first line and falls back
    /// to plain text, so the result is always markup. A non-empty but
    /// unrecognized `language` yields `Ok("")`.
    ///
    /// # Errors
    ///
    /// Fails only when the grammar itself cannot parse a line, which the
    /// bundled grammar set does not do in practice.
    pub fn highlight(&self, code: &str, language: &str) -> Result<String, BoxError> {
        let syntax = if language.is_empty() {
            self.syntaxes
                .find_syntax_by_first_line(code)
                .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
        } else {
            match self.syntaxes.find_syntax_by_token(language) {
                Some(syntax) => syntax,
                None => {
                    tracing::debug!(language, "no grammar for language");
                    return Ok(String::new());
                }
            }
        };

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }
        Ok(generator.finalize())
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_language_produces_classed_markup() {
        let highlighter = Highlighter::new();
        let markup = highlighter
            .highlight("let x = 1;\n", "rust")
            .expect("highlight");
        assert!(markup.contains("<span"), "markup: {markup}");
        assert!(markup.contains("class="), "markup: {markup}");
    }

    #[test]
    fn test_unknown_language_yields_empty_markup() {
        let highlighter = Highlighter::new();
        for code in ["", "whatever\n", "<b>tag</b>\n", "line one\nline two\n"] {
            let markup = highlighter
                .highlight(code, "notalanguage")
                .expect("highlight");
            assert_eq!(markup, "", "code: {code:?}");
        }
    }

    #[test]
    fn test_empty_language_always_produces_markup() {
        let highlighter = Highlighter::new();
        let markup = highlighter.highlight("plain words\n", "").expect("highlight");
        assert!(!markup.is_empty());

        // Empty input is the one case allowed to come back empty.
        let markup = highlighter.highlight("", "").expect("highlight");
        assert!(markup.is_empty());
    }

    #[test]
    fn test_empty_language_detects_from_first_line() {
        let highlighter = Highlighter::new();
        let markup = highlighter
            .highlight("#!/usr/bin/env bash\necho hi\n", "")
            .expect("highlight");
        assert!(markup.contains("<span"), "markup: {markup}");
    }

    #[test]
    fn test_markup_escapes_html_in_code() {
        let highlighter = Highlighter::new();
        let markup = highlighter
            .highlight("let tag = \"<b>\";\n", "rust")
            .expect("highlight");
        assert!(markup.contains("&lt;b&gt;"), "markup: {markup}");
        assert!(!markup.contains("<b>"), "markup: {markup}");
    }

    #[test]
    fn test_language_aliases_resolve() {
        let highlighter = Highlighter::new();
        for alias in ["rs", "js", "py"] {
            let markup = highlighter.highlight("x\n", alias).expect("highlight");
            assert!(!markup.is_empty(), "alias {alias} should resolve");
        }
    }
}
