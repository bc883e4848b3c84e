//! Math span rendering.
//!
//! Typesetting happens in the browser; the rule only wraps the TeX source
//! in spans the configured library can pick up.

use dais_engine::{MarkdownPipeline, RuleFamily, escape_html};
use pulldown_cmark::Event;

use crate::config::{Config, MathLib};

/// Stylesheet fragment for math spans.
pub const STYLE: &str = ".math{font-family:KaTeX_Main,'Times New Roman',serif;}\n.math-display{display:block;margin:1em 0;text-align:center;}";

/// Opening of a display math span, matched by the fitting rule.
pub(crate) const DISPLAY_PREFIX: &str = r#"<span class="math math-display""#;

/// Register the `math` rule and enable `$` span parsing when configured.
pub(crate) fn register(pipeline: &mut MarkdownPipeline, config: &Config) {
    let math = config.math;
    if math.enabled {
        pipeline.enable(&[RuleFamily::Math]);
    }
    pipeline.add_rule(
        "math",
        Box::new(move |events, _ctx| {
            if !math.enabled {
                return events;
            }
            let lib = lib_token(math.lib);
            events
                .into_iter()
                .map(|event| match event {
                    Event::InlineMath(tex) => Event::InlineHtml(span(&tex, "math-inline", lib)),
                    Event::DisplayMath(tex) => Event::InlineHtml(span(&tex, "math-display", lib)),
                    other => other,
                })
                .collect()
        }),
    );
}

fn span(tex: &str, class: &str, lib: &str) -> pulldown_cmark::CowStr<'static> {
    format!(
        r#"<span class="math {class}" data-lib="{lib}">{}</span>"#,
        escape_html(tex)
    )
    .into()
}

fn lib_token(lib: MathLib) -> &'static str {
    match lib {
        MathLib::Katex => "katex",
        MathLib::Mathjax => "mathjax",
    }
}
