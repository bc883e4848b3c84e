//! Browser helper script injection.
//!
//! The helper measures `[data-auto-scaling]` fragments and applies the
//! scale transforms; without it the markers are inert annotations.

use dais_engine::{MarkdownPipeline, escape_html};
use pulldown_cmark::Event;

use crate::config::{Config, ScriptOptions, ScriptSource};

/// Published browser bundle location used by [`ScriptSource::Cdn`].
pub const CDN_URL: &str = "https://cdn.jsdelivr.net/npm/dais-browser/dist/dais.browser.min.js";

/// Bundled helper for [`ScriptSource::Inline`].
const BROWSER_SCRIPT: &str = r#"(function () {
  "use strict";
  var fit = function (el) {
    var parent = el.parentElement;
    if (!parent) return;
    el.style.transform = "";
    var scale = Math.min(1, parent.clientWidth / el.scrollWidth);
    el.style.transform = scale < 1 ? "scale(" + scale + ")" : "";
  };
  var refresh = function () {
    document.querySelectorAll("[data-auto-scaling]").forEach(fit);
  };
  if (typeof ResizeObserver !== "undefined") {
    var observer = new ResizeObserver(refresh);
    document.querySelectorAll("section.slide").forEach(function (el) {
      observer.observe(el);
    });
  }
  window.addEventListener("load", refresh);
})();"#;

/// Markup for the helper tag matching the resolved options.
fn script_tag(script: &ScriptOptions) -> String {
    let nonce = match &script.nonce {
        Some(nonce) => format!(r#" nonce="{}""#, escape_html(nonce)),
        None => String::new(),
    };
    match script.source {
        ScriptSource::Inline => format!("<script{nonce}>{BROWSER_SCRIPT}</script>\n"),
        ScriptSource::Cdn => {
            format!("<script{nonce} src=\"{CDN_URL}\" defer></script>\n")
        }
    }
}

/// Register the `script` rule appending the helper to the last slide.
pub(crate) fn register(pipeline: &mut MarkdownPipeline, config: &Config) {
    let script = config.script.clone();
    pipeline.add_rule(
        "script",
        Box::new(move |mut events, _ctx| {
            if script.enabled {
                events.push(Event::Html(script_tag(&script).into()));
            }
            events
        }),
    );
}
