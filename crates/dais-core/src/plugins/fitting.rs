//! Auto-scaling markers driven by theme metadata.
//!
//! Themes opt in through the `@auto-scaling` metadata key: `true` scales
//! everything, otherwise a comma list of `fittingHeader`, `code` and
//! `math` picks the targets. The rule only annotates the markup; the
//! browser helper script measures and applies the transforms.

use dais_engine::{MarkdownPipeline, RenderContext};
use pulldown_cmark::{Event, Tag, TagEnd};

use crate::config::Config;
use crate::plugins::math;

/// Stylesheet fragment for auto-scaled fragments.
pub const STYLE: &str =
    "[data-auto-scaling]{display:inline-block;max-width:100%;transform-origin:left top;}";

/// Which element kinds the resolved theme wants scaled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Scaling {
    headings: bool,
    code: bool,
    math: bool,
}

impl Scaling {
    fn from_theme(ctx: &RenderContext<'_>) -> Self {
        Self::parse(ctx.theme().meta_str("auto-scaling"))
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("true") => Self {
                headings: true,
                code: true,
                math: true,
            },
            Some(list) => {
                let mut scaling = Self::default();
                for token in list.split(',').map(str::trim) {
                    match token {
                        "fittingHeader" => scaling.headings = true,
                        "code" => scaling.code = true,
                        "math" => scaling.math = true,
                        _ => {}
                    }
                }
                scaling
            }
            None => Self::default(),
        }
    }

    fn any(self) -> bool {
        self.headings || self.code || self.math
    }
}

/// Register the `fitting` rule.
pub(crate) fn register(pipeline: &mut MarkdownPipeline, _config: &Config) {
    pipeline.add_rule(
        "fitting",
        Box::new(|events, ctx| {
            let scaling = Scaling::from_theme(ctx);
            if !scaling.any() {
                return events;
            }
            annotate(events, scaling)
        }),
    );
}

/// Insert scaling markers around the targeted elements.
fn annotate(events: Vec<Event<'_>>, scaling: Scaling) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    for event in events {
        match &event {
            Event::Start(Tag::Heading { .. }) if scaling.headings => {
                out.push(event);
                out.push(Event::InlineHtml(r#"<span data-auto-scaling="fit">"#.into()));
            }
            Event::End(TagEnd::Heading(_)) if scaling.headings => {
                out.push(Event::InlineHtml("</span>".into()));
                out.push(event);
            }
            Event::Start(Tag::CodeBlock(_)) if scaling.code => {
                out.push(Event::Html(r#"<div data-auto-scaling="downscale">"#.into()));
                out.push(event);
            }
            Event::End(TagEnd::CodeBlock) if scaling.code => {
                out.push(event);
                out.push(Event::Html("</div>\n".into()));
            }
            Event::InlineHtml(html)
                if scaling.math && html.starts_with(math::DISPLAY_PREFIX) =>
            {
                out.push(Event::InlineHtml(
                    r#"<div data-auto-scaling="downscale">"#.into(),
                ));
                out.push(event);
                out.push(Event::InlineHtml("</div>".into()));
            }
            _ => out.push(event),
        }
    }
    out
}
