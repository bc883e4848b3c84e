//! Raw HTML allowlist enforcement.
//!
//! Boolean policies need no rule work: the pipeline neutralizes raw HTML
//! before rules run when it is fully disallowed, and the writer passes it
//! through when it is fully allowed. This rule handles the allowlist case
//! by rewriting every raw fragment tag by tag.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::LazyLock;

use dais_engine::{AttrPolicy, HtmlPolicy, MarkdownPipeline, TagPolicy, escape_html};
use pulldown_cmark::Event;
use regex::Regex;

use crate::config::Config;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(/?)([a-z][a-z0-9-]*)([^<>]*?)\s*(/?)\s*>").unwrap()
});

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .unwrap()
});

/// Register the `html` rule enforcing the configured policy.
pub(crate) fn register(pipeline: &mut MarkdownPipeline, config: &Config) {
    let policy = config.html.clone();
    pipeline.add_rule(
        "html",
        Box::new(move |events, _ctx| match &policy {
            HtmlPolicy::Allowlist(tags) => sanitize_events(events, tags),
            HtmlPolicy::All(_) => events,
        }),
    );
}

/// Sanitize raw HTML events, joining contiguous block lines first.
///
/// The parser hands out HTML blocks one line per event, so a tag can open
/// on one line and close on the next; the policy has to see the whole
/// block at once or a split tag slips past the scanner.
fn sanitize_events<'a>(
    events: Vec<Event<'a>>,
    tags: &HashMap<String, TagPolicy>,
) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut block = String::new();
    for event in events {
        match event {
            Event::Html(html) => block.push_str(&html),
            Event::InlineHtml(html) => {
                flush_block(&mut out, &mut block, tags);
                out.push(Event::InlineHtml(sanitize(&html, tags).into()));
            }
            other => {
                flush_block(&mut out, &mut block, tags);
                out.push(other);
            }
        }
    }
    flush_block(&mut out, &mut block, tags);
    out
}

fn flush_block<'a>(
    out: &mut Vec<Event<'a>>,
    block: &mut String,
    tags: &HashMap<String, TagPolicy>,
) {
    if !block.is_empty() {
        out.push(Event::Html(sanitize(block.as_str(), tags).into()));
        block.clear();
    }
}

/// Rewrite one raw fragment, escaping tags outside the allowlist and
/// dropping attributes their tag policy rejects. Comments are removed,
/// text between tags passes through.
fn sanitize(fragment: &str, tags: &HashMap<String, TagPolicy>) -> String {
    let fragment = COMMENT.replace_all(fragment, "");
    let mut out = String::with_capacity(fragment.len());
    let mut cursor = 0;
    for caps in TAG.captures_iter(&fragment) {
        let Some(all) = caps.get(0) else { continue };
        push_text(&mut out, &fragment[cursor..all.start()]);
        cursor = all.end();

        let closing = !caps[1].is_empty();
        let name = caps[2].to_lowercase();
        let Some(policy) = tags.get(&name) else {
            out.push_str(&escape_html(all.as_str()));
            continue;
        };
        if closing {
            write!(out, "</{name}>").unwrap();
        } else {
            out.push('<');
            out.push_str(&name);
            out.push_str(&filter_attrs(
                policy,
                caps.get(3).map_or("", |attrs| attrs.as_str()),
            ));
            if !caps[4].is_empty() {
                out.push_str(" /");
            }
            out.push('>');
        }
    }
    push_text(&mut out, &fragment[cursor..]);
    out
}

/// Text between tags passes through unless it still carries a `<`, which
/// marks a fragment the tag scanner could not parse (an unclosed tag or a
/// bogus comment); those are escaped wholesale.
fn push_text(out: &mut String, text: &str) {
    if text.contains('<') {
        out.push_str(&escape_html(text));
    } else {
        out.push_str(text);
    }
}

/// Serialize the attributes the tag policy keeps, normalized to lowercase
/// names and double-quoted values.
fn filter_attrs(policy: &TagPolicy, raw: &str) -> String {
    let mut out = String::new();
    for caps in ATTR.captures_iter(raw) {
        let name = caps[1].to_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str());

        // Outer None drops the attribute, inner None keeps it value-less.
        let decision: Option<Option<String>> = match policy {
            TagPolicy::Attributes(allowed) => allowed
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&name))
                .then(|| value.map(ToOwned::to_owned)),
            TagPolicy::Rules(rules) => match rules.get(&name) {
                Some(AttrPolicy::Keep(true)) => Some(value.map(ToOwned::to_owned)),
                Some(AttrPolicy::Transform(transform)) => {
                    transform(value.unwrap_or("")).map(Some)
                }
                Some(AttrPolicy::Keep(false)) | None => None,
            },
        };
        if let Some(value) = decision {
            out.push(' ');
            out.push_str(&name);
            if let Some(value) = value {
                write!(out, "=\"{}\"", escape_html(&value)).unwrap();
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;

    fn br_only() -> HashMap<String, TagPolicy> {
        HashMap::from([("br".to_owned(), TagPolicy::Attributes(Vec::new()))])
    }

    #[test]
    fn test_allowlisted_tag_passes() {
        assert_eq!(sanitize("a<br>b", &br_only()), "a<br>b");
        assert_eq!(sanitize("a<br />b", &br_only()), "a<br />b");
    }

    #[test]
    fn test_other_tags_are_escaped() {
        assert_eq!(
            sanitize("<script>alert(1)</script>", &br_only()),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_tag_name_is_case_insensitive() {
        assert_eq!(sanitize("<BR>", &br_only()), "<br>");
    }

    #[test]
    fn test_attributes_outside_allowlist_are_dropped() {
        let tags = HashMap::from([(
            "a".to_owned(),
            TagPolicy::Attributes(vec!["href".to_owned()]),
        )]);
        assert_eq!(
            sanitize(r#"<a href="x" onclick="evil()">hi</a>"#, &tags),
            r#"<a href="x">hi</a>"#
        );
    }

    #[test]
    fn test_value_less_attribute_survives() {
        let tags = HashMap::from([(
            "input".to_owned(),
            TagPolicy::Attributes(vec!["disabled".to_owned()]),
        )]);
        assert_eq!(sanitize("<input disabled>", &tags), "<input disabled>");
    }

    #[test]
    fn test_attribute_rules_keep_and_drop() {
        let tags = HashMap::from([(
            "img".to_owned(),
            TagPolicy::Rules(HashMap::from([
                ("alt".to_owned(), AttrPolicy::Keep(true)),
                ("src".to_owned(), AttrPolicy::Keep(false)),
            ])),
        )]);
        assert_eq!(
            sanitize(r#"<img src="x" alt="cat">"#, &tags),
            r#"<img alt="cat">"#
        );
    }

    #[test]
    fn test_attribute_transform_rewrites_value() {
        let tags = HashMap::from([(
            "img".to_owned(),
            TagPolicy::Rules(HashMap::from([(
                "src".to_owned(),
                AttrPolicy::Transform(Arc::new(|value: &str| {
                    value.starts_with("https://").then(|| value.to_owned())
                })),
            )])),
        )]);
        assert_eq!(
            sanitize(r#"<img src="https://ok/x.png">"#, &tags),
            r#"<img src="https://ok/x.png">"#
        );
        assert_eq!(sanitize(r#"<img src="javascript:evil()">"#, &tags), "<img>");
    }

    #[test]
    fn test_tag_split_across_lines_is_escaped() {
        assert_eq!(
            sanitize("<script\n>alert(1)</script\n>", &br_only()),
            "&lt;script\n&gt;alert(1)&lt;/script\n&gt;"
        );
    }

    #[test]
    fn test_block_lines_are_joined_before_sanitizing() {
        let events = vec![
            Event::Html("<script\n".into()),
            Event::Html(">alert(1)</script>\n".into()),
        ];
        let out = sanitize_events(events, &br_only());
        assert_eq!(
            out,
            vec![Event::Html(
                "&lt;script\n&gt;alert(1)&lt;/script&gt;\n".into()
            )]
        );
    }

    #[test]
    fn test_dangling_open_bracket_is_escaped() {
        assert_eq!(sanitize("a <scr", &br_only()), "a &lt;scr");
        assert_eq!(
            sanitize("<!doctype html>", &br_only()),
            "&lt;!doctype html&gt;"
        );
    }

    #[test]
    fn test_comments_are_removed() {
        assert_eq!(sanitize("a<!-- hidden -->b", &br_only()), "ab");
    }

    #[test]
    fn test_attribute_value_is_requoted_and_escaped() {
        let tags = HashMap::from([(
            "a".to_owned(),
            TagPolicy::Attributes(vec!["title".to_owned()]),
        )]);
        assert_eq!(
            sanitize("<a title='say \"hi\"'>", &tags),
            r#"<a title="say &quot;hi&quot;">"#
        );
    }
}
