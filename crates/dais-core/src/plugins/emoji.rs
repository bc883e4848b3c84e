//! Emoji conversion for `:shortcode:` tokens and Unicode glyphs.

use std::sync::LazyLock;

use dais_engine::{MarkdownPipeline, escape_html};
use pulldown_cmark::{Event, Tag, TagEnd};
use regex::Regex;

use crate::config::{Config, EmojiConfig, EmojiMode};

/// Stylesheet fragment sizing emoji images like the surrounding text.
pub const STYLE: &str =
    "img.emoji{height:1em;width:1em;margin:0 .05em 0 .1em;vertical-align:-0.1em;}";

/// CDN base for twemoji SVG assets.
const TWEMOJI_BASE: &str = "https://cdn.jsdelivr.net/gh/jdecked/twemoji@15.1.0/assets/svg/";

/// Longest emoji sequence worth probing, in characters. Flag and family
/// sequences stay under this.
const MAX_SEQUENCE: usize = 10;

static SHORTCODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":([a-z0-9_+-]+):").unwrap());

/// Register the `emoji` rule.
pub(crate) fn register(pipeline: &mut MarkdownPipeline, config: &Config) {
    let emoji = config.emoji;
    pipeline.add_rule(
        "emoji",
        Box::new(move |events, _ctx| {
            if emoji.shortcode == EmojiMode::Ignore && emoji.unicode == EmojiMode::Ignore {
                return events;
            }
            convert_events(events, emoji)
        }),
    );
}

/// Walk the event stream converting text, leaving code blocks and image
/// descriptions alone.
fn convert_events(events: Vec<Event<'_>>, emoji: EmojiConfig) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut skip_depth = 0usize;
    for event in events {
        match &event {
            Event::Start(Tag::CodeBlock(_) | Tag::Image { .. }) => {
                skip_depth += 1;
                out.push(event);
            }
            Event::End(TagEnd::CodeBlock | TagEnd::Image) => {
                skip_depth = skip_depth.saturating_sub(1);
                out.push(event);
            }
            Event::Text(text) if skip_depth == 0 => {
                let text = text.to_string();
                convert_text(&text, emoji, &mut out);
            }
            _ => out.push(event),
        }
    }
    out
}

enum Piece {
    Text(String),
    Markup(String),
}

/// Split one text run into plain text and emoji markup events.
fn convert_text<'a>(text: &str, emoji: EmojiConfig, out: &mut Vec<Event<'a>>) {
    let mut pieces = Vec::new();
    if emoji.shortcode == EmojiMode::Ignore {
        pieces.push(Piece::Text(text.to_owned()));
    } else {
        let mut cursor = 0;
        for caps in SHORTCODE.captures_iter(text) {
            let Some(all) = caps.get(0) else { continue };
            let Some(found) = emojis::get_by_shortcode(&caps[1]) else {
                continue;
            };
            if all.start() > cursor {
                pieces.push(Piece::Text(text[cursor..all.start()].to_owned()));
            }
            pieces.push(match emoji.shortcode {
                EmojiMode::Twemoji => Piece::Markup(twemoji_img(found.as_str())),
                _ => Piece::Text(found.as_str().to_owned()),
            });
            cursor = all.end();
        }
        if cursor < text.len() {
            pieces.push(Piece::Text(text[cursor..].to_owned()));
        }
    }

    for piece in pieces {
        match piece {
            Piece::Text(text) if emoji.unicode == EmojiMode::Twemoji => {
                split_unicode(&text, out);
            }
            Piece::Text(text) if !text.is_empty() => out.push(Event::Text(text.into())),
            Piece::Markup(markup) => out.push(Event::InlineHtml(markup.into())),
            Piece::Text(_) => {}
        }
    }
}

/// Scan a text run for Unicode emoji sequences, longest match first.
///
/// ASCII characters are skipped without probing unless a variation
/// selector or keycap combiner follows, which is how keycap sequences
/// like `1\u{fe0f}\u{20e3}` open.
fn split_unicode<'a>(text: &str, out: &mut Vec<Event<'a>>) {
    let mut plain = String::new();
    let mut index = 0;
    while index < text.len() {
        let rest = &text[index..];
        let Some(first) = rest.chars().next() else { break };
        if !first.is_ascii() || rest[first.len_utf8()..].starts_with(['\u{fe0f}', '\u{20e3}']) {
            if let Some((len, glyph)) = longest_emoji(rest) {
                if !plain.is_empty() {
                    out.push(Event::Text(std::mem::take(&mut plain).into()));
                }
                out.push(Event::InlineHtml(twemoji_img(glyph).into()));
                index += len;
                continue;
            }
        }
        plain.push(first);
        index += first.len_utf8();
    }
    if !plain.is_empty() {
        out.push(Event::Text(plain.into()));
    }
}

/// Longest emoji sequence at the start of `rest`, as byte length and glyph.
fn longest_emoji(rest: &str) -> Option<(usize, &str)> {
    let mut found = None;
    for (count, (idx, ch)) in rest.char_indices().enumerate() {
        if count == MAX_SEQUENCE {
            break;
        }
        let end = idx + ch.len_utf8();
        if emojis::get(&rest[..end]).is_some() {
            found = Some((end, &rest[..end]));
        }
    }
    found
}

/// Build a twemoji `<img>` tag for an emoji glyph.
fn twemoji_img(glyph: &str) -> String {
    format!(
        r#"<img class="emoji" draggable="false" alt="{}" src="{}{}.svg" />"#,
        escape_html(glyph),
        TWEMOJI_BASE,
        twemoji_code(glyph),
    )
}

/// Twemoji asset name: lowercase hex codepoints joined by `-`.
///
/// Variation selector 16 is dropped unless the sequence carries a ZWJ,
/// matching the CDN's file naming.
fn twemoji_code(glyph: &str) -> String {
    let has_zwj = glyph.chars().any(|c| c == '\u{200d}');
    glyph
        .chars()
        .filter(|&c| has_zwj || c != '\u{fe0f}')
        .map(|c| format!("{:x}", c as u32))
        .collect::<Vec<_>>()
        .join("-")
}
