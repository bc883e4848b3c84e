//! Event-stream HTML assembly for slide decks.
//!
//! The deck is split into slides at top-level thematic breaks, and each
//! slide is written as a `<section>` element. With the inline SVG scaffold
//! enabled, every section is wrapped in an `<svg><foreignObject>` shell so
//! decks scale with their container.

use std::fmt::Write as _;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Tag, TagEnd};

use crate::error::EngineError;
use crate::markdown::MarkdownOptions;

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Buffering state for the current fenced code block.
#[derive(Default)]
struct CodeState {
    active: bool,
    language: Option<String>,
    buffer: String,
}

impl CodeState {
    fn start(&mut self, language: Option<String>) {
        self.active = true;
        self.language = language;
        self.buffer.clear();
    }

    fn end(&mut self) -> (Option<String>, String) {
        self.active = false;
        (self.language.take(), std::mem::take(&mut self.buffer))
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Column alignment tracking for the current table.
#[derive(Default)]
struct TableState {
    in_head: bool,
    alignments: Vec<Alignment>,
    cell_index: usize,
}

impl TableState {
    fn start(&mut self, alignments: Vec<Alignment>) {
        self.alignments = alignments;
        self.in_head = false;
        self.cell_index = 0;
    }

    fn alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => r#" style="text-align:left""#,
            Some(Alignment::Center) => r#" style="text-align:center""#,
            Some(Alignment::Right) => r#" style="text-align:right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

/// Alt text capture for the current image.
#[derive(Default)]
struct ImageState {
    active: bool,
    alt: String,
    src: String,
    title: String,
}

impl ImageState {
    fn start(&mut self, src: String, title: String) {
        self.active = true;
        self.alt.clear();
        self.src = src;
        self.title = title;
    }

    fn end(&mut self) -> (String, String, String) {
        self.active = false;
        (
            std::mem::take(&mut self.src),
            std::mem::take(&mut self.alt),
            std::mem::take(&mut self.title),
        )
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

/// Writes one slide's events as HTML.
struct HtmlWriter<'o> {
    options: &'o MarkdownOptions,
    out: String,
    code: CodeState,
    table: TableState,
    image: ImageState,
}

impl<'o> HtmlWriter<'o> {
    fn new(options: &'o MarkdownOptions) -> Self {
        Self {
            options,
            out: String::new(),
            code: CodeState::default(),
            table: TableState::default(),
            image: ImageState::default(),
        }
    }

    fn render(mut self, events: Vec<Event<'_>>) -> Result<String, EngineError> {
        for event in events {
            self.process_event(event)?;
        }
        Ok(self.out)
    }

    fn process_event(&mut self, event: Event<'_>) -> Result<(), EngineError> {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => return self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.raw_html(&html),
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => self.hard_break(),
            Event::Rule => self.out.push_str("<hr />"),
            Event::TaskListMarker(checked) => self.task_list_marker(checked),
            // Math spans reach the writer only when no rule rewrote them.
            Event::InlineMath(tex) => self.out.push_str(&escape_html(&format!("${tex}$"))),
            Event::DisplayMath(tex) => self.out.push_str(&escape_html(&format!("$${tex}$$"))),
            Event::FootnoteReference(_) => {}
        }
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if !self.image.is_active() {
                    self.out.push_str("<p>");
                }
            }
            Tag::Heading { level, .. } => {
                write!(self.out, "<{}>", heading_tag(level)).unwrap();
            }
            Tag::BlockQuote(_) => {
                self.out.push_str("<blockquote>");
            }
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(ref info) if !info.is_empty() => info
                        .split_whitespace()
                        .next()
                        .map(std::borrow::ToOwned::to_owned),
                    _ => None,
                };
                self.code.start(language);
            }
            Tag::List(start) => match start {
                Some(1) => self.out.push_str("<ol>"),
                Some(n) => write!(self.out, r#"<ol start="{n}">"#).unwrap(),
                None => self.out.push_str("<ul>"),
            },
            Tag::Item => {
                self.out.push_str("<li>");
            }
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => {
                self.out.push_str("<dl>");
            }
            Tag::DefinitionListTitle => {
                self.out.push_str("<dt>");
            }
            Tag::DefinitionListDefinition => {
                self.out.push_str("<dd>");
            }
            Tag::Table(alignments) => {
                self.table.start(alignments);
                self.out.push_str("<table>");
            }
            Tag::TableHead => {
                self.table.in_head = true;
                self.table.cell_index = 0;
                self.out.push_str("<thead><tr>");
            }
            Tag::TableRow => {
                self.table.cell_index = 0;
                self.out.push_str("<tr>");
            }
            Tag::TableCell => {
                let align = self.table.alignment_style();
                let tag = if self.table.in_head { "th" } else { "td" };
                write!(self.out, "<{tag}{align}>").unwrap();
            }
            Tag::Emphasis => self.out.push_str("<em>"),
            Tag::Strong => self.out.push_str("<strong>"),
            Tag::Strikethrough => self.out.push_str("<s>"),
            Tag::Link { dest_url, .. } => {
                write!(self.out, r#"<a href="{}">"#, escape_html(&dest_url)).unwrap();
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image.start(dest_url.to_string(), title.to_string());
            }
            Tag::Superscript => self.out.push_str("<sup>"),
            Tag::Subscript => self.out.push_str("<sub>"),
        }
    }

    fn end_tag(&mut self, tag: TagEnd) -> Result<(), EngineError> {
        match tag {
            TagEnd::Paragraph => {
                if !self.image.is_active() {
                    self.out.push_str("</p>");
                }
            }
            TagEnd::Heading(level) => {
                write!(self.out, "</{}>", heading_tag(level)).unwrap();
            }
            TagEnd::BlockQuote(_) => {
                self.out.push_str("</blockquote>");
            }
            TagEnd::CodeBlock => {
                self.finish_code_block()?;
            }
            TagEnd::List(ordered) => {
                self.out.push_str(if ordered { "</ol>" } else { "</ul>" });
            }
            TagEnd::Item => {
                self.out.push_str("</li>");
            }
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
            TagEnd::Image => {
                let (src, alt, title) = self.image.end();
                write!(
                    self.out,
                    r#"<img src="{}" alt="{}""#,
                    escape_html(&src),
                    escape_html(&alt)
                )
                .unwrap();
                if !title.is_empty() {
                    write!(self.out, r#" title="{}""#, escape_html(&title)).unwrap();
                }
                self.out.push_str(" />");
            }
            TagEnd::DefinitionList => {
                self.out.push_str("</dl>");
            }
            TagEnd::DefinitionListTitle => {
                self.out.push_str("</dt>");
            }
            TagEnd::DefinitionListDefinition => {
                self.out.push_str("</dd>");
            }
            TagEnd::Table => {
                self.out.push_str("</tbody></table>");
            }
            TagEnd::TableHead => {
                self.out.push_str("</tr></thead><tbody>");
                self.table.in_head = false;
            }
            TagEnd::TableRow => {
                self.out.push_str("</tr>");
            }
            TagEnd::TableCell => {
                self.out
                    .push_str(if self.table.in_head { "</th>" } else { "</td>" });
                self.table.cell_index += 1;
            }
            TagEnd::Emphasis => self.out.push_str("</em>"),
            TagEnd::Strong => self.out.push_str("</strong>"),
            TagEnd::Strikethrough => self.out.push_str("</s>"),
            TagEnd::Link => self.out.push_str("</a>"),
            TagEnd::Superscript => self.out.push_str("</sup>"),
            TagEnd::Subscript => self.out.push_str("</sub>"),
        }
        Ok(())
    }

    /// Close the buffered code block, dispatching the highlight callback.
    ///
    /// An empty callback result means the language was not recognized and
    /// the content is written as escaped plain text instead.
    fn finish_code_block(&mut self) -> Result<(), EngineError> {
        let (language, content) = self.code.end();
        let language = language.unwrap_or_default();

        let markup = match &self.options.highlight {
            Some(highlight) => {
                highlight(&content, &language).map_err(|source| EngineError::Highlight {
                    language: language.clone(),
                    source,
                })?
            }
            None => String::new(),
        };

        if language.is_empty() {
            self.out.push_str("<pre><code>");
        } else {
            write!(
                self.out,
                r#"<pre><code class="language-{}">"#,
                escape_html(&language)
            )
            .unwrap();
        }
        if markup.is_empty() {
            self.out.push_str(&escape_html(&content));
        } else {
            self.out.push_str(&markup);
        }
        self.out.push_str("</code></pre>");
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.code.is_active() {
            self.code.buffer.push_str(text);
        } else if self.image.is_active() {
            self.image.alt.push_str(text);
        } else {
            self.out.push_str(&escape_html(text));
        }
    }

    fn inline_code(&mut self, code: &str) {
        if self.image.is_active() {
            self.image.alt.push_str(code);
        } else {
            write!(self.out, "<code>{}</code>", escape_html(code)).unwrap();
        }
    }

    /// Raw HTML policy is enforced by the pipeline before events reach the
    /// writer, so whatever arrives here is passed through.
    fn raw_html(&mut self, html: &str) {
        if self.image.is_active() {
            return;
        }
        self.out.push_str(html);
    }

    fn soft_break(&mut self) {
        if self.code.is_active() {
            self.code.buffer.push('\n');
        } else if self.image.is_active() {
            self.image.alt.push(' ');
        } else if self.options.breaks {
            self.out.push_str("<br />");
        } else {
            self.out.push('\n');
        }
    }

    fn hard_break(&mut self) {
        if self.image.is_active() {
            self.image.alt.push(' ');
        } else {
            self.out.push_str("<br />");
        }
    }

    fn task_list_marker(&mut self, checked: bool) {
        self.out.push_str(if checked {
            r#"<input type="checkbox" checked disabled /> "#
        } else {
            r#"<input type="checkbox" disabled /> "#
        });
    }
}

/// Split a top-level event stream into slides at thematic breaks.
///
/// Rules nested inside other blocks stay horizontal rules.
fn split_slides(events: Vec<Event<'_>>) -> Vec<Vec<Event<'_>>> {
    let mut slides = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;
    for event in events {
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Rule if depth == 0 => {
                slides.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(event);
    }
    slides.push(current);

    // A rule as the very first block opens the deck, it separates nothing.
    if slides.len() > 1 && slides[0].is_empty() {
        slides.remove(0);
    }
    slides
}

/// Render the full event stream as a deck of slide sections.
pub(crate) fn render_deck(
    events: Vec<Event<'_>>,
    options: &MarkdownOptions,
    inline_svg: bool,
    size: (u32, u32),
) -> Result<String, EngineError> {
    let (width, height) = size;
    let mut html = String::new();
    for (index, slide) in split_slides(events).into_iter().enumerate() {
        let number = index + 1;
        let body = HtmlWriter::new(options).render(slide)?;
        if inline_svg {
            write!(
                html,
                r#"<svg class="slide-wrapper" viewBox="0 0 {width} {height}"><foreignObject width="{width}" height="{height}">"#
            )
            .unwrap();
        }
        write!(html, r#"<section class="slide" data-slide="{number}">"#).unwrap();
        html.push_str(&body);
        html.push_str("</section>");
        if inline_svg {
            html.push_str("</foreignObject></svg>");
        }
        html.push('\n');
    }
    Ok(html)
}
