//! Markdown processor configuration and the rule pipeline.
//!
//! Parsing itself is delegated to `pulldown-cmark`. Everything a deck
//! extension can customize lives here: processor options, post-parse
//! event rules, and custom global directive handlers.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};

use pulldown_cmark::{Event, LinkType, Options, Tag, TagEnd};
use regex::Regex;

use crate::directives::DirectiveMap;
use crate::error::BoxError;
use crate::theme::Theme;

/// Matches bare URLs eligible for automatic linking.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\bhttps?://|\bwww\.)[^\s<>"')]+[^\s<>"').,;:!?]"#).unwrap()
});

/// Markdown dialect selecting the parser's base extension set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dialect {
    /// CommonMark with no extensions beyond the enabled rule families.
    #[default]
    CommonMark,
    /// GitHub Flavored Markdown: tables, strikethrough, task lists.
    Gfm,
}

/// Raw HTML handling policy for rendered output.
#[derive(Clone)]
pub enum HtmlPolicy {
    /// Pass all raw HTML through (`true`) or escape it entirely (`false`).
    All(bool),
    /// Pass through only the listed elements, filtered tag by tag.
    ///
    /// Enforced by the sanitizing pipeline rule; the writer passes events
    /// through untouched once that rule has run.
    Allowlist(HashMap<String, TagPolicy>),
}

impl Default for HtmlPolicy {
    fn default() -> Self {
        Self::All(false)
    }
}

impl fmt::Debug for HtmlPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All(allowed) => f.debug_tuple("All").field(allowed).finish(),
            Self::Allowlist(tags) => {
                let mut names: Vec<_> = tags.keys().collect();
                names.sort();
                f.debug_tuple("Allowlist").field(&names).finish()
            }
        }
    }
}

/// Per-tag filter inside an [`HtmlPolicy::Allowlist`].
#[derive(Clone)]
pub enum TagPolicy {
    /// Keep the tag with exactly these attributes; all others are dropped.
    Attributes(Vec<String>),
    /// Keep the tag, deciding attribute by attribute.
    Rules(HashMap<String, AttrPolicy>),
}

impl fmt::Debug for TagPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attributes(names) => f.debug_tuple("Attributes").field(names).finish(),
            Self::Rules(rules) => {
                let mut names: Vec<_> = rules.keys().collect();
                names.sort();
                f.debug_tuple("Rules").field(&names).finish()
            }
        }
    }
}

/// Per-attribute rule inside a [`TagPolicy::Rules`] map.
#[derive(Clone)]
pub enum AttrPolicy {
    /// Keep (`true`) or drop (`false`) the attribute unchanged.
    Keep(bool),
    /// Rewrite the attribute value; returning `None` drops the attribute.
    Transform(Arc<AttrTransform>),
}

/// Attribute value rewriter used by [`AttrPolicy::Transform`].
pub type AttrTransform = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Callback producing highlighted markup for fenced code blocks.
///
/// Receives the code and the fence language token. An empty return string
/// means "not highlighted" and the writer falls back to escaped plain text.
pub type HighlightFn = Arc<dyn Fn(&str, &str) -> Result<String, BoxError> + Send + Sync>;

/// Options for the markdown processor.
#[derive(Clone, Default)]
pub struct MarkdownOptions {
    /// Base dialect for the parser.
    pub dialect: Dialect,
    /// Render single newlines as `<br />`.
    pub breaks: bool,
    /// Turn bare URLs into links.
    pub linkify: bool,
    /// Raw HTML policy.
    pub html: HtmlPolicy,
    /// Highlight callback for fenced code blocks.
    pub highlight: Option<HighlightFn>,
}

impl fmt::Debug for MarkdownOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkdownOptions")
            .field("dialect", &self.dialect)
            .field("breaks", &self.breaks)
            .field("linkify", &self.linkify)
            .field("html", &self.html)
            .field("highlight", &self.highlight.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Built-in parser rule families that can be enabled after construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleFamily {
    /// Pipe tables.
    Table,
    /// Automatic linking of bare URLs.
    Linkify,
    /// `~~strikethrough~~` spans.
    Strikethrough,
    /// `$...$` and `$$...$$` math spans.
    Math,
}

/// An event transform applied between parsing and HTML assembly.
///
/// Rules run in registration order and may rewrite the event stream
/// arbitrarily. Problems are reported as warnings on the context rather
/// than failing the render.
pub type Rule =
    Box<dyn for<'a> Fn(Vec<Event<'a>>, &RenderContext<'_>) -> Vec<Event<'a>> + Send + Sync>;

/// Handler for a custom global directive.
///
/// Receives the raw directive value and the resolved theme, and returns
/// derived directives to merge into the directive map. An `Err` becomes a
/// render warning and leaves the map untouched.
pub type DirectiveHandler =
    Arc<dyn Fn(&str, &Theme) -> Result<Vec<(String, String)>, String> + Send + Sync>;

/// Per-render state visible to pipeline rules.
pub struct RenderContext<'r> {
    theme: &'r Theme,
    directives: &'r DirectiveMap,
    warnings: RefCell<Vec<String>>,
}

impl<'r> RenderContext<'r> {
    /// Build a context, mainly useful for exercising rules directly.
    #[must_use]
    pub fn new(theme: &'r Theme, directives: &'r DirectiveMap) -> Self {
        Self {
            theme,
            directives,
            warnings: RefCell::new(Vec::new()),
        }
    }

    /// The theme the deck resolved to.
    pub fn theme(&self) -> &Theme {
        self.theme
    }

    /// Look up a resolved global directive.
    pub fn directive(&self, name: &str) -> Option<&str> {
        self.directives.get(name).map(String::as_str)
    }

    /// Record a non-fatal problem with the document.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(warning = %message, "render warning");
        self.warnings.borrow_mut().push(message);
    }

    pub(crate) fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut self.warnings.borrow_mut())
    }
}

struct NamedRule {
    name: String,
    apply: Rule,
}

/// The markdown processor: parser configuration plus an ordered chain of
/// named event-transform rules.
pub struct MarkdownPipeline {
    options: MarkdownOptions,
    families: BTreeSet<RuleFamily>,
    rules: Vec<NamedRule>,
    directives: Vec<(String, DirectiveHandler)>,
}

impl MarkdownPipeline {
    pub(crate) fn new(options: MarkdownOptions) -> Self {
        Self {
            options,
            families: BTreeSet::new(),
            rules: Vec::new(),
            directives: Vec::new(),
        }
    }

    /// The processor options this pipeline was built with.
    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Enable built-in rule families.
    pub fn enable(&mut self, families: &[RuleFamily]) {
        self.families.extend(families.iter().copied());
    }

    /// Whether a rule family is active, via `enable`, the processor
    /// options, or the dialect.
    pub fn is_enabled(&self, family: RuleFamily) -> bool {
        if self.families.contains(&family) {
            return true;
        }
        match family {
            RuleFamily::Linkify => self.options.linkify,
            RuleFamily::Table | RuleFamily::Strikethrough => self.options.dialect == Dialect::Gfm,
            RuleFamily::Math => false,
        }
    }

    /// Register a named rule at the end of the chain.
    pub fn add_rule(&mut self, name: impl Into<String>, rule: Rule) {
        let name = name.into();
        tracing::debug!(rule = %name, "registered pipeline rule");
        self.rules.push(NamedRule { name, apply: rule });
    }

    /// Names of registered rules in execution order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name.as_str()).collect()
    }

    /// Register a handler for a custom global directive.
    pub fn add_directive(&mut self, name: impl Into<String>, handler: DirectiveHandler) {
        self.directives.push((name.into(), handler));
    }

    pub(crate) fn directive_handlers(&self) -> &[(String, DirectiveHandler)] {
        &self.directives
    }

    /// Parser options matching the dialect and enabled families.
    pub(crate) fn parser_options(&self) -> Options {
        let mut options = Options::empty();
        if self.options.dialect == Dialect::Gfm {
            options.insert(Options::ENABLE_TABLES);
            options.insert(Options::ENABLE_STRIKETHROUGH);
            options.insert(Options::ENABLE_TASKLISTS);
        }
        if self.families.contains(&RuleFamily::Table) {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.families.contains(&RuleFamily::Strikethrough) {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.families.contains(&RuleFamily::Math) {
            options.insert(Options::ENABLE_MATH);
        }
        options
    }

    /// Run the built-in and registered rules over the event stream.
    ///
    /// Built-ins go first: linkify on the original text events, then raw
    /// HTML neutralization under [`HtmlPolicy::All`]`(false)`. Markup that
    /// registered rules inject afterwards is never filtered.
    pub(crate) fn apply_rules<'a>(
        &self,
        mut events: Vec<Event<'a>>,
        ctx: &RenderContext<'_>,
    ) -> Vec<Event<'a>> {
        if self.is_enabled(RuleFamily::Linkify) {
            events = linkify_events(events);
        }
        if matches!(self.options.html, HtmlPolicy::All(false)) {
            events = neutralize_raw_html(events);
        }
        for rule in &self.rules {
            events = (rule.apply)(events, ctx);
        }
        events
    }
}

/// Demote raw HTML events to plain text so the writer escapes them.
fn neutralize_raw_html(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    events
        .into_iter()
        .map(|event| match event {
            Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
            other => other,
        })
        .collect()
}

/// Turn bare URLs in text events into links.
///
/// Text inside code blocks, existing links, and image alt text is left
/// untouched.
fn linkify_events(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut skip_depth = 0usize;
    for event in events {
        match &event {
            Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => {
                skip_depth += 1;
                out.push(event);
            }
            Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                skip_depth = skip_depth.saturating_sub(1);
                out.push(event);
            }
            Event::Text(text) if skip_depth == 0 && URL_PATTERN.is_match(text) => {
                let text = text.to_string();
                linkify_text(&text, &mut out);
            }
            _ => out.push(event),
        }
    }
    out
}

fn linkify_text<'a>(text: &str, out: &mut Vec<Event<'a>>) {
    let mut cursor = 0;
    for found in URL_PATTERN.find_iter(text) {
        if found.start() > cursor {
            out.push(Event::Text(text[cursor..found.start()].to_owned().into()));
        }
        let url = found.as_str();
        let href = if url.starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_owned()
        };
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: href.into(),
            title: "".into(),
            id: "".into(),
        }));
        out.push(Event::Text(url.to_owned().into()));
        out.push(Event::End(TagEnd::Link));
        cursor = found.end();
    }
    if cursor < text.len() {
        out.push(Event::Text(text[cursor..].to_owned().into()));
    }
}
