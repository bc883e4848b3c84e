//! Front matter splitting and global directive parsing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Global directives resolved for a single render pass.
pub type DirectiveMap = BTreeMap<String, String>;

/// Matches top-level `key: value` lines for the loose fallback parser.
static LOOSE_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([A-Za-z_][A-Za-z0-9_-]*)[ \t]*:[ \t]+(\S.*?)[ \t]*$").unwrap());

/// Split a leading YAML front matter block off the document.
///
/// The block must open with `---` on the very first line and close with a
/// matching fence. Returns the block body (without fences) and the
/// remaining markdown. An unterminated block is treated as content.
pub(crate) fn split_front_matter(source: &str) -> (Option<&str>, &str) {
    let Some(rest) = source.strip_prefix("---") else {
        return (None, source);
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return (None, source);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, source)
}

/// Parse a front matter block into scalar directives.
///
/// Tries a strict YAML parse first. When `loose` is set and the strict
/// parse fails, falls back to scanning for `key: value` lines so that a
/// malformed block still yields whatever directives it contains.
pub(crate) fn parse(yaml: &str, loose: bool) -> DirectiveMap {
    match parse_strict(yaml) {
        Some(map) => map,
        None if loose => parse_loose(yaml),
        None => DirectiveMap::new(),
    }
}

fn parse_strict(yaml: &str) -> Option<DirectiveMap> {
    let mapping: serde_yaml::Mapping = serde_yaml::from_str(yaml).ok()?;
    let mut map = DirectiveMap::new();
    for (key, value) in mapping {
        let serde_yaml::Value::String(key) = key else {
            continue;
        };
        // Nested structures are not directives; skip them.
        let value = match value {
            serde_yaml::Value::String(value) => value,
            serde_yaml::Value::Number(value) => value.to_string(),
            serde_yaml::Value::Bool(value) => value.to_string(),
            _ => continue,
        };
        map.insert(key, value);
    }
    Some(map)
}

fn parse_loose(yaml: &str) -> DirectiveMap {
    let mut map = DirectiveMap::new();
    for caps in LOOSE_ENTRY.captures_iter(yaml) {
        map.insert(caps[1].to_owned(), caps[2].to_owned());
    }
    map
}
