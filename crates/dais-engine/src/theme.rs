//! Theme registration and lookup.
//!
//! Themes are plain CSS stylesheets carrying `/* @key value */` metadata
//! comments. The registry indexes them by their `@theme` name and resolves
//! unknown names to a configurable default.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::EngineError;

/// Matches single-line `/* @key value */` metadata comments.
static META_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*\s*@([A-Za-z][A-Za-z0-9-]*)\s+(.+?)\s*\*/").unwrap());

/// How a metadata key is parsed out of a theme stylesheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaKind {
    /// A single value; the last occurrence wins.
    String,
    /// Every occurrence is collected in stylesheet order.
    Array,
}

/// A parsed metadata value.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum MetaValue {
    /// Single string value.
    String(String),
    /// Collected occurrences of a repeatable key.
    Array(Vec<String>),
}

impl MetaValue {
    /// The value as a single string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            Self::Array(_) => None,
        }
    }

    /// The collected occurrences, if this is a repeatable key.
    pub fn as_array(&self) -> Option<&[String]> {
        match self {
            Self::String(_) => None,
            Self::Array(values) => Some(values),
        }
    }
}

/// A registered theme: its CSS and the metadata parsed out of it.
#[derive(Clone, Debug)]
pub struct Theme {
    name: String,
    css: String,
    meta: BTreeMap<String, MetaValue>,
}

impl Theme {
    /// Parse a stylesheet into a theme, extracting metadata comments.
    ///
    /// The `@theme` key names the theme and is required; the first
    /// occurrence wins. All other keys are collected according to the
    /// registry's metadata schema, defaulting to [`MetaKind::String`].
    pub(crate) fn parse(
        css: &str,
        schema: &BTreeMap<String, MetaKind>,
    ) -> Result<Self, EngineError> {
        let mut name: Option<String> = None;
        let mut meta = BTreeMap::new();

        for caps in META_COMMENT.captures_iter(css) {
            let key = &caps[1];
            let value = caps[2].trim();
            if key == "theme" {
                if name.is_none() {
                    name = Some(value.to_owned());
                }
                continue;
            }
            match schema.get(key).copied().unwrap_or(MetaKind::String) {
                MetaKind::String => {
                    meta.insert(key.to_owned(), MetaValue::String(value.to_owned()));
                }
                MetaKind::Array => {
                    let entry = meta
                        .entry(key.to_owned())
                        .or_insert_with(|| MetaValue::Array(Vec::new()));
                    if let MetaValue::Array(values) = entry {
                        values.push(value.to_owned());
                    }
                }
            }
        }

        let name = name.ok_or(EngineError::UnnamedTheme)?;
        Ok(Self {
            name,
            css: css.to_owned(),
            meta,
        })
    }

    /// The theme's `@theme` name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full stylesheet the theme was registered with.
    pub fn css(&self) -> &str {
        &self.css
    }

    /// All metadata parsed from the stylesheet.
    pub fn meta(&self) -> &BTreeMap<String, MetaValue> {
        &self.meta
    }

    /// Look up a single-valued metadata key.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key)?.as_str()
    }

    /// Look up a repeatable metadata key.
    pub fn meta_array(&self, key: &str) -> Option<&[String]> {
        self.meta.get(key)?.as_array()
    }
}

/// Indexes themes by name and resolves lookups with a default fallback.
#[derive(Clone, Debug, Default)]
pub struct ThemeRegistry {
    themes: BTreeMap<String, Theme>,
    default: Option<String>,
    meta_schema: BTreeMap<String, MetaKind>,
}

impl ThemeRegistry {
    /// Declare the metadata keys themes may carry and how each is parsed.
    ///
    /// Applies to themes added afterwards; themes already registered keep
    /// the metadata parsed under the previous schema.
    pub fn set_meta_schema(&mut self, schema: &[(&str, MetaKind)]) {
        self.meta_schema = schema
            .iter()
            .map(|(key, kind)| ((*key).to_owned(), *kind))
            .collect();
    }

    /// Register a theme stylesheet and return its name.
    pub fn add(&mut self, css: &str) -> Result<String, EngineError> {
        let theme = Theme::parse(css, &self.meta_schema)?;
        let name = theme.name().to_owned();
        if self.themes.contains_key(&name) {
            return Err(EngineError::DuplicateTheme(name));
        }
        tracing::debug!(theme = %name, "registered theme");
        self.themes.insert(name.clone(), theme);
        Ok(name)
    }

    /// Mark a registered theme as the fallback for unknown lookups.
    pub fn set_default(&mut self, name: &str) -> Result<(), EngineError> {
        if !self.themes.contains_key(name) {
            return Err(EngineError::UnknownTheme(name.to_owned()));
        }
        self.default = Some(name.to_owned());
        Ok(())
    }

    /// The fallback theme, if one was set.
    pub fn default_theme(&self) -> Option<&Theme> {
        self.themes.get(self.default.as_deref()?)
    }

    /// Look up a theme by exact name.
    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.themes.get(name)
    }

    /// Resolve a requested theme name, falling back to the default.
    ///
    /// Returns the theme and whether the fallback was taken instead of the
    /// requested name.
    pub fn resolve(&self, requested: Option<&str>) -> Option<(&Theme, bool)> {
        match requested {
            Some(name) => match self.themes.get(name) {
                Some(theme) => Some((theme, false)),
                None => self.default_theme().map(|theme| (theme, true)),
            },
            None => self.default_theme().map(|theme| (theme, false)),
        }
    }

    /// Names of all registered themes in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    /// Number of registered themes.
    pub fn len(&self) -> usize {
        self.themes.len()
    }

    /// Whether the registry holds no themes.
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}
