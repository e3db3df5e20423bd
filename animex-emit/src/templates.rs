//! Output templates and the per-document template cache

use crate::stringify::stringify_simple;
use crate::{Error, Result};
use animex_core::frame::format_number;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Placeholder standing for the mode dependent class extension helper
pub const EXTEND_TOKEN: &str = "extend";

/// Lookup of raw template text by name and version
pub trait TemplateSource {
    /// Returns the template text, or `Error::TemplateMissing`
    fn get(&self, name: &str, version: u32) -> Result<String>;
}

/// Templates stored as `<root>/<version>.0/<name>.txt`
#[derive(Debug, Clone)]
pub struct DirTemplates {
    root: PathBuf,
}

impl DirTemplates {
    /// Creates a source reading from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path a template is read from
    pub fn path(&self, name: &str, version: u32) -> PathBuf {
        self.root
            .join(format!("{}.0", version))
            .join(format!("{}.txt", name))
    }
}

impl TemplateSource for DirTemplates {
    fn get(&self, name: &str, version: u32) -> Result<String> {
        match fs::read_to_string(self.path(name, version)) {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(Error::TemplateMissing {
                name: name.to_string(),
                version,
            }),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory templates
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    templates: HashMap<(String, u32), String>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a template
    pub fn insert(&mut self, name: impl Into<String>, version: u32, text: impl Into<String>) {
        self.templates.insert((name.into(), version), text.into());
    }

    /// Builder-style [`MemoryTemplates::insert`]
    pub fn with(mut self, name: impl Into<String>, version: u32, text: impl Into<String>) -> Self {
        self.insert(name, version, text);
        self
    }
}

impl TemplateSource for MemoryTemplates {
    fn get(&self, name: &str, version: u32) -> Result<String> {
        self.templates
            .get(&(name.to_string(), version))
            .cloned()
            .ok_or_else(|| Error::TemplateMissing {
                name: name.to_string(),
                version,
            })
    }
}

/// Loads each template once per document and fills in its placeholders
pub struct TemplateCache<'a> {
    source: &'a dyn TemplateSource,
    version: u32,
    compress: bool,
    loaded: HashMap<String, String>,
}

impl<'a> TemplateCache<'a> {
    /// Creates an empty cache for one conversion
    pub fn new(source: &'a dyn TemplateSource, version: u32, compress: bool) -> Self {
        Self {
            source,
            version,
            compress,
            loaded: HashMap::new(),
        }
    }

    /// Gets the raw template text, loading it on first use
    pub fn load(&mut self, name: &str) -> Result<&str> {
        if !self.loaded.contains_key(name) {
            let text = self.source.get(name, self.version)?;
            debug!("Loaded template '{}' v{}", name, self.version);
            self.loaded.insert(name.to_string(), text);
        }
        self.loaded
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::TemplateMissing {
                name: name.to_string(),
                version: self.version,
            })
    }

    /// Number of distinct templates loaded so far
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    /// True if nothing has been loaded yet
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Renders a template, replacing every `${key}` with its value
    pub fn render(&mut self, name: &str, values: &[(&str, Value)]) -> Result<String> {
        let extend = if self.compress { "e" } else { "extend" };
        let text = self.load(name)?;
        Ok(substitute(text, |key| {
            if key == EXTEND_TOKEN {
                return Some(extend.to_string());
            }
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| placeholder_text(value))
        }))
    }
}

/// Strings are inserted raw, everything else in compact structural form
fn placeholder_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        other => stringify_simple(other),
    }
}

/// Single pass `${key}` replacement; unknown keys are left as written
fn substitute(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match lookup(key) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[start..start + 3 + end]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
