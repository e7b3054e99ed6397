//! Typed, schema-validated block options.
//!
//! Every plugin declares the options it understands with
//! [`OptionSchema::register_option`]. At load time the raw JSON map of a
//! block is checked against that schema, producing [`Options`] whose
//! values are already parsed, or a [`ConfigError`] naming the culprit.

use crate::bar::{Align, Markup, MinWidth};
use crate::error::ConfigError;
use chrono::format::{Item, StrftimeItems};
use chrono::Utc;
use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// A color option: one color, or one color per display state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Single(String),
    States(BTreeMap<String, String>),
}

impl ColorSpec {
    pub fn single(&self) -> Option<&str> {
        match self {
            ColorSpec::Single(color) => Some(color),
            ColorSpec::States(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Size(u64),
    Text(String),
    Path(PathBuf),
    Color(ColorSpec),
    TextMap(BTreeMap<String, String>),
    Align(Align),
    MinWidth(MinWidth),
    Markup(Markup),
}

/// Turns a raw JSON value into a typed option or explains why it can't.
pub type OptionParser = fn(&Value) -> Result<OptionValue, String>;

#[derive(Clone, Copy)]
pub struct OptionSpec {
    pub parser: OptionParser,
    pub required: bool,
}

/// Options every block understands, whatever its plugin.
const COMMON_OPTIONS: &[(&str, OptionParser)] = &[
    ("color", parsers::color),
    ("background", parsers::single_color),
    ("border", parsers::single_color),
    ("separator", parsers::boolean),
    ("separator_block_width", parsers::uint),
    ("min_width", parsers::min_width),
    ("align", parsers::align),
    ("markup", parsers::markup),
];

/// The options one plugin accepts.
#[derive(Clone)]
pub struct OptionSchema {
    plugin: String,
    options: BTreeMap<String, OptionSpec>,
}

impl OptionSchema {
    pub fn new(plugin: &str) -> Self {
        let options = COMMON_OPTIONS
            .iter()
            .map(|(name, parser)| {
                (
                    name.to_string(),
                    OptionSpec {
                        parser: *parser,
                        required: false,
                    },
                )
            })
            .collect();
        Self {
            plugin: plugin.to_string(),
            options,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn register_option(&mut self, name: &str, parser: OptionParser, required: bool) {
        debug!("Registering option {} for {}", name, self.plugin);
        if self
            .options
            .insert(name.to_string(), OptionSpec { parser, required })
            .is_some()
            && !COMMON_OPTIONS.iter().any(|(common, _)| *common == name)
        {
            warn!("Overwriting option {} for {}", name, self.plugin);
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.options.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }

    /// Check `raw` against the schema and parse every known option.
    /// Unknown option names are ignored with a warning; `null` counts as
    /// absent.
    pub fn validate(&self, raw: &Map<String, Value>) -> Result<Options, ConfigError> {
        let mut options = Options::default();

        for (name, value) in raw {
            if value.is_null() {
                continue;
            }
            let Some(spec) = self.options.get(name) else {
                warn!("{}: ignoring unknown option '{}'", self.plugin, name);
                continue;
            };
            let parsed = (spec.parser)(value).map_err(|reason| ConfigError::InvalidOption {
                plugin: self.plugin.clone(),
                option: name.clone(),
                reason,
            })?;
            options.insert(name, parsed);
        }

        if let Some(missing) = self.required().find(|name| !options.contains(name)) {
            return Err(ConfigError::MissingOption {
                plugin: self.plugin.clone(),
                option: missing.to_string(),
            });
        }

        Ok(options)
    }
}

/// Validated options of one block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Options(BTreeMap<String, OptionValue>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: OptionValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn with(mut self, name: &str, value: OptionValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            OptionValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            OptionValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            OptionValue::Int(v) => Some(*v),
            OptionValue::Size(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            OptionValue::Float(v) => Some(*v),
            OptionValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn size(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            OptionValue::Size(v) => Some(*v),
            OptionValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn path(&self, name: &str) -> Option<&Path> {
        match self.get(name)? {
            OptionValue::Path(v) => Some(v),
            _ => None,
        }
    }

    pub fn color(&self, name: &str) -> Option<&ColorSpec> {
        match self.get(name)? {
            OptionValue::Color(v) => Some(v),
            _ => None,
        }
    }

    pub fn text_map(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        match self.get(name)? {
            OptionValue::TextMap(v) => Some(v),
            _ => None,
        }
    }

    pub fn align(&self) -> Option<Align> {
        match self.get("align")? {
            OptionValue::Align(v) => Some(*v),
            _ => None,
        }
    }

    pub fn min_width(&self) -> Option<&MinWidth> {
        match self.get("min_width")? {
            OptionValue::MinWidth(v) => Some(v),
            _ => None,
        }
    }

    pub fn markup(&self) -> Option<Markup> {
        match self.get("markup")? {
            OptionValue::Markup(v) => Some(*v),
            _ => None,
        }
    }
}

/// Stock option parsers.
pub mod parsers {
    use super::*;

    pub fn int(value: &Value) -> Result<OptionValue, String> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(OptionValue::Int)
                .ok_or_else(|| format!("expected an integer, got {}", n)),
            Value::String(s) => s
                .trim()
                .parse()
                .map(OptionValue::Int)
                .map_err(|_| format!("expected an integer, got '{}'", s)),
            other => Err(format!("expected an integer, got {}", other)),
        }
    }

    pub fn uint(value: &Value) -> Result<OptionValue, String> {
        match int(value)? {
            OptionValue::Int(v) if v >= 0 => Ok(OptionValue::Int(v)),
            _ => Err(format!("expected a non-negative integer, got {}", value)),
        }
    }

    pub fn float(value: &Value) -> Result<OptionValue, String> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(OptionValue::Float)
                .ok_or_else(|| format!("expected a number, got {}", n)),
            Value::String(s) => s
                .trim()
                .parse()
                .map(OptionValue::Float)
                .map_err(|_| format!("expected a number, got '{}'", s)),
            other => Err(format!("expected a number, got {}", other)),
        }
    }

    /// Booleans, plus `"1"`/`"0"`/`"true"`/`"false"` strings and 0/1.
    pub fn boolean(value: &Value) -> Result<OptionValue, String> {
        match value {
            Value::Bool(b) => Ok(OptionValue::Bool(*b)),
            Value::Number(n) if n.as_u64() == Some(0) => Ok(OptionValue::Bool(false)),
            Value::Number(n) if n.as_u64() == Some(1) => Ok(OptionValue::Bool(true)),
            Value::String(s) => match s.to_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(OptionValue::Bool(true)),
                "0" | "false" | "no" => Ok(OptionValue::Bool(false)),
                _ => Err(format!("expected a boolean, got '{}'", s)),
            },
            other => Err(format!("expected a boolean, got {}", other)),
        }
    }

    pub fn text(value: &Value) -> Result<OptionValue, String> {
        match value {
            Value::String(s) => Ok(OptionValue::Text(s.clone())),
            Value::Number(n) => Ok(OptionValue::Text(n.to_string())),
            other => Err(format!("expected a string, got {}", other)),
        }
    }

    /// A text template with `{name}` placeholders.
    pub fn template(value: &Value) -> Result<OptionValue, String> {
        let parsed = text(value)?;
        if let OptionValue::Text(s) = &parsed {
            crate::utils::template::validate(s)?;
        }
        Ok(parsed)
    }

    /// A strftime format string. Some specifiers parse but cannot be
    /// formatted, so the format is also rendered once.
    pub fn strftime(value: &Value) -> Result<OptionValue, String> {
        let parsed = text(value)?;
        if let OptionValue::Text(s) = &parsed {
            let invalid = || format!("invalid time format '{}'", s);
            if StrftimeItems::new(s).any(|item| matches!(item, Item::Error)) {
                return Err(invalid());
            }
            let mut rendered = String::new();
            write!(rendered, "{}", Utc::now().format(s)).map_err(|_| invalid())?;
        }
        Ok(parsed)
    }

    /// A byte size: a number of bytes or a string like `20GiB`.
    pub fn size(value: &Value) -> Result<OptionValue, String> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .map(OptionValue::Size)
                .ok_or_else(|| format!("expected a size, got {}", n)),
            Value::String(s) => crate::utils::size::parse_size(s).map(OptionValue::Size),
            other => Err(format!("expected a size, got {}", other)),
        }
    }

    /// A path that must exist.
    pub fn existing_path(value: &Value) -> Result<OptionValue, String> {
        let path = PathBuf::from(expect_str(value)?);
        if !path.exists() {
            return Err(format!("{} does not exist", path.display()));
        }
        Ok(OptionValue::Path(path))
    }

    /// A directory; relative paths are resolved against the working directory.
    pub fn directory(value: &Value) -> Result<OptionValue, String> {
        let mut path = PathBuf::from(expect_str(value)?);
        if !path.is_absolute() {
            warn!("{} is not absolute, trying to resolve...", path.display());
            path = std::env::current_dir()
                .map_err(|e| format!("cannot resolve {}: {}", path.display(), e))?
                .join(path);
            debug!("Path resolved to {}", path.display());
        }
        if !path.is_dir() {
            return Err(format!("{} does not exist or is not a directory", path.display()));
        }
        Ok(OptionValue::Path(path))
    }

    /// A path to an executable.
    pub fn executable(value: &Value) -> Result<OptionValue, String> {
        let path = PathBuf::from(expect_str(value)?);
        if !crate::utils::is_executable(&path) {
            return Err(format!("{} is not an executable file", path.display()));
        }
        Ok(OptionValue::Path(path))
    }

    /// A single color: `"#rrggbb"`, `"#rrggbbaa"` or `{"r": .., "g": .., "b": ..}`.
    pub fn single_color(value: &Value) -> Result<OptionValue, String> {
        parse_single_color(value).map(|c| OptionValue::Color(ColorSpec::Single(c)))
    }

    /// A single color, or an object mapping display states to colors.
    pub fn color(value: &Value) -> Result<OptionValue, String> {
        if let Ok(single) = parse_single_color(value) {
            return Ok(OptionValue::Color(ColorSpec::Single(single)));
        }
        let Value::Object(map) = value else {
            return Err(format!("expected a color, got {}", value));
        };
        let mut states = BTreeMap::new();
        for (state, color) in map {
            let color = parse_single_color(color).map_err(|e| format!("state '{}': {}", state, e))?;
            states.insert(state.clone(), color);
        }
        Ok(OptionValue::Color(ColorSpec::States(states)))
    }

    /// An object mapping names to text templates.
    pub fn template_map(value: &Value) -> Result<OptionValue, String> {
        let Value::Object(map) = value else {
            return Err(format!("expected an object of templates, got {}", value));
        };
        let mut templates = BTreeMap::new();
        for (key, v) in map {
            let s = expect_str(v)?;
            crate::utils::template::validate(s)?;
            templates.insert(key.to_lowercase(), s.to_string());
        }
        Ok(OptionValue::TextMap(templates))
    }

    pub fn align(value: &Value) -> Result<OptionValue, String> {
        serde_json::from_value(value.clone())
            .map(OptionValue::Align)
            .map_err(|_| format!("expected left, center or right, got {}", value))
    }

    pub fn min_width(value: &Value) -> Result<OptionValue, String> {
        serde_json::from_value(value.clone())
            .map(OptionValue::MinWidth)
            .map_err(|_| format!("expected a pixel count or sample text, got {}", value))
    }

    pub fn markup(value: &Value) -> Result<OptionValue, String> {
        serde_json::from_value(value.clone())
            .map(OptionValue::Markup)
            .map_err(|_| format!("expected pango or none, got {}", value))
    }

    fn expect_str(value: &Value) -> Result<&str, String> {
        value
            .as_str()
            .ok_or_else(|| format!("expected a string, got {}", value))
    }

    fn parse_single_color(value: &Value) -> Result<String, String> {
        match value {
            Value::String(s) => {
                let hex = s.strip_prefix('#').ok_or_else(|| format!("'{}' is not a #rrggbb color", s))?;
                if (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    Ok(s.to_lowercase())
                } else {
                    Err(format!("'{}' is not a #rrggbb color", s))
                }
            }
            Value::Object(map) => {
                let channel = |name: &str| {
                    map.get(name)
                        .and_then(Value::as_u64)
                        .filter(|v| *v <= 255)
                        .ok_or_else(|| format!("color channel '{}' must be 0-255", name))
                };
                Ok(format!("#{:02x}{:02x}{:02x}", channel("r")?, channel("g")?, channel("b")?))
            }
            other => Err(format!("expected a color, got {}", other)),
        }
    }
}
