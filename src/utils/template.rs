//! Tiny placeholder templates for block text.
//!
//! `{name}` is replaced by the named value, `{name:.2}` additionally fixes
//! the number of decimals, and `{}` stands for the first (primary) value.
//! Unknown names are left in the output verbatim.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Largest accepted `{name:.N}` precision.
pub const MAX_PRECISION: usize = 20;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)?(?::\.(\d+))?\}").expect("placeholder pattern is valid")
});

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl TemplateValue {
    fn render(&self, precision: Option<usize>) -> String {
        match (self, precision) {
            (TemplateValue::Float(v), Some(p)) => format!("{:.*}", p, v),
            (TemplateValue::Float(v), None) => v.to_string(),
            (TemplateValue::Int(v), Some(p)) if p > 0 => format!("{:.*}", p, *v as f64),
            (TemplateValue::Int(v), _) => v.to_string(),
            (TemplateValue::Text(v), _) => v.clone(),
        }
    }
}

impl From<f64> for TemplateValue {
    fn from(v: f64) -> Self {
        TemplateValue::Float(v)
    }
}

impl From<i64> for TemplateValue {
    fn from(v: i64) -> Self {
        TemplateValue::Int(v)
    }
}

impl From<u64> for TemplateValue {
    fn from(v: u64) -> Self {
        TemplateValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<String> for TemplateValue {
    fn from(v: String) -> Self {
        TemplateValue::Text(v)
    }
}

impl From<&str> for TemplateValue {
    fn from(v: &str) -> Self {
        TemplateValue::Text(v.to_string())
    }
}

/// Substitute `values` into `template`.
pub fn render(template: &str, values: &[(&str, TemplateValue)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let precision = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .map(|p| p.min(MAX_PRECISION));
            let value = match caps.get(1) {
                Some(name) => values.iter().find(|(k, _)| *k == name.as_str()),
                None => values.first(),
            };
            match value {
                Some((_, v)) => v.render(precision),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Check that every brace in `template` belongs to a placeholder and that
/// no precision exceeds [`MAX_PRECISION`].
pub fn validate(template: &str) -> Result<(), String> {
    for caps in PLACEHOLDER.captures_iter(template) {
        if let Some(digits) = caps.get(2) {
            match digits.as_str().parse::<usize>() {
                Ok(p) if p <= MAX_PRECISION => {}
                _ => {
                    return Err(format!(
                        "precision {} in '{}' exceeds {}",
                        digits.as_str(),
                        template,
                        MAX_PRECISION
                    ))
                }
            }
        }
    }
    let stripped = PLACEHOLDER.replace_all(template, "");
    if stripped.contains('{') || stripped.contains('}') {
        return Err(format!("unbalanced or malformed placeholder in '{}'", template));
    }
    Ok(())
}
