//! State color palettes.
//!
//! Threshold-driven plugins pick a color per state (`ok`, `warn`, `err`,
//! ...). The theme supplies the defaults; a block's `color` option can
//! override single states or all of them at once.

use crate::config::options::ColorSpec;
use log::warn;
use std::collections::HashMap;

pub const FALLBACK_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: String,
    pub colors: HashMap<String, String>,
}

impl Theme {
    pub fn get_color(&self, state: &str) -> Option<&str> {
        self.colors.get(state).map(String::as_str)
    }

    /// Resolve the colors of `states`, applying the block's override.
    pub fn palette(&self, spec: Option<&ColorSpec>, states: &[&str]) -> Palette {
        let mut colors = HashMap::with_capacity(states.len());
        for state in states {
            let color = match spec {
                Some(ColorSpec::Single(color)) => Some(color.clone()),
                Some(ColorSpec::States(map)) => map.get(*state).cloned(),
                None => None,
            }
            .or_else(|| self.get_color(state).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_COLOR.to_string());
            colors.insert(state.to_string(), color);
        }
        Palette { colors }
    }
}

impl Default for Theme {
    fn default() -> Self {
        default_theme()
    }
}

/// Resolved state colors of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: HashMap<String, String>,
}

impl Palette {
    pub fn get(&self, state: &str) -> &str {
        self.colors
            .get(state)
            .map(String::as_str)
            .unwrap_or(FALLBACK_COLOR)
    }
}

pub fn get_theme(name: &str) -> Theme {
    match name {
        "default" => default_theme(),
        "nord" => nord_theme(),
        "gruvbox" => gruvbox_theme(),
        "tokyo-night" => tokyo_night_theme(),
        "rose-pine" => rose_pine_theme(),
        other => {
            warn!("Unknown theme '{}', falling back to default", other);
            default_theme()
        }
    }
}

pub fn theme_names() -> &'static [&'static str] {
    &["default", "nord", "gruvbox", "tokyo-night", "rose-pine"]
}

fn build(name: &str, entries: &[(&str, &str)]) -> Theme {
    Theme {
        name: name.to_string(),
        colors: entries
            .iter()
            .map(|(state, color)| (state.to_string(), color.to_string()))
            .collect(),
    }
}

fn default_theme() -> Theme {
    build(
        "default",
        &[
            ("ok", "#ffffff"),
            ("warn", "#ffff00"),
            ("err", "#ff0000"),
            ("crit", "#ff0000"),
            ("charge", "#00ff00"),
            ("default", "#ffffff"),
            ("completed", "#00ff00"),
            ("scanning", "#ffff00"),
            ("disconnected", "#ff0000"),
        ],
    )
}

fn nord_theme() -> Theme {
    build(
        "nord",
        &[
            ("ok", "#d8dee9"),
            ("warn", "#ebcb8b"),
            ("err", "#bf616a"),
            ("crit", "#bf616a"),
            ("charge", "#a3be8c"),
            ("default", "#d8dee9"),
            ("completed", "#a3be8c"),
            ("scanning", "#ebcb8b"),
            ("disconnected", "#bf616a"),
        ],
    )
}

fn gruvbox_theme() -> Theme {
    build(
        "gruvbox",
        &[
            ("ok", "#ebdbb2"),
            ("warn", "#fabd2f"),
            ("err", "#fb4934"),
            ("crit", "#cc241d"),
            ("charge", "#b8bb26"),
            ("default", "#ebdbb2"),
            ("completed", "#b8bb26"),
            ("scanning", "#fabd2f"),
            ("disconnected", "#fb4934"),
        ],
    )
}

fn tokyo_night_theme() -> Theme {
    build(
        "tokyo-night",
        &[
            ("ok", "#c0caf5"),
            ("warn", "#e0af68"),
            ("err", "#f7768e"),
            ("crit", "#f7768e"),
            ("charge", "#9ece6a"),
            ("default", "#c0caf5"),
            ("completed", "#9ece6a"),
            ("scanning", "#e0af68"),
            ("disconnected", "#f7768e"),
        ],
    )
}

fn rose_pine_theme() -> Theme {
    build(
        "rose-pine",
        &[
            ("ok", "#e0def4"),
            ("warn", "#f6c177"),
            ("err", "#eb6f92"),
            ("crit", "#eb6f92"),
            ("charge", "#9ccfd8"),
            ("default", "#e0def4"),
            ("completed", "#9ccfd8"),
            ("scanning", "#f6c177"),
            ("disconnected", "#eb6f92"),
        ],
    )
}
