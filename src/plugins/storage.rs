//! Shared pieces of the free-space plugins (memory, disk, zfs).

use crate::config::options::{parsers, OptionSchema};
use crate::plugins::{InstanceContext, Reading};
use crate::themes::Palette;
use crate::utils::{format_size, template};

pub const STATES: &[&str] = &["ok", "warn", "err"];

/// Register the options every storage plugin accepts.
pub fn register_options(schema: &mut OptionSchema) {
    schema.register_option("text", parsers::template, false);
    schema.register_option("threshold_warn", parsers::size, false);
    schema.register_option("threshold_err", parsers::size, false);
}

/// Free-space thresholds and display template of one storage block.
#[derive(Debug, Clone, PartialEq)]
pub struct Storage {
    pub text: String,
    pub threshold_warn: u64,
    pub threshold_err: u64,
    palette: Palette,
}

impl Storage {
    pub fn from_context(ctx: &InstanceContext<'_>, warn: u64, err: u64, text: &str) -> Self {
        Self {
            text: ctx.template("text", text),
            threshold_warn: ctx.options.size("threshold_warn").unwrap_or(warn),
            threshold_err: ctx.options.size("threshold_err").unwrap_or(err),
            palette: ctx.palette(STATES),
        }
    }

    pub fn state(&self, avail: u64) -> &'static str {
        if avail <= self.threshold_err {
            "err"
        } else if avail <= self.threshold_warn {
            "warn"
        } else {
            "ok"
        }
    }

    pub fn reading(&self, avail: u64) -> Reading {
        let text = template::render(&self.text, &[("avail", format_size(avail).into())]);
        Reading::mirrored(text).with_color(self.palette.get(self.state(avail)))
    }
}
