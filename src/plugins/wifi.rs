use crate::config::options::{parsers, OptionSchema};
use crate::error::ConfigError;
use crate::plugins::{BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use crate::themes::Palette;
use crate::utils::find_binary;
use crate::utils::template::{self, TemplateValue};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::warn;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio::process::Command;

const STATES: &[&str] = &["default", "completed", "scanning", "disconnected"];

pub struct WifiPlugin {
    info: PluginInfo,
    schema: OptionSchema,
}

impl WifiPlugin {
    pub fn new() -> Self {
        let mut schema = OptionSchema::new("wifi");
        schema.register_option("text", parsers::template_map, false);
        schema.register_option("iface", parsers::text, false);
        schema.register_option("wpa_cli", parsers::executable, false);
        Self {
            info: PluginInfo::new("wifi", "0.1.0", "statusblocks"),
            schema,
        }
    }
}

impl Default for WifiPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for WifiPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        let iface = match ctx.options.text("iface") {
            Some(iface) => iface.to_string(),
            None if ctx.instance == "wifi" => "wlan0".to_string(),
            None => ctx.instance.to_string(),
        };
        let wpa_cli = match ctx.options.path("wpa_cli") {
            Some(path) => path.to_path_buf(),
            None => find_binary("wpa_cli").ok_or_else(|| ctx.error("could not find 'wpa_cli'"))?,
        };

        let mut text = BTreeMap::new();
        text.insert("default".to_string(), format!("{}: {{wpa_state}}", iface));
        text.insert("completed".to_string(), format!("{}: {{ssid}}", iface));
        if let Some(configured) = ctx.options.text_map("text") {
            text.extend(configured.clone());
        }

        Ok(Box::new(WifiSensor {
            key: ctx.key(),
            iface,
            wpa_cli,
            text,
            palette: ctx.palette(STATES),
        }))
    }
}

/// Parse the `key=value` lines printed by `wpa_cli status`.
pub fn parse_status(output: &str) -> (HashMap<String, String>, Vec<&str>) {
    let mut status = HashMap::new();
    let mut rejected = Vec::new();
    for line in output.lines().filter(|line| !line.is_empty()) {
        match line.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                status.insert(key.to_string(), value.to_string());
            }
            _ => rejected.push(line),
        }
    }
    (status, rejected)
}

pub struct WifiSensor {
    key: String,
    iface: String,
    wpa_cli: PathBuf,
    text: BTreeMap<String, String>,
    palette: Palette,
}

impl WifiSensor {
    async fn status(&self) -> Result<HashMap<String, String>> {
        let output = Command::new(&self.wpa_cli)
            .args(["-i", &self.iface, "status"])
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.wpa_cli.display()))?;
        if !output.status.success() {
            bail!("wpa_cli exited with {}", output.status);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (status, rejected) = parse_status(&stdout);
        for line in rejected {
            warn!("[{}] Failed to match line '{}'", self.key, line);
        }
        Ok(status)
    }

    fn render(&self, status: &HashMap<String, String>) -> Result<Reading> {
        let state = status
            .get("wpa_state")
            .map(|s| s.to_lowercase())
            .ok_or_else(|| anyhow!("wpa_cli reported no wpa_state"))?;

        let template = self
            .text
            .get(&state)
            .or_else(|| self.text.get("default"))
            .map(String::as_str)
            .unwrap_or("{wpa_state}");
        let values: Vec<(&str, TemplateValue)> = status
            .iter()
            .map(|(k, v)| (k.as_str(), TemplateValue::from(v.as_str())))
            .collect();

        let color_state = if STATES.contains(&state.as_str()) {
            state.as_str()
        } else {
            "default"
        };
        Ok(Reading::mirrored(template::render(template, &values))
            .with_color(self.palette.get(color_state)))
    }
}

#[async_trait]
impl Sensor for WifiSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        let status = self.status().await?;
        self.render(&status)
    }
}
