//! Plugin table and the Block/Worker pairs built from it.

use crate::bar::{Attribute, Block, Statusline};
use crate::config::options::{OptionSchema, Options};
use crate::error::{ConfigError, PluginError};
use crate::plugins::{self, external, BoxedPlugin, ExternalPlugin, InstanceContext, Plugin};
use crate::themes::Theme;
use crate::worker::Worker;
use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct Registry {
    plugins: HashMap<String, BoxedPlugin>,
    instances: HashMap<String, Worker>,
    theme: Theme,
    fetch_timeout: Option<Duration>,
}

impl Registry {
    pub fn new(theme: Theme) -> Self {
        Self {
            plugins: HashMap::new(),
            instances: HashMap::new(),
            theme,
            fetch_timeout: None,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Add a plugin under its lowercased name.
    pub fn register(&mut self, plugin: BoxedPlugin) -> Result<(), PluginError> {
        let name = plugin.name().to_lowercase();
        if self.plugins.contains_key(&name) {
            return Err(PluginError::Duplicate(name));
        }
        debug!(
            "Registered plugin {} {} by {}",
            name,
            plugin.info().version,
            plugin.info().author
        );
        self.plugins.insert(name, plugin);
        Ok(())
    }

    /// Register the built-in plugins, then every loadable executable in
    /// `dir`. External plugins that fail to load are logged and skipped.
    pub async fn load_plugins(&mut self, dir: Option<&Path>) {
        for plugin in plugins::builtin() {
            if let Err(e) = self.register(plugin) {
                warn!("{}", e);
            }
        }

        let Some(dir) = dir else {
            return;
        };
        if !dir.is_dir() {
            debug!("Plugin directory {} does not exist", dir.display());
            return;
        }

        for path in external::discover(dir) {
            match ExternalPlugin::load(&path).await {
                Ok(plugin) => {
                    if let Err(e) = self.register(Box::new(plugin)) {
                        warn!("Skipping {}: {}", path.display(), e);
                    }
                }
                Err(e) => warn!("Skipping external plugin: {}", e),
            }
        }
    }

    pub fn plugin(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.get(&name.to_lowercase()).map(|p| p.as_ref())
    }

    /// Loaded plugins sorted by name.
    pub fn plugins(&self) -> Vec<&dyn Plugin> {
        let mut list: Vec<&dyn Plugin> = self.plugins.values().map(|p| p.as_ref()).collect();
        list.sort_by(|a, b| a.name().cmp(b.name()));
        list
    }

    pub fn schema(&self, plugin: &str) -> Option<&OptionSchema> {
        self.plugin(plugin).map(|p| p.schema())
    }

    /// Create a block for `plugin`/`instance` in `statusline` and start the
    /// worker feeding it.
    ///
    /// An unknown plugin is not an error: nothing is created and `None` is
    /// returned. Sensor construction failures are configuration errors.
    pub fn instantiate<W: Write + Send>(
        &mut self,
        statusline: &Statusline<W>,
        plugin: &str,
        instance: &str,
        interval: Duration,
        options: &Options,
    ) -> Result<Option<Arc<Block>>, ConfigError> {
        let Some(factory) = self.plugins.get(&plugin.to_lowercase()) else {
            debug!("No plugin named {}, skipping {}", plugin, instance);
            return Ok(None);
        };
        let name = factory.name().to_string();

        if instance.is_empty() {
            return Err(ConfigError::plugin(&name, instance, "instance name is empty"));
        }
        if interval.is_zero() {
            return Err(ConfigError::InvalidInterval {
                block: format!("{}_{}", name, instance),
                interval: 0,
            });
        }
        // Plugin names are case-insensitive, and so are instance keys.
        let key = format!("{}_{}", name, instance).to_lowercase();
        if self.instances.contains_key(&key) {
            warn!("Duplicate block {}, skipping", key);
            return Ok(None);
        }

        let ctx = InstanceContext {
            plugin: &name,
            instance,
            options,
            theme: &self.theme,
        };
        let sensor = factory.instantiate(&ctx)?;

        let block = statusline.new_block(&name, instance);
        apply_common_options(&block, options);

        let worker = Worker::builder()
            .block(Arc::clone(&block))
            .sensor(sensor)
            .interval(interval)
            .fetch_timeout(self.fetch_timeout)
            .spawn()
            .map_err(|e| ConfigError::plugin(&name, instance, e.to_string()))?;

        info!(
            "Loaded {} [{} - {}]",
            key,
            factory.info().version,
            factory.info().author
        );
        self.instances.insert(key, worker);
        Ok(Some(block))
    }

    pub fn instance(&self, key: &str) -> Option<&Worker> {
        self.instances.get(&key.to_lowercase())
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Stop every worker: first signal all of them, then wait for all of
    /// them, so shutdown takes as long as the slowest worker.
    pub async fn stop_all(&mut self) {
        for worker in self.instances.values() {
            worker.request_stop();
        }
        join_all(self.instances.values_mut().map(|worker| worker.join())).await;
        debug!("Stopped {} workers", self.instances.len());
    }
}

/// Copy the protocol-visible options onto a fresh block in one locked step.
fn apply_common_options(block: &Block, options: &Options) {
    let mut attributes = Vec::new();
    if let Some(color) = options.color("color").and_then(|c| c.single()) {
        attributes.push(Attribute::Color(color.to_string()));
    }
    if let Some(color) = options.color("background").and_then(|c| c.single()) {
        attributes.push(Attribute::Background(color.to_string()));
    }
    if let Some(color) = options.color("border").and_then(|c| c.single()) {
        attributes.push(Attribute::Border(color.to_string()));
    }
    if let Some(separator) = options.bool("separator") {
        attributes.push(Attribute::Separator(separator));
    }
    if let Some(width) = options
        .int("separator_block_width")
        .and_then(|w| u32::try_from(w).ok())
    {
        attributes.push(Attribute::SeparatorBlockWidth(width));
    }
    if let Some(min_width) = options.min_width() {
        attributes.push(Attribute::MinWidth(min_width.clone()));
    }
    if let Some(align) = options.align() {
        attributes.push(Attribute::Align(align));
    }
    if let Some(markup) = options.markup() {
        attributes.push(Attribute::Markup(markup));
    }

    let mut state = block.lock();
    for attribute in attributes {
        state.apply(attribute);
    }
}
