use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Horizontal alignment of the text inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Minimal width of a block, either in pixels or as wide as a sample text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MinWidth {
    Pixels(u32),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Markup {
    Pango,
    None,
}

/// One attribute assignment, see [`Block::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    FullText(String),
    ShortText(String),
    Color(String),
    Background(String),
    Border(String),
    MinWidth(MinWidth),
    Align(Align),
    Urgent(bool),
    Separator(bool),
    SeparatorBlockWidth(u32),
    Markup(Markup),
}

/// The mutable display attributes of a block.
///
/// Absent attributes and empty strings are left out of the protocol
/// frame entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlockState {
    #[serde(skip_serializing_if = "is_blank")]
    pub full_text: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub short_text: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub border: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_width: Option<MinWidth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator_block_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<Markup>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

impl BlockState {
    pub fn apply(&mut self, attribute: Attribute) {
        match attribute {
            Attribute::FullText(v) => self.full_text = Some(v),
            Attribute::ShortText(v) => self.short_text = Some(v),
            Attribute::Color(v) => self.color = Some(v),
            Attribute::Background(v) => self.background = Some(v),
            Attribute::Border(v) => self.border = Some(v),
            Attribute::MinWidth(v) => self.min_width = Some(v),
            Attribute::Align(v) => self.align = Some(v),
            Attribute::Urgent(v) => self.urgent = Some(v),
            Attribute::Separator(v) => self.separator = Some(v),
            Attribute::SeparatorBlockWidth(v) => self.separator_block_width = Some(v),
            Attribute::Markup(v) => self.markup = Some(v),
        }
    }
}

/// A single, individually lockable display cell of the status line.
///
/// The identity (`plugin`, `instance`) is fixed at creation; everything
/// else lives behind the block's own lock.
pub struct Block {
    plugin: String,
    instance: String,
    state: Mutex<BlockState>,
}

impl Block {
    pub fn new(plugin: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            instance: instance.into(),
            state: Mutex::new(BlockState::default()),
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// The `plugin_instance` key used for de-duplication and log context.
    pub fn key(&self) -> String {
        format!("{}_{}", self.plugin, self.instance)
    }

    /// Acquire the block's lock. The lock is released when the guard drops,
    /// on every exit path. A lock poisoned by a panicking holder is
    /// recovered: attribute writes are plain assignments, so the state is
    /// never left half-written.
    pub fn lock(&self) -> BlockGuard<'_> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        BlockGuard { block: self, state }
    }

    /// Set one attribute under the block's lock.
    pub fn set(&self, attribute: Attribute) {
        self.lock().apply(attribute);
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> BlockState {
        self.lock().clone()
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.plugin == other.plugin && self.instance == other.instance
    }
}

impl Eq for Block {}

impl Hash for Block {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.plugin.hash(state);
        self.instance.hash(state);
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Block {}_{}>", self.plugin, self.instance)
    }
}

/// Exclusive access to a block's attributes.
pub struct BlockGuard<'a> {
    block: &'a Block,
    state: MutexGuard<'a, BlockState>,
}

impl BlockGuard<'_> {
    pub fn block(&self) -> &Block {
        self.block
    }
}

impl Deref for BlockGuard<'_> {
    type Target = BlockState;

    fn deref(&self) -> &BlockState {
        &self.state
    }
}

impl DerefMut for BlockGuard<'_> {
    fn deref_mut(&mut self) -> &mut BlockState {
        &mut self.state
    }
}

/// Serialized form of a locked block: identity plus non-empty attributes.
impl Serialize for BlockGuard<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Frame<'a> {
            name: &'a str,
            instance: &'a str,
            #[serde(flatten)]
            state: &'a BlockState,
        }

        Frame {
            name: &self.block.plugin,
            instance: &self.block.instance,
            state: &self.state,
        }
        .serialize(serializer)
    }
}
