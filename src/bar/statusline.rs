use crate::bar::block::{Block, BlockGuard};
use log::{debug, info, log_enabled, warn, Level};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Protocol header written once when the stream opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_signal: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cont_signal: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_events: Option<bool>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: 1,
            stop_signal: None,
            cont_signal: None,
            click_events: None,
        }
    }
}

/// How frames are laid out on the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Pretty-print with this many spaces of indentation.
    pub indent: Option<usize>,
    /// Precede every frame after the first with a comma.
    pub comma_separated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Open,
    Closed,
}

struct Inner<W> {
    writer: W,
    state: StreamState,
    frames: u64,
    blocks: Vec<Arc<Block>>,
}

/// The snapshot renderer.
///
/// Holds every block of the bar in configuration order. Each call to
/// [`Statusline::sendline`] locks all blocks, writes one complete frame and
/// releases them again.
pub struct Statusline<W: Write + Send> {
    options: RenderOptions,
    inner: Mutex<Inner<W>>,
}

impl<W: Write + Send> Statusline<W> {
    pub fn new(writer: W, options: RenderOptions) -> Self {
        Self {
            options,
            inner: Mutex::new(Inner {
                writer,
                state: StreamState::Idle,
                frames: 0,
                blocks: Vec::new(),
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner<W>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn state(&self) -> StreamState {
        self.inner().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == StreamState::Open
    }

    /// Number of blocks on the bar.
    pub fn len(&self) -> usize {
        self.inner().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shared handles to every block, in display order.
    pub fn blocks(&self) -> Vec<Arc<Block>> {
        self.inner().blocks.clone()
    }

    /// Append a new block to the bar.
    pub fn new_block(&self, plugin: &str, instance: &str) -> Arc<Block> {
        debug!("Creating new block for {}:{}", plugin, instance);
        let block = Arc::new(Block::new(plugin, instance));
        self.inner().blocks.push(Arc::clone(&block));
        block
    }

    /// Write the protocol header and open the endless frame array.
    pub fn start(&self, header: &Header) -> io::Result<()> {
        let mut inner = self.inner();
        match inner.state {
            StreamState::Open => {
                warn!("Status stream already started");
                return Ok(());
            }
            StreamState::Closed => {
                warn!("Status stream already closed, refusing to restart");
                return Ok(());
            }
            StreamState::Idle => {}
        }

        info!("Starting status stream");
        let mut buf = self.encode(header)?;
        debug!("Sending protocol header {}", String::from_utf8_lossy(&buf));
        buf.push(b'[');
        inner.writer.write_all(&buf)?;
        inner.writer.flush()?;
        inner.state = StreamState::Open;
        Ok(())
    }

    /// Close the frame array. The stream cannot be reopened afterwards.
    pub fn stop(&self) -> io::Result<()> {
        let mut inner = self.inner();
        if inner.state != StreamState::Open {
            warn!("Status stream is not running");
            return Ok(());
        }

        info!("Stopping status stream");
        inner.state = StreamState::Closed;
        inner.writer.write_all(b"]")?;
        inner.writer.flush()
    }

    /// Emit one snapshot of all blocks. Does nothing unless the stream is open.
    pub fn sendline(&self) -> io::Result<()> {
        let mut inner = self.inner();
        if inner.state != StreamState::Open {
            return Ok(());
        }

        let Inner {
            writer,
            blocks,
            frames,
            ..
        } = &mut *inner;

        // Lock every block in display order. The guards release their
        // locks when dropped, whether or not the write below succeeds.
        let guards: Vec<BlockGuard<'_>> = blocks.iter().map(|b| b.lock()).collect();

        let mut buf = Vec::with_capacity(128 * guards.len().max(1));
        if self.options.comma_separated && *frames > 0 {
            buf.push(b',');
        }
        self.encode_into(&mut buf, &guards)?;

        if log_enabled!(Level::Debug) {
            debug!("Sending status line {}", String::from_utf8_lossy(&buf));
        }

        writer.write_all(&buf)?;
        writer.flush()?;
        *frames += 1;
        Ok(())
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf, value)?;
        Ok(buf)
    }

    fn encode_into<T: Serialize + ?Sized>(&self, buf: &mut Vec<u8>, value: &T) -> io::Result<()> {
        match self.options.indent {
            Some(width) => {
                let indent = vec![b' '; width];
                let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
                let mut ser = serde_json::Serializer::with_formatter(&mut *buf, formatter);
                value.serialize(&mut ser)?;
            }
            None => serde_json::to_writer(&mut *buf, value)?,
        }
        Ok(())
    }

    /// Consume the renderer and hand back the output sink.
    pub fn into_writer(self) -> W {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .writer
    }
}
