#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use statusblocks::config::options::{parsers, OptionSchema};
use statusblocks::error::ConfigError;
use statusblocks::plugins::{BoxedSensor, InstanceContext, Plugin, PluginInfo, Reading, Sensor};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// An in-memory stdout that stays readable while the renderer owns a clone.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A sink whose writes always fail, like a closed pipe.
pub struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }
}

#[derive(Debug)]
pub struct Stream {
    pub header: Value,
    pub frames: Vec<Value>,
    pub closed: bool,
}

/// Split renderer output into header, frames and the closing bracket.
pub fn parse_stream(output: &str) -> Stream {
    let mut iter = serde_json::Deserializer::from_str(output).into_iter::<Value>();
    let header = iter.next().expect("no header").expect("invalid header");
    let mut rest = output[iter.byte_offset()..].trim_start();
    assert!(rest.starts_with('['), "frame array not opened: {:?}", rest);
    rest = &rest[1..];

    let mut frames = Vec::new();
    let mut closed = false;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }
        if let Some(after) = rest.strip_prefix(']') {
            closed = true;
            assert!(after.trim().is_empty(), "output after close: {:?}", after);
            break;
        }
        let mut iter = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
        let frame = iter.next().expect("no frame").expect("invalid frame");
        rest = &rest[iter.byte_offset()..];
        frames.push(frame);
    }

    Stream {
        header,
        frames,
        closed,
    }
}

/// Produces `n`, `n+1`, ... with matching full text, short text and color.
pub struct CountingSensor {
    pub next: Arc<AtomicU64>,
    pub delay: Option<Duration>,
}

impl CountingSensor {
    pub fn new() -> Self {
        Self {
            next: Arc::new(AtomicU64::new(0)),
            delay: None,
        }
    }

    pub fn boxed() -> BoxedSensor {
        Box::new(Self::new())
    }
}

pub fn counting_reading(n: u64) -> Reading {
    Reading::new(format!("tick {}", n))
        .with_short(format!("tick {}", n))
        .with_color(format!("#{:06x}", n % 0x1000000))
}

#[async_trait]
impl Sensor for CountingSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(counting_reading(n))
    }
}

/// Succeeds `successes` times, then fails forever.
pub struct FlakySensor {
    pub successes: u64,
    pub calls: Arc<AtomicU64>,
}

#[async_trait]
impl Sensor for FlakySensor {
    async fn fetch(&mut self) -> Result<Reading> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.successes {
            Ok(Reading::mirrored(format!("ok {}", call)))
        } else {
            bail!("sensor unplugged")
        }
    }
}

pub struct PanickingSensor;

#[async_trait]
impl Sensor for PanickingSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        panic!("sensor exploded");
    }
}

/// Sleeps for `delay` on every fetch.
pub struct SlowSensor {
    pub delay: Duration,
}

#[async_trait]
impl Sensor for SlowSensor {
    async fn fetch(&mut self) -> Result<Reading> {
        tokio::time::sleep(self.delay).await;
        Ok(Reading::mirrored("slow"))
    }
}

/// A plugin building [`CountingSensor`]s, optionally slowed down by a
/// `delay_ms` option.
pub struct CountingPlugin {
    info: PluginInfo,
    schema: OptionSchema,
}

impl CountingPlugin {
    pub fn new(name: &str) -> Self {
        let mut schema = OptionSchema::new(name);
        schema.register_option("delay_ms", parsers::uint, false);
        Self {
            info: PluginInfo::new(name, "9.9.9", "tests"),
            schema,
        }
    }
}

impl Plugin for CountingPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn instantiate(&self, ctx: &InstanceContext<'_>) -> Result<BoxedSensor, ConfigError> {
        let mut sensor = CountingSensor::new();
        sensor.delay = ctx
            .options
            .int("delay_ms")
            .map(|ms| Duration::from_millis(ms as u64));
        Ok(Box::new(sensor))
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn wait_for<F: FnMut() -> bool>(timeout: Duration, mut check: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
