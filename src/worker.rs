//! Periodic block updaters.
//!
//! A [`Worker`] owns one [`Sensor`] and the [`Block`] it feeds. It runs as
//! its own tokio task: fetch, apply the reading under the block lock, sleep,
//! repeat. The block lock is never held while fetching.

use crate::bar::Block;
use crate::error::WorkerError;
use crate::plugins::{BoxedSensor, Reading, Sensor};
use anyhow::{anyhow, Result};
use log::{debug, error, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct WorkerBuilder {
    block: Option<Arc<Block>>,
    sensor: Option<BoxedSensor>,
    interval: Duration,
    fetch_timeout: Option<Duration>,
}

impl WorkerBuilder {
    pub fn block(mut self, block: Arc<Block>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn sensor(mut self, sensor: BoxedSensor) -> Self {
        self.sensor = Some(sensor);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Worker, WorkerError> {
        let block = self.block.ok_or(WorkerError::MissingBlock)?;
        if block.instance().is_empty() {
            return Err(WorkerError::Unnamed(block.plugin().to_string()));
        }
        let key = block.key();
        let sensor = self
            .sensor
            .ok_or_else(|| WorkerError::MissingSensor(key.clone()))?;
        if self.interval.is_zero() {
            return Err(WorkerError::ZeroInterval(key));
        }

        Ok(Worker {
            key,
            block,
            interval: self.interval,
            fetch_timeout: self.fetch_timeout,
            cancel: CancellationToken::new(),
            sensor: Some(sensor),
            task: None,
        })
    }

    /// Build and start in one go. Must be called within a tokio runtime.
    pub fn spawn(self) -> Result<Worker, WorkerError> {
        let mut worker = self.build()?;
        worker.start();
        Ok(worker)
    }
}

pub struct Worker {
    key: String,
    block: Arc<Block>,
    interval: Duration,
    fetch_timeout: Option<Duration>,
    cancel: CancellationToken,
    sensor: Option<BoxedSensor>,
    task: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::default()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn is_stopping(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Spawn the update loop. A worker runs at most once.
    pub fn start(&mut self) {
        let Some(sensor) = self.sensor.take() else {
            warn!("[{}] Worker already started", self.key);
            return;
        };
        let cycle = Cycle {
            key: self.key.clone(),
            block: Arc::clone(&self.block),
            interval: self.interval,
            fetch_timeout: self.fetch_timeout,
            cancel: self.cancel.clone(),
        };
        self.task = Some(tokio::spawn(cycle.run(sensor)));
    }

    /// Ask the loop to exit after its current fetch. Does not wait.
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the loop to exit.
    pub async fn join(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        match task.await {
            Ok(()) => debug!("[{}] Worker stopped", self.key),
            Err(e) if e.is_panic() => error!("[{}] Worker panicked", self.key),
            Err(e) => warn!("[{}] Worker did not finish cleanly: {}", self.key, e),
        }
    }

    pub async fn stop(&mut self, join: bool) {
        self.request_stop();
        if join {
            self.join().await;
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Cycle {
    key: String,
    block: Arc<Block>,
    interval: Duration,
    fetch_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Cycle {
    async fn run(self, mut sensor: BoxedSensor) {
        debug!("[{}] Worker started, interval {:?}", self.key, self.interval);
        while !self.cancel.is_cancelled() {
            match self.fetch(sensor.as_mut()).await {
                Ok(reading) => {
                    let mut state = self.block.lock();
                    reading.apply(&mut state);
                }
                Err(e) => warn!("[{}] Update failed: {:#}", self.key, e),
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    async fn fetch(&self, sensor: &mut dyn Sensor) -> Result<Reading> {
        match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, sensor.fetch())
                .await
                .map_err(|_| anyhow!("fetch timed out after {:?}", limit))?,
            None => sensor.fetch().await,
        }
    }
}
