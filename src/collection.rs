//! Multi-device collection
//!
//! [`CollectionOrchestrator`] owns one [`DeviceScraper`] per configured UPS and
//! produces one batch of snapshots per call to [`CollectionOrchestrator::collect`].
//!
//! # Modes
//!
//! - **Sequential**: devices are scraped one after another in configuration
//!   order. A device that fails hard yields a missing entry and collection
//!   moves on to the next device.
//! - **Concurrent**: one task per device, all running at once. The whole batch
//!   shares a single deadline of login timeout + 1 second; if any device is
//!   still running when it passes, the batch collapses into one missing entry.
//!   Results arrive in completion order.
//!
//! Each scraper sits behind its own mutex, so a session is never used by two
//! tasks at the same time.

use crate::config::{DeviceMap, ExporterConfig};
use crate::error::Result;
use crate::ups::types::DeviceSnapshot;
use crate::ups::{Credentials, DeviceScraper};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// One entry of a batch; `None` marks a device (or a whole timed-out batch)
/// that produced no snapshot.
pub type BatchEntry = Option<DeviceSnapshot>;

pub struct CollectionOrchestrator {
    scrapers: Vec<Arc<Mutex<DeviceScraper>>>,
    threading: bool,
    login_timeout: Duration,
}

impl CollectionOrchestrator {
    /// Build one scraper per entry of `devices`, each with its own session.
    pub fn new(devices: DeviceMap, config: &ExporterConfig) -> Result<Self> {
        let scrapers = devices
            .into_iter()
            .map(|(name, device)| {
                DeviceScraper::new(
                    device.address,
                    Credentials::new(device.user, device.password),
                    Some(name),
                    config,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_scrapers(scrapers, config))
    }

    /// Build from a JSON device map on disk.
    pub fn from_json_file(path: impl AsRef<Path>, config: &ExporterConfig) -> Result<Self> {
        Self::new(DeviceMap::from_json_file(path)?, config)
    }

    /// Single device whose name is derived from the device itself unless given.
    pub fn single(
        address: impl Into<String>,
        credentials: Credentials,
        name: Option<String>,
        config: &ExporterConfig,
    ) -> Result<Self> {
        let scraper = DeviceScraper::new(address, credentials, name, config)?;
        Ok(Self::from_scrapers(vec![scraper], config))
    }

    pub fn from_scrapers(scrapers: Vec<DeviceScraper>, config: &ExporterConfig) -> Self {
        Self {
            scrapers: scrapers
                .into_iter()
                .map(|scraper| Arc::new(Mutex::new(scraper)))
                .collect(),
            threading: config.threading,
            login_timeout: Duration::from_secs(config.login_timeout_seconds),
        }
    }

    pub fn len(&self) -> usize {
        self.scrapers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrapers.is_empty()
    }

    pub fn scrapers(&self) -> &[Arc<Mutex<DeviceScraper>>] {
        &self.scrapers
    }

    pub fn is_concurrent(&self) -> bool {
        self.threading
    }

    /// Deadline shared by all devices of a concurrent batch
    pub fn batch_deadline(&self) -> Duration {
        self.login_timeout + Duration::from_secs(1)
    }

    /// Collect one batch of snapshots.
    pub async fn collect(&self) -> Vec<BatchEntry> {
        if self.threading {
            self.collect_concurrent().await
        } else {
            self.collect_sequential().await
        }
    }

    async fn collect_sequential(&self) -> Vec<BatchEntry> {
        let mut batch = Vec::with_capacity(self.scrapers.len());
        for scraper in &self.scrapers {
            let mut scraper = scraper.lock().await;
            let result = scraper.get_data().await;
            batch.push(isolate(scraper.ups_id(), result));
        }
        batch
    }

    async fn collect_concurrent(&self) -> Vec<BatchEntry> {
        // One task per device, so the pool never outgrows the device count
        let mut tasks = JoinSet::new();
        for scraper in &self.scrapers {
            let scraper = Arc::clone(scraper);
            tasks.spawn(async move {
                let mut scraper = scraper.lock().await;
                let result = scraper.get_data().await;
                isolate(scraper.ups_id(), result)
            });
        }

        let deadline = self.batch_deadline();
        let drained = tokio::time::timeout(deadline, async {
            let mut batch = Vec::with_capacity(tasks.len());
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(entry) => batch.push(entry),
                    Err(e) => {
                        error!("Device task did not complete: {}", e);
                        batch.push(None);
                    }
                }
            }
            batch
        })
        .await;

        match drained {
            Ok(batch) => {
                debug!("Collected {} devices concurrently", batch.len());
                batch
            }
            Err(_) => {
                // Dropping the join set aborts the devices still running
                error!(
                    "Collection timed out after {:?}; discarding the whole batch",
                    deadline
                );
                vec![None]
            }
        }
    }
}

/// Keep a hard failure of one device from affecting the rest of the batch.
fn isolate(ups_id: &str, result: Result<DeviceSnapshot>) -> BatchEntry {
    match result {
        Ok(snapshot) => {
            info!("Collected snapshot of {}", ups_id);
            Some(snapshot)
        }
        Err(e) => {
            error!("Failed to collect {}: {}", ups_id, e);
            None
        }
    }
}
