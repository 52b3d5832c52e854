//! The stream facade: a lightweight handle around one stream's UUID that
//! caches the metadata worth caching and never caches the rest.
//!
//! Cheap fields (`collection`, `tags`, whether the stream exists at all) are
//! fetched once and reused. `annotations` always goes back to the cluster
//! since annotations are meant to be read fresh; `cachedAnnotations` is the
//! escape hatch for callers who are fine with a stale copy. `version` is
//! never cached — it's the whole point of calling it.

use std::collections::HashMap;
use std::sync::Weak;

use parking_lot::Mutex;
use wire::{ChangedRange, RawPoint, StatisticalPoint, Status};

use crate::client::{Client, ClientInner};

#[derive(Default)]
struct MetadataCache {
    fetched: bool,
    exists: bool,
    collection: String,
    tags: HashMap<String, String>,
    annotations: HashMap<String, String>,
    annotations_version: u64,
}

/// Handle to one stream, identified by UUID. Holds a weak reference back to
/// the `Client` it came from so a `Stream` outliving its `Client` fails
/// calls with `Status::ClientGone` instead of keeping the client alive.
pub struct Stream {
    uuid: [u8; 16],
    client: Weak<ClientInner>,
    cache: Mutex<MetadataCache>,
}

impl Stream {
    pub(crate) fn new(client: Client, uuid: [u8; 16]) -> Self {
        Self {
            uuid,
            client: Client::downgrade(&client),
            cache: Mutex::new(MetadataCache::default()),
        }
    }

    pub fn uuid(&self) -> [u8; 16] {
        self.uuid
    }

    fn client(&self) -> Result<Client, Status> {
        self.client
            .upgrade()
            .map(|inner| Client { inner })
            .ok_or(Status::ClientGone)
    }

    async fn refresh_metadata(&self) -> Result<(), Status> {
        let client = self.client()?;
        match client.stream_info(self.uuid, true, false).await {
            Ok(response) => {
                let mut cache = self.cache.lock();
                cache.fetched = true;
                cache.exists = true;
                if let Some(descriptor) = response.descriptor {
                    cache.collection = descriptor.collection;
                    cache.tags = descriptor.tags;
                    cache.annotations = descriptor.annotations;
                    cache.annotations_version = descriptor.annotationversion;
                }
                Ok(())
            }
            Err(status) if status.is_no_such_stream() => {
                *self.cache.lock() = MetadataCache {
                    fetched: true,
                    exists: false,
                    ..MetadataCache::default()
                };
                Ok(())
            }
            Err(status) => Err(status),
        }
    }

    pub async fn exists(&self) -> Result<bool, Status> {
        if self.cache.lock().fetched {
            return Ok(self.cache.lock().exists);
        }
        self.refresh_metadata().await?;
        Ok(self.cache.lock().exists)
    }

    pub async fn collection(&self) -> Result<String, Status> {
        if self.cache.lock().fetched {
            return Ok(self.cache.lock().collection.clone());
        }
        self.refresh_metadata().await?;
        Ok(self.cache.lock().collection.clone())
    }

    pub async fn tags(&self) -> Result<HashMap<String, String>, Status> {
        if self.cache.lock().fetched {
            return Ok(self.cache.lock().tags.clone());
        }
        self.refresh_metadata().await?;
        Ok(self.cache.lock().tags.clone())
    }

    /// Annotations, fetched fresh on every call.
    pub async fn annotations(&self) -> Result<HashMap<String, String>, Status> {
        self.refresh_metadata().await?;
        Ok(self.cache.lock().annotations.clone())
    }

    /// Annotations, reusing the cached copy unless none has been fetched yet.
    pub async fn cached_annotations(&self) -> Result<HashMap<String, String>, Status> {
        if self.cache.lock().fetched {
            return Ok(self.cache.lock().annotations.clone());
        }
        self.refresh_metadata().await?;
        Ok(self.cache.lock().annotations.clone())
    }

    pub async fn annotation_version(&self) -> Result<u64, Status> {
        if self.cache.lock().fetched {
            return Ok(self.cache.lock().annotations_version);
        }
        self.refresh_metadata().await?;
        Ok(self.cache.lock().annotations_version)
    }

    /// The current data version, always a fresh round trip.
    pub async fn version(&self) -> Result<u64, Status> {
        let client = self.client()?;
        let response = client.stream_info(self.uuid, false, true).await?;
        Ok(response.versionmajor)
    }

    pub async fn nearest(&self, time: i64, version: u64, backward: bool) -> Result<(RawPoint, u64), Status> {
        self.client()?.nearest(self.uuid, time, version, backward).await
    }

    /// Push-callback surface: `on_batch` runs once per non-terminal batch,
    /// in delivery order. Returns the final version on a clean finish.
    pub async fn raw_values(
        &self,
        start: i64,
        end: i64,
        version: u64,
        mut on_batch: impl FnMut(Vec<RawPoint>, u64),
    ) -> Result<u64, Status> {
        let mut stream = self.client()?.raw_values(self.uuid, start, end, version);
        loop {
            let batch = stream.next_batch().await;
            if batch.finished {
                return if batch.status.is_error() { Err(batch.status) } else { Ok(batch.version) };
            }
            on_batch(batch.values, batch.version);
        }
    }

    /// Blocking-collect surface: drains the whole range into a fresh vector.
    pub async fn raw_values_collect(&self, start: i64, end: i64, version: u64) -> Result<(Vec<RawPoint>, u64), Status> {
        let mut values = Vec::new();
        let last_version = self
            .raw_values(start, end, version, |mut batch, _| values.append(&mut batch))
            .await?;
        Ok((values, last_version))
    }

    /// Sync-collect surface: appends into a caller-owned vector.
    pub async fn raw_values_into(&self, start: i64, end: i64, version: u64, out: &mut Vec<RawPoint>) -> Result<u64, Status> {
        self.raw_values(start, end, version, |mut batch, _| out.append(&mut batch)).await
    }

    pub async fn aligned_windows(
        &self,
        start: i64,
        end: i64,
        pointwidth: u32,
        version: u64,
        mut on_batch: impl FnMut(Vec<StatisticalPoint>, u64),
    ) -> Result<u64, Status> {
        let mut stream = self.client()?.aligned_windows(self.uuid, start, end, pointwidth, version);
        loop {
            let batch = stream.next_batch().await;
            if batch.finished {
                return if batch.status.is_error() { Err(batch.status) } else { Ok(batch.version) };
            }
            on_batch(batch.values, batch.version);
        }
    }

    pub async fn aligned_windows_collect(
        &self,
        start: i64,
        end: i64,
        pointwidth: u32,
        version: u64,
    ) -> Result<(Vec<StatisticalPoint>, u64), Status> {
        let mut values = Vec::new();
        let last_version = self
            .aligned_windows(start, end, pointwidth, version, |mut batch, _| values.append(&mut batch))
            .await?;
        Ok((values, last_version))
    }

    pub async fn aligned_windows_into(
        &self,
        start: i64,
        end: i64,
        pointwidth: u32,
        version: u64,
        out: &mut Vec<StatisticalPoint>,
    ) -> Result<u64, Status> {
        self.aligned_windows(start, end, pointwidth, version, |mut batch, _| out.append(&mut batch))
            .await
    }

    pub async fn windows(
        &self,
        start: i64,
        end: i64,
        width: u64,
        depth: u32,
        version: u64,
        mut on_batch: impl FnMut(Vec<StatisticalPoint>, u64),
    ) -> Result<u64, Status> {
        let mut stream = self.client()?.windows(self.uuid, start, end, width, depth, version);
        loop {
            let batch = stream.next_batch().await;
            if batch.finished {
                return if batch.status.is_error() { Err(batch.status) } else { Ok(batch.version) };
            }
            on_batch(batch.values, batch.version);
        }
    }

    pub async fn windows_collect(
        &self,
        start: i64,
        end: i64,
        width: u64,
        depth: u32,
        version: u64,
    ) -> Result<(Vec<StatisticalPoint>, u64), Status> {
        let mut values = Vec::new();
        let last_version = self
            .windows(start, end, width, depth, version, |mut batch, _| values.append(&mut batch))
            .await?;
        Ok((values, last_version))
    }

    pub async fn changes(
        &self,
        from_generation: u64,
        to_generation: u64,
        resolution: u32,
        mut on_batch: impl FnMut(Vec<ChangedRange>, u64),
    ) -> Result<u64, Status> {
        let mut stream = self.client()?.changes(self.uuid, from_generation, to_generation, resolution);
        loop {
            let batch = stream.next_batch().await;
            if batch.finished {
                return if batch.status.is_error() { Err(batch.status) } else { Ok(batch.version) };
            }
            on_batch(batch.values, batch.version);
        }
    }

    pub async fn changes_collect(
        &self,
        from_generation: u64,
        to_generation: u64,
        resolution: u32,
    ) -> Result<(Vec<ChangedRange>, u64), Status> {
        let mut values = Vec::new();
        let last_version = self
            .changes(from_generation, to_generation, resolution, |mut batch, _| values.append(&mut batch))
            .await?;
        Ok((values, last_version))
    }
}
