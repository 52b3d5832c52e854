//! The dispatcher: resolves a UUID (or "any" member) to a live connection,
//! issues the call, and reacts to the result. Every unary RPC follows the
//! same `resolve; call; retry-on-wrong-endpoint` shape; every streaming RPC
//! follows the same shape but re-issues the whole stream on a mid-stream
//! redirect instead of a single call.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use cluster::{EndpointCache, NodeIdentity, RoutingMap, Transport};
use parking_lot::RwLock;
use rand::Rng;
use wire::{proto, ChangedRange, RawPoint, StatisticalPoint, Status};

use crate::config::ClientConfig;
use crate::endpoint::GrpcEndpoint;
use crate::stream::Stream;
use crate::streaming::{Batch, StreamPump};

const LIST_COLLECTIONS_PAGE_SIZE: u64 = 10;
const LIST_COLLECTIONS_ASYNC_PAGE_SIZE: u64 = 2;

/// Either a specific stream's owning member, or "whichever member answers" —
/// the same lookup path a random cold-start UUID takes.
#[derive(Clone, Copy)]
enum Target {
    Uuid([u8; 16]),
    Any,
}

pub(crate) struct ClientInner {
    config: ClientConfig,
    routing: RwLock<Arc<RoutingMap>>,
    cache: EndpointCache<GrpcEndpoint>,
}

impl ClientInner {
    async fn resolve(&self, target: Target) -> Result<(NodeIdentity, Arc<GrpcEndpoint>), Status> {
        match target {
            Target::Uuid(uuid) => {
                let routing = self.routing.read().clone();
                let member = routing.endpoint_for(&uuid).ok_or_else(Status::cluster_degraded)?;
                let (identity, addresses) = (member.identity, member.addresses.clone());
                let endpoint = self.cache.get_or_connect(identity, &addresses).await?;
                Ok((identity, endpoint))
            }
            Target::Any => {
                if let Some(found) = self.cache.any() {
                    return Ok(found);
                }
                let mut uuid = [0u8; 16];
                rand::rng().fill(&mut uuid);
                Box::pin(self.resolve(Target::Uuid(uuid))).await
            }
        }
    }
}

type UnaryCall<'a, R> = Pin<Box<dyn Future<Output = Result<R, Status>> + Send + 'a>>;

/// Top-level client handle: holds the current routing map and the endpoint
/// cache, and vends `Stream` handles.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

impl Client {
    /// Bootstrap against each address in turn, adopting the first routing
    /// map (`Mash`) received.
    pub async fn connect(config: ClientConfig) -> Result<Self, Status> {
        let call_timeout = config.call_timeout();
        let mut last_err = Status::disconnected();
        for address in &config.bootstrap {
            log::debug!("probing bootstrap address {address}");
            let probe = match GrpcEndpoint::dial(address).await {
                Ok(probe) => probe,
                Err(status) => {
                    last_err = status;
                    continue;
                }
            };
            let info = tokio::time::timeout(call_timeout, probe.info())
                .await
                .unwrap_or_else(|_| Err(Status::disconnected()));
            match info {
                Ok(info) => {
                    let routing = RoutingMap::from_mash(info.mash.unwrap_or_default());
                    log::info!("adopted routing map with {} member(s) from {address}", routing.members().len());
                    let inner = Arc::new(ClientInner {
                        config,
                        routing: RwLock::new(Arc::new(routing)),
                        cache: EndpointCache::new(call_timeout),
                    });
                    return Ok(Self { inner });
                }
                Err(status) => last_err = status,
            }
        }
        log::warn!("exhausted every bootstrap address without adopting a routing map");
        Err(last_err)
    }

    async fn dispatch_unary<R>(
        &self,
        target: Target,
        call: impl for<'a> Fn(&'a GrpcEndpoint) -> UnaryCall<'a, R>,
    ) -> Result<R, Status> {
        let mut attempts = 0;
        loop {
            let (identity, endpoint) = self.inner.resolve(target).await?;
            let result = call(&endpoint).await;
            if let Err(status) = &result {
                if status.is_wrong_endpoint() && attempts < self.inner.config.max_redirects {
                    log::debug!("member {identity} is no longer the right endpoint, retrying ({}/{})", attempts + 1, self.inner.config.max_redirects);
                    self.inner.cache.evict(identity);
                    attempts += 1;
                    continue;
                }
            }
            return result;
        }
    }

    pub fn downgrade(&self) -> std::sync::Weak<ClientInner> {
        Arc::downgrade(&self.inner)
    }

    /// Update the active routing map, e.g. after observing a fresher `Mash`
    /// on an `info` response. Replaces the snapshot atomically.
    pub fn update_routing(&self, routing: RoutingMap) {
        *self.inner.routing.write() = Arc::new(routing);
    }

    pub fn stream(&self, uuid: [u8; 16]) -> Stream {
        Stream::new(self.clone(), uuid)
    }

    pub async fn create(
        &self,
        uuid: [u8; 16],
        collection: impl Into<String>,
        tags: std::collections::HashMap<String, String>,
        annotations: std::collections::HashMap<String, String>,
    ) -> Result<(), Status> {
        let collection = collection.into();
        let timeout = self.inner.config.call_timeout();
        self.dispatch_unary(Target::Uuid(uuid), move |ep| {
            Box::pin(ep.create(uuid, collection.clone(), tags.clone(), annotations.clone(), timeout))
        })
        .await
    }

    pub async fn insert(&self, uuid: [u8; 16], points: Vec<RawPoint>, sync: bool) -> Result<u64, Status> {
        let timeout = self.inner.config.call_timeout();
        self.dispatch_unary(Target::Uuid(uuid), move |ep| Box::pin(ep.insert(uuid, points.clone(), sync, timeout)))
            .await
    }

    pub async fn delete_range(&self, uuid: [u8; 16], start: i64, end: i64) -> Result<u64, Status> {
        let timeout = self.inner.config.call_timeout();
        self.dispatch_unary(Target::Uuid(uuid), move |ep| Box::pin(ep.delete_range(uuid, start, end, timeout)))
            .await
    }

    pub async fn obliterate(&self, uuid: [u8; 16]) -> Result<(), Status> {
        let timeout = self.inner.config.call_timeout();
        self.dispatch_unary(Target::Uuid(uuid), move |ep| Box::pin(ep.obliterate(uuid, timeout)))
            .await
    }

    pub async fn nearest(
        &self,
        uuid: [u8; 16],
        time: i64,
        version: u64,
        backward: bool,
    ) -> Result<(RawPoint, u64), Status> {
        let timeout = self.inner.config.call_timeout();
        self.dispatch_unary(Target::Uuid(uuid), move |ep| {
            Box::pin(ep.nearest(uuid, time, version, backward, timeout))
        })
        .await
    }

    pub(crate) async fn stream_info(
        &self,
        uuid: [u8; 16],
        omit_version: bool,
        omit_descriptor: bool,
    ) -> Result<proto::StreamInfoResponse, Status> {
        let timeout = self.inner.config.call_timeout();
        self.dispatch_unary(Target::Uuid(uuid), move |ep| {
            Box::pin(ep.stream_info(uuid, omit_version, omit_descriptor, timeout))
        })
        .await
    }

    /// Walk every page of `listCollections(prefix, page_size)`, withholding
    /// each page's cursor entry until it reappears as the first entry of the
    /// next page, and hand each page to `on_page` as it arrives.
    async fn paged_list_collections(
        &self,
        prefix: &str,
        page_size: u64,
        mut on_page: impl FnMut(Vec<String>),
    ) -> Result<(), Status> {
        let prefix = prefix.to_string();
        let timeout = self.inner.config.call_timeout();
        let mut cursor = String::new();

        loop {
            let prefix = prefix.clone();
            let cursor_for_call = cursor.clone();
            let mut page = self
                .dispatch_unary(Target::Any, move |ep| {
                    let prefix = prefix.clone();
                    let cursor_for_call = cursor_for_call.clone();
                    Box::pin(async move { ep.list_collections(&prefix, &cursor_for_call, page_size, timeout).await })
                })
                .await?;

            let full_page = page.len() as u64 == page_size;
            if full_page {
                cursor = page.last().cloned().unwrap_or_default();
                page.pop();
            }
            on_page(page);

            if !full_page {
                return Ok(());
            }
        }
    }

    /// Blocking-collect surface: `listCollections`, page size 10.
    pub async fn list_collections(&self, prefix: &str) -> Result<Vec<String>, Status> {
        let mut results = Vec::new();
        self.paged_list_collections(prefix, LIST_COLLECTIONS_PAGE_SIZE, |mut page| results.append(&mut page))
            .await?;
        Ok(results)
    }

    /// Push-callback surface grounded in the reference `listCollectionsAsync`:
    /// same pagination rules as `list_collections`, but with a page size of
    /// 2 (small deliberately, for clarity of the pagination logic) and one
    /// `on_page` call per page instead of collecting everything up front.
    pub async fn list_collections_async(&self, prefix: &str, on_page: impl FnMut(Vec<String>)) -> Result<(), Status> {
        self.paged_list_collections(prefix, LIST_COLLECTIONS_ASYNC_PAGE_SIZE, on_page).await
    }

    fn redirecting_stream<T, V>(
        &self,
        target: Target,
        start: impl for<'a> Fn(&'a GrpcEndpoint) -> UnaryCall<'a, tonic::Streaming<T>> + Send + Sync + 'static,
        extract: impl Fn(T) -> (Vec<V>, u64, Option<proto::Status>) + Send + Sync + 'static,
    ) -> RedirectingStream<T, V>
    where
        T: Send + 'static,
    {
        RedirectingStream {
            inner: self.inner.clone(),
            target,
            start: Box::new(start),
            extract: Box::new(extract),
            pump: None,
            current_identity: None,
            attempts: 0,
        }
    }

    pub fn lookup_streams(
        &self,
        collection: impl Into<String>,
        is_collection_prefix: bool,
        tags: std::collections::HashMap<String, proto::TagValue>,
        annotations: std::collections::HashMap<String, proto::TagValue>,
    ) -> RedirectingStream<proto::LookupStreamsResponse, proto::StreamDescriptor> {
        let collection = collection.into();
        let timeout = self.inner.config.call_timeout();
        self.redirecting_stream(
            Target::Any,
            move |ep| {
                Box::pin(ep.lookup_streams(
                    collection.clone(),
                    is_collection_prefix,
                    tags.clone(),
                    annotations.clone(),
                    timeout,
                ))
            },
            |r: proto::LookupStreamsResponse| (r.results, 0, r.stat),
        )
    }

    pub fn raw_values(
        &self,
        uuid: [u8; 16],
        start: i64,
        end: i64,
        version: u64,
    ) -> RedirectingStream<proto::RawValuesResponse, RawPoint> {
        let timeout = self.inner.config.call_timeout();
        self.redirecting_stream(
            Target::Uuid(uuid),
            move |ep| Box::pin(ep.raw_values(uuid, start, end, version, timeout)),
            |r: proto::RawValuesResponse| {
                (
                    r.values.into_iter().map(RawPoint::from).collect(),
                    r.versionmajor,
                    r.stat,
                )
            },
        )
    }

    pub fn aligned_windows(
        &self,
        uuid: [u8; 16],
        start: i64,
        end: i64,
        pointwidth: u32,
        version: u64,
    ) -> RedirectingStream<proto::StatPointsResponse, StatisticalPoint> {
        let timeout = self.inner.config.call_timeout();
        self.redirecting_stream(
            Target::Uuid(uuid),
            move |ep| Box::pin(ep.aligned_windows(uuid, start, end, pointwidth, version, timeout)),
            |r: proto::StatPointsResponse| {
                (
                    r.values.into_iter().map(StatisticalPoint::from).collect(),
                    r.versionmajor,
                    r.stat,
                )
            },
        )
    }

    pub fn windows(
        &self,
        uuid: [u8; 16],
        start: i64,
        end: i64,
        width: u64,
        depth: u32,
        version: u64,
    ) -> RedirectingStream<proto::StatPointsResponse, StatisticalPoint> {
        let timeout = self.inner.config.call_timeout();
        self.redirecting_stream(
            Target::Uuid(uuid),
            move |ep| Box::pin(ep.windows(uuid, start, end, width, depth, version, timeout)),
            |r: proto::StatPointsResponse| {
                (
                    r.values.into_iter().map(StatisticalPoint::from).collect(),
                    r.versionmajor,
                    r.stat,
                )
            },
        )
    }

    pub fn changes(
        &self,
        uuid: [u8; 16],
        from_generation: u64,
        to_generation: u64,
        resolution: u32,
    ) -> RedirectingStream<proto::ChangesResponse, ChangedRange> {
        let timeout = self.inner.config.call_timeout();
        self.redirecting_stream(
            Target::Uuid(uuid),
            move |ep| Box::pin(ep.changes(uuid, from_generation, to_generation, resolution, timeout)),
            |r: proto::ChangesResponse| {
                (
                    r.ranges.into_iter().map(ChangedRange::from).collect(),
                    r.versionmajor,
                    r.stat,
                )
            },
        )
    }
}

type StartFn<T> = Box<dyn for<'a> Fn(&'a GrpcEndpoint) -> UnaryCall<'a, tonic::Streaming<T>> + Send + Sync>;
type ExtractFn<T, V> = Box<dyn Fn(T) -> (Vec<V>, u64, Option<proto::Status>) + Send + Sync>;

/// A streaming RPC that transparently restarts from scratch if a
/// wrong-endpoint status is observed partway through, up to
/// `ClientConfig::max_redirects` times.
pub struct RedirectingStream<T, V> {
    inner: Arc<ClientInner>,
    target: Target,
    start: StartFn<T>,
    extract: ExtractFn<T, V>,
    pump: Option<StreamPump<tonic::Streaming<T>>>,
    current_identity: Option<NodeIdentity>,
    attempts: u32,
}

impl<T, V> RedirectingStream<T, V> {
    async fn ensure_pump(&mut self) -> Result<(), Status> {
        if self.pump.is_some() {
            return Ok(());
        }
        let (identity, endpoint) = self.inner.resolve(self.target).await?;
        let streaming = (self.start)(&endpoint).await?;
        self.current_identity = Some(identity);
        self.pump = Some(StreamPump::new(streaming));
        Ok(())
    }

    /// Pull the next batch, transparently re-streaming from the start on a
    /// wrong-endpoint redirect.
    pub async fn next_batch(&mut self) -> Batch<V> {
        loop {
            if let Err(status) = self.ensure_pump().await {
                return Batch {
                    values: Vec::new(),
                    version: 0,
                    finished: true,
                    status,
                };
            }

            let batch = self.pump.as_mut().expect("pump just ensured").next_batch(&self.extract).await;
            if batch.finished && batch.status.is_wrong_endpoint() && self.attempts < self.inner.config.max_redirects {
                if let Some(identity) = self.current_identity.take() {
                    self.inner.cache.evict(identity);
                }
                self.pump = None;
                self.attempts += 1;
                continue;
            }
            return batch;
        }
    }
}
