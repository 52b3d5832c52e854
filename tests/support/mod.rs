//! A minimal fake cluster member for end-to-end tests: a real tonic server,
//! bound to a loopback port, whose behavior on each RPC is configurable so
//! tests can exercise the dispatcher's retry and redirect logic against
//! something that actually speaks the wire protocol.

use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};
use wire::proto;
use wire::proto::btrdb_server::{Btrdb, BtrdbServer};

pub type BoxStream<T> = Pin<Box<dyn tokio_stream::Stream<Item = Result<T, Status>> + Send>>;

fn coded(code: u32, msg: &str) -> proto::Status {
    proto::Status {
        code,
        msg: msg.to_string(),
    }
}

/// Behavior of one fake cluster member, configurable per test.
pub struct FakeMember {
    pub mash: proto::Mash,
    /// Returns `CODE_WRONG_ENDPOINT` for the first `wrong_endpoint_count`
    /// unary calls to `stream_info`/`insert`, then succeeds.
    pub wrong_endpoint_count: u32,
    pub calls_seen: Arc<AtomicU32>,
    /// Incremented on every `stream_info` call, regardless of outcome.
    pub stream_info_calls: Arc<AtomicU32>,
    /// Backing data for `ListCollections`, sorted ascending.
    pub collections: Vec<String>,
    /// If set, `nearest` sleeps this long before replying, to exercise the
    /// client's own call deadline rather than anything this fixture decides.
    pub nearest_delay: Option<Duration>,
}

impl FakeMember {
    pub fn new(mash: proto::Mash) -> Self {
        Self {
            mash,
            wrong_endpoint_count: 0,
            calls_seen: Arc::new(AtomicU32::new(0)),
            stream_info_calls: Arc::new(AtomicU32::new(0)),
            collections: Vec::new(),
            nearest_delay: None,
        }
    }

    fn next_is_wrong_endpoint(&self) -> bool {
        let seen = self.calls_seen.fetch_add(1, Ordering::SeqCst);
        seen < self.wrong_endpoint_count
    }
}

#[tonic::async_trait]
impl Btrdb for FakeMember {
    async fn info(&self, _request: Request<proto::InfoRequest>) -> Result<Response<proto::InfoResponse>, Status> {
        Ok(Response::new(proto::InfoResponse {
            stat: None,
            majorversion: "0".to_string(),
            minorversion: "1".to_string(),
            build: "test".to_string(),
            mash: Some(self.mash.clone()),
        }))
    }

    async fn stream_info(
        &self,
        _request: Request<proto::StreamInfoRequest>,
    ) -> Result<Response<proto::StreamInfoResponse>, Status> {
        self.stream_info_calls.fetch_add(1, Ordering::SeqCst);
        if self.next_is_wrong_endpoint() {
            return Ok(Response::new(proto::StreamInfoResponse {
                stat: Some(coded(wire::constants::CODE_WRONG_ENDPOINT, "wrong endpoint")),
                versionmajor: 0,
                descriptor: None,
            }));
        }
        Ok(Response::new(proto::StreamInfoResponse {
            stat: None,
            versionmajor: 1,
            descriptor: Some(proto::StreamDescriptor {
                uuid: vec![0; 16],
                collection: "a/b".to_string(),
                tags: Default::default(),
                annotations: Default::default(),
                annotationversion: 1,
                versionmajor: 1,
            }),
        }))
    }

    async fn create(&self, _request: Request<proto::CreateRequest>) -> Result<Response<proto::CreateResponse>, Status> {
        Ok(Response::new(proto::CreateResponse { stat: None }))
    }

    async fn insert(&self, _request: Request<proto::InsertRequest>) -> Result<Response<proto::InsertResponse>, Status> {
        if self.next_is_wrong_endpoint() {
            return Ok(Response::new(proto::InsertResponse {
                stat: Some(coded(wire::constants::CODE_WRONG_ENDPOINT, "wrong endpoint")),
                versionmajor: 0,
            }));
        }
        Ok(Response::new(proto::InsertResponse {
            stat: None,
            versionmajor: 1,
        }))
    }

    async fn delete_range(&self, _request: Request<proto::DeleteRequest>) -> Result<Response<proto::DeleteResponse>, Status> {
        Ok(Response::new(proto::DeleteResponse {
            stat: None,
            versionmajor: 1,
        }))
    }

    async fn obliterate(
        &self,
        _request: Request<proto::ObliterateRequest>,
    ) -> Result<Response<proto::ObliterateResponse>, Status> {
        Ok(Response::new(proto::ObliterateResponse { stat: None }))
    }

    async fn list_collections(
        &self,
        request: Request<proto::ListCollectionsRequest>,
    ) -> Result<Response<proto::ListCollectionsResponse>, Status> {
        let req = request.into_inner();
        let limit = req.limit.max(1) as usize;
        let page: Vec<String> = self
            .collections
            .iter()
            .filter(|name| name.starts_with(&req.prefix) && name.as_str() >= req.startwith.as_str())
            .take(limit)
            .cloned()
            .collect();
        Ok(Response::new(proto::ListCollectionsResponse {
            stat: None,
            collections: page,
        }))
    }

    async fn nearest(&self, _request: Request<proto::NearestParams>) -> Result<Response<proto::NearestResponse>, Status> {
        if let Some(delay) = self.nearest_delay {
            tokio::time::sleep(delay).await;
        }
        Err(Status::unimplemented("nearest is not used by this fixture"))
    }

    type LookupStreamsStream = BoxStream<proto::LookupStreamsResponse>;

    async fn lookup_streams(
        &self,
        _request: Request<proto::LookupStreamsParams>,
    ) -> Result<Response<Self::LookupStreamsStream>, Status> {
        Err(Status::unimplemented("lookup_streams is not used by this fixture"))
    }

    type RawValuesStream = BoxStream<proto::RawValuesResponse>;

    async fn raw_values(
        &self,
        _request: Request<proto::RawValuesParams>,
    ) -> Result<Response<Self::RawValuesStream>, Status> {
        Err(Status::unimplemented("raw_values is not used by this fixture"))
    }

    type AlignedWindowsStream = BoxStream<proto::StatPointsResponse>;

    async fn aligned_windows(
        &self,
        _request: Request<proto::AlignedWindowsParams>,
    ) -> Result<Response<Self::AlignedWindowsStream>, Status> {
        Err(Status::unimplemented("aligned_windows is not used by this fixture"))
    }

    type WindowsStream = BoxStream<proto::StatPointsResponse>;

    async fn windows(
        &self,
        _request: Request<proto::WindowsParams>,
    ) -> Result<Response<Self::WindowsStream>, Status> {
        Err(Status::unimplemented("windows is not used by this fixture"))
    }

    type ChangesStream = BoxStream<proto::ChangesResponse>;

    async fn changes(
        &self,
        _request: Request<proto::ChangesParams>,
    ) -> Result<Response<Self::ChangesStream>, Status> {
        Err(Status::unimplemented("changes is not used by this fixture"))
    }
}

/// Bind a loopback port without serving yet, so tests can bake the resolved
/// address into the fake member's own routing map before it starts serving.
pub async fn bind() -> (String, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let address = listener.local_addr().expect("local addr").to_string();
    (address, listener)
}

/// Serve `member` on an already-bound listener. Returns a handle that stops
/// the server when aborted.
pub fn spawn(listener: TcpListener, member: FakeMember) -> JoinHandle<()> {
    let incoming = TcpListenerStream::new(listener);
    tokio::spawn(async move {
        let _ = tonic::transport::Server::builder()
            .add_service(BtrdbServer::new(member))
            .serve_with_incoming(incoming)
            .await;
    })
}

/// Bind and immediately serve `member`, for tests that don't need the
/// address ahead of time.
pub async fn serve(member: FakeMember) -> (String, JoinHandle<()>) {
    let (address, listener) = bind().await;
    (address, spawn(listener, member))
}
