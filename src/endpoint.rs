//! The concrete connection to one cluster member: a thin wrapper over the
//! generated gRPC stub that also implements `cluster::Transport` so the
//! endpoint cache can manage it without knowing about gRPC at all.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use cluster::Transport;
use tonic::transport::{Channel, Endpoint as ChannelEndpoint};
use wire::constants::CODE_DISCONNECTED;
use wire::proto::btrdb_client::BtrdbClient;
use wire::{proto, RawPoint, Status};

/// A connected client stub for one cluster member.
///
/// Cloning is cheap: the inner generated client shares its HTTP/2 connection,
/// so every method here clones it rather than taking `&mut self`.
#[derive(Clone)]
pub struct GrpcEndpoint {
    client: BtrdbClient<Channel>,
}

/// Wrap `message` in a request stamped with `timeout` as its `grpc-timeout`
/// deadline — the only cancellation mechanism a call has.
fn timed<T>(message: T, timeout: Duration) -> tonic::Request<T> {
    let mut request = tonic::Request::new(message);
    request.set_timeout(timeout);
    request
}

#[async_trait]
impl Transport for GrpcEndpoint {
    async fn dial(address: &str) -> Result<Self, Status> {
        let uri = format!("http://{address}");
        let channel = ChannelEndpoint::from_shared(uri)
            .map_err(|e| Status::Coded {
                code: CODE_DISCONNECTED,
                msg: e.to_string(),
            })?
            .connect_timeout(Duration::from_secs(2))
            .connect()
            .await
            .map_err(|e| Status::Coded {
                code: CODE_DISCONNECTED,
                msg: e.to_string(),
            })?;
        Ok(Self {
            client: BtrdbClient::new(channel),
        })
    }

    async fn probe(&self) -> Result<(), Status> {
        self.info().await.map(|_| ())
    }
}

impl GrpcEndpoint {
    pub async fn info(&self) -> Result<proto::InfoResponse, Status> {
        let mut client = self.client.clone();
        let (body, status) = Status::combine(
            client.info(proto::InfoRequest {}).await,
            |r: &proto::InfoResponse| r.stat.clone(),
        );
        match body {
            Some(response) => Ok(response),
            None => Err(status),
        }
    }

    pub async fn stream_info(
        &self,
        uuid: [u8; 16],
        omit_version: bool,
        omit_descriptor: bool,
        timeout: Duration,
    ) -> Result<proto::StreamInfoResponse, Status> {
        let mut client = self.client.clone();
        let request = proto::StreamInfoRequest {
            uuid: uuid.to_vec(),
            omit_version,
            omit_descriptor,
        };
        let (body, status) = Status::combine(client.stream_info(timed(request, timeout)).await, |r| r.stat.clone());
        body.ok_or(status)
    }

    pub async fn create(
        &self,
        uuid: [u8; 16],
        collection: String,
        tags: HashMap<String, String>,
        annotations: HashMap<String, String>,
        timeout: Duration,
    ) -> Result<(), Status> {
        let mut client = self.client.clone();
        let request = proto::CreateRequest {
            uuid: uuid.to_vec(),
            collection,
            tags,
            annotations,
        };
        let (_, status) = Status::combine(
            client.create(timed(request, timeout)).await,
            |r: &proto::CreateResponse| r.stat.clone(),
        );
        if status.is_error() {
            Err(status)
        } else {
            Ok(())
        }
    }

    /// Insert a batch of points. Every point in `points` is appended to the
    /// request — the reference implementation this is modeled on built a
    /// fresh point per iteration but never attached it to the request,
    /// silently dropping the whole batch.
    pub async fn insert(&self, uuid: [u8; 16], points: Vec<RawPoint>, sync: bool, timeout: Duration) -> Result<u64, Status> {
        let mut client = self.client.clone();
        let mut values = Vec::with_capacity(points.len());
        for point in points {
            values.push(proto::RawPoint::from(point));
        }
        let request = proto::InsertRequest {
            uuid: uuid.to_vec(),
            values,
            sync,
        };
        let (body, status) = Status::combine(
            client.insert(timed(request, timeout)).await,
            |r: &proto::InsertResponse| r.stat.clone(),
        );
        body.map(|r| r.versionmajor).ok_or(status)
    }

    pub async fn delete_range(&self, uuid: [u8; 16], start: i64, end: i64, timeout: Duration) -> Result<u64, Status> {
        let mut client = self.client.clone();
        let request = proto::DeleteRequest {
            uuid: uuid.to_vec(),
            start,
            end,
        };
        let (body, status) = Status::combine(
            client.delete_range(timed(request, timeout)).await,
            |r: &proto::DeleteResponse| r.stat.clone(),
        );
        body.map(|r| r.versionmajor).ok_or(status)
    }

    pub async fn obliterate(&self, uuid: [u8; 16], timeout: Duration) -> Result<(), Status> {
        let mut client = self.client.clone();
        let request = proto::ObliterateRequest { uuid: uuid.to_vec() };
        let (_, status) = Status::combine(
            client.obliterate(timed(request, timeout)).await,
            |r: &proto::ObliterateResponse| r.stat.clone(),
        );
        if status.is_error() {
            Err(status)
        } else {
            Ok(())
        }
    }

    pub async fn list_collections(
        &self,
        prefix: &str,
        startwith: &str,
        limit: u64,
        timeout: Duration,
    ) -> Result<Vec<String>, Status> {
        let mut client = self.client.clone();
        let request = proto::ListCollectionsRequest {
            prefix: prefix.to_string(),
            startwith: startwith.to_string(),
            limit,
        };
        let (body, status) = Status::combine(
            client.list_collections(timed(request, timeout)).await,
            |r: &proto::ListCollectionsResponse| r.stat.clone(),
        );
        body.map(|r| r.collections).ok_or(status)
    }

    pub async fn nearest(
        &self,
        uuid: [u8; 16],
        time: i64,
        version: u64,
        backward: bool,
        timeout: Duration,
    ) -> Result<(RawPoint, u64), Status> {
        let mut client = self.client.clone();
        let request = proto::NearestParams {
            uuid: uuid.to_vec(),
            time,
            versionmajor: version,
            backward,
        };
        let (body, status) = Status::combine(
            client.nearest(timed(request, timeout)).await,
            |r: &proto::NearestResponse| r.stat.clone(),
        );
        body.map(|r| (RawPoint::from(r.value.unwrap_or_default()), r.versionmajor))
            .ok_or(status)
    }

    pub async fn raw_values(
        &self,
        uuid: [u8; 16],
        start: i64,
        end: i64,
        version: u64,
        timeout: Duration,
    ) -> Result<tonic::Streaming<proto::RawValuesResponse>, Status> {
        let mut client = self.client.clone();
        let request = proto::RawValuesParams {
            uuid: uuid.to_vec(),
            start,
            end,
            versionmajor: version,
        };
        client
            .raw_values(timed(request, timeout))
            .await
            .map(tonic::Response::into_inner)
            .map_err(Status::from)
    }

    pub async fn aligned_windows(
        &self,
        uuid: [u8; 16],
        start: i64,
        end: i64,
        pointwidth: u32,
        version: u64,
        timeout: Duration,
    ) -> Result<tonic::Streaming<proto::StatPointsResponse>, Status> {
        let mut client = self.client.clone();
        let request = proto::AlignedWindowsParams {
            uuid: uuid.to_vec(),
            start,
            end,
            pointwidth,
            versionmajor: version,
        };
        client
            .aligned_windows(timed(request, timeout))
            .await
            .map(tonic::Response::into_inner)
            .map_err(Status::from)
    }

    pub async fn windows(
        &self,
        uuid: [u8; 16],
        start: i64,
        end: i64,
        width: u64,
        depth: u32,
        version: u64,
        timeout: Duration,
    ) -> Result<tonic::Streaming<proto::StatPointsResponse>, Status> {
        let mut client = self.client.clone();
        let request = proto::WindowsParams {
            uuid: uuid.to_vec(),
            start,
            end,
            width,
            depth,
            versionmajor: version,
        };
        client
            .windows(timed(request, timeout))
            .await
            .map(tonic::Response::into_inner)
            .map_err(Status::from)
    }

    pub async fn changes(
        &self,
        uuid: [u8; 16],
        from_generation: u64,
        to_generation: u64,
        resolution: u32,
        timeout: Duration,
    ) -> Result<tonic::Streaming<proto::ChangesResponse>, Status> {
        let mut client = self.client.clone();
        let request = proto::ChangesParams {
            uuid: uuid.to_vec(),
            fromgeneration: from_generation,
            togeneration: to_generation,
            resolution,
        };
        client
            .changes(timed(request, timeout))
            .await
            .map(tonic::Response::into_inner)
            .map_err(Status::from)
    }

    pub async fn lookup_streams(
        &self,
        collection: String,
        is_collection_prefix: bool,
        tags: HashMap<String, proto::TagValue>,
        annotations: HashMap<String, proto::TagValue>,
        timeout: Duration,
    ) -> Result<tonic::Streaming<proto::LookupStreamsResponse>, Status> {
        let mut client = self.client.clone();
        let request = proto::LookupStreamsParams {
            collection,
            is_collection_prefix,
            tags,
            annotations,
        };
        client
            .lookup_streams(timed(request, timeout))
            .await
            .map(tonic::Response::into_inner)
            .map_err(Status::from)
    }
}
