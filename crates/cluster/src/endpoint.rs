//! The connection abstraction the endpoint cache manages one instance of per
//! cluster member.
//!
//! The cluster crate never speaks gRPC directly: it is generic over anything
//! that can dial an address and prove the connection actually works, which
//! lets the cache and its cold-connect races be tested without a server. The
//! root crate supplies the real implementation over `tonic::transport::Channel`.

use async_trait::async_trait;
use btrdb_client_wire::Status;

/// A connection to a single cluster member.
#[async_trait]
pub trait Transport: Send + Sync + Sized + 'static {
    /// Open a connection to `address`. This should return as soon as a
    /// channel exists; it does not need to prove the peer is reachable.
    async fn dial(address: &str) -> Result<Self, Status>;

    /// Force the connection by performing a cheap round trip. Cold-connect
    /// races use this to pick a winner among several dialed addresses.
    async fn probe(&self) -> Result<(), Status>;
}
