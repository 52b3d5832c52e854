//! Cluster routing and connection management for the btrdb-client core.
//!
//! This crate owns the parts of the client that know the cluster is a
//! cluster: the routing map that resolves a stream UUID to the member that
//! owns it (`routing`), the partition hash function that drives that
//! resolution (`hash`), the connection abstraction each member's live
//! connection must implement (`endpoint`), and the cache that keeps exactly
//! one connection per member alive and races cold connects (`cache`).
//!
//! Retrying against a different member after a redirect, and everything that
//! actually speaks the wire protocol, lives in the root crate.

pub mod cache;
pub mod endpoint;
pub mod hash;
pub mod routing;

pub use cache::EndpointCache;
pub use endpoint::Transport;
pub use hash::{hash_uuid, murmur3_32};
pub use routing::{Member, NodeIdentity, RoutingMap};
