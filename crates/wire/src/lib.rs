//! Wire types for the btrdb-client core.
//!
//! This crate owns everything that crosses the cluster boundary: the
//! generated gRPC stubs (`proto`), the status taxonomy combining transport
//! and application-level failures (`Status`), the domain value types carried
//! on every streaming response (`RawPoint`, `StatisticalPoint`,
//! `ChangedRange`), and the constants fixed by the wire contract.
//!
//! None of this crate knows about cluster routing or retrying; that lives in
//! `btrdb-client-cluster` and the root crate respectively.

pub mod constants;
pub mod points;
pub mod status;

pub mod proto {
    tonic::include_proto!("btrdb");
}

pub use points::{ChangedRange, RawPoint, StatisticalPoint};
pub use status::Status;
