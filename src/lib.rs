pub mod client;
pub mod config;
pub mod endpoint;
pub mod stream;
pub mod streaming;

pub use client::Client;
pub use config::ClientConfig;
pub use endpoint::GrpcEndpoint;
pub use stream::Stream;

pub use wire::{proto, ChangedRange, RawPoint, StatisticalPoint, Status};
