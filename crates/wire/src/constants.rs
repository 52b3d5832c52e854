//! Public constants fixed by the wire contract.

/// Number of raw bytes in a stream UUID.
pub const UUID_NUM_BYTES: usize = 16;

/// Delimiter separating candidate addresses inside `Member::grpcendpoints`.
pub const ADDRESS_DELIMITER: char = ';';

/// Maximum point-width exponent accepted by the aligned-windows RPC.
pub const MAX_PWE: u8 = 63;

/// Latest representable time, in nanoseconds since the Unix epoch.
pub const MAX_TIME: i64 = (48i64 << 56) - 1;

/// Earliest representable time, in nanoseconds since the Unix epoch.
pub const MIN_TIME: i64 = -(16i64 << 56);

/// Application-level status code: the node that received the request no
/// longer owns the targeted UUID.
pub const CODE_WRONG_ENDPOINT: u32 = 405;

/// Application-level status code: no stream exists with the given UUID.
pub const CODE_NO_SUCH_STREAM: u32 = 404;

/// Client-side status code: the UUID's hash falls in a gap of the routing
/// map that no active member covers.
pub const CODE_CLUSTER_DEGRADED: u32 = 419;

/// Client-side status code: no candidate address for the resolved node (or
/// any bootstrap address) could be reached.
pub const CODE_DISCONNECTED: u32 = 421;
