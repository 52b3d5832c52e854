//! The status taxonomy: every call into the cluster returns one of three
//! kinds of outcome, and retry/surface decisions are made purely by
//! inspecting this type.

use std::fmt;

use crate::{constants, proto};

/// Outcome of a single RPC.
///
/// `Ok` means the call succeeded. `Grpc` wraps a transport-level failure
/// (deadline exceeded, connection refused, cancelled, ...). `Coded` wraps an
/// application-level failure carried in the response body's `stat` field, or
/// a client-side condition (`ClusterDegraded`, `Disconnected`) that never
/// actually crosses the wire but is represented with the same wire codes so
/// callers can match on `code()` uniformly.
#[derive(Debug, Clone)]
pub enum Status {
    Ok,
    Grpc(tonic::Status),
    Coded { code: u32, msg: String },
    /// The `Client` this `Stream` was created from has been dropped.
    ClientGone,
}

impl Status {
    pub fn cluster_degraded() -> Self {
        Self::Coded {
            code: constants::CODE_CLUSTER_DEGRADED,
            msg: "uuid falls in a gap of the routing map".to_string(),
        }
    }

    pub fn disconnected() -> Self {
        Self::Coded {
            code: constants::CODE_DISCONNECTED,
            msg: "no candidate address could be reached".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Ok)
    }

    /// The application-level code, if this status carries one. Transport
    /// failures and `ClientGone` have no wire code.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Coded { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_wrong_endpoint(&self) -> bool {
        self.code() == Some(constants::CODE_WRONG_ENDPOINT)
    }

    pub fn is_no_such_stream(&self) -> bool {
        self.code() == Some(constants::CODE_NO_SUCH_STREAM)
    }

    /// Build a `Status` from an optional wire-level `Status` message, as
    /// embedded in nearly every response.
    pub fn from_stat(stat: Option<proto::Status>) -> Self {
        match stat {
            Some(proto::Status { code, .. }) if code == 0 => Self::Ok,
            Some(proto::Status { code, msg }) => Self::Coded { code, msg },
            None => Self::Ok,
        }
    }

    /// Run the combined factory over a raw transport result: a transport
    /// failure always wins over whatever the body says, because there may be
    /// no body at all.
    pub fn combine<T>(
        result: Result<tonic::Response<T>, tonic::Status>,
        stat: impl FnOnce(&T) -> Option<proto::Status>,
    ) -> (Option<T>, Self) {
        match result {
            Err(e) => (None, Self::Grpc(e)),
            Ok(response) => {
                let body = response.into_inner();
                let status = Self::from_stat(stat(&body));
                if status.is_error() {
                    (None, status)
                } else {
                    (Some(body), status)
                }
            }
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Grpc(status) => write!(f, "transport error: {status}"),
            Self::Coded { code, msg } => write!(f, "error {code}: {msg}"),
            Self::ClientGone => write!(f, "client has been dropped"),
        }
    }
}

impl std::error::Error for Status {}

impl From<tonic::Status> for Status {
    fn from(value: tonic::Status) -> Self {
        Self::Grpc(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_stat_treats_missing_stat_as_ok() {
        assert!(matches!(Status::from_stat(None), Status::Ok));
    }

    #[test]
    fn from_stat_treats_zero_code_as_ok() {
        let stat = proto::Status {
            code: 0,
            msg: "fine".to_string(),
        };
        assert!(matches!(Status::from_stat(Some(stat)), Status::Ok));
    }

    #[test]
    fn from_stat_preserves_nonzero_code_and_message() {
        let stat = proto::Status {
            code: constants::CODE_NO_SUCH_STREAM,
            msg: "no such stream".to_string(),
        };
        let status = Status::from_stat(Some(stat));
        assert!(status.is_no_such_stream());
        assert_eq!(status.code(), Some(constants::CODE_NO_SUCH_STREAM));
    }

    #[test]
    fn combine_prefers_transport_failure_over_body() {
        let err = tonic::Status::unavailable("down");
        let (body, status) = Status::combine::<()>(Err(err), |_| None);
        assert!(body.is_none());
        assert!(matches!(status, Status::Grpc(_)));
    }

    #[test]
    fn combine_surfaces_coded_body_and_drops_it() {
        let response = tonic::Response::new(42u32);
        let stat = proto::Status {
            code: constants::CODE_WRONG_ENDPOINT,
            msg: "elsewhere".to_string(),
        };
        let (body, status) = Status::combine(Ok(response), |_| Some(stat.clone()));
        assert!(body.is_none());
        assert!(status.is_wrong_endpoint());
    }

    #[test]
    fn combine_passes_through_body_on_success() {
        let response = tonic::Response::new(42u32);
        let (body, status) = Status::combine(Ok(response), |_| None);
        assert_eq!(body, Some(42));
        assert!(!status.is_error());
    }

    #[test]
    fn cluster_degraded_and_disconnected_are_client_local_codes() {
        assert_eq!(
            Status::cluster_degraded().code(),
            Some(constants::CODE_CLUSTER_DEGRADED)
        );
        assert_eq!(Status::disconnected().code(), Some(constants::CODE_DISCONNECTED));
    }

    #[test]
    fn client_gone_has_no_wire_code() {
        assert_eq!(Status::ClientGone.code(), None);
        assert!(Status::ClientGone.is_error());
    }
}
