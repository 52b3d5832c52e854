//! The routing map: a snapshot of which cluster member owns which slice of
//! the 32-bit hash ring.

use btrdb_client_wire::constants::ADDRESS_DELIMITER;
use btrdb_client_wire::proto;

use crate::hash::hash_uuid;

/// Stable identity for a cluster member, used as the key into the endpoint
/// cache. The wire `Member::hash` field is unique per member for the
/// lifetime of the cluster even though the hash range it owns can move.
pub type NodeIdentity = u32;

/// One partition of the hash ring, owned by one cluster member.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub identity: NodeIdentity,
    pub start: u32,
    pub end: u32,
    pub addresses: Vec<String>,
}

impl Member {
    /// Whether `hash` falls in this member's half-open range `[start, end)`.
    pub fn covers(&self, hash: u32) -> bool {
        self.start <= hash && hash < self.end
    }

    fn from_proto(m: proto::Member) -> Option<Self> {
        if !m.r#in || !m.up || m.start == m.end {
            return None;
        }
        Some(Self {
            identity: m.hash,
            start: u32::try_from(m.start).unwrap_or(0),
            end: u32::try_from(m.end).unwrap_or(u32::MAX),
            addresses: m
                .grpcendpoints
                .split(ADDRESS_DELIMITER)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        })
    }
}

/// A point-in-time snapshot of cluster membership.
///
/// The reference implementation keeps one slot per member, including
/// inactive ones, and leaves their range zeroed so lookups skip them. We
/// filter inactive members out at construction instead: a member is active
/// exactly when `in() && up() && start != end`, and a zeroed `[0, 0)` range
/// never matches any hash either way, so the two renderings agree on every
/// lookup.
#[derive(Debug, Clone, Default)]
pub struct RoutingMap {
    members: Vec<Member>,
}

impl RoutingMap {
    pub fn from_mash(mash: proto::Mash) -> Self {
        let members = mash
            .members
            .into_iter()
            .filter_map(Member::from_proto)
            .collect();
        Self { members }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Resolve a raw hash to the member covering it, or `None` if it falls
    /// in a gap no active member has claimed.
    pub fn lookup(&self, hash: u32) -> Option<&Member> {
        self.members.iter().find(|m| m.covers(hash))
    }

    /// Resolve a stream UUID to the member that owns it.
    pub fn endpoint_for(&self, uuid: &[u8; 16]) -> Option<&Member> {
        self.lookup(hash_uuid(uuid))
    }
}
