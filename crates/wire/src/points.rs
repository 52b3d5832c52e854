//! Domain value types carried by streaming responses.

use crate::proto;

/// A single timestamped sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPoint {
    pub time: i64,
    pub value: f64,
}

impl From<proto::RawPoint> for RawPoint {
    fn from(value: proto::RawPoint) -> Self {
        Self {
            time: value.time,
            value: value.value,
        }
    }
}

impl From<RawPoint> for proto::RawPoint {
    fn from(value: RawPoint) -> Self {
        Self {
            time: value.time,
            value: value.value,
        }
    }
}

/// A statistical summary over a window of raw points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticalPoint {
    pub time: i64,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub count: u64,
}

impl From<proto::StatPoint> for StatisticalPoint {
    fn from(value: proto::StatPoint) -> Self {
        Self {
            time: value.time,
            min: value.min,
            mean: value.mean,
            max: value.max,
            count: value.count,
        }
    }
}

/// A half-open interval `[start, end)` where data differs between two
/// stream versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangedRange {
    pub start: i64,
    pub end: i64,
}

impl From<proto::ChangedRange> for ChangedRange {
    fn from(value: proto::ChangedRange) -> Self {
        Self {
            start: value.start,
            end: value.end,
        }
    }
}
