//! Historical graphs, rendered by an external delegate.
//!
//! The web layer only picks the metric family, the grouping parameters, and
//! the interval; what the image looks like is the delegate's business.

pub mod rrd;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::error::{CeViewError, Result};

pub use rrd::RrdGraphs;

pub const DEFAULT_INTERVAL: &str = "daily";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricFamily {
    Jobs,
    Vos,
    Metrics,
}

impl MetricFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricFamily::Jobs => "jobs",
            MetricFamily::Vos => "vos",
            MetricFamily::Metrics => "metrics",
        }
    }
}

impl std::fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time span a graph covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Interval {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "hourly" => Ok(Interval::Hourly),
            "daily" => Ok(Interval::Daily),
            "weekly" => Ok(Interval::Weekly),
            "monthly" => Ok(Interval::Monthly),
            "yearly" => Ok(Interval::Yearly),
            other => Err(CeViewError::UnknownInterval(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Hourly => "hourly",
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Monthly => "monthly",
            Interval::Yearly => "yearly",
        }
    }
}

/// A metric recorded under `group`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MetricName {
    pub group: String,
    pub name: String,
}

/// What to draw: a family, its grouping parameters (VO; or metric group and
/// name), and the interval token from the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRequest {
    pub family: MetricFamily,
    pub params: Vec<String>,
    pub interval: String,
}

impl GraphRequest {
    pub fn new(family: MetricFamily, params: Vec<String>, interval: impl Into<String>) -> Self {
        Self {
            family,
            params,
            interval: interval.into(),
        }
    }
}

#[async_trait]
pub trait GraphDelegate: Send + Sync {
    /// VOs that have recorded history.
    async fn list_vos(&self) -> Result<Vec<String>>;

    /// Metrics that have recorded history.
    async fn list_metrics(&self) -> Result<Vec<MetricName>>;

    /// PNG bytes for the requested graph.
    async fn graph(&self, request: &GraphRequest) -> Result<Bytes>;
}
