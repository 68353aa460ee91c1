use std::collections::BTreeMap;

use futures::{Stream, StreamExt};
use serde::Serialize;

use crate::classad::ClassAd;
use crate::error::Result;
use crate::jobs::status::{JobStatus, JOB_STATUS_ATTR};

pub const VO_ATTR: &str = "x509UserProxyVOName";
pub const FQAN_ATTR: &str = "x509UserProxyFirstFQAN";
pub const DN_ATTR: &str = "x509userproxysubject";

/// Placeholder for a missing VO or DN.
pub const UNKNOWN: &str = "Unknown";

const FQAN_NULL_MARKERS: [&str; 2] = ["/Capability=NULL", "/Role=NULL"];

/// Per-bucket job counters.
///
/// `jobs` counts every job seen; the other three only count their own status,
/// so `jobs - running - idle - held` is the number of jobs in other states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobCounts {
    pub running: u64,
    pub idle: u64,
    pub held: u64,
    pub jobs: u64,
}

impl JobCounts {
    pub fn record(&mut self, status: Option<JobStatus>) {
        self.jobs += 1;
        match status {
            Some(JobStatus::Idle) => self.idle += 1,
            Some(JobStatus::Running) => self.running += 1,
            Some(JobStatus::Held) => self.held += 1,
            _ => {}
        }
    }

    /// Jobs counted toward `jobs` but none of the tracked states.
    pub fn other(&self) -> u64 {
        self.jobs - self.running - self.idle - self.held
    }
}

/// A fold over job ads. `PROJECTION` lists the only attributes `observe`
/// reads, so the scheduler query can be limited to them.
pub trait Tally: Default {
    const PROJECTION: &'static [&'static str];

    fn observe(&mut self, ad: &ClassAd);

    fn from_ads<'a, I>(ads: I) -> Self
    where
        I: IntoIterator<Item = &'a ClassAd>,
    {
        let mut tally = Self::default();
        for ad in ads {
            tally.observe(ad);
        }
        tally
    }
}

/// Drain a stream of job ads into a fresh tally. The first stream error
/// aborts the fold; partial counts are never returned.
pub async fn tally_stream<T, S>(ads: S) -> Result<T>
where
    T: Tally,
    S: Stream<Item = Result<ClassAd>>,
{
    let mut tally = T::default();
    let mut ads = std::pin::pin!(ads);
    while let Some(ad) = ads.next().await {
        tally.observe(&ad?);
    }
    Ok(tally)
}

/// One global bucket for the whole queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Totals {
    pub counts: JobCounts,
}

impl Tally for Totals {
    const PROJECTION: &'static [&'static str] = &[JOB_STATUS_ATTR];

    fn observe(&mut self, ad: &ClassAd) {
        self.counts.record(JobStatus::of(ad));
    }
}

/// Drop the `/Capability=NULL` and `/Role=NULL` markers from an FQAN.
pub fn strip_fqan(fqan: &str) -> String {
    FQAN_NULL_MARKERS
        .iter()
        .fold(fqan.to_string(), |acc, marker| acc.replace(marker, ""))
}

/// Grouping key for pilot submitters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PilotKey {
    pub dn: String,
    pub vo: String,
    pub voms: String,
}

impl PilotKey {
    pub fn new(dn: &str, vo: &str, fqan: &str) -> Self {
        Self {
            dn: dn.to_string(),
            vo: vo.to_string(),
            voms: strip_fqan(fqan),
        }
    }

    pub fn of(ad: &ClassAd) -> Self {
        Self::new(
            &ad.text_or(DN_ATTR, UNKNOWN),
            &ad.text_or(VO_ATTR, UNKNOWN),
            &ad.text_or(FQAN_ATTR, ""),
        )
    }
}

/// Buckets keyed by (DN, VO, VOMS), iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PilotCounts {
    buckets: BTreeMap<PilotKey, JobCounts>,
}

impl PilotCounts {
    pub fn get(&self, key: &PilotKey) -> Option<&JobCounts> {
        self.buckets.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PilotKey, &JobCounts)> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl Tally for PilotCounts {
    const PROJECTION: &'static [&'static str] = &[VO_ATTR, FQAN_ATTR, JOB_STATUS_ATTR, DN_ATTR];

    fn observe(&mut self, ad: &ClassAd) {
        let status = JobStatus::of(ad);
        self.buckets
            .entry(PilotKey::of(ad))
            .or_default()
            .record(status);
    }
}

/// Buckets keyed by VO name. Serializes as a JSON object keyed by VO.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VoCounts {
    buckets: BTreeMap<String, JobCounts>,
}

impl VoCounts {
    pub fn get(&self, vo: &str) -> Option<&JobCounts> {
        self.buckets.get(vo)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JobCounts)> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl Tally for VoCounts {
    const PROJECTION: &'static [&'static str] = &[VO_ATTR, JOB_STATUS_ATTR];

    fn observe(&mut self, ad: &ClassAd) {
        self.buckets
            .entry(ad.text_or(VO_ATTR, UNKNOWN))
            .or_default()
            .record(JobStatus::of(ad));
    }
}
