//! Job-ad aggregation.
//!
//! Folds a stream of job ads into per-status counters, either as one global
//! bucket ([`Totals`]) or grouped by submitter identity ([`PilotCounts`],
//! [`VoCounts`]). Buckets are created on first sight of a key and live only
//! as long as the tally that owns them.

pub mod status;
pub mod tally;

pub use status::JobStatus;
pub use tally::{
    strip_fqan, tally_stream, JobCounts, PilotCounts, PilotKey, Tally, Totals, VoCounts,
};
