//! Access to the scheduler: configuration params, job queries, and the
//! schedd's own ad.
//!
//! Everything goes through the [`Condor`] trait so the web layer can be
//! driven by an in-memory scheduler in tests. [`CondorCli`] is the production
//! implementation, which shells out to the HTCondor command-line tools.

pub mod cli;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::classad::ClassAd;
use crate::error::Result;

pub use cli::CondorCli;

/// Constraint selecting every job in the queue.
pub const ALL_JOBS: &str = "true";

/// Lazily produced job ads. Errors surface in-band and end the stream.
pub type AdStream = BoxStream<'static, Result<ClassAd>>;

/// Which schedd to talk to. With no pool, the local schedd is used; with a
/// pool but no name, the pool's default schedd.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheddLocator {
    pub pool: Option<String>,
    pub name: Option<String>,
}

impl ScheddLocator {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn in_pool(pool: impl Into<String>, name: Option<String>) -> Self {
        Self {
            pool: Some(pool.into()),
            name,
        }
    }
}

impl std::fmt::Display for ScheddLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.pool, &self.name) {
            (None, None) => write!(f, "local schedd"),
            (None, Some(name)) => write!(f, "{}", name),
            (Some(pool), None) => write!(f, "default schedd in {}", pool),
            (Some(pool), Some(name)) => write!(f, "{} in {}", name, pool),
        }
    }
}

#[async_trait]
pub trait Condor: Send + Sync {
    /// Value of a configuration param, `None` when it is not defined.
    async fn param(&self, name: &str) -> Result<Option<String>>;

    /// Version banner of the installed scheduler.
    async fn version(&self) -> Result<String>;

    /// Job ads matching `constraint`, carrying only the `projection` attributes.
    async fn query_jobs(
        &self,
        locator: &ScheddLocator,
        constraint: &str,
        projection: &[&str],
    ) -> Result<AdStream>;

    /// The schedd's own advertisement from the collector.
    async fn schedd_ad(&self, locator: &ScheddLocator) -> Result<ClassAd>;
}
