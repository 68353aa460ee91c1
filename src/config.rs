use std::net::SocketAddr;
use std::path::PathBuf;

use crate::condor::cli::DEFAULT_CONDOR_CONFIG;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_TEMPLATE_DIR: &str = "/usr/share/condor-ce/templates";
/// Relative to the working directory, created on demand.
pub const DEFAULT_SPOOL_DIR: &str = "tmp";

/// Scheduler configuration params consulted when no override is given.
pub const POOL_PARAM: &str = "HTCONDORCE_WEBAPP_POOL";
pub const NAME_PARAM: &str = "HTCONDORCE_WEBAPP_NAME";
pub const TEMPLATES_PARAM: &str = "HTCONDORCE_WEBAPP_TEMPLATES";
pub const SPOOL_PARAM: &str = "HTCONDORCE_WEBAPP_SPOOL";

/// Process-level overrides, typically from the command line or environment.
///
/// Every `None` falls back to the matching scheduler param, and then to a
/// built-in default, when the runtime is first resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    /// Collector used to locate the schedd.
    pub pool: Option<String>,
    /// Schedd name within the pool.
    pub name: Option<String>,
    pub template_dir: Option<PathBuf>,
    /// Where graph history lives.
    pub spool_dir: Option<PathBuf>,
    /// Configuration file the scheduler tools read.
    pub condor_config: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: DEFAULT_LISTEN_ADDR
                .parse()
                .expect("default listen address is valid"),
            pool: None,
            name: None,
            template_dir: None,
            spool_dir: None,
            condor_config: PathBuf::from(DEFAULT_CONDOR_CONFIG),
        }
    }
}

impl Settings {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = Some(pool.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = Some(dir.into());
        self
    }
}
