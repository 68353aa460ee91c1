//! Process-wide state resolved on first use.
//!
//! Overrides from [`Settings`] win; otherwise the scheduler's configuration is
//! consulted, then built-in defaults. The result is immutable once built.

use std::path::PathBuf;
use std::sync::Arc;

use crate::condor::{Condor, ScheddLocator};
use crate::config::{
    Settings, DEFAULT_SPOOL_DIR, DEFAULT_TEMPLATE_DIR, NAME_PARAM, POOL_PARAM, SPOOL_PARAM,
    TEMPLATES_PARAM,
};
use crate::error::Result;
use crate::graphs::{GraphDelegate, RrdGraphs};
use crate::web::templates::Templates;

pub struct Runtime {
    pub locator: ScheddLocator,
    pub templates: Templates,
    pub spool_dir: PathBuf,
    pub graphs: Arc<dyn GraphDelegate>,
}

impl Runtime {
    /// Resolve every setting. `graphs` replaces the default delegate, which
    /// draws from the spool dir.
    pub async fn resolve(
        settings: &Settings,
        condor: &dyn Condor,
        graphs: Option<Arc<dyn GraphDelegate>>,
    ) -> Result<Self> {
        let locator = resolve_locator(settings, condor).await;

        let template_dir = match settings.template_dir.clone() {
            Some(dir) => dir,
            None => param(condor, TEMPLATES_PARAM)
                .await
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIR)),
        };

        let spool_dir = match settings.spool_dir.clone() {
            Some(dir) => dir,
            None => param(condor, SPOOL_PARAM)
                .await
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SPOOL_DIR)),
        };
        tokio::fs::create_dir_all(&spool_dir).await?;

        let graphs = graphs.unwrap_or_else(|| Arc::new(RrdGraphs::new(spool_dir.clone())));

        tracing::info!(
            schedd = %locator,
            templates = %template_dir.display(),
            spool = %spool_dir.display(),
            "Runtime initialized"
        );

        Ok(Self {
            locator,
            templates: Templates::from_dir(template_dir),
            spool_dir,
            graphs,
        })
    }
}

/// Pool and schedd name: override, then scheduler param. A missing name
/// means the pool's default schedd.
pub async fn resolve_locator(settings: &Settings, condor: &dyn Condor) -> ScheddLocator {
    let pool = match settings.pool.clone() {
        Some(pool) => Some(pool),
        None => param(condor, POOL_PARAM).await,
    };
    let name = match settings.name.clone() {
        Some(name) => Some(name),
        None => param(condor, NAME_PARAM).await,
    };
    ScheddLocator { pool, name }
}

/// Param lookups degrade to "not configured" when the scheduler's
/// configuration cannot be read.
async fn param(condor: &dyn Condor, name: &str) -> Option<String> {
    match condor.param(name).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(param = name, error = %e, "Could not read configuration param");
            None
        }
    }
}
