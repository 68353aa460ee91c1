use std::path::{Path, PathBuf};

use minijinja::Environment;
use serde::Serialize;

use crate::classad::parse_expr;
use crate::condor::Condor;
use crate::error::Result;
use crate::graphs::MetricName;

pub const INDEX_TEMPLATE: &str = "index.html";
pub const VOS_TEMPLATE: &str = "vos.html";
pub const METRICS_TEMPLATE: &str = "metrics.html";

/// Placeholder for page fields whose backing value is not configured.
pub const UNKNOWN: &str = "Unknown";

/// Page templates loaded from a directory. `.html` templates are
/// auto-escaped.
pub struct Templates {
    dir: PathBuf,
    env: Environment<'static>,
}

impl Templates {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir.clone()));
        Self { dir, env }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        Ok(self.env.get_template(name)?.render(ctx)?)
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates").field("dir", &self.dir).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexPage {
    pub version: String,
    pub ceversion: String,
    pub resource: String,
    pub resourcegroup: String,
    pub batchsys: String,
}

impl IndexPage {
    /// Collect the index fields from the scheduler's version banner and
    /// configuration. Nothing here fails the page: unavailable values read as
    /// `Unknown`.
    pub async fn gather(condor: &dyn Condor) -> Self {
        let version = match condor.version().await {
            Ok(v) if !v.is_empty() => v,
            Ok(_) => UNKNOWN.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read scheduler version");
                UNKNOWN.to_string()
            }
        };
        Self {
            version,
            ceversion: config_text(condor, "HTCondorCEVersion").await,
            resource: config_text(condor, "OSG_Resource").await,
            resourcegroup: config_text(condor, "OSG_ResourceGroup").await,
            batchsys: config_text(condor, "OSG_BatchSystems").await,
        }
    }
}

/// A configuration param read as a ClassAd literal: quoted strings come back
/// unquoted, other expressions verbatim.
async fn config_text(condor: &dyn Condor, name: &str) -> String {
    let raw = match condor.param(name).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return UNKNOWN.to_string(),
        Err(e) => {
            tracing::warn!(param = name, error = %e, "Could not read configuration param");
            return UNKNOWN.to_string();
        }
    };
    parse_expr(&raw)
        .scalar_text()
        .unwrap_or_else(|| raw.trim().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VosPage {
    pub vos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsPage {
    pub metrics: Vec<MetricName>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_from_directory_with_escaping() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(VOS_TEMPLATE),
            "{% for vo in vos %}<li>{{ vo }}</li>{% endfor %}",
        )
        .unwrap();

        let templates = Templates::from_dir(dir.path());
        let page = templates
            .render(
                VOS_TEMPLATE,
                VosPage {
                    vos: vec!["cms".to_string(), "<osg>".to_string()],
                },
            )
            .unwrap();
        assert_eq!(page, "<li>cms</li><li>&lt;osg&gt;</li>");
    }

    #[test]
    fn missing_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let templates = Templates::from_dir(dir.path());
        assert!(templates.render(INDEX_TEMPLATE, ()).is_err());
    }
}
