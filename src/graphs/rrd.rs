use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;

use crate::error::{CeViewError, Result};
use crate::graphs::{GraphDelegate, GraphRequest, Interval, MetricFamily, MetricName};

const RRD_EXT: &str = "rrd";

/// Job-state data sources recorded in the `jobs` and `vos` databases.
const JOB_SERIES: [(&str, &str); 3] = [
    ("Running", "#00A000"),
    ("Idle", "#0000C0"),
    ("Held", "#C00000"),
];

/// Graphs drawn by `rrdtool` from round-robin databases under the spool dir:
///
/// - `jobs.rrd` for the whole CE
/// - `vos/<vo>.rrd` per VO
/// - `metrics/<group>/<name>.rrd` per metric, with a single `value` source
#[derive(Debug, Clone)]
pub struct RrdGraphs {
    spool_dir: PathBuf,
    program: String,
}

impl RrdGraphs {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
            program: "rrdtool".to_string(),
        }
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    fn database(&self, request: &GraphRequest) -> Result<PathBuf> {
        if request.params.iter().any(|p| p.is_empty() || p == "." || p == "..") {
            return Err(CeViewError::GraphNotFound(request.params.join("/")));
        }
        let path = match (request.family, request.params.as_slice()) {
            (MetricFamily::Jobs, []) => self.spool_dir.join("jobs").with_extension(RRD_EXT),
            (MetricFamily::Vos, [vo]) => self
                .spool_dir
                .join("vos")
                .join(format!("{}.{}", vo, RRD_EXT)),
            (MetricFamily::Metrics, [group, name]) => self
                .spool_dir
                .join("metrics")
                .join(group)
                .join(format!("{}.{}", name, RRD_EXT)),
            (family, params) => {
                return Err(CeViewError::Internal(format!(
                    "{} graph takes different parameters than {:?}",
                    family, params
                )))
            }
        };
        Ok(path)
    }

    fn graph_args(request: &GraphRequest, interval: Interval, database: &Path) -> Vec<String> {
        let start = match interval {
            Interval::Hourly => "-1hour",
            Interval::Daily => "-1day",
            Interval::Weekly => "-1week",
            Interval::Monthly => "-1month",
            Interval::Yearly => "-1year",
        };
        let title = match request.params.as_slice() {
            [] => format!("CE jobs ({})", interval.as_str()),
            params => format!("{} ({})", params.join(" "), interval.as_str()),
        };
        // rrdtool splits DEF on ':'
        let db = database.to_string_lossy().replace(':', "\\:");

        let mut args: Vec<String> = [
            "graph", "-", "--imgformat", "PNG", "--start", start, "--end", "now", "--width", "600",
            "--height", "200", "--title",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(title);

        match request.family {
            MetricFamily::Jobs | MetricFamily::Vos => {
                args.push("--vertical-label".to_string());
                args.push("jobs".to_string());
                for (ds, color) in JOB_SERIES {
                    let var = ds.to_lowercase();
                    args.push(format!("DEF:{}={}:{}:AVERAGE", var, db, ds));
                    args.push(format!("LINE2:{}{}:{}", var, color, ds));
                }
            }
            MetricFamily::Metrics => {
                let label = request.params.last().cloned().unwrap_or_default();
                args.push(format!("DEF:value={}:value:AVERAGE", db));
                args.push(format!("LINE2:value#0060C0:{}", label));
            }
        }
        args
    }

    async fn list_rrd_stems(dir: &Path) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut stems = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RRD_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
        stems.sort();
        Ok(stems)
    }
}

#[async_trait]
impl GraphDelegate for RrdGraphs {
    async fn list_vos(&self) -> Result<Vec<String>> {
        Self::list_rrd_stems(&self.spool_dir.join("vos")).await
    }

    async fn list_metrics(&self) -> Result<Vec<MetricName>> {
        let metrics_dir = self.spool_dir.join("metrics");
        let mut groups = match tokio::fs::read_dir(&metrics_dir).await {
            Ok(groups) => groups,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut metrics = Vec::new();
        while let Some(entry) = groups.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let group = entry.file_name().to_string_lossy().into_owned();
            for name in Self::list_rrd_stems(&entry.path()).await? {
                metrics.push(MetricName {
                    group: group.clone(),
                    name,
                });
            }
        }
        metrics.sort();
        Ok(metrics)
    }

    async fn graph(&self, request: &GraphRequest) -> Result<Bytes> {
        let interval = Interval::parse(&request.interval)?;
        let database = self.database(request)?;
        if !tokio::fs::try_exists(&database).await? {
            return Err(CeViewError::GraphNotFound(database.display().to_string()));
        }

        let args = Self::graph_args(request, interval, &database);
        tracing::debug!(family = %request.family, database = %database.display(), "Rendering graph");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CeViewError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            tracing::error!(
                family = %request.family,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Graph rendering failed"
            );
            return Err(CeViewError::CommandFailed {
                command: self.program.clone(),
                status: output.status.to_string(),
            });
        }
        Ok(Bytes::from(output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn databases_live_under_the_spool_dir() {
        let graphs = RrdGraphs::new("/var/spool/ce");
        let jobs = GraphRequest::new(MetricFamily::Jobs, vec![], "daily");
        assert_eq!(
            graphs.database(&jobs).unwrap(),
            PathBuf::from("/var/spool/ce/jobs.rrd")
        );

        let vo = GraphRequest::new(MetricFamily::Vos, vec!["OSG".to_string()], "daily");
        assert_eq!(
            graphs.database(&vo).unwrap(),
            PathBuf::from("/var/spool/ce/vos/OSG.rrd")
        );

        let metric = GraphRequest::new(
            MetricFamily::Metrics,
            vec!["schedd".to_string(), "RecentJobsStarted".to_string()],
            "weekly",
        );
        assert_eq!(
            graphs.database(&metric).unwrap(),
            PathBuf::from("/var/spool/ce/metrics/schedd/RecentJobsStarted.rrd")
        );
    }

    #[test]
    fn dot_segments_are_rejected() {
        let graphs = RrdGraphs::new("/var/spool/ce");
        let request = GraphRequest::new(
            MetricFamily::Metrics,
            vec!["..".to_string(), "x".to_string()],
            "daily",
        );
        assert!(matches!(
            graphs.database(&request),
            Err(CeViewError::GraphNotFound(_))
        ));
    }

    #[test]
    fn job_graphs_draw_three_series() {
        let request = GraphRequest::new(MetricFamily::Vos, vec!["OSG".to_string()], "weekly");
        let args = RrdGraphs::graph_args(&request, Interval::Weekly, Path::new("/s/vos/OSG.rrd"));
        assert_eq!(&args[..2], &["graph", "-"]);
        assert!(args.contains(&"-1week".to_string()));
        assert!(args.contains(&"DEF:held=/s/vos/OSG.rrd:Held:AVERAGE".to_string()));
        assert_eq!(args.iter().filter(|a| a.starts_with("LINE2:")).count(), 3);
    }

    #[tokio::test]
    async fn listings_of_missing_dirs_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let graphs = RrdGraphs::new(dir.path());
        assert!(graphs.list_vos().await.unwrap().is_empty());
        assert!(graphs.list_metrics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listings_scan_rrd_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("vos")).unwrap();
        std::fs::write(dir.path().join("vos/osg.rrd"), b"").unwrap();
        std::fs::write(dir.path().join("vos/cms.rrd"), b"").unwrap();
        std::fs::write(dir.path().join("vos/README"), b"").unwrap();
        std::fs::create_dir_all(dir.path().join("metrics/schedd")).unwrap();
        std::fs::write(dir.path().join("metrics/schedd/JobsRunning.rrd"), b"").unwrap();

        let graphs = RrdGraphs::new(dir.path());
        assert_eq!(graphs.list_vos().await.unwrap(), vec!["cms", "osg"]);
        assert_eq!(
            graphs.list_metrics().await.unwrap(),
            vec![MetricName {
                group: "schedd".to_string(),
                name: "JobsRunning".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn missing_database_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let graphs = RrdGraphs::new(dir.path());
        let request = GraphRequest::new(MetricFamily::Jobs, vec![], "daily");
        assert!(matches!(
            graphs.graph(&request).await,
            Err(CeViewError::GraphNotFound(_))
        ));
    }
}
