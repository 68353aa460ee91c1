use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::classad::{parse_ads, quote, AdReader, ClassAd};
use crate::condor::{AdStream, Condor, ScheddLocator};
use crate::error::{CeViewError, Result};

pub const DEFAULT_CONDOR_CONFIG: &str = "/etc/condor-ce/condor_config";

/// Scheduler access through `condor_q`, `condor_status`, `condor_config_val`
/// and `condor_version`, all run against one configuration file.
#[derive(Debug, Clone)]
pub struct CondorCli {
    config_file: PathBuf,
}

impl Default for CondorCli {
    fn default() -> Self {
        Self::new(DEFAULT_CONDOR_CONFIG)
    }
}

impl CondorCli {
    pub fn new(config_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        tracing::debug!(program, args = ?args, "Running scheduler command");
        let mut cmd = Command::new(program);
        cmd.args(args)
            .env("CONDOR_CONFIG", &self.config_file)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    async fn output(&self, program: &str, args: &[String]) -> Result<(ExitStatus, String)> {
        let output = self
            .command(program, args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| CeViewError::Spawn {
                command: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(program, status = %output.status, stderr = %stderr.trim(), "Scheduler command failed");
        }
        Ok((
            output.status,
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }

    fn job_query_args(locator: &ScheddLocator, constraint: &str, projection: &[&str]) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref pool) = locator.pool {
            args.push("-pool".to_string());
            args.push(pool.clone());
        }
        if let Some(ref name) = locator.name {
            args.push("-name".to_string());
            args.push(name.clone());
        }
        args.push("-long".to_string());
        args.push("-constraint".to_string());
        args.push(constraint.to_string());
        if !projection.is_empty() {
            args.push("-attributes".to_string());
            args.push(projection.join(","));
        }
        args
    }

    fn schedd_query_args(locator: &ScheddLocator) -> Vec<String> {
        let mut args = vec!["-schedd".to_string(), "-long".to_string()];
        if let Some(ref pool) = locator.pool {
            args.push("-pool".to_string());
            args.push(pool.clone());
        }
        if let Some(ref name) = locator.name {
            args.push("-constraint".to_string());
            args.push(format!("Name =?= {}", quote(name)));
        }
        args
    }
}

/// State threaded through the job-ad stream.
///
/// Lines are decoded lossily: a byte that is not UTF-8 only degrades the
/// attribute it appears in.
struct JobQuery<R> {
    stdout: R,
    line: Vec<u8>,
    reader: AdReader,
    child: Option<Child>,
}

impl<R> JobQuery<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn new(stdout: R, child: Option<Child>) -> Self {
        Self {
            stdout,
            line: Vec::new(),
            reader: AdReader::new(),
            child,
        }
    }

    async fn next_ad(&mut self) -> Option<Result<ClassAd>> {
        loop {
            self.line.clear();
            match self.stdout.read_until(b'\n', &mut self.line).await {
                Ok(0) => {
                    if let Some(ad) = std::mem::take(&mut self.reader).finish() {
                        return Some(Ok(ad));
                    }
                    let mut child = self.child.take()?;
                    return match child.wait().await {
                        Ok(status) if status.success() => None,
                        Ok(status) => Some(Err(CeViewError::CommandFailed {
                            command: "condor_q".to_string(),
                            status: status.to_string(),
                        })),
                        Err(e) => Some(Err(e.into())),
                    };
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&self.line);
                    if let Some(ad) = self.reader.push_line(&line) {
                        return Some(Ok(ad));
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    fn into_stream(self) -> AdStream {
        stream::unfold(Some(self), |state| async move {
            let mut query = state?;
            match query.next_ad().await? {
                Ok(ad) => Some((Ok(ad), Some(query))),
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }
}

#[async_trait]
impl Condor for CondorCli {
    async fn param(&self, name: &str) -> Result<Option<String>> {
        let (status, stdout) = self
            .output("condor_config_val", &[name.to_string()])
            .await?;
        let value = stdout.trim();
        if !status.success() || value.is_empty() {
            return Ok(None);
        }
        Ok(Some(value.to_string()))
    }

    async fn version(&self) -> Result<String> {
        let (status, stdout) = self.output("condor_version", &[]).await?;
        if !status.success() {
            return Err(CeViewError::CommandFailed {
                command: "condor_version".to_string(),
                status: status.to_string(),
            });
        }
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    async fn query_jobs(
        &self,
        locator: &ScheddLocator,
        constraint: &str,
        projection: &[&str],
    ) -> Result<AdStream> {
        let args = Self::job_query_args(locator, constraint, projection);
        let mut child = self
            .command("condor_q", &args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| CeViewError::Spawn {
                command: "condor_q".to_string(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            CeViewError::Internal("condor_q stdout was not captured".to_string())
        })?;

        Ok(JobQuery::new(BufReader::new(stdout), Some(child)).into_stream())
    }

    async fn schedd_ad(&self, locator: &ScheddLocator) -> Result<ClassAd> {
        let args = Self::schedd_query_args(locator);
        let (status, stdout) = self.output("condor_status", &args).await?;
        if !status.success() {
            return Err(CeViewError::CommandFailed {
                command: "condor_status".to_string(),
                status: status.to_string(),
            });
        }
        parse_ads(&stdout)
            .into_iter()
            .next()
            .ok_or_else(|| CeViewError::ScheddNotFound(locator.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condor::ALL_JOBS;
    use crate::jobs::{tally_stream, PilotCounts, PilotKey, VoCounts};

    #[test]
    fn local_job_query_has_no_pool_args() {
        let args = CondorCli::job_query_args(&ScheddLocator::local(), ALL_JOBS, &["JobStatus"]);
        assert_eq!(
            args,
            vec!["-long", "-constraint", "true", "-attributes", "JobStatus"]
        );
    }

    #[test]
    fn pool_job_query_names_the_schedd() {
        let locator = ScheddLocator::in_pool("ce.example.org:9619", Some("ce.example.org".to_string()));
        let args = CondorCli::job_query_args(&locator, ALL_JOBS, &["JobStatus", "x509UserProxyVOName"]);
        assert_eq!(&args[..4], &["-pool", "ce.example.org:9619", "-name", "ce.example.org"]);
        assert_eq!(args.last().map(String::as_str), Some("JobStatus,x509UserProxyVOName"));
    }

    #[test]
    fn schedd_query_quotes_the_name() {
        let locator = ScheddLocator::in_pool("pool:9619", Some("ce\"1".to_string()));
        let args = CondorCli::schedd_query_args(&locator);
        assert_eq!(args.last().map(String::as_str), Some(r#"Name =?= "ce\"1""#));
    }

    #[test]
    fn default_uses_ce_config() {
        assert_eq!(
            CondorCli::default().config_file(),
            Path::new(DEFAULT_CONDOR_CONFIG)
        );
    }

    #[tokio::test]
    async fn job_stream_splits_ads_on_blank_lines() {
        let output: &'static [u8] = b"JobStatus = 2\nx509UserProxyVOName = \"OSG\"\n\nJobStatus = 1\n";
        let ads: Vec<_> = JobQuery::new(output, None).into_stream().collect().await;
        assert_eq!(ads.len(), 2);
        assert!(ads.iter().all(|ad| ad.is_ok()));
    }

    #[tokio::test]
    async fn non_utf8_subject_degrades_instead_of_failing() {
        let output: &'static [u8] = b"JobStatus = 2\n\
x509UserProxyVOName = \"OSG\"\n\
x509userproxysubject = \"/CN=Jos\xe9\"\n\
\n\
JobStatus = 1\n\
x509UserProxyVOName = \"OSG\"\n";

        let vos: VoCounts = tally_stream(JobQuery::new(output, None).into_stream())
            .await
            .unwrap();
        let osg = vos.get("OSG").unwrap();
        assert_eq!((osg.running, osg.idle, osg.jobs), (1, 1, 2));

        let pilots: PilotCounts = tally_stream(JobQuery::new(output, None).into_stream())
            .await
            .unwrap();
        assert_eq!(pilots.len(), 2);
        let lossy = pilots
            .get(&PilotKey::new("/CN=Jos\u{FFFD}", "OSG", ""))
            .unwrap();
        assert_eq!(lossy.running, 1);
    }
}
