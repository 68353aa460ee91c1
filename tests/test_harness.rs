//! Test harness for driving the web app against an in-memory scheduler.
//!
//! Provides a fake [`Condor`] with canned job ads and params, a fake graph
//! delegate that records what it was asked to draw, and helpers for issuing
//! requests through the axum router without binding a socket.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use ce_view::classad::ClassAd;
use ce_view::condor::{AdStream, Condor, ScheddLocator};
use ce_view::config::Settings;
use ce_view::error::{CeViewError, Result};
use ce_view::graphs::{GraphDelegate, GraphRequest, MetricName};
use ce_view::web::{app, AppState};

pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// How the fake scheduler misbehaves, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Failure {
    #[default]
    None,
    /// The query cannot be started.
    Unreachable,
    /// The query yields its ads and then fails.
    MidStream,
}

#[derive(Default)]
pub struct FakeCondor {
    pub jobs: Vec<ClassAd>,
    pub schedd: Option<ClassAd>,
    pub params: HashMap<String, String>,
    pub version: String,
    pub failure: Failure,
    pub queries: Mutex<Vec<(ScheddLocator, Vec<String>)>>,
    pub param_calls: Mutex<HashMap<String, usize>>,
}

impl FakeCondor {
    pub fn new() -> Self {
        Self {
            version: "$CondorVersion: 24.0.1 2024-10-31 $".to_string(),
            ..Default::default()
        }
    }

    pub fn with_job(mut self, ad: ClassAd) -> Self {
        self.jobs.push(ad);
        self
    }

    pub fn with_schedd(mut self, ad: ClassAd) -> Self {
        self.schedd = Some(ad);
        self
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = failure;
        self
    }

    pub fn param_calls(&self, name: &str) -> usize {
        self.param_calls
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    fn unreachable() -> CeViewError {
        CeViewError::CommandFailed {
            command: "condor_q".to_string(),
            status: "exit status: 1".to_string(),
        }
    }
}

/// Keep only the projected attributes, the way the scheduler does.
fn project(ad: &ClassAd, projection: &[&str]) -> ClassAd {
    let mut projected = ClassAd::new();
    for attr in ad.iter() {
        if projection
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&attr.name))
        {
            projected.insert(&attr.name, &attr.expr);
        }
    }
    projected
}

#[async_trait]
impl Condor for FakeCondor {
    async fn param(&self, name: &str) -> Result<Option<String>> {
        *self
            .param_calls
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default() += 1;
        Ok(self.params.get(name).cloned())
    }

    async fn version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    async fn query_jobs(
        &self,
        locator: &ScheddLocator,
        _constraint: &str,
        projection: &[&str],
    ) -> Result<AdStream> {
        self.queries.lock().unwrap().push((
            locator.clone(),
            projection.iter().map(|p| p.to_string()).collect(),
        ));
        if self.failure == Failure::Unreachable {
            return Err(Self::unreachable());
        }

        let mut items: Vec<Result<ClassAd>> = self
            .jobs
            .iter()
            .map(|ad| Ok(project(ad, projection)))
            .collect();
        if self.failure == Failure::MidStream {
            items.push(Err(Self::unreachable()));
        }
        Ok(stream::iter(items).boxed())
    }

    async fn schedd_ad(&self, locator: &ScheddLocator) -> Result<ClassAd> {
        if self.failure == Failure::Unreachable {
            return Err(Self::unreachable());
        }
        self.schedd
            .clone()
            .ok_or_else(|| CeViewError::ScheddNotFound(locator.to_string()))
    }
}

#[derive(Default)]
pub struct FakeGraphs {
    pub vos: Vec<String>,
    pub metrics: Vec<MetricName>,
    pub requests: Mutex<Vec<GraphRequest>>,
}

impl FakeGraphs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<GraphRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphDelegate for FakeGraphs {
    async fn list_vos(&self) -> Result<Vec<String>> {
        Ok(self.vos.clone())
    }

    async fn list_metrics(&self) -> Result<Vec<MetricName>> {
        Ok(self.metrics.clone())
    }

    async fn graph(&self, request: &GraphRequest) -> Result<Bytes> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(Bytes::from_static(FAKE_PNG))
    }
}

/// Templates shipped with the crate.
pub fn template_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")
}

pub fn job(status: &str) -> ClassAd {
    ClassAd::new().with("JobStatus", status)
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A web app wired to fakes, with its own spool dir.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub condor: Arc<FakeCondor>,
    pub graphs: Arc<FakeGraphs>,
    pub spool: TempDir,
}

impl TestApp {
    pub fn new(condor: FakeCondor) -> Self {
        Self::with_graphs(condor, FakeGraphs::new())
    }

    pub fn with_graphs(condor: FakeCondor, graphs: FakeGraphs) -> Self {
        Self::with_settings(condor, graphs, Settings::default())
    }

    pub fn with_settings(condor: FakeCondor, graphs: FakeGraphs, settings: Settings) -> Self {
        let spool = tempfile::tempdir().unwrap();
        let settings = settings
            .with_template_dir(template_dir())
            .with_spool_dir(spool.path());
        let condor = Arc::new(condor);
        let graphs = Arc::new(graphs);
        let state = AppState::new(settings, condor.clone()).with_graphs(graphs.clone());

        Self {
            router: app(state.clone()),
            state,
            condor,
            graphs,
            spool,
        }
    }

    pub async fn get(&self, uri: &str) -> Response {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        Response {
            status,
            headers,
            body,
        }
    }
}
