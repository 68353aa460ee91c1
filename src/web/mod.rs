//! HTTP front end.
//!
//! Every request goes to one fallback handler, which runs the decoded path
//! through the ordered [`RouteTable`] and dispatches on the matched
//! [`Endpoint`]. JSON endpoints query the scheduler and fold the job stream;
//! HTML endpoints render templates; graph endpoints delegate to the
//! [`GraphDelegate`](crate::graphs::GraphDelegate).

pub mod render;
pub mod router;
pub mod templates;

use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::condor::{Condor, ALL_JOBS};
use crate::config::Settings;
use crate::error::{CeViewError, Result};
use crate::graphs::{GraphDelegate, GraphRequest, MetricFamily, DEFAULT_INTERVAL};
use crate::jobs::{tally_stream, PilotCounts, Tally, Totals, VoCounts};
use crate::runtime::Runtime;

use render::{ad_to_json, pilot_rows, unix_time, Payload, TotalsBody};
pub use router::{Endpoint, RouteParams, RouteTable};
use templates::{IndexPage, MetricsPage, VosPage, INDEX_TEMPLATE, METRICS_TEMPLATE, VOS_TEMPLATE};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub condor: Arc<dyn Condor>,
    graphs: Option<Arc<dyn GraphDelegate>>,
    routes: Arc<RouteTable<Endpoint>>,
    runtime: Arc<OnceCell<Arc<Runtime>>>,
}

impl AppState {
    pub fn new(settings: Settings, condor: Arc<dyn Condor>) -> Self {
        Self {
            settings: Arc::new(settings),
            condor,
            graphs: None,
            routes: Arc::new(RouteTable::standard()),
            runtime: Arc::new(OnceCell::new()),
        }
    }

    /// Use `graphs` instead of drawing from the spool dir.
    pub fn with_graphs(mut self, graphs: Arc<dyn GraphDelegate>) -> Self {
        self.graphs = Some(graphs);
        self
    }

    /// The resolved runtime, built by the first caller. Concurrent first
    /// callers wait on the same initialization.
    pub async fn runtime(&self) -> Result<Arc<Runtime>> {
        self.runtime
            .get_or_try_init(|| async {
                Runtime::resolve(&self.settings, self.condor.as_ref(), self.graphs.clone())
                    .await
                    .map(Arc::new)
            })
            .await
            .cloned()
    }
}

impl IntoResponse for CeViewError {
    fn into_response(self) -> Response {
        let status = if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, self.to_string()).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_web(addr: SocketAddr, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Starting web server");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Web server stopped");
    Ok(())
}

/// Percent-decode a request path, keeping the raw form if it does not
/// decode to UTF-8.
fn decode_path(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

async fn dispatch(State(state): State<AppState>, uri: Uri) -> Response {
    let path = decode_path(uri.path());

    let Some(matched) = state.routes.lookup(&path) else {
        tracing::debug!(path = %path, "No route matched");
        return render::not_found(&path);
    };
    let endpoint = *matched.handler;
    tracing::debug!(path = %path, endpoint = ?endpoint, "Routing request");

    match handle(&state, endpoint, &matched.params).await {
        Ok(payload) => payload.into_response(),
        Err(e) => {
            tracing::error!(path = %path, endpoint = ?endpoint, error = %e, "Request failed");
            e.into_response()
        }
    }
}

async fn handle(state: &AppState, endpoint: Endpoint, params: &RouteParams) -> Result<Payload> {
    let runtime = state.runtime().await?;

    match endpoint {
        Endpoint::Index => {
            let page = IndexPage::gather(state.condor.as_ref()).await;
            Ok(Payload::html(runtime.templates.render(INDEX_TEMPLATE, page)?))
        }
        Endpoint::Vos => {
            let vos = runtime.graphs.list_vos().await?;
            Ok(Payload::html(
                runtime.templates.render(VOS_TEMPLATE, VosPage { vos })?,
            ))
        }
        Endpoint::Metrics => {
            let metrics = runtime.graphs.list_metrics().await?;
            Ok(Payload::html(
                runtime.templates.render(METRICS_TEMPLATE, MetricsPage { metrics })?,
            ))
        }
        Endpoint::Totals => {
            let totals: Totals = query_jobs(state, &runtime).await?;
            Payload::json(&TotalsBody::new(&totals, unix_time()))
        }
        Endpoint::Pilots => {
            let pilots: PilotCounts = query_jobs(state, &runtime).await?;
            Payload::json(&pilot_rows(&pilots))
        }
        Endpoint::Schedd => {
            let ad = state.condor.schedd_ad(&runtime.locator).await?;
            Payload::json(&ad_to_json(&ad))
        }
        Endpoint::VosJson => {
            let vos: VoCounts = query_jobs(state, &runtime).await?;
            Payload::json(&vos)
        }
        Endpoint::CeGraph => graph(&runtime, MetricFamily::Jobs, Vec::new(), params.get(0)).await,
        Endpoint::VoGraph => {
            let vo = required(params, 0)?;
            graph(&runtime, MetricFamily::Vos, vec![vo], params.get(1)).await
        }
        Endpoint::MetricsGraph => {
            let group = required(params, 0)?;
            let name = required(params, 1)?;
            graph(&runtime, MetricFamily::Metrics, vec![group, name], params.get(2)).await
        }
    }
}

async fn query_jobs<T: Tally>(state: &AppState, runtime: &Runtime) -> Result<T> {
    let ads = state
        .condor
        .query_jobs(&runtime.locator, ALL_JOBS, T::PROJECTION)
        .await?;
    tally_stream(ads).await
}

async fn graph(
    runtime: &Runtime,
    family: MetricFamily,
    params: Vec<String>,
    interval: Option<&str>,
) -> Result<Payload> {
    let request = GraphRequest::new(family, params, interval.unwrap_or(DEFAULT_INTERVAL));
    let image = runtime.graphs.graph(&request).await?;
    Ok(Payload::png(image))
}

fn required(params: &RouteParams, index: usize) -> Result<String> {
    params
        .get(index)
        .map(str::to_string)
        .ok_or_else(|| CeViewError::Internal(format!("route is missing parameter {}", index)))
}
