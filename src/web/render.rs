//! Response bodies: JSON documents, rendered pages, and images, all with the
//! same one-minute public cache directive.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};

use crate::classad::ClassAd;
use crate::error::Result;
use crate::jobs::{JobCounts, PilotCounts, Totals};

pub const CACHE_CONTROL: &str = "max-age=60, public";

pub const JSON: &str = "application/json";
pub const HTML: &str = "text/html";
pub const PNG: &str = "image/png";

/// A successful response body and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub content_type: &'static str,
    pub body: Bytes,
}

impl Payload {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self {
            content_type: JSON,
            body: Bytes::from(serde_json::to_vec(value)?),
        })
    }

    pub fn html(page: String) -> Self {
        Self {
            content_type: HTML,
            body: Bytes::from(page),
        }
    }

    pub fn png(image: Bytes) -> Self {
        Self {
            content_type: PNG,
            body: image,
        }
    }
}

impl IntoResponse for Payload {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, self.content_type),
                (header::CACHE_CONTROL, CACHE_CONTROL),
            ],
            self.body,
        )
            .into_response()
    }
}

/// JSON form of an ad. Each attribute is evaluated in the ad's scope and
/// scalar results are emitted as-is; undefined values, lists, records and
/// expressions that cannot be computed are emitted as
/// `{"_condor_type": "expr", "expr": "<expression text>"}` so callers can
/// re-parse them.
pub fn ad_to_json(ad: &ClassAd) -> Map<String, JsonValue> {
    ad.iter()
        .map(|attr| {
            let value = ad.evaluate(&attr.name).to_json().unwrap_or_else(|| {
                json!({
                    "_condor_type": "expr",
                    "expr": attr.expr,
                })
            });
            (attr.name.clone(), value)
        })
        .collect()
}

/// Current time as fractional seconds since the epoch, for `UpdateDate`.
pub fn unix_time() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TotalsBody {
    pub running: u64,
    pub idle: u64,
    pub held: u64,
    pub update_date: f64,
}

impl TotalsBody {
    pub fn new(totals: &Totals, update_date: f64) -> Self {
        Self {
            running: totals.counts.running,
            idle: totals.counts.idle,
            held: totals.counts.held,
            update_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PilotRow<'a> {
    #[serde(flatten)]
    pub counts: &'a JobCounts,
    #[serde(rename = "DN")]
    pub dn: &'a str,
    #[serde(rename = "VO")]
    pub vo: &'a str,
    #[serde(rename = "VOMS")]
    pub voms: &'a str,
}

pub fn pilot_rows(pilots: &PilotCounts) -> Vec<PilotRow<'_>> {
    pilots
        .iter()
        .map(|(key, counts)| PilotRow {
            counts,
            dn: &key.dn,
            vo: &key.vo,
            voms: &key.voms,
        })
        .collect()
}

/// Escape text for inclusion in HTML.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// 404 page echoing the requested path, pointing the client at the index.
pub fn not_found(path: &str) -> Response {
    let body = format!(
        "Resource {} not found",
        html_escape(path.trim_start_matches('/'))
    );
    (
        StatusCode::NOT_FOUND,
        [
            (header::CONTENT_TYPE, HTML),
            (header::CACHE_CONTROL, CACHE_CONTROL),
            (header::LOCATION, "/"),
        ],
        body,
    )
        .into_response()
}
