//! Dashboard route definitions.

use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use super::state::AppState;
use crate::report::dashboard::{DashboardPage, ErrorPage, IndexPage};
use crate::report::export::table_csv;
use crate::session::Session;
use crate::terminus::{MetricsPeriod, MetricsQuery, TerminusError};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics_page))
        .route("/metrics.csv", get(metrics_csv))
        .route("/health", get(health))
}

#[derive(Debug, Deserialize)]
struct MetricsParams {
    site: String,
    env: String,
    #[serde(default)]
    period: Option<String>,
}

impl MetricsParams {
    fn query(&self) -> Result<MetricsQuery, Response> {
        let period = match self.period.as_deref() {
            None | Some("") => MetricsPeriod::Day,
            Some(p) => p
                .parse::<MetricsPeriod>()
                .map_err(|msg| error_page(StatusCode::BAD_REQUEST, "Invalid period", msg))?,
        };
        Ok(MetricsQuery::new(&self.site, &self.env, period))
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339()
        }
    }))
}

async fn index() -> Response {
    render(IndexPage::new("", "", MetricsPeriod::Day))
}

async fn metrics_page(State(state): State<AppState>, Query(params): Query<MetricsParams>) -> Response {
    let session = match fetch(&state, &params).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    if let Some(table) = &session.table {
        match table_csv(table) {
            Ok(bytes) => state.exports.put(&session.query, bytes).await,
            Err(e) => warn!(error = %e, "CSV not prepared for download"),
        }
    }

    let alert_status = match (&session.spike, &state.notifier) {
        (Some(spike), Some(notifier)) => match notifier.notify_spike(spike).await {
            Ok(()) => "Spike alert sent.".to_string(),
            Err(e) => {
                warn!(error = %e, "spike alert not delivered");
                format!("Spike alert not sent: {}", e)
            }
        },
        _ => String::new(),
    };

    render(DashboardPage::new(&session).with_alert_status(alert_status))
}

/// Serves the table the dashboard last rendered for this query; runs terminus
/// only when nothing fresh is stored.
async fn metrics_csv(State(state): State<AppState>, Query(params): Query<MetricsParams>) -> Response {
    let query = match params.query() {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    if let Some(bytes) = state.exports.get(&query).await {
        return csv_download(&query, bytes);
    }

    let session = match fetch(&state, &params).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let Some(table) = &session.table else {
        let message = session
            .parse_diagnostic
            .clone()
            .unwrap_or_else(|| "No table to export.".to_string());
        return error_page(StatusCode::NOT_FOUND, "Nothing to export", message);
    };

    match table_csv(table) {
        Ok(bytes) => csv_download(&session.query, bytes),
        Err(e) => error_page(StatusCode::INTERNAL_SERVER_ERROR, "Export failed", e.to_string()),
    }
}

fn csv_download(query: &MetricsQuery, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", query.csv_file_name()),
            ),
        ],
        bytes,
    )
        .into_response()
}

async fn fetch(state: &AppState, params: &MetricsParams) -> Result<Session, Response> {
    let query = params.query()?;
    Session::fetch(&state.terminus, query, &state.policy)
        .await
        .map_err(|e| {
            let status = match &e {
                TerminusError::InvalidTarget { .. } => StatusCode::BAD_REQUEST,
                TerminusError::Spawn { .. } | TerminusError::Failed { .. } => StatusCode::BAD_GATEWAY,
            };
            warn!(error = %e, "metrics fetch failed");
            error_page(status, "Could not fetch metrics", e.to_string())
        })
}

fn render<T: Template>(page: T) -> Response {
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("An error occurred: {}", e)).into_response()
        }
    }
}

fn error_page(status: StatusCode, title: &str, message: String) -> Response {
    let page = ErrorPage { title, message };
    let mut response = render(page);
    if response.status() == StatusCode::OK {
        *response.status_mut() = status;
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::exports::ExportCache;
    use crate::config::PolicyConfig;
    use crate::terminus::Terminus;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        super::super::router(AppState {
            terminus: Terminus::new("/nonexistent/terminus-binary"),
            policy: PolicyConfig::default(),
            notifier: None,
            exports: ExportCache::default(),
        })
    }

    async fn get(uri: &str) -> (StatusCode, String) {
        let resp = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_index_renders_form() {
        let (status, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<form method=\"get\" action=\"/metrics\">"));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn test_invalid_period_is_bad_request() {
        let (status, body) = get("/metrics?site=a&env=live&period=year").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Invalid period"));
    }

    #[tokio::test]
    async fn test_invalid_site_is_bad_request() {
        let (status, _) = get("/metrics?site=-rf&env=live").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_terminus_is_bad_gateway() {
        let (status, body) = get("/metrics?site=mysite&env=live&period=week").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("Could not fetch metrics"));
        assert!(body.contains("Is terminus installed"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (status, _) = get("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
