use reqwest::header::ACCEPT;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::BackendConfig;
use crate::response::{AnalysisResponse, QueryRequest};

const GENERIC_FAILURE: &str = "An error occurred while processing your query";
const NO_ANALYSIS: &str = "The server returned no analysis";

/// Why a submission produced no analysis. Every variant is terminal for its submission.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("The request timed out. The analysis service took too long to respond.")]
    Timeout,
    #[error("The request was cancelled.")]
    Cancelled,
    #[error("Could not reach the analysis service: {0}")]
    Transport(String),
    #[error("{}", status_text(.status, .message))]
    Status { status: u16, message: Option<String> },
    #[error("{0}")]
    Server(String),
    #[error("The server returned an invalid response.")]
    InvalidResponse,
}

fn status_text(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(msg) => msg.to_string(),
        None => format!("{} (HTTP {})", GENERIC_FAILURE, status),
    }
}

impl QueryError {
    fn transport(err: reqwest::Error) -> Self {
        QueryError::Transport(err.to_string())
    }
}

pub struct QueryClient {
    base_url: String,
    timeout: Duration,
    send_accept_header: bool,
    client: reqwest::Client,
}

impl QueryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, send_accept_header: bool) -> Self {
        QueryClient {
            base_url: base_url.into(),
            timeout,
            send_accept_header,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.base_url.clone(), config.timeout(), config.send_accept_header)
    }

    pub fn endpoint(&self) -> String {
        format!("{}/query", self.base_url.trim_end_matches('/'))
    }

    /// Posts `query` to the backend and waits for the analysis.
    ///
    /// Resolves exactly once: with the parsed response, or with the first of
    /// timeout, cancellation, transport failure or an unusable body.
    pub async fn submit(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<AnalysisResponse, QueryError> {
        let url = self.endpoint();
        let started = Instant::now();
        tracing::info!(%url, query_len = query.len(), "dispatching query");

        let mut request = self.client.post(&url).json(&QueryRequest { query });
        if self.send_accept_header {
            request = request.header(ACCEPT, "application/json");
        }

        let exchange = async {
            let response = request.send().await.map_err(QueryError::transport)?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(QueryError::transport)?;
            interpret(status, &body)
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(QueryError::Cancelled),
            result = tokio::time::timeout(self.timeout, exchange) => {
                result.unwrap_or(Err(QueryError::Timeout))
            }
        };

        match &outcome {
            Ok(_) => tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "query answered"),
            Err(e) => tracing::warn!(elapsed_ms = started.elapsed().as_millis() as u64, error = %e, "query failed"),
        }

        outcome
    }
}

/// Maps a status code and raw body onto the response or its failure category.
pub fn interpret(status: u16, body: &[u8]) -> Result<AnalysisResponse, QueryError> {
    let parsed = serde_json::from_slice::<AnalysisResponse>(body);

    if !(200..300).contains(&status) {
        let message = parsed
            .ok()
            .and_then(|r| r.error_message().map(str::to_string));
        return Err(QueryError::Status { status, message });
    }

    let response = parsed.map_err(|e| {
        tracing::debug!("unparsable response body: {}", e);
        QueryError::InvalidResponse
    })?;

    if let Some(message) = response.error_message() {
        return Err(QueryError::Server(message.to_string()));
    }

    match response.analysis.as_deref() {
        Some(text) if !text.trim().is_empty() => Ok(response),
        _ => Err(QueryError::Server(NO_ANALYSIS.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_backend;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    fn client_for(base_url: &str) -> QueryClient {
        QueryClient::new(base_url, Duration::from_secs(5), true)
    }

    #[test]
    fn test_interpret_success() {
        let body = br#"{"analysis": "All quiet", "raw_data": []}"#;
        let response = interpret(200, body).unwrap();
        assert_eq!(response.analysis.as_deref(), Some("All quiet"));
    }

    #[test]
    fn test_interpret_status_uses_server_message() {
        let err = interpret(404, br#"{"error": "No results found"}"#).unwrap_err();
        assert_eq!(
            err,
            QueryError::Status { status: 404, message: Some("No results found".to_string()) }
        );
        assert_eq!(err.to_string(), "No results found");
    }

    #[test]
    fn test_interpret_status_without_json_falls_back() {
        let err = interpret(502, b"<html>Bad Gateway</html>").unwrap_err();
        assert_eq!(err, QueryError::Status { status: 502, message: None });
        assert!(err.to_string().contains("HTTP 502"));
    }

    #[test]
    fn test_interpret_invalid_json() {
        assert_eq!(interpret(200, b"not json").unwrap_err(), QueryError::InvalidResponse);
        assert_eq!(interpret(200, b"[1, 2]").unwrap_err(), QueryError::InvalidResponse);
    }

    #[test]
    fn test_interpret_error_field_on_success_status() {
        let err = interpret(200, br#"{"analysis": "x", "error": "quota exceeded"}"#).unwrap_err();
        assert_eq!(err, QueryError::Server("quota exceeded".to_string()));
    }

    #[test]
    fn test_interpret_keeps_analysis_with_odd_details() {
        let body = br#"{
            "analysis": "**3** phishing incidents",
            "query_details": {"query_focus": "phishing", "filter_criteria": {"type": "phishing"}},
            "raw_data": []
        }"#;
        let response = interpret(200, body).unwrap();
        assert_eq!(response.analysis.as_deref(), Some("**3** phishing incidents"));
        assert_eq!(
            response.query_details.unwrap().filter_criteria,
            vec!["type: phishing".to_string()]
        );
    }

    #[test]
    fn test_interpret_missing_analysis() {
        let err = interpret(200, br#"{"raw_data": {}}"#).unwrap_err();
        assert_eq!(err.to_string(), NO_ANALYSIS);
    }

    #[test]
    fn test_timeout_text_differs_from_transport() {
        let timeout = QueryError::Timeout.to_string();
        let transport = QueryError::Transport("connection refused".to_string()).to_string();
        assert_ne!(timeout, transport);
        assert!(timeout.contains("timed out"));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = client_for("http://localhost:5000/");
        assert_eq!(client.endpoint(), "http://localhost:5000/query");
    }

    #[tokio::test]
    async fn test_submit_sends_json_with_headers() {
        let router = Router::new().route(
            "/query",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let content_type = headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let accept = headers
                    .get("accept")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({
                    "analysis": format!("{}|{}|{}", content_type, accept, body["query"].as_str().unwrap_or_default()),
                }))
            }),
        );
        let base_url = spawn_backend(router).await;

        let response = client_for(&base_url)
            .submit("weekly incidents", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            response.analysis.as_deref(),
            Some("application/json|application/json|weekly incidents")
        );
    }

    #[tokio::test]
    async fn test_submit_falls_back_to_default_accept() {
        let router = Router::new().route(
            "/query",
            post(|headers: HeaderMap| async move {
                let accept = headers
                    .get("accept")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("<missing>")
                    .to_string();
                Json(json!({ "analysis": format!("accept={}", accept) }))
            }),
        );
        let base_url = spawn_backend(router).await;

        let client = QueryClient::new(&base_url, Duration::from_secs(5), false);
        let response = client.submit("q", CancellationToken::new()).await.unwrap();
        assert_eq!(response.analysis.as_deref(), Some("accept=*/*"));
    }

    #[tokio::test]
    async fn test_submit_surfaces_not_found_message() {
        let router = Router::new().route(
            "/query",
            post(|| async {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "No results found" })))
            }),
        );
        let base_url = spawn_backend(router).await;

        let err = client_for(&base_url)
            .submit("nothing", CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No results found");
    }

    #[tokio::test]
    async fn test_submit_times_out() {
        let router = Router::new().route(
            "/query",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "analysis": "too late" }))
            }),
        );
        let base_url = spawn_backend(router).await;

        let client = QueryClient::new(&base_url, Duration::from_millis(100), true);
        let err = client.submit("slow", CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, QueryError::Timeout);
    }

    #[tokio::test]
    async fn test_submit_cancelled() {
        let router = Router::new().route(
            "/query",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "analysis": "too late" }))
            }),
        );
        let base_url = spawn_backend(router).await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = client_for(&base_url).submit("slow", cancel).await.unwrap_err();
        assert_eq!(err, QueryError::Cancelled);
    }

    #[tokio::test]
    async fn test_submit_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(&format!("http://{}", addr))
            .submit("anyone there", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Transport(_)));
    }
}
