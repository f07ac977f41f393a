//! Streamable-HTTP transport: one JSON-RPC message per `POST /mcp`.
//!
//! Stateless. Every request is handled by the same [`McpServer`] the stdio
//! loop uses, so tool behavior is identical on both transports.

use crate::mcp::McpServer;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
struct AppState {
    server: McpServer,
    auth_token: Option<Arc<str>>,
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn handle_mcp(State(state): State<AppState>, body: String) -> Response {
    match state.server.handle_message(&body).await {
        Some(resp) => Json(resp).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn require_token(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.auth_token.as_deref() else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    if provided == Some(expected) {
        next.run(req).await
    } else {
        warn!("Rejected unauthenticated request to {}", req.uri().path());
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// `/health` stays open; `/mcp` requires the bearer token when one is set.
pub fn router(server: McpServer, auth_token: Option<String>) -> Router {
    let state = AppState {
        server,
        auth_token: auth_token.filter(|t| !t.is_empty()).map(Arc::from),
    };

    let mcp = Router::new()
        .route("/mcp", post(handle_mcp))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health))
        .merge(mcp)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(server: McpServer, addr: &str, auth_token: Option<String>) -> anyhow::Result<()> {
    if auth_token.as_deref().map_or(true, str::is_empty) {
        warn!("HTTP transport has no auth token; /mcp is open to anyone who can reach it");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("MCP HTTP server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(server, auth_token)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxmox::{Credentials, ProxmoxClient};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(token: Option<&str>) -> Router {
        let creds = Credentials::with_password("http://127.0.0.1:1", "root@pam", "pw");
        let server = McpServer::new(ProxmoxClient::new(creds).unwrap());
        router(server, token.map(String::from))
    }

    fn post_mcp(body: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let response = app(Some("secret"))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_or_wrong_token_is_rejected() {
        let ping = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;

        let response = app(Some("secret")).oneshot(post_mcp(ping, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(Some("secret"))
            .oneshot(post_mcp(ping, Some("wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_tools_list_with_token() {
        let body = r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#;
        let response = app(Some("secret"))
            .oneshot(post_mcp(body, Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["id"], 7);
        assert!(!v["result"]["tools"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_is_accepted_without_body() {
        let body = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        let response = app(None).oneshot(post_mcp(body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_parse_error_is_returned_as_json_rpc() {
        let response = app(None).oneshot(post_mcp("{oops", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"]["code"], -32700);
        assert!(v["id"].is_null());
    }
}
