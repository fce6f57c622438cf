//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Workflows
        .route("/workflows", get(handlers::workflow::list_workflows))
        .route(
            "/workflows/run/{workflow_name}",
            post(handlers::workflow::run_workflow),
        )
        // Runs
        .route("/runs", get(handlers::run::list_runs))
        .route("/runs/{id}", get(handlers::run::get_run))
        .route("/runs/{id}/resume", post(handlers::run::resume_run))
        .route("/runs/{id}/cancel", post(handlers::run::cancel_run));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn app() -> (Router, TempDir) {
        let dir = TempDir::new().unwrap();
        let state = AppState::open(dir.path().to_path_buf()).await.unwrap();
        (build_router(state), dir)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = ServiceExt::<Request<Body>>::oneshot(app, req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 1_000_000)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = app().await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, json) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_list_workflows() {
        let (app, _dir) = app().await;
        let req = Request::builder()
            .uri("/api/v1/workflows")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app, req).await;

        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"research"));
        assert_eq!(json["_links"]["self"], "/api/v1/workflows");
    }

    #[tokio::test]
    async fn test_run_unknown_workflow_is_404() {
        let (app, _dir) = app().await;
        let req = post_json(
            "/api/v1/workflows/run/missing",
            serde_json::json!({"topic": "graph databases"}),
        );
        let (status, json) = send(app, req).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["data"].is_null());
        assert_eq!(json["errors"][0]["code"], "WORKFLOW_NOT_FOUND");
        let available = json["errors"][0]["details"]["available"].as_array().unwrap();
        assert!(available.iter().any(|n| n == "research"));
    }

    #[tokio::test]
    async fn test_run_invalid_request_is_400() {
        let (app, _dir) = app().await;
        let req = post_json("/api/v1/workflows/run/research", serde_json::json!({"topic": " ab "}));
        let (status, json) = send(app, req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"][0]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_run_is_404() {
        let (app, _dir) = app().await;
        let id = uuid::Uuid::now_v7();

        let req = Request::builder()
            .uri(format!("/api/v1/runs/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app.clone(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["errors"][0]["code"], "RUN_NOT_FOUND");

        let req = post_json(&format!("/api/v1/runs/{id}/cancel"), serde_json::json!({}));
        let (status, _) = send(app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_runs_empty() {
        let (app, _dir) = app().await;
        let req = Request::builder()
            .uri("/api/v1/runs?limit=5")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], serde_json::json!([]));
    }
}
