use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use glass_optimizer_core::{
    render_svg, EnhancedOptimizationResult, GlassProject, InMemoryProjectRepository,
    OptimizationRequest, OptimizationResult, Optimizer, OptimizerError, PlateOrientation,
    ProjectRepository,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Glass Cutting Optimizer</title>
</head>
<body>
    <h1>Glass Cutting Optimizer API</h1>
    <h2>API Endpoints:</h2>
    <ul>
        <li>GET /api/health - Health check</li>
        <li>POST /api/optimize - Run optimization</li>
        <li>POST /api/generate/svg?orientation=TOP_LEFT - Plate diagram for a plan</li>
        <li>POST /api/projects - Save a project</li>
        <li>GET /api/projects - List projects, newest first</li>
        <li>GET /api/projects/:id - Load a project</li>
        <li>DELETE /api/projects/:id - Delete a project</li>
    </ul>
</body>
</html>"#;

#[derive(Clone, Default)]
struct AppState {
    projects: Arc<Mutex<InMemoryProjectRepository>>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Glass Optimizer API");

    let app = app(AppState::default());

    let addr = std::env::var("GLASS_OPTIMIZER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind to {}: {}", addr, err);
            std::process::exit(1);
        }
    };

    info!("API server listening on http://{}", addr);
    info!("Try: curl http://localhost:3000/api/health");

    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
        std::process::exit(1);
    }
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/health", get(health_check))
        .route("/api/optimize", post(optimize))
        .route("/api/generate/svg", post(generate_svg))
        .route("/api/projects", post(save_project).get(list_projects))
        .route("/api/projects/:id", get(load_project).delete(delete_project))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "glass-optimizer-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Main optimization endpoint
async fn optimize(
    Json(request): Json<OptimizationRequest>,
) -> Result<Json<EnhancedOptimizationResult>, AppError> {
    info!(
        "Received optimization request with {} cuts on {} × {} cm plates",
        request.cuts.len(),
        request.plate_width,
        request.plate_height
    );

    let optimizer = Optimizer::new(request)?;
    let result = tokio::task::spawn_blocking(move || optimizer.optimize())
        .await
        .map_err(anyhow::Error::from)?;

    info!(
        "Optimization complete: {} plates, {:.2}% utilization, {} cuts",
        result.primary.total_plates,
        result.primary.average_utilization,
        result.primary.total_guillotine_cuts
    );

    Ok(Json(result))
}

#[derive(Deserialize)]
struct SvgParams {
    #[serde(default)]
    orientation: PlateOrientation,
}

/// Generate SVG visualization
async fn generate_svg(
    Query(params): Query<SvgParams>,
    Json(result): Json<OptimizationResult>,
) -> Result<Response, AppError> {
    info!("Generating SVG for {} plates", result.plates.len());

    let svg = render_svg(&result, params.orientation).map_err(anyhow::Error::from)?;

    Ok((StatusCode::OK, [("Content-Type", "image/svg+xml")], svg).into_response())
}

async fn save_project(
    State(state): State<AppState>,
    Json(project): Json<GlassProject>,
) -> Result<Response, AppError> {
    let id = state.projects.lock().await.save(project)?;
    info!("Saved project {}", id);
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<GlassProject>>, AppError> {
    Ok(Json(state.projects.lock().await.list()?))
}

async fn load_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GlassProject>, AppError> {
    Ok(Json(state.projects.lock().await.load(&id)?))
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.projects.lock().await.delete(&id)?;
    info!("Deleted project {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Application error type
struct AppError(anyhow::Error);

impl From<OptimizerError> for AppError {
    fn from(err: OptimizerError) -> Self {
        AppError(err.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request error: {}", self.0);

        let status = match self.0.downcast_ref::<OptimizerError>() {
            Some(OptimizerError::InvalidInput(_)) | Some(OptimizerError::PieceExceedsPlate { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Some(OptimizerError::ProjectNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = json!({ "error": self.0.to_string() });
        if let Some(OptimizerError::PieceExceedsPlate { pieces, .. }) =
            self.0.downcast_ref::<OptimizerError>()
        {
            body["pieces"] = json!(pieces);
        }

        (status, Json(body)).into_response()
    }
}

async fn serve_index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn send(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn exact_fit_request() -> serde_json::Value {
        json!({
            "plateWidth": 100.0,
            "plateHeight": 100.0,
            "cuts": [{ "id": "A", "width": 50.0, "height": 50.0, "quantity": 4 }]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(AppState::default());
        let response = send(&app, "GET", "/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_optimize() {
        let app = app(AppState::default());
        let response = send(&app, "POST", "/api/optimize", Some(exact_fit_request())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["primary"]["totalPlates"], 1);
        assert_eq!(body["validation"]["isValid"], true);
        assert_eq!(body["metadata"]["confidenceLevel"], "HIGH");
        assert_eq!(body["primary"]["instructions"][0]["type"], "horizontal");
    }

    #[tokio::test]
    async fn test_oversized_piece_is_bad_request() {
        let app = app(AppState::default());
        let request = json!({
            "plateWidth": 260.0,
            "plateHeight": 180.0,
            "cuts": [{ "id": "X", "width": 300.0, "height": 50.0, "quantity": 1 }]
        });
        let response = send(&app, "POST", "/api/optimize", Some(request)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["pieces"][0]["requestId"], "X");
    }

    #[tokio::test]
    async fn test_generate_svg() {
        let app = app(AppState::default());
        let result = json_body(send(&app, "POST", "/api/optimize", Some(exact_fit_request())).await).await;

        let response = send(
            &app,
            "POST",
            "/api/generate/svg?orientation=BOTTOM_RIGHT",
            Some(result["primary"].clone()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/svg+xml");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let svg = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(svg.contains("A-1"));
        assert!(svg.contains("from bottom right"));
    }

    #[tokio::test]
    async fn test_project_lifecycle() {
        let app = app(AppState::default());
        let project = json!({
            "projectName": "Kitchen",
            "plateWidth": 260.0,
            "plateHeight": 180.0,
            "cutsRequested": [{ "id": "a", "width": 50.0, "height": 40.0, "quantity": 2 }],
            "plateOrientation": "TOP_RIGHT"
        });

        let response = send(&app, "POST", "/api/projects", Some(project)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = json_body(response).await["id"].as_str().unwrap().to_string();

        let response = send(&app, "GET", &format!("/api/projects/{}", id), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let loaded = json_body(response).await;
        assert_eq!(loaded["projectName"], "Kitchen");
        assert_eq!(loaded["plateOrientation"], "TOP_RIGHT");

        let listed = json_body(send(&app, "GET", "/api/projects", None).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let response = send(&app, "DELETE", &format!("/api/projects/{}", id), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, "GET", &format!("/api/projects/{}", id), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
