use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::get;
use axum::routing::post;
use busy_probe::FlagMonitor;
use busy_probe::LoadMonitor;
use tower_busy::Reply;
use tower_busy::TooBusyConfig;
use tower_busy::TooBusyLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 1. Setup Monitor: flipped by hand through the admin route
    let monitor = Arc::new(FlagMonitor::default());

    // 2. Setup Gate: JSON message, and keep /health answering while busy
    let config = TooBusyConfig::default()
        .with_message(serde_json::json!({ "error": "server too busy" }))
        .with_max_lag(Duration::from_millis(70));
    let gate = TooBusyLayer::new(monitor.clone(), config).handler(
        |head: &Parts, reply: &mut Reply| {
            if head.uri.path() == "/health" {
                reply.status(StatusCode::OK).send("busy");
            }
        },
    );
    let _shutdown = gate.shutdown_guard();

    // 3. Build the Router. Only routes added before `.layer()` are gated.
    let admin = Router::new()
        .route("/admin/overload/{state}", post(set_overload))
        .with_state(monitor);

    let app = Router::new()
        .route("/", get(|| async { "Hello, Busy!" }))
        .route("/health", get(|| async { "ok" }))
        .layer(gate)
        .merge(admin);

    // 4. Serve
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .unwrap();
    println!("📡 Listening on http://127.0.0.1:3000");
    println!("   curl -X POST http://127.0.0.1:3000/admin/overload/on");

    axum::serve(listener, app).await.unwrap();
}

async fn set_overload(
    State(monitor): State<Arc<FlagMonitor>>,
    Path(state): Path<String>,
) -> (StatusCode, String) {
    match state.as_str() {
        "on" => {
            monitor.set_overloaded(true);
        }
        "off" => {
            monitor.set_overloaded(false);
        }
        other => return (StatusCode::BAD_REQUEST, format!("unknown state `{other}`")),
    }
    (
        StatusCode::OK,
        format!("overloaded: {}", monitor.is_overloaded()),
    )
}
