pub mod api;
mod catalog;
mod config;
mod feed;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use catalog::Catalog;
use config::Config;
use feed::FeedManager;

#[derive(OpenApi)]
#[openapi(
    info(title = "Shuttle Opt-In API", version = "0.1.0"),
    paths(
        api::routes::list_routes,
        api::routes::get_route,
        api::joins::request_join,
        api::joins::list_joins,
        api::health::health_check,
    ),
    components(schemas(
        api::ErrorResponse,
        api::routes::RouteListResponse,
        api::joins::JoinRequest,
        api::joins::JoinResponse,
        api::joins::JoinBoardResponse,
        api::health::HealthResponse,
        feed::RouteCard,
        feed::StopEta,
    )),
    tags(
        (name = "routes", description = "Shuttle routes with live ETAs"),
        (name = "joins", description = "Daily route opt-in"),
        (name = "health", description = "Service health check")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    let catalog = Catalog::from_configs(&config.routes).expect("Invalid route catalog");
    tracing::info!(
        routes = catalog.len(),
        stops = catalog.stop_count(),
        "Loaded route catalog"
    );
    if catalog.is_empty() {
        tracing::warn!("Route catalog is empty; the board will have nothing to show");
    }

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    // Start the simulated live feed
    let feed = Arc::new(FeedManager::new(catalog, &config.feed).expect("Failed to initialize feed"));
    feed.start();

    // Build the app
    let app = Router::new()
        .route("/", get(root))
        .nest("/api", api::router(feed.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");

    tracing::info!("Server running on http://localhost:3000");
    tracing::info!("Swagger UI: http://localhost:3000/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "Shuttle Opt-In API"
}
