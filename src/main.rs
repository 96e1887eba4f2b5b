pub mod api;
mod config;
mod models;
mod services;

use std::sync::Arc;

use axum::{Router, routing::get};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[cfg(feature = "dev-tools")]
use axum_sql_viewer::SqlViewerLayer;
#[cfg(feature = "dev-tools")]
use tracing_web_console::TracingLayer;

use config::Config;
use services::{BookingService, PositionHub, RouteTopology};

#[derive(OpenApi)]
#[openapi(
    info(title = "Busline API", version = "0.1.0"),
    paths(
        api::routes::list_routes,
        api::routes::get_route_stations,
        api::schedules::list_schedules_by_route,
        api::bookings::create_booking,
        api::bookings::cancel_booking,
        api::bookings::get_seat_map,
        api::tracking::report_position,
        api::tracking::get_last_position,
        api::health::health_check,
    ),
    components(schemas(
        api::ErrorResponse,
        api::routes::RouteListResponse,
        api::routes::RouteStationsResponse,
        api::schedules::ScheduleSummary,
        api::schedules::ScheduleListResponse,
        api::bookings::BookingResponse,
        api::bookings::CancelResponse,
        api::bookings::SeatMapRequest,
        api::bookings::SeatMapResponse,
        api::tracking::ReportResponse,
        api::tracking::LastPositionResponse,
        api::health::HealthResponse,
        models::Station,
        models::RouteSummary,
        models::Schedule,
        models::SeatBooking,
        models::BookingStatus,
        models::SeatClass,
        models::LastKnownPosition,
        models::PositionReport,
        models::PositionUpdate,
        services::booking::BookingRequest,
        services::booking::BookingConfirmation,
        services::booking::SeatAvailability,
        services::booking::SeatStatus,
        services::booking::SeatBookedEvent,
    )),
    tags(
        (name = "routes", description = "Route and station endpoints"),
        (name = "schedules", description = "Scheduled departures per route"),
        (name = "bookings", description = "Segment seat booking"),
        (name = "tracking", description = "Live vehicle tracking"),
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
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    tracing::info!(
        average_speed_kmh = config.tracking.average_speed_kmh,
        "Loaded configuration"
    );

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

    // Initialize SQLite database
    let cwd = std::env::current_dir().expect("Failed to get current directory");
    let db_path = cwd.join("database");
    if let Err(e) = std::fs::create_dir_all(&db_path) {
        tracing::warn!("Could not create database directory: {}", e);
    }
    let db_file = db_path.join("data.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_file.display());
    let pool = SqlitePool::connect(&db_url)
        .await
        .expect("Failed to connect to SQLite database");

    // Run migrations
    let migrator = sqlx::migrate!("./migrations");
    tracing::info!(migrations = migrator.migrations.len(), "Found migrations");
    migrator
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Database migrations completed");

    // Construct the core services
    let topology = Arc::new(RouteTopology::new(pool.clone()));
    let booking_service = Arc::new(BookingService::new(pool.clone(), topology.clone()));
    let hub = Arc::new(PositionHub::new(
        pool.clone(),
        topology.clone(),
        &config.tracking,
    ));

    // Build the app
    #[allow(unused_mut)] // mut needed when dev-tools feature is enabled
    let mut app = Router::new()
        .route("/", get(root))
        .nest("/api", api::router(pool.clone(), topology, booking_service, hub))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Add dev tools only when feature is enabled
    #[cfg(feature = "dev-tools")]
    {
        let tracing_layer = TracingLayer::new("/tracing");
        app = app
            .merge(SqlViewerLayer::sqlite("/sql-viewer", pool.clone()).into_router())
            .merge(tracing_layer.into_router());
        tracing::warn!("Dev tools enabled: SQL Viewer and Tracing Console are accessible");
    }

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");

    tracing::info!("Server running on http://localhost:3000");
    tracing::info!("Swagger UI: http://localhost:3000/swagger-ui");
    #[cfg(feature = "dev-tools")]
    {
        tracing::info!("SQL Viewer: http://localhost:3000/sql-viewer");
        tracing::info!("Tracing Console: http://localhost:3000/tracing");
    }

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "Busline API"
}
