use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorResponse};
use crate::models::{RouteSummary, Station};

use super::RoutesState;

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteListResponse {
    pub routes: Vec<RouteSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteStationsResponse {
    pub route_id: i64,
    /// Ordered waypoints; coordinates may be missing until provisioned
    pub stations: Vec<Station>,
}

/// List all routes
#[utoipa::path(
    get,
    path = "/api/routes",
    responses(
        (status = 200, description = "List of routes", body = RouteListResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn list_routes(
    State(state): State<RoutesState>,
) -> Result<Json<RouteListResponse>, ApiError> {
    let routes: Vec<RouteSummary> = sqlx::query_as(
        "SELECT id, name, distance_km FROM routes ORDER BY id",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(crate::services::BookingError::from)?;
    let total = routes.len();
    Ok(Json(RouteListResponse { routes, total }))
}

/// Ordered stations of a route, for seat-map segment pickers and the map
/// polyline
#[utoipa::path(
    get,
    path = "/api/routes/{id}/stations",
    params(
        ("id" = i64, Path, description = "Route id")
    ),
    responses(
        (status = 200, description = "Ordered stations of the route", body = RouteStationsResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn get_route_stations(
    State(state): State<RoutesState>,
    Path(id): Path<i64>,
) -> Result<Json<RouteStationsResponse>, ApiError> {
    let route = state.topology.route(id).await?;
    Ok(Json(RouteStationsResponse {
        route_id: id,
        stations: route.stations.clone(),
    }))
}
