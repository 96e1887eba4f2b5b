//! Route topology: the ordered-station and distance oracle.
//!
//! Each route's station list is loaded from the database once and cached;
//! the cache entry is rebuilt only when the route definition changes
//! (via [`RouteTopology::invalidate`]).

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::models::Station;
use crate::services::BookingError;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometers
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Immutable snapshot of one route's ordered stations
#[derive(Debug)]
pub struct CachedRoute {
    pub route_id: i64,
    /// Stations sorted by ascending order index
    pub stations: Vec<Station>,
    order_by_name: HashMap<String, i64>,
}

impl CachedRoute {
    pub fn new(route_id: i64, mut stations: Vec<Station>) -> Self {
        stations.sort_by_key(|s| s.order_index);
        let order_by_name = stations
            .iter()
            .map(|s| (normalize(&s.name), s.order_index))
            .collect();
        Self {
            route_id,
            stations,
            order_by_name,
        }
    }

    /// Resolve a station name (case-insensitive, trimmed) to its order index
    pub fn station_order(&self, name: &str) -> Option<i64> {
        self.order_by_name.get(&normalize(name)).copied()
    }

    /// Sum of great-circle distances between consecutive stations with
    /// known coordinates in the order range [from_order, to_order].
    /// Stations with missing coordinates contribute zero distance; this is
    /// an approximation, not an error.
    pub fn cumulative_distance_km(&self, from_order: i64, to_order: i64) -> f64 {
        let mut total = 0.0;
        let span: Vec<&Station> = self
            .stations
            .iter()
            .filter(|s| s.order_index >= from_order && s.order_index <= to_order)
            .collect();
        for pair in span.windows(2) {
            if let (Some(lat1), Some(lng1), Some(lat2), Some(lng2)) =
                (pair[0].lat, pair[0].lng, pair[1].lat, pair[1].lng)
            {
                total += haversine_km(lat1, lng1, lat2, lng2);
            }
        }
        total
    }
}

/// Cached per-route station lookup, backed by the stations table
pub struct RouteTopology {
    pool: SqlitePool,
    cache: RwLock<HashMap<i64, Arc<CachedRoute>>>,
}

impl RouteTopology {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get the cached snapshot for a route, loading it on first use
    pub async fn route(&self, route_id: i64) -> Result<Arc<CachedRoute>, BookingError> {
        {
            let cache = self.cache.read().await;
            if let Some(route) = cache.get(&route_id) {
                return Ok(route.clone());
            }
        }

        let stations: Vec<Station> = sqlx::query_as(
            "SELECT id, route_id, name, order_index, lat, lng \
             FROM stations WHERE route_id = ? ORDER BY order_index",
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        let route = Arc::new(CachedRoute::new(route_id, stations));
        // Empty routes are not cached so a later provisioning pass is picked up
        if !route.stations.is_empty() {
            let mut cache = self.cache.write().await;
            cache.insert(route_id, route.clone());
        }
        Ok(route)
    }

    /// Resolve a station name on a route to its 1-based order index
    pub async fn station_order(&self, route_id: i64, name: &str) -> Result<i64, BookingError> {
        let route = self.route(route_id).await?;
        route
            .station_order(name)
            .ok_or_else(|| BookingError::UnknownStation {
                route_id,
                station: name.trim().to_string(),
            })
    }

    pub async fn cumulative_distance_km(
        &self,
        route_id: i64,
        from_order: i64,
        to_order: i64,
    ) -> Result<f64, BookingError> {
        let route = self.route(route_id).await?;
        Ok(route.cumulative_distance_km(from_order, to_order))
    }

    /// Drop the cached snapshot for a route after its definition changed
    pub async fn invalidate(&self, route_id: i64) {
        let mut cache = self.cache.write().await;
        cache.remove(&route_id);
    }

    /// Number of routes currently cached (health reporting)
    pub async fn cached_route_count(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(route_id: i64, name: &str, order: i64, coords: Option<(f64, f64)>) -> Station {
        Station {
            id: order,
            route_id,
            name: name.to_string(),
            order_index: order,
            lat: coords.map(|c| c.0),
            lng: coords.map(|c| c.1),
        }
    }

    fn desert_route() -> CachedRoute {
        CachedRoute::new(
            1,
            vec![
                station(1, "Bikaner", 1, Some((28.0229, 73.3119))),
                station(1, "Nagaur", 2, Some((27.2020, 73.7339))),
                station(1, "Jodhpur", 3, Some((26.2389, 73.0243))),
            ],
        )
    }

    #[test]
    fn station_order_is_case_insensitive_and_trimmed() {
        let route = desert_route();
        assert_eq!(route.station_order("bikaner"), Some(1));
        assert_eq!(route.station_order("  JODHPUR "), Some(3));
        assert_eq!(route.station_order("Jaisalmer"), None);
    }

    #[test]
    fn station_order_is_deterministic() {
        let route = desert_route();
        let first = route.station_order("Nagaur");
        for _ in 0..10 {
            assert_eq!(route.station_order("Nagaur"), first);
        }
    }

    #[test]
    fn cumulative_distance_sums_consecutive_legs() {
        let route = desert_route();
        let leg1 = haversine_km(28.0229, 73.3119, 27.2020, 73.7339);
        let leg2 = haversine_km(27.2020, 73.7339, 26.2389, 73.0243);
        let total = route.cumulative_distance_km(1, 3);
        assert!((total - (leg1 + leg2)).abs() < 1e-9);
    }

    #[test]
    fn missing_coordinates_contribute_zero() {
        let route = CachedRoute::new(
            2,
            vec![
                station(2, "A", 1, Some((27.0, 75.0))),
                station(2, "B", 2, None),
                station(2, "C", 3, Some((26.0, 74.0))),
            ],
        );
        // Both legs touch the coordinate-less station B, so nothing is summed
        assert_eq!(route.cumulative_distance_km(1, 3), 0.0);
    }

    #[test]
    fn haversine_known_distance() {
        // Jaipur to Delhi is roughly 240 km great-circle
        let d = haversine_km(26.9124, 75.7873, 28.6139, 77.2090);
        assert!(d > 230.0 && d < 250.0, "unexpected distance {d}");
    }

    #[sqlx::test]
    async fn loads_and_caches_route_from_store(pool: SqlitePool) {
        sqlx::query("INSERT INTO routes (id, name) VALUES (1, 'Bikaner - Jodhpur')")
            .execute(&pool)
            .await
            .unwrap();
        for (name, order) in [("Bikaner", 1), ("Nagaur", 2), ("Jodhpur", 3)] {
            sqlx::query("INSERT INTO stations (route_id, name, order_index) VALUES (1, ?, ?)")
                .bind(name)
                .bind(order)
                .execute(&pool)
                .await
                .unwrap();
        }

        let topology = RouteTopology::new(pool);
        assert_eq!(topology.station_order(1, "Nagaur").await.unwrap(), 2);
        assert_eq!(topology.cached_route_count().await, 1);

        let err = topology.station_order(1, "Jaisalmer").await.unwrap_err();
        assert!(matches!(err, BookingError::UnknownStation { .. }));

        topology.invalidate(1).await;
        assert_eq!(topology.cached_route_count().await, 0);
    }
}
