use geo_types::Point;

use crate::entities::Coordinates;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters.
pub fn haversine_distance(a: Coordinates, b: Coordinates) -> f64 {
    let a: Point<f64> = a.into();
    let b: Point<f64> = b.into();

    let (lat1, lat2) = (a.y().to_radians(), b.y().to_radians());
    let d_lat = (b.y() - a.y()).to_radians();
    let d_lng = (b.x() - a.x()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Inclusive: a point exactly on the boundary is inside.
pub fn within_radius(center: Coordinates, point: Coordinates, radius_meters: f64) -> bool {
    haversine_distance(center, point) <= radius_meters
}
