//! Great-circle math shared by the route engine and the fleet optimizer.
//!
//! Distances are in nautical miles, angles in degrees, positions WGS84.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

const METERS_PER_NM: f64 = 1852.0;

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "lng", alias = "longitude")]
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(CoreError::InvalidCoordinate {
                latitude: self.lat,
                longitude: self.lon,
            })
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}

/// Great-circle distance between two points (Haversine formula).
pub fn distance_nm(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Same as [`distance_nm`] but validates both endpoints first.
pub fn checked_distance_nm(a: GeoPoint, b: GeoPoint) -> Result<f64> {
    a.validate()?;
    b.validate()?;
    Ok(distance_nm(a, b))
}

/// Initial bearing from `a` to `b`, normalized to `[0, 360)`.
pub fn bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_lambda = (b.lon - a.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_bearing(x.atan2(y).to_degrees())
}

/// Same as [`bearing_deg`] but validates both endpoints first.
pub fn checked_bearing_deg(a: GeoPoint, b: GeoPoint) -> Result<f64> {
    a.validate()?;
    b.validate()?;
    Ok(bearing_deg(a, b))
}

pub fn normalize_bearing(deg: f64) -> f64 {
    let value = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if value >= 360.0 {
        0.0
    } else {
        value
    }
}

/// Destination point after travelling `distance_nm` along `bearing_deg`.
pub fn offset_by_bearing(start: GeoPoint, distance_nm: f64, bearing_deg: f64) -> GeoPoint {
    if distance_nm.abs() <= f64::EPSILON {
        return start;
    }

    let lat1 = start.lat.to_radians();
    let lon1 = start.lon.to_radians();
    let bearing_rad = bearing_deg.to_radians();
    let angular_distance = distance_nm / EARTH_RADIUS_NM;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    GeoPoint::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Point at `fraction` (0..=1) along the great circle from `a` to `b`.
pub fn interpolate(a: GeoPoint, b: GeoPoint, fraction: f64) -> GeoPoint {
    if fraction <= 0.0 {
        return a;
    }
    if fraction >= 1.0 {
        return b;
    }
    let total = distance_nm(a, b);
    if total <= f64::EPSILON {
        return a;
    }
    let delta = total / EARTH_RADIUS_NM;
    let sin_delta = delta.sin();
    if sin_delta.abs() <= f64::EPSILON {
        return offset_by_bearing(a, total * fraction, bearing_deg(a, b));
    }

    let phi1 = a.lat.to_radians();
    let lambda1 = a.lon.to_radians();
    let phi2 = b.lat.to_radians();
    let lambda2 = b.lon.to_radians();

    let wa = ((1.0 - fraction) * delta).sin() / sin_delta;
    let wb = (fraction * delta).sin() / sin_delta;
    let x = wa * phi1.cos() * lambda1.cos() + wb * phi2.cos() * lambda2.cos();
    let y = wa * phi1.cos() * lambda1.sin() + wb * phi2.cos() * lambda2.sin();
    let z = wa * phi1.sin() + wb * phi2.sin();

    GeoPoint::new(
        z.atan2((x * x + y * y).sqrt()).to_degrees(),
        y.atan2(x).to_degrees(),
    )
}

/// `count` points evenly spaced along the great circle, endpoints included.
pub fn sample_great_circle(a: GeoPoint, b: GeoPoint, count: usize) -> Vec<GeoPoint> {
    let count = count.max(2);
    (0..count)
        .map(|idx| interpolate(a, b, idx as f64 / (count - 1) as f64))
        .collect()
}

/// Sum of great-circle legs along an ordered path.
pub fn path_length_nm(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_nm(pair[0], pair[1]))
        .sum()
}

// ==== Local tangent-plane projection ====
// Latitude-aware degree scaling, good enough for the short legs of a coastal network.

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Project `point` into an east/north plane (nautical miles) centred on `reference`.
pub fn project_nm(point: GeoPoint, reference: GeoPoint) -> (f64, f64) {
    let east = (point.lon - reference.lon) * meters_per_deg_lon(reference.lat) / METERS_PER_NM;
    let north = (point.lat - reference.lat) * meters_per_deg_lat(reference.lat) / METERS_PER_NM;
    (east, north)
}

/// Inverse of [`project_nm`].
pub fn unproject_nm(east_nm: f64, north_nm: f64, reference: GeoPoint) -> GeoPoint {
    GeoPoint::new(
        reference.lat + north_nm * METERS_PER_NM / meters_per_deg_lat(reference.lat),
        reference.lon + east_nm * METERS_PER_NM / meters_per_deg_lon(reference.lat),
    )
}

/// Fraction along `start -> end` of the point closest to `point`, in the local plane.
pub fn closest_fraction_on_segment(point: GeoPoint, start: GeoPoint, end: GeoPoint) -> f64 {
    let (px, py) = project_nm(point, point);
    let (ax, ay) = project_nm(start, point);
    let (bx, by) = project_nm(end, point);
    let (sx, sy) = (bx - ax, by - ay);
    let seg_len_sq = sx * sx + sy * sy;
    if seg_len_sq < 1e-12 {
        return 0.0;
    }
    (((px - ax) * sx + (py - ay) * sy) / seg_len_sq).clamp(0.0, 1.0)
}

/// Minimum distance from a point to a route segment.
///
/// The plane is centred on `point`, so accuracy is best close to the point,
/// which is where the hazard and clearance checks care about it.
pub fn distance_to_segment_nm(point: GeoPoint, start: GeoPoint, end: GeoPoint) -> f64 {
    let (ax, ay) = project_nm(start, point);
    let (bx, by) = project_nm(end, point);
    let (sx, sy) = (bx - ax, by - ay);
    let seg_len_sq = sx * sx + sy * sy;

    if seg_len_sq < 1e-12 {
        return (ax * ax + ay * ay).sqrt();
    }

    // Point sits at the origin of the plane.
    let t = ((-ax * sx - ay * sy) / seg_len_sq).clamp(0.0, 1.0);
    let cx = ax + t * sx;
    let cy = ay + t * sy;
    (cx * cx + cy * cy).sqrt()
}

pub(crate) fn segments_intersect_2d(
    a1: (f64, f64),
    a2: (f64, f64),
    b1: (f64, f64),
    b2: (f64, f64),
) -> bool {
    // Tolerance in nautical miles on locally-projected coordinates.
    const EPS: f64 = 1e-9;

    fn orient(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> f64 {
        (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
    }

    fn within(a: f64, b: f64, value: f64) -> bool {
        let min = a.min(b) - EPS;
        let max = a.max(b) + EPS;
        value >= min && value <= max
    }

    fn on_segment(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> bool {
        within(p.0, q.0, r.0) && within(p.1, q.1, r.1)
    }

    let o1 = orient(a1, a2, b1);
    let o2 = orient(a1, a2, b2);
    let o3 = orient(b1, b2, a1);
    let o4 = orient(b1, b2, a2);

    if o1.abs() <= EPS && on_segment(a1, a2, b1) {
        return true;
    }
    if o2.abs() <= EPS && on_segment(a1, a2, b2) {
        return true;
    }
    if o3.abs() <= EPS && on_segment(b1, b2, a1) {
        return true;
    }
    if o4.abs() <= EPS && on_segment(b1, b2, a2) {
        return true;
    }

    let a_crosses = (o1 > EPS && o2 < -EPS) || (o1 < -EPS && o2 > EPS);
    let b_crosses = (o3 > EPS && o4 < -EPS) || (o3 < -EPS && o4 > EPS);
    a_crosses && b_crosses
}

/// Whether segments `a1-a2` and `b1-b2` intersect, on a plane centred at `a1`.
pub fn segments_intersect(a1: GeoPoint, a2: GeoPoint, b1: GeoPoint, b2: GeoPoint) -> bool {
    segments_intersect_2d(
        project_nm(a1, a1),
        project_nm(a2, a1),
        project_nm(b1, a1),
        project_nm(b2, a1),
    )
}

/// Ray-casting containment test against a polygon ring of `[lat, lon]` vertices.
pub fn point_in_polygon(point: GeoPoint, polygon: &[GeoPoint]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = polygon[i].lat;
        let xi = polygon[i].lon;
        let yj = polygon[j].lat;
        let xj = polygon[j].lon;

        if ((yi > point.lat) != (yj > point.lat))
            && (point.lon < (xj - xi) * (point.lat - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// True if the straight leg `start -> end` touches the interior or boundary of `polygon`.
pub fn segment_crosses_polygon(start: GeoPoint, end: GeoPoint, polygon: &[GeoPoint]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    if point_in_polygon(start, polygon) || point_in_polygon(end, polygon) {
        return true;
    }

    let a1 = project_nm(start, start);
    let a2 = project_nm(end, start);
    let n = polygon.len();
    (0..n).any(|i| {
        let b1 = project_nm(polygon[i], start);
        let b2 = project_nm(polygon[(i + 1) % n], start);
        segments_intersect_2d(a1, a2, b1, b2)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_segments_intersect() {
        let a1 = GeoPoint::new(25.0, 55.0);
        let a2 = GeoPoint::new(26.0, 56.0);
        assert!(segments_intersect(a1, a2, GeoPoint::new(26.0, 55.0), GeoPoint::new(25.0, 56.0)));
        assert!(!segments_intersect(a1, a2, GeoPoint::new(25.0, 55.5), GeoPoint::new(25.2, 56.0)));
    }

    #[test]
    fn one_degree_of_latitude_is_sixty_miles() {
        let dist = distance_nm(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((dist - 60.04).abs() < 0.1, "got {dist}");
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_identity() {
        let a = GeoPoint::new(24.4539, 54.3773);
        let b = GeoPoint::new(25.2697, 55.3095);
        assert!((distance_nm(a, b) - distance_nm(b, a)).abs() < 1e-9);
        assert_eq!(distance_nm(a, a), 0.0);
        assert!(distance_nm(a, b) > 0.0);
    }

    #[test]
    fn bearing_points_east_and_stays_in_range() {
        let east = bearing_deg(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        assert!((east - 90.0).abs() < 1e-6);

        let west = bearing_deg(GeoPoint::new(0.0, 1.0), GeoPoint::new(0.0, 0.0));
        assert!((west - 270.0).abs() < 1e-6);

        let north = bearing_deg(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((0.0..360.0).contains(&north));
    }

    #[test]
    fn checked_helpers_reject_bad_coordinates() {
        let good = GeoPoint::new(25.0, 55.0);
        assert!(matches!(
            checked_distance_nm(good, GeoPoint::new(f64::NAN, 55.0)),
            Err(CoreError::InvalidCoordinate { .. })
        ));
        assert!(checked_bearing_deg(GeoPoint::new(91.0, 0.0), good).is_err());
        assert!(GeoPoint::new(25.0, 181.0).validate().is_err());
        assert!(GeoPoint::new(-90.0, 180.0).validate().is_ok());
    }

    #[test]
    fn offset_round_trips_distance_and_bearing() {
        let start = GeoPoint::new(25.0, 55.0);
        let moved = offset_by_bearing(start, 30.0, 45.0);
        assert!((distance_nm(start, moved) - 30.0).abs() < 1e-6);
        assert!((bearing_deg(start, moved) - 45.0).abs() < 0.1);
    }

    #[test]
    fn interpolated_midpoint_splits_the_leg() {
        let a = GeoPoint::new(24.4539, 54.3773);
        let b = GeoPoint::new(25.2697, 55.3095);
        let mid = interpolate(a, b, 0.5);
        let total = distance_nm(a, b);
        assert!((distance_nm(a, mid) - total / 2.0).abs() < 1e-6);
        assert!((distance_nm(mid, b) - total / 2.0).abs() < 1e-6);
        assert_eq!(sample_great_circle(a, b, 5).len(), 5);
        assert_eq!(sample_great_circle(a, b, 0).len(), 2);
    }

    #[test]
    fn segment_distance_matches_perpendicular_offset() {
        let start = GeoPoint::new(25.0, 55.0);
        let end = GeoPoint::new(25.0, 56.0);
        let mid = interpolate(start, end, 0.5);
        let off = offset_by_bearing(mid, 12.0, 0.0);
        let dist = distance_to_segment_nm(off, start, end);
        assert!((dist - 12.0).abs() < 0.2, "got {dist}");

        // Beyond the end of the segment the distance is to the endpoint.
        let past = offset_by_bearing(end, 5.0, 90.0);
        assert!((distance_to_segment_nm(past, start, end) - 5.0).abs() < 0.05);
    }

    #[test]
    fn polygon_crossing_detects_legs_through_land() {
        let square = vec![
            GeoPoint::new(25.0, 55.0),
            GeoPoint::new(25.0, 55.5),
            GeoPoint::new(25.5, 55.5),
            GeoPoint::new(25.5, 55.0),
        ];
        assert!(point_in_polygon(GeoPoint::new(25.2, 55.2), &square));
        assert!(!point_in_polygon(GeoPoint::new(26.0, 55.2), &square));
        assert!(segment_crosses_polygon(
            GeoPoint::new(25.2, 54.8),
            GeoPoint::new(25.2, 55.8),
            &square
        ));
        assert!(!segment_crosses_polygon(
            GeoPoint::new(25.8, 54.8),
            GeoPoint::new(25.8, 55.8),
            &square
        ));
    }
}
