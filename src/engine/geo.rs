use serde::Serialize;
use utoipa::ToSchema;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default geofence radius: 50 meters. An employee must be physically at the
/// site for the scan to resolve to it.
pub const DEFAULT_RADIUS_KM: f64 = 0.05;

/// A named coordinate the geofence resolver can match against. Anchors come
/// from locations and their sites; rows without coordinates are skipped.
#[derive(Debug, Clone)]
pub struct GeofenceAnchor {
    pub location_id: Option<u64>,
    pub site_id: Option<u64>,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// The anchor a scan resolved to, with its distance rounded for display.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GeofenceHit {
    pub location_id: Option<u64>,
    pub site_id: Option<u64>,
    pub name: String,
    pub distance_km: f64,
}

/// Great-circle distance between two coordinates in kilometers, rounded to
/// two decimal places. Returns `None` if any input is not a finite number.
///
/// Symmetric: `distance_km(a, b) == distance_km(b, a)`.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<f64> {
    haversine_km(lat1, lon1, lat2, lon2).map(super::round2)
}

/// Unrounded haversine distance. The geofence comparison uses this directly:
/// rounding to 2 decimals quantizes to 10 m steps, which would pull a point
/// 50.1 m away inside a 50 m fence.
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<f64> {
    if ![lat1, lon1, lat2, lon2].iter().all(|v| v.is_finite()) {
        return None;
    }

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    Some(EARTH_RADIUS_KM * c)
}

/// Resolve a coordinate to the nearest anchor within `radius_km` (boundary
/// inclusive), or `None` when nothing qualifies or the inputs are unusable.
///
/// Anchors tied on distance resolve to the first one in input order.
pub fn resolve(
    lat: f64,
    lon: f64,
    anchors: &[GeofenceAnchor],
    radius_km: f64,
) -> Option<GeofenceHit> {
    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }

    let mut best: Option<(&GeofenceAnchor, f64)> = None;

    for anchor in anchors {
        let (Some(a_lat), Some(a_lon)) = (anchor.latitude, anchor.longitude) else {
            continue;
        };
        let Some(distance) = haversine_km(lat, lon, a_lat, a_lon) else {
            continue;
        };
        if distance > radius_km {
            continue;
        }
        // Strict improvement only, so the first anchor wins ties.
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((anchor, distance));
        }
    }

    best.map(|(anchor, distance)| GeofenceHit {
        location_id: anchor.location_id,
        site_id: anchor.site_id,
        name: anchor.name.clone(),
        distance_km: super::round2(distance),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(site_id: u64, name: &str, lat: f64, lon: f64) -> GeofenceAnchor {
        GeofenceAnchor {
            location_id: Some(1),
            site_id: Some(site_id),
            name: name.to_string(),
            latitude: Some(lat),
            longitude: Some(lon),
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = (40.7128, -74.0060);
        let b = (34.0522, -118.2437);
        assert_eq!(
            distance_km(a.0, a.1, b.0, b.1),
            distance_km(b.0, b.1, a.0, a.1)
        );
    }

    #[test]
    fn distance_between_identical_points_is_zero() {
        assert_eq!(distance_km(40.7128, -74.0060, 40.7128, -74.0060), Some(0.0));
    }

    #[test]
    fn distance_matches_known_offsets() {
        // Pure latitude offsets: one degree of latitude is ~111.19 km.
        let base = (40.712800, -74.006000);
        // ~10 m
        assert_eq!(
            distance_km(base.0, base.1, base.0 + 0.000090, base.1),
            Some(0.01)
        );
        // ~50 m
        assert_eq!(
            distance_km(base.0, base.1, base.0 + 0.000450, base.1),
            Some(0.05)
        );
        // ~100 m
        assert_eq!(
            distance_km(base.0, base.1, base.0 + 0.000900, base.1),
            Some(0.10)
        );
    }

    #[test]
    fn distance_rejects_non_finite_input() {
        assert_eq!(distance_km(f64::NAN, 0.0, 0.0, 0.0), None);
        assert_eq!(distance_km(0.0, f64::INFINITY, 0.0, 0.0), None);
    }

    #[test]
    fn resolve_picks_nearest_within_radius() {
        let anchors = vec![
            anchor(1, "Office A", 40.713450, -74.006000),
            anchor(2, "Office B", 40.712810, -74.006000),
        ];
        let hit = resolve(40.712800, -74.006000, &anchors, DEFAULT_RADIUS_KM)
            .expect("Office B is ~1 m away");
        assert_eq!(hit.site_id, Some(2));
        assert_eq!(hit.name, "Office B");
    }

    #[test]
    fn resolve_boundary_is_inclusive() {
        let base = (40.712800, -74.006000);
        // ~49.9 m from base: inside the default 50 m fence.
        let near = vec![anchor(1, "Near", base.0 + 0.000449, base.1)];
        assert!(resolve(base.0, base.1, &near, DEFAULT_RADIUS_KM).is_some());

        // ~50.1 m from base: outside, even though the displayed distance
        // would round to 0.05 km.
        let just_outside = vec![anchor(1, "Outside", base.0 + 0.0004506, base.1)];
        assert!(resolve(base.0, base.1, &just_outside, DEFAULT_RADIUS_KM).is_none());

        // Exactly at the boundary: a radius equal to the computed distance
        // still matches.
        let d = haversine_km(base.0, base.1, base.0 + 0.000449, base.1).unwrap();
        assert!(resolve(base.0, base.1, &near, d).is_some());
        assert!(resolve(base.0, base.1, &near, d * 0.999).is_none());
    }

    #[test]
    fn resolve_ties_keep_first_anchor() {
        let base = (40.712800, -74.006000);
        // Same coordinates, both at distance zero.
        let anchors = vec![
            anchor(1, "First", base.0, base.1),
            anchor(2, "Second", base.0, base.1),
        ];
        let hit = resolve(base.0, base.1, &anchors, DEFAULT_RADIUS_KM).unwrap();
        assert_eq!(hit.site_id, Some(1));
    }

    #[test]
    fn resolve_skips_anchors_without_coordinates() {
        let anchors = vec![
            GeofenceAnchor {
                location_id: Some(1),
                site_id: Some(1),
                name: "No coords".to_string(),
                latitude: None,
                longitude: None,
            },
            anchor(2, "Here", 40.7128, -74.0060),
        ];
        let hit = resolve(40.7128, -74.0060, &anchors, DEFAULT_RADIUS_KM).unwrap();
        assert_eq!(hit.site_id, Some(2));
    }

    #[test]
    fn resolve_rejects_unusable_coordinates() {
        let anchors = vec![anchor(1, "Here", 40.7128, -74.0060)];
        assert!(resolve(f64::NAN, -74.0060, &anchors, DEFAULT_RADIUS_KM).is_none());
    }

    #[test]
    fn resolve_empty_anchor_set_is_none() {
        assert!(resolve(40.7128, -74.0060, &[], DEFAULT_RADIUS_KM).is_none());
    }
}
