//! Spherical geometry for service-area classification.
//!
//! Coordinates are converted to unit vectors and polygon containment is
//! decided on the sphere, so edges follow great circles rather than straight
//! lines in latitude/longitude space.

use serde::Deserialize;

/// Geographic coordinate in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    fn to_unit_vector(self) -> Vec3 {
        let lat = self.lat.to_radians();
        let lng = self.lng.to_radians();
        Vec3 {
            x: lat.cos() * lng.cos(),
            y: lat.cos() * lng.sin(),
            z: lat.sin(),
        }
    }
}

/// Geographic bounding box, used as a geocoding viewport hint.
#[derive(Clone, Copy, Debug)]
pub struct LatLngBounds {
    pub north_east: LatLng,
    pub south_west: LatLng,
}

#[derive(Clone, Copy, Debug)]
struct Vec3 {
    x: f64,
    y: f64,
    z: f64,
}

impl Vec3 {
    const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    fn plus(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    fn neg(self) -> Vec3 {
        Vec3 {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    fn normalized(self) -> Vec3 {
        let norm = self.dot(self).sqrt();
        Vec3 {
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
        }
    }
}

/// A closed loop of vertices on the unit sphere.
///
/// Containment is the parity of great-circle edge crossings along the arc
/// from a reference point outside the loop to the queried point. Winding
/// order of the vertices does not matter.
pub struct SphericalPolygon {
    vertices: Vec<Vec3>,
    outside: Vec3,
}

impl SphericalPolygon {
    /// Builds a polygon from a vertex loop. The loop must span much less
    /// than a hemisphere, which holds for any city-scale service area.
    pub fn new(points: &[LatLng]) -> Self {
        assert!(points.len() >= 3, "polygon needs at least three vertices");
        let vertices: Vec<Vec3> = points.iter().map(|p| p.to_unit_vector()).collect();
        // The antipode of the vertex centroid is guaranteed to lie outside
        // a loop smaller than a hemisphere.
        let centroid = vertices
            .iter()
            .fold(Vec3::ZERO, |acc, v| acc.plus(*v))
            .normalized();
        Self {
            vertices,
            outside: centroid.neg(),
        }
    }

    pub fn contains(&self, point: LatLng) -> bool {
        let target = point.to_unit_vector();
        let n = self.vertices.len();
        let mut crossings = 0u32;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            if arcs_cross(self.outside, target, a, b) {
                crossings += 1;
            }
        }
        crossings % 2 == 1
    }
}

/// Whether the great-circle arcs p-q and a-b (each shorter than a half
/// circle) share an interior point. Zero determinants count as no crossing,
/// which keeps boundary queries deterministic for identical input.
fn arcs_cross(p: Vec3, q: Vec3, a: Vec3, b: Vec3) -> bool {
    let n1 = p.cross(q);
    let n2 = a.cross(b);

    // Both arcs must straddle the other's great circle.
    if n1.dot(a) * n1.dot(b) >= 0.0 || n2.dot(p) * n2.dot(q) >= 0.0 {
        return false;
    }

    // The two circles meet at two antipodal points; the arcs only cross if
    // the same one of them lies on both arcs.
    let intersection = n1.cross(n2).normalized();
    let candidate = if intersection.dot(p.plus(q)) > 0.0 {
        intersection
    } else {
        intersection.neg()
    };
    candidate.dot(a.plus(b)) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> SphericalPolygon {
        SphericalPolygon::new(&[
            LatLng::new(49.5, 23.5),
            LatLng::new(49.5, 24.5),
            LatLng::new(50.5, 24.5),
            LatLng::new(50.5, 23.5),
        ])
    }

    #[test]
    fn contains_an_interior_point() {
        assert!(unit_square().contains(LatLng::new(50.0, 24.0)));
    }

    #[test]
    fn excludes_exterior_points_on_all_sides() {
        let square = unit_square();
        assert!(!square.contains(LatLng::new(51.0, 24.0)));
        assert!(!square.contains(LatLng::new(49.0, 24.0)));
        assert!(!square.contains(LatLng::new(50.0, 25.0)));
        assert!(!square.contains(LatLng::new(50.0, 23.0)));
    }

    #[test]
    fn excludes_far_away_points() {
        assert!(!unit_square().contains(LatLng::new(-33.9, 151.2)));
    }

    #[test]
    fn winding_order_does_not_matter() {
        let reversed = SphericalPolygon::new(&[
            LatLng::new(50.5, 23.5),
            LatLng::new(50.5, 24.5),
            LatLng::new(49.5, 24.5),
            LatLng::new(49.5, 23.5),
        ]);
        assert!(reversed.contains(LatLng::new(50.0, 24.0)));
        assert!(!reversed.contains(LatLng::new(51.0, 24.0)));
    }

    #[test]
    fn concave_polygon_classifies_the_notch_as_outside() {
        // A "U" shape: the notch between the arms is outside.
        let u_shape = SphericalPolygon::new(&[
            LatLng::new(49.0, 23.0),
            LatLng::new(49.0, 25.0),
            LatLng::new(50.0, 25.0),
            LatLng::new(50.0, 24.4),
            LatLng::new(49.4, 24.4),
            LatLng::new(49.4, 23.6),
            LatLng::new(50.0, 23.6),
            LatLng::new(50.0, 23.0),
        ]);
        assert!(u_shape.contains(LatLng::new(49.2, 24.0)));
        assert!(!u_shape.contains(LatLng::new(49.8, 24.0)));
        assert!(u_shape.contains(LatLng::new(49.7, 23.3)));
    }

    #[test]
    fn repeated_queries_are_deterministic() {
        let square = unit_square();
        let boundary_adjacent = LatLng::new(49.5000001, 24.0);
        let first = square.contains(boundary_adjacent);
        for _ in 0..10 {
            assert_eq!(square.contains(boundary_adjacent), first);
        }
    }
}
