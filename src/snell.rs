//! Surface interaction rules for the ray propagation engine.
//!
//! Implements the direction change a ray undergoes when it meets an optical
//! surface: specular reflection for mirrors, vector-form Snell refraction
//! (with a total-internal-reflection fallback) for plain lens surfaces, and
//! the converging/diverging focal heuristics used by the teaching
//! visualization for convex and concave lenses.
//!
//! The lens heuristics are deliberately not exact thin-lens optics: the
//! further a hit point sits from the central axis, the more the outgoing
//! direction tilts toward (convex) or away from (concave) that axis,
//! parameterized by an assumed focal length. The intent is a readable
//! demonstration of converging and diverging behavior, not an accurate
//! optical model.

use nalgebra::{Point3, Vector3};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reflection_preserves_incidence_angle() {
        let d = Vector3::new(1.0, -1.0, 0.0).normalize();
        let n = Vector3::new(0.0, 1.0, 0.0);
        let r = reflect(&d, &n);
        assert_relative_eq!((-d.dot(&n)).acos(), r.dot(&n).acos(), epsilon = 1e-6);
        assert_relative_eq!(r.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn head_on_mirror_reverses() {
        let d = Vector3::new(1.0, 0.0, 0.0);
        let n = Vector3::new(-1.0, 0.0, 0.0);
        let r = reflect(&d, &n);
        assert_relative_eq!(r.x, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn normal_incidence_refraction_goes_straight() {
        let d = Vector3::new(1.0, 0.0, 0.0);
        let n = Vector3::new(-1.0, 0.0, 0.0);
        let r = refract(&d, &n, 1.5);
        assert_relative_eq!(r.dot(&d), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn refraction_bends_toward_normal_entering_denser_medium() {
        let d = Vector3::new(1.0, -1.0, 0.0).normalize();
        let n = Vector3::new(0.0, 1.0, 0.0);
        let r = refract(&d, &n, 1.5);
        // Transmitted angle from the (downward) normal is smaller than incident
        let cos_i = (-d.dot(&n)).abs();
        let cos_t = r.dot(&-n).abs();
        assert!(cos_t > cos_i);
    }

    #[test]
    fn grazing_incidence_total_internal_reflection() {
        // Refractive index below 1 models exiting into a rarer medium; at a
        // steep angle the discriminant goes negative and the mirror formula
        // must apply.
        let d = Vector3::new(1.0, -0.05, 0.0).normalize();
        let n = Vector3::new(0.0, 1.0, 0.0);
        let r = refract(&d, &n, 0.2);
        let mirrored = reflect(&d, &n);
        assert_relative_eq!(r.x, mirrored.x, epsilon = 1e-6);
        assert_relative_eq!(r.y, mirrored.y, epsilon = 1e-6);
    }

    #[test]
    fn convex_tilts_toward_axis() {
        let hit = Point3::new(1.0, 0.8, 0.0);
        let d = converge(&hit, 5.0);
        assert!(d.y < 0.0);
        assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn concave_tilts_away_from_axis() {
        let hit = Point3::new(1.0, 0.8, -0.4);
        let d = diverge(&hit, 5.0);
        assert!(d.y > 0.0);
        assert!(d.z < 0.0);
    }

    #[test]
    fn axial_hit_passes_through_lens_centre() {
        let hit = Point3::new(1.0, 0.0, 0.0);
        let c = converge(&hit, 5.0);
        let v = diverge(&hit, 5.0);
        assert_relative_eq!(c.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(v.x, 1.0, epsilon = 1e-6);
    }
}

/// Specular reflection of `direction` about the unit surface `normal`.
pub fn reflect(direction: &Vector3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
    direction - normal * (2.0 * direction.dot(normal))
}

/// Vector-form Snell refraction through a surface of the given refractive
/// index, with the surrounding medium at index 1. When the discriminant
/// `1 - n^2 (1 - cos_i^2)` is negative the ray undergoes total internal
/// reflection and the mirror formula applies instead.
pub fn refract(direction: &Vector3<f32>, normal: &Vector3<f32>, refr_index: f32) -> Vector3<f32> {
    let n1 = 1.0;
    let n2 = refr_index;

    let cos_i = -normal.dot(direction);
    // Orient the normal against the incoming ray
    let normal = if cos_i < 0.0 { -normal } else { *normal };

    let eta = if cos_i < 0.0 { n2 / n1 } else { n1 / n2 };
    let cos_t2 = 1.0 - eta * eta * (1.0 - cos_i * cos_i);

    if cos_t2 < 0.0 {
        reflect(direction, &normal)
    } else {
        direction * eta + normal * (eta * cos_i - cos_t2.sqrt())
    }
}

/// Converging lens heuristic: the outgoing direction tilts toward the
/// central (x) axis in proportion to the hit point's off-axis offset.
pub fn converge(hit: &Point3<f32>, focal_length: f32) -> Vector3<f32> {
    Vector3::new(1.0, -hit.y / focal_length, -hit.z / focal_length).normalize()
}

/// Diverging lens heuristic: the sign-flipped counterpart of [`converge`].
pub fn diverge(hit: &Point3<f32>, focal_length: f32) -> Vector3<f32> {
    Vector3::new(1.0, hit.y / focal_length, hit.z / focal_length).normalize()
}
