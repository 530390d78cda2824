//! Ray propagation through planar optical surfaces.
//!
//! Given an origin, a unit direction, a maximum travel distance and a set of
//! surfaces, the engine produces the full multi-bounce light path as an
//! ordered list of segments. Each surface hit re-emits the ray with a
//! direction set by the surface's interaction rule until the depth ceiling
//! is reached or no further surface lies ahead.
//!
//! The path is built iteratively rather than by recursive spawning, so the
//! whole polyline is available as one value and depth is bounded without
//! stack concerns. The trace is a pure function of its inputs: it carries no
//! frame-to-frame state and is only re-run when the declarative inputs
//! change.

use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::settings::PLANE_EPSILON;
use crate::snell;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mirror_at(x: f32) -> Surface {
        Surface {
            position: Point3::new(x, 0.0, 0.0),
            normal: Vector3::new(-1.0, 0.0, 0.0),
            kind: SurfaceKind::Mirror,
        }
    }

    #[test]
    fn no_surfaces_travels_full_length() {
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 10.0);
        let path = trace(&ray, &[], 3, 5.0);
        assert_eq!(path.segments.len(), 1);
        assert_eq!(path.segments[0].end, Point3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn mirror_reflects_head_on() {
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 10.0);
        let path = trace(&ray, &[mirror_at(1.0)], 3, 5.0);
        assert_eq!(path.segments.len(), 2);
        assert_relative_eq!(path.segments[0].end.x, 1.0, epsilon = 1e-6);
        // Outgoing direction is (-1, 0, 0): the second segment runs back
        // through the remaining 4 units of travel
        assert_relative_eq!(path.segments[1].end.x, -3.0, epsilon = 1e-5);
    }

    #[test]
    fn depth_zero_truncates_at_hit_without_child() {
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 10.0);
        let path = trace(&ray, &[mirror_at(1.0)], 0, 5.0);
        assert_eq!(path.segments.len(), 1);
        assert_relative_eq!(path.segments[0].end.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn parallel_surface_is_skipped() {
        let surface = Surface {
            position: Point3::new(0.0, 1.0, 0.0),
            normal: Vector3::new(0.0, 1.0, 0.0),
            kind: SurfaceKind::Mirror,
        };
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 10.0);
        let path = trace(&ray, &[surface], 3, 5.0);
        assert_eq!(path.segments.len(), 1);
        assert_eq!(path.segments[0].end, Point3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn surface_behind_origin_is_ignored() {
        let ray = Ray::new(Point3::new(2.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 10.0);
        let path = trace(&ray, &[mirror_at(1.0)], 3, 5.0);
        assert_eq!(path.segments.len(), 1);
        assert_relative_eq!(path.segments[0].end.x, 12.0, epsilon = 1e-5);
    }

    #[test]
    fn nearest_surface_wins() {
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 10.0);
        let path = trace(&ray, &[mirror_at(3.0), mirror_at(1.0)], 0, 5.0);
        assert_relative_eq!(path.segments[0].end.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn total_internal_reflection_mirrors_instead_of_refracting() {
        let surface = Surface {
            position: Point3::new(0.0, -1.0, 0.0),
            normal: Vector3::new(0.0, 1.0, 0.0),
            kind: SurfaceKind::Lens {
                refr_index: 0.2,
                lens_type: None,
            },
        };
        let dir = Vector3::new(1.0, -0.05, 0.0).normalize();
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), dir, 40.0);
        let path = trace(&ray, &[surface], 1, 5.0);
        assert_eq!(path.segments.len(), 2);
        // The mirrored ray heads back upward
        assert!(path.segments[1].end.y > path.segments[1].start.y);
    }

    #[test]
    fn bounces_between_mirror_pair_until_depth_limit() {
        let left = Surface {
            position: Point3::new(-1.0, 0.0, 0.0),
            normal: Vector3::new(1.0, 0.0, 0.0),
            kind: SurfaceKind::Mirror,
        };
        let right = mirror_at(1.0);
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 100.0);
        let path = trace(&ray, &[left, right], 4, 5.0);
        // Initial segment plus one per allowed re-emission
        assert_eq!(path.segments.len(), 5);
    }

    #[test]
    fn zero_length_ray_stays_at_origin() {
        let ray = Ray::new(Point3::new(2.0, 3.0, 4.0), Vector3::new(1.0, 0.0, 0.0), 0.0);
        let path = trace(&ray, &[mirror_at(5.0)], 3, 5.0);
        assert_eq!(path.segments.len(), 1);
        assert_eq!(path.segments[0].end, ray.origin);
    }

    #[test]
    fn convex_lens_crosses_axis_near_focal_point() {
        let lens = Surface {
            position: Point3::new(0.0, 0.0, 0.0),
            normal: Vector3::new(-1.0, 0.0, 0.0),
            kind: SurfaceKind::Lens {
                refr_index: 1.5,
                lens_type: Some(LensType::Convex),
            },
        };
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.0), Vector3::new(1.0, 0.0, 0.0), 20.0);
        let path = trace(&ray, &[lens], 1, 5.0);
        assert_eq!(path.segments.len(), 2);
        let out = path.segments[1].end - path.segments[1].start;
        assert!(out.y < 0.0, "converging ray must tilt toward the axis");
    }
}

/// How a surface redirects an incoming ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum LensType {
    Convex,
    Concave,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SurfaceKind {
    Mirror,
    Lens {
        refr_index: f32,
        lens_type: Option<LensType>,
    },
}

/// An infinite optical plane. `normal` must be unit length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Surface {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub kind: SurfaceKind,
}

/// A directed ray. `direction` must be unit length before tracing.
#[derive(Debug, Clone, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
    pub length: f32,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>, length: f32) -> Self {
        Self {
            origin,
            direction,
            length,
        }
    }
}

/// Result of the nearest-hit query. Computed fresh per bounce and discarded
/// once the child ray is emitted.
#[derive(Debug, Clone, PartialEq)]
struct Intersection {
    point: Point3<f32>,
    normal: Vector3<f32>,
    kind: SurfaceKind,
    distance: f32,
}

/// One drawable piece of the light path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start: Point3<f32>,
    pub end: Point3<f32>,
}

impl Segment {
    pub fn length(&self) -> f32 {
        (self.end - self.start).norm()
    }
}

/// The full multi-bounce path, ordered from the source outward.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LightPath {
    pub segments: Vec<Segment>,
}

impl LightPath {
    /// Total travelled distance over all segments.
    pub fn total_length(&self) -> f32 {
        self.segments.iter().map(Segment::length).sum()
    }
}

/// Finds the closest surface hit strictly between the origin and the ray's
/// remaining travel. Surfaces the ray runs parallel to are skipped.
fn nearest_hit(
    origin: &Point3<f32>,
    direction: &Vector3<f32>,
    length: f32,
    surfaces: &[Surface],
) -> Option<Intersection> {
    let mut closest: Option<Intersection> = None;

    for surface in surfaces {
        let denominator = surface.normal.dot(direction);
        if denominator.abs() < PLANE_EPSILON {
            continue;
        }

        let t = surface.normal.dot(&(surface.position - origin)) / denominator;
        if t <= 0.0 || t >= length {
            continue;
        }
        if closest.as_ref().is_some_and(|c| t >= c.distance) {
            continue;
        }

        closest = Some(Intersection {
            point: origin + direction * t,
            normal: surface.normal,
            kind: surface.kind,
            distance: t,
        });
    }

    closest
}

/// Outgoing direction for a ray hitting a surface, per the surface's
/// interaction rule.
fn redirect(
    direction: &Vector3<f32>,
    hit: &Intersection,
    focal_length: f32,
) -> Vector3<f32> {
    match hit.kind {
        SurfaceKind::Mirror => snell::reflect(direction, &hit.normal),
        SurfaceKind::Lens {
            lens_type: Some(LensType::Convex),
            ..
        } => snell::converge(&hit.point, focal_length),
        SurfaceKind::Lens {
            lens_type: Some(LensType::Concave),
            ..
        } => snell::diverge(&hit.point, focal_length),
        SurfaceKind::Lens {
            refr_index,
            lens_type: None,
        } => snell::refract(direction, &hit.normal, refr_index),
    }
}

/// Traces the full light path of `ray` through `surfaces`.
///
/// The ray truncates at each hit; a child ray is emitted from the hit point
/// with the remaining travel distance only while the interaction count stays
/// below `max_depth`. A non-positive `length` yields a single degenerate
/// segment at the origin.
pub fn trace(ray: &Ray, surfaces: &[Surface], max_depth: i32, focal_length: f32) -> LightPath {
    let mut segments = Vec::new();

    let mut origin = ray.origin;
    let mut direction = ray.direction;
    let mut remaining = ray.length;
    let mut depth = 0;

    loop {
        if remaining <= 0.0 {
            segments.push(Segment {
                start: origin,
                end: origin,
            });
            break;
        }

        match nearest_hit(&origin, &direction, remaining, surfaces) {
            None => {
                segments.push(Segment {
                    start: origin,
                    end: origin + direction * remaining,
                });
                break;
            }
            Some(hit) => {
                segments.push(Segment {
                    start: origin,
                    end: hit.point,
                });

                if depth >= max_depth {
                    break;
                }

                direction = redirect(&direction, &hit, focal_length);
                remaining -= hit.distance;
                origin = hit.point;
                depth += 1;
            }
        }
    }

    LightPath { segments }
}
