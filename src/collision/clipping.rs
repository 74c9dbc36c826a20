use arrayvec::ArrayVec;

use crate::utils::math::SpaceVector;

const EPSILON: f32 = 1e-4;

/// Upper bound on vertices produced by clipping a quad against four planes.
pub const MAX_CLIP_VERTICES: usize = 8;

pub type ClipPolygon<V> = ArrayVec<V, MAX_CLIP_VERTICES>;

/// Half-space `normal · p <= distance`.
#[derive(Debug, Clone, Copy)]
pub struct Plane<V> {
    normal: V,
    distance: f32,
}

impl<V: SpaceVector> Plane<V> {
    pub fn from_point_normal(point: V, normal: V) -> Self {
        let n = normal.normalize_or_zero();
        Self {
            normal: n,
            distance: n.dot(point),
        }
    }

    pub fn signed_distance(&self, point: V) -> f32 {
        self.normal.dot(point) - self.distance
    }
}

/// Clips the provided polygon against a set of planes using the Sutherland-Hodgman algorithm.
pub fn clip_polygon<V: SpaceVector>(vertices: &[V], planes: &[Plane<V>]) -> ClipPolygon<V> {
    let mut output: ClipPolygon<V> = vertices.iter().copied().take(MAX_CLIP_VERTICES).collect();
    let mut scratch = ClipPolygon::new();
    for plane in planes {
        clip_against_plane(&output, *plane, &mut scratch);
        std::mem::swap(&mut output, &mut scratch);
        if output.is_empty() {
            break;
        }
    }
    output
}

fn clip_against_plane<V: SpaceVector>(
    vertices: &[V],
    plane: Plane<V>,
    clipped: &mut ClipPolygon<V>,
) {
    clipped.clear();
    if vertices.is_empty() {
        return;
    }

    for i in 0..vertices.len() {
        let current = vertices[i];
        let next = vertices[(i + 1) % vertices.len()];

        let current_dist = plane.signed_distance(current);
        let next_dist = plane.signed_distance(next);

        let current_inside = current_dist <= EPSILON;
        let next_inside = next_dist <= EPSILON;

        if current_inside && next_inside {
            push_vertex(clipped, next);
        } else if current_inside && !next_inside {
            if let Some(hit) = line_plane_intersection(current, next, current_dist, next_dist) {
                push_vertex(clipped, hit);
            }
        } else if !current_inside && next_inside {
            if let Some(hit) = line_plane_intersection(current, next, current_dist, next_dist) {
                push_vertex(clipped, hit);
            }
            push_vertex(clipped, next);
        }
    }
}

/// A convex polygon gains at most one vertex per plane, so a quad clipped
/// by four planes fits in [`MAX_CLIP_VERTICES`].
fn push_vertex<V>(clipped: &mut ClipPolygon<V>, vertex: V) {
    let pushed = clipped.try_push(vertex);
    debug_assert!(pushed.is_ok(), "clip polygon exceeded {MAX_CLIP_VERTICES} vertices");
}

/// Clips segment `[start, end]` against every plane; `None` if nothing remains.
pub fn clip_segment<V: SpaceVector>(start: V, end: V, planes: &[Plane<V>]) -> Option<(V, V)> {
    let (mut a, mut b) = (start, end);
    for plane in planes {
        let da = plane.signed_distance(a);
        let db = plane.signed_distance(b);
        match (da <= EPSILON, db <= EPSILON) {
            (true, true) => {}
            (false, false) => return None,
            (true, false) => b = line_plane_intersection(a, b, da, db)?,
            (false, true) => a = line_plane_intersection(a, b, da, db)?,
        }
    }
    Some((a, b))
}

fn line_plane_intersection<V: SpaceVector>(
    start: V,
    end: V,
    start_dist: f32,
    end_dist: f32,
) -> Option<V> {
    let denom = start_dist - end_dist;
    if denom.abs() <= EPSILON {
        return None;
    }
    let t = start_dist / denom;
    Some(start + (end - start) * t)
}

/// Side planes of a rectangular face given its tangents and half-extents.
pub fn rectangle_planes<V: SpaceVector>(
    center: V,
    tangent_u: V,
    tangent_v: V,
    half_u: f32,
    half_v: f32,
) -> [Plane<V>; 4] {
    [
        Plane::from_point_normal(center + tangent_u * half_u, tangent_u),
        Plane::from_point_normal(center - tangent_u * half_u, -tangent_u),
        Plane::from_point_normal(center + tangent_v * half_v, tangent_v),
        Plane::from_point_normal(center - tangent_v * half_v, -tangent_v),
    ]
}

/// Side planes bounding a segment-shaped face (the 2D analogue of [`rectangle_planes`]).
pub fn segment_planes<V: SpaceVector>(center: V, tangent: V, half: f32) -> [Plane<V>; 2] {
    [
        Plane::from_point_normal(center + tangent * half, tangent),
        Plane::from_point_normal(center - tangent * half, -tangent),
    ]
}
