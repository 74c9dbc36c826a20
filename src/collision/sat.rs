//! Separating-axis test for box/box (rect/rect in 2D) with contact manifolds.
//!
//! Candidate axes are numbered so the index can be cached between ticks:
//! `0..D` are the face normals of `A`, `D..2D` those of `B`, and in 3D the
//! remaining nine are the cross products `A_i × B_j` at `2D + 3i + j`.

use crate::collision::clipping::{
    clip_polygon, clip_segment, rectangle_planes, segment_planes, ClipPolygon,
};
use crate::collision::contact::ContactManifold;
use crate::collision::shapes::OrientedBox;
use crate::utils::math::{closest_points_on_segments, SpaceVector};
use glam::{Vec2, Vec3};

const FACE_RELATIVE_TOLERANCE: f32 = 0.98;
const FACE_ABSOLUTE_TOLERANCE: f32 = 0.001;
const EDGE_RELATIVE_TOLERANCE: f32 = 0.95;
const EDGE_ABSOLUTE_TOLERANCE: f32 = 0.01;
const PARALLEL_EPSILON_SQ: f32 = 1e-6;

/// Dimension-specific parts of the box/box separating-axis test.
pub trait SatSpace: SpaceVector {
    /// Number of edge/edge cross-product axes; zero in 2D.
    const EDGE_AXES: usize;

    /// Normalized edge axis `index`, or `None` for (near) parallel edges.
    fn edge_axis(a: &OrientedBox<Self>, b: &OrientedBox<Self>, index: usize) -> Option<Self>;

    /// Clips the face of `incident` most anti-parallel to `normal` against the
    /// side planes of `reference`'s face `axis` (outward normal `normal`).
    fn clip_incident_face(
        reference: &OrientedBox<Self>,
        axis: usize,
        normal: Self,
        incident: &OrientedBox<Self>,
    ) -> ClipPolygon<Self>;

    /// Contact point for an edge/edge contact along `normal` (pointing from `a` to `b`).
    fn edge_contact_point(
        a: &OrientedBox<Self>,
        b: &OrientedBox<Self>,
        _index: usize,
        normal: Self,
    ) -> Self {
        (a.support(normal) + b.support(-normal)) * 0.5
    }
}

impl SatSpace for Vec3 {
    const EDGE_AXES: usize = 9;

    fn edge_axis(a: &OrientedBox<Self>, b: &OrientedBox<Self>, index: usize) -> Option<Self> {
        let axis = a.axis(index / 3).cross(b.axis(index % 3));
        (axis.length_squared() > PARALLEL_EPSILON_SQ).then(|| axis.normalize())
    }

    fn clip_incident_face(
        reference: &OrientedBox<Self>,
        axis: usize,
        normal: Self,
        incident: &OrientedBox<Self>,
    ) -> ClipPolygon<Self> {
        let (face, sign) = incident_face(incident, normal);
        let face_center =
            incident.center + incident.axis(face) * (sign * incident.half_extents[face]);
        let (iu, iv) = ((face + 1) % 3, (face + 2) % 3);
        let u = incident.axis(iu) * incident.half_extents[iu];
        let v = incident.axis(iv) * incident.half_extents[iv];
        let quad = [
            face_center + u + v,
            face_center - u + v,
            face_center - u - v,
            face_center + u - v,
        ];

        let (ru, rv) = ((axis + 1) % 3, (axis + 2) % 3);
        let planes = rectangle_planes(
            reference.center + normal * reference.half_extents[axis],
            reference.axis(ru),
            reference.axis(rv),
            reference.half_extents[ru],
            reference.half_extents[rv],
        );
        clip_polygon(&quad, &planes)
    }

    fn edge_contact_point(
        a: &OrientedBox<Self>,
        b: &OrientedBox<Self>,
        index: usize,
        normal: Self,
    ) -> Self {
        let (a0, a1) = support_edge(a, index / 3, normal);
        let (b0, b1) = support_edge(b, index % 3, -normal);
        let (pa, pb) = closest_points_on_segments(a0, a1, b0, b1);
        (pa + pb) * 0.5
    }
}

impl SatSpace for Vec2 {
    const EDGE_AXES: usize = 0;

    fn edge_axis(_a: &OrientedBox<Self>, _b: &OrientedBox<Self>, _index: usize) -> Option<Self> {
        None
    }

    fn clip_incident_face(
        reference: &OrientedBox<Self>,
        axis: usize,
        normal: Self,
        incident: &OrientedBox<Self>,
    ) -> ClipPolygon<Self> {
        let (face, sign) = incident_face(incident, normal);
        let face_center =
            incident.center + incident.axis(face) * (sign * incident.half_extents[face]);
        let tangent = incident.axis(1 - face) * incident.half_extents[1 - face];

        let side = 1 - axis;
        let planes = segment_planes(
            reference.center + normal * reference.half_extents[axis],
            reference.axis(side),
            reference.half_extents[side],
        );
        clip_segment(face_center - tangent, face_center + tangent, &planes)
            .map(|(p, q)| [p, q].into_iter().collect())
            .unwrap_or_default()
    }
}

/// Axis of `incident` whose face is most anti-parallel to `normal`, with the
/// sign selecting that face.
fn incident_face<V: SpaceVector>(incident: &OrientedBox<V>, normal: V) -> (usize, f32) {
    let mut best = (0, 1.0);
    let mut best_abs = f32::NEG_INFINITY;
    for axis in 0..V::DIM {
        let dot = incident.axis(axis).dot(normal);
        if dot.abs() > best_abs {
            best_abs = dot.abs();
            best = (axis, if dot > 0.0 { -1.0 } else { 1.0 });
        }
    }
    best
}

/// Edge of `bx` parallel to its local `axis` that lies furthest along `direction`.
fn support_edge(bx: &OrientedBox<Vec3>, axis: usize, direction: Vec3) -> (Vec3, Vec3) {
    let local = bx.rotation.conjugate() * direction;
    let mut corner = Vec3::ZERO;
    for k in 0..3 {
        if k != axis {
            corner[k] = if local[k] >= 0.0 {
                bx.half_extents[k]
            } else {
                -bx.half_extents[k]
            };
        }
    }
    let mid = bx.center + bx.rotation * corner;
    let half = bx.axis(axis) * bx.half_extents[axis];
    (mid - half, mid + half)
}

/// Total number of candidate axes for dimension `V`.
pub fn axis_count<V: SatSpace>() -> usize {
    2 * V::DIM + V::EDGE_AXES
}

fn candidate_axis<V: SatSpace>(a: &OrientedBox<V>, b: &OrientedBox<V>, index: usize) -> Option<V> {
    let dim = V::DIM;
    if index < dim {
        Some(a.axis(index))
    } else if index < 2 * dim {
        Some(b.axis(index - dim))
    } else {
        V::edge_axis(a, b, index - 2 * dim)
    }
}

fn separation<V: SpaceVector>(a: &OrientedBox<V>, b: &OrientedBox<V>, axis: V) -> f32 {
    (b.center - a.center).dot(axis).abs() - a.projected_radius(axis) - b.projected_radius(axis)
}

#[derive(Debug, Clone, Copy)]
struct AxisQuery {
    index: usize,
    separation: f32,
}

impl AxisQuery {
    const NONE: Self = Self {
        index: usize::MAX,
        separation: f32::NEG_INFINITY,
    };
}

/// Exact overlap test between two boxes. Touching boxes collide.
///
/// `cached_axis` holds the axis that separated the pair last time; it is
/// tried first, refreshed on separation and cleared on overlap. When a
/// manifold is supplied it is rebuilt with its normal pointing from `a` to `b`.
pub fn box_box<V: SatSpace>(
    a: &OrientedBox<V>,
    b: &OrientedBox<V>,
    cached_axis: &mut Option<u8>,
    manifold: Option<&mut ContactManifold<V>>,
) -> bool {
    if let Some(axis) = cached_axis.and_then(|index| candidate_axis(a, b, index as usize)) {
        if separation(a, b, axis) > 0.0 {
            return false;
        }
    }

    let mut face_a = AxisQuery::NONE;
    let mut face_b = AxisQuery::NONE;
    let mut edge = AxisQuery::NONE;
    for index in 0..axis_count::<V>() {
        let Some(axis) = candidate_axis(a, b, index) else {
            continue;
        };
        let sep = separation(a, b, axis);
        if sep > 0.0 {
            *cached_axis = Some(index as u8);
            return false;
        }
        let best = if index < V::DIM {
            &mut face_a
        } else if index < 2 * V::DIM {
            &mut face_b
        } else {
            &mut edge
        };
        if sep > best.separation {
            *best = AxisQuery { index, separation: sep };
        }
    }
    *cached_axis = None;

    let Some(manifold) = manifold else {
        return true;
    };
    manifold.clear();

    let face_max = face_a.separation.max(face_b.separation);
    if edge.separation > EDGE_RELATIVE_TOLERANCE * face_max + EDGE_ABSOLUTE_TOLERANCE {
        edge_contact(a, b, edge, manifold);
    } else if face_b.separation
        > FACE_RELATIVE_TOLERANCE * face_a.separation + FACE_ABSOLUTE_TOLERANCE
    {
        face_contact(b, face_b.index - V::DIM, a, face_b.separation, manifold);
        manifold.flip();
    } else {
        face_contact(a, face_a.index, b, face_a.separation, manifold);
    }
    true
}

fn face_contact<V: SatSpace>(
    reference: &OrientedBox<V>,
    axis: usize,
    incident: &OrientedBox<V>,
    separation: f32,
    manifold: &mut ContactManifold<V>,
) {
    let mut normal = reference.axis(axis);
    if (incident.center - reference.center).dot(normal) < 0.0 {
        normal = -normal;
    }
    let face_center = reference.center + normal * reference.half_extents[axis];

    manifold.normal = normal;
    for point in V::clip_incident_face(reference, axis, normal, incident) {
        let s = normal.dot(point - face_center);
        if s <= 0.0 {
            manifold.push_point(point - normal * s, -s);
        }
    }
    if manifold.points.is_empty() {
        let point = (reference.support(normal) + incident.support(-normal)) * 0.5;
        manifold.push_point(point, -separation);
    }
}

fn edge_contact<V: SatSpace>(
    a: &OrientedBox<V>,
    b: &OrientedBox<V>,
    query: AxisQuery,
    manifold: &mut ContactManifold<V>,
) {
    let index = query.index - 2 * V::DIM;
    let Some(mut normal) = V::edge_axis(a, b, index) else {
        return;
    };
    if (b.center - a.center).dot(normal) < 0.0 {
        normal = -normal;
    }
    let point = V::edge_contact_point(a, b, index, normal);
    manifold.set_single(normal, point, -query.separation);
}
