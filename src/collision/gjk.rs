//! GJK distance queries with Johnson's distance sub-algorithm.
//!
//! The simplex holds up to `DIM + 1` points of the Minkowski difference
//! `A - B` together with the support points on `A` and `B` they came from, so
//! the closest points on both shapes can be recovered from the barycentric
//! coefficients.

use crate::collision::shapes::Shape;
use crate::utils::logging::GjkTrace;
use crate::utils::math::SpaceVector;

const MAX_POINTS: usize = 4;
const MAX_SUBSETS: usize = 1 << MAX_POINTS;

/// Iteration cap for both GJK queries.
pub const GJK_MAX_ITERATIONS: usize = 32;

/// Relative convergence tolerance on `|v|² - v·w`.
pub const GJK_RELATIVE_EPSILON: f32 = 1e-6;

/// Tolerance under which `|v|²` counts as the origin being enclosed.
pub const GJK_ABSOLUTE_EPSILON: f32 = 1e-10;

/// Result of [`gjk_shallow_penetration_test`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GjkOutput<V> {
    /// Closest point on the core of `A`.
    pub point_a: V,
    /// Closest point on the core of `B`.
    pub point_b: V,
    /// Last search direction, `point_a - point_b` on convergence.
    pub v: V,
    /// Core distance.
    pub distance: f32,
}

/// Support mapping consumed by the GJK queries.
pub trait SupportMap<V: SpaceVector> {
    fn core_support(&self, direction: V) -> V;
}

impl<V: SpaceVector> SupportMap<V> for Shape<V> {
    fn core_support(&self, direction: V) -> V {
        Shape::core_support(self, direction)
    }
}

/// Simplex state for Johnson's distance sub-algorithm.
#[derive(Debug, Clone)]
pub struct GjkJohnsonsDistanceIterator<V> {
    y: [V; MAX_POINTS],
    a: [V; MAX_POINTS],
    b: [V; MAX_POINTS],
    dots: [[f32; MAX_POINTS]; MAX_POINTS],
    deltas: [[f32; MAX_POINTS]; MAX_SUBSETS],
    bits: usize,
    lambdas: [f32; MAX_POINTS],
    v: V,
}

impl<V: SpaceVector> Default for GjkJohnsonsDistanceIterator<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: SpaceVector> GjkJohnsonsDistanceIterator<V> {
    pub fn new() -> Self {
        Self {
            y: [V::ZERO; MAX_POINTS],
            a: [V::ZERO; MAX_POINTS],
            b: [V::ZERO; MAX_POINTS],
            dots: [[0.0; MAX_POINTS]; MAX_POINTS],
            deltas: [[0.0; MAX_POINTS]; MAX_SUBSETS],
            bits: 0,
            lambdas: [0.0; MAX_POINTS],
            v: V::ZERO,
        }
    }

    pub fn reset(&mut self) {
        self.bits = 0;
        self.v = V::ZERO;
    }

    fn max_points() -> usize {
        V::DIM + 1
    }

    pub fn point_count(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// The simplex spans the full space, so it encloses the origin.
    pub fn is_full(&self) -> bool {
        self.point_count() == Self::max_points()
    }

    /// Closest point of the current simplex to the origin.
    pub fn v(&self) -> V {
        self.v
    }

    /// Largest squared length among the retained points.
    pub fn max_length_squared(&self) -> f32 {
        self.active()
            .map(|i| self.dots[i][i])
            .fold(0.0, f32::max)
    }

    /// Whether `w` already is a vertex of the simplex.
    pub fn contains(&self, w: V) -> bool {
        self.active()
            .any(|i| (self.y[i] - w).length_squared() <= GJK_ABSOLUTE_EPSILON)
    }

    /// Closest points on `A` and `B` for the current barycentric coefficients.
    pub fn closest_points(&self) -> (V, V) {
        let mut pa = V::ZERO;
        let mut pb = V::ZERO;
        for i in self.active() {
            pa += self.a[i] * self.lambdas[i];
            pb += self.b[i] * self.lambdas[i];
        }
        (pa, pb)
    }

    fn active(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_POINTS).filter(move |i| self.bits & (1 << i) != 0)
    }

    /// Adds the support pair `(a_added, b_added)` and reduces the simplex to
    /// the smallest subset whose affine hull contains the point closest to the
    /// origin. Returns `false` if the simplex was already full.
    pub fn iterate(&mut self, a_added: V, b_added: V) -> bool {
        let Some(slot) = (0..Self::max_points()).find(|i| self.bits & (1 << i) == 0) else {
            return false;
        };
        let w = a_added - b_added;
        self.y[slot] = w;
        self.a[slot] = a_added;
        self.b[slot] = b_added;

        let all = self.bits | (1 << slot);
        for i in 0..MAX_POINTS {
            if all & (1 << i) != 0 {
                let d = self.y[i].dot(w);
                self.dots[i][slot] = d;
                self.dots[slot][i] = d;
            }
        }
        self.compute_deltas(all);

        let new_bit = 1 << slot;
        let max_size = all.count_ones();
        for size in 1..=max_size {
            for subset in 1..=all {
                if subset & all != subset || subset & new_bit == 0 || subset.count_ones() != size {
                    continue;
                }
                if self.is_valid_subset(subset, all) {
                    self.commit(subset);
                    return true;
                }
            }
        }

        // Numerical trouble: keep the subset with positive weights that lies
        // closest to the origin.
        let mut best: Option<(usize, f32)> = None;
        for subset in 1..=all {
            if subset & all != subset
                || subset & new_bit == 0
                || !self.has_positive_weights(subset)
            {
                continue;
            }
            let len_sq = self.point_of(subset).length_squared();
            if best.map_or(true, |(_, b)| len_sq < b) {
                best = Some((subset, len_sq));
            }
        }
        self.commit(best.map_or(new_bit, |(subset, _)| subset));
        true
    }

    /// Johnson's cofactors `Δ_j(X)` for every subset `X` of `all`.
    fn compute_deltas(&mut self, all: usize) {
        for subset in 1..=all {
            if subset & all != subset {
                continue;
            }
            if subset.count_ones() == 1 {
                let i = subset.trailing_zeros() as usize;
                self.deltas[subset] = [0.0; MAX_POINTS];
                self.deltas[subset][i] = 1.0;
                continue;
            }
            for j in 0..MAX_POINTS {
                if subset & (1 << j) == 0 {
                    self.deltas[subset][j] = 0.0;
                    continue;
                }
                let rest = subset & !(1 << j);
                let k = rest.trailing_zeros() as usize;
                let mut delta = 0.0;
                for i in 0..MAX_POINTS {
                    if rest & (1 << i) != 0 {
                        delta += self.deltas[rest][i] * (self.dots[i][k] - self.dots[i][j]);
                    }
                }
                self.deltas[subset][j] = delta;
            }
        }
    }

    fn has_positive_weights(&self, subset: usize) -> bool {
        (0..MAX_POINTS)
            .filter(|i| subset & (1 << i) != 0)
            .all(|i| self.deltas[subset][i] > 0.0)
    }

    fn is_valid_subset(&self, subset: usize, all: usize) -> bool {
        if !self.has_positive_weights(subset) {
            return false;
        }
        (0..MAX_POINTS)
            .filter(|j| all & (1 << j) != 0 && subset & (1 << j) == 0)
            .all(|j| self.deltas[subset | (1 << j)][j] <= 0.0)
    }

    fn point_of(&self, subset: usize) -> V {
        let total: f32 = (0..MAX_POINTS)
            .filter(|i| subset & (1 << i) != 0)
            .map(|i| self.deltas[subset][i])
            .sum();
        let mut v = V::ZERO;
        for i in 0..MAX_POINTS {
            if subset & (1 << i) != 0 {
                v += self.y[i] * (self.deltas[subset][i] / total);
            }
        }
        v
    }

    fn commit(&mut self, subset: usize) {
        let total: f32 = (0..MAX_POINTS)
            .filter(|i| subset & (1 << i) != 0)
            .map(|i| self.deltas[subset][i])
            .sum();
        let mut v = V::ZERO;
        for i in 0..MAX_POINTS {
            if subset & (1 << i) != 0 {
                self.lambdas[i] = self.deltas[subset][i] / total;
                v += self.y[i] * self.lambdas[i];
            } else {
                self.lambdas[i] = 0.0;
            }
        }
        self.bits = subset;
        self.v = v;
    }
}

/// GJK distance between the cores of `a` and `b`, interpreted against the sum
/// of their margins.
///
/// Returns `0.0` when the shapes are separated by more than `margins_sum`
/// (`gjk_out.distance` is then infinite) or exactly touching,
/// `margins_sum - distance` for a shallow penetration with the closest core
/// points in `gjk_out`, and `-1.0` when the cores themselves overlap and a
/// deep-penetration fallback is needed.
pub fn gjk_shallow_penetration_test<V, A, B, T>(
    a: &A,
    b: &B,
    margins_sum: f32,
    iterator: &mut GjkJohnsonsDistanceIterator<V>,
    seed: V,
    gjk_out: &mut GjkOutput<V>,
    trace: &mut T,
) -> f32
where
    V: SpaceVector,
    A: SupportMap<V> + ?Sized,
    B: SupportMap<V> + ?Sized,
    T: GjkTrace<V> + ?Sized,
{
    iterator.reset();
    let mut v = if seed.length_squared() > GJK_ABSOLUTE_EPSILON {
        seed
    } else {
        V::basis(0)
    };

    for iteration in 0..GJK_MAX_ITERATIONS {
        let wa = a.core_support(-v);
        let wb = b.core_support(v);
        let w = wa - wb;
        let vw = v.dot(w);
        trace.on_iteration(iteration, v, w);

        let v_len_sq = v.length_squared();
        if vw > 0.0 && vw * vw > v_len_sq * margins_sum * margins_sum {
            gjk_out.v = v;
            gjk_out.distance = f32::INFINITY;
            trace.on_result(0.0);
            return 0.0;
        }

        if !iterator.is_empty()
            && (iterator.contains(w) || v_len_sq - vw <= GJK_RELATIVE_EPSILON * v_len_sq)
        {
            break;
        }

        if !iterator.iterate(wa, wb) {
            break;
        }
        v = iterator.v();

        if iterator.is_full()
            || v.length_squared() <= GJK_ABSOLUTE_EPSILON * iterator.max_length_squared().max(1.0)
        {
            gjk_out.v = v;
            gjk_out.distance = 0.0;
            trace.on_result(-1.0);
            return -1.0;
        }
    }

    let (point_a, point_b) = iterator.closest_points();
    let distance = v.length();
    *gjk_out = GjkOutput {
        point_a,
        point_b,
        v,
        distance,
    };
    let result = (margins_sum - distance).max(0.0);
    trace.on_result(result);
    result
}

/// Boolean GJK overlap test without margins. Touching shapes intersect.
pub fn gjk_intersection_test<V, A, B>(
    a: &A,
    b: &B,
    iterator: &mut GjkJohnsonsDistanceIterator<V>,
    seed: &mut V,
) -> bool
where
    V: SpaceVector,
    A: SupportMap<V> + ?Sized,
    B: SupportMap<V> + ?Sized,
{
    iterator.reset();
    let mut v = if seed.length_squared() > GJK_ABSOLUTE_EPSILON {
        *seed
    } else {
        V::basis(0)
    };

    for _ in 0..GJK_MAX_ITERATIONS {
        let wa = a.core_support(-v);
        let wb = b.core_support(v);
        let w = wa - wb;
        let vw = v.dot(w);
        if vw > 0.0 {
            *seed = v;
            return false;
        }

        let v_len_sq = v.length_squared();
        if !iterator.is_empty()
            && (iterator.contains(w) || v_len_sq - vw <= GJK_RELATIVE_EPSILON * v_len_sq)
        {
            *seed = v;
            return v_len_sq <= GJK_ABSOLUTE_EPSILON * iterator.max_length_squared().max(1.0);
        }

        if !iterator.iterate(wa, wb) {
            return true;
        }
        v = iterator.v();
        if iterator.is_full()
            || v.length_squared() <= GJK_ABSOLUTE_EPSILON * iterator.max_length_squared().max(1.0)
        {
            *seed = v;
            return true;
        }
    }

    *seed = v;
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{Quat, Vec2, Vec3};

    #[test]
    fn johnson_reduces_segment_to_interior_point() {
        let mut it = GjkJohnsonsDistanceIterator::<Vec2>::new();
        it.iterate(Vec2::new(-1.0, 1.0), Vec2::ZERO);
        it.iterate(Vec2::new(1.0, 1.0), Vec2::ZERO);
        assert_eq!(it.point_count(), 2);
        assert_relative_eq!(it.v(), Vec2::new(0.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn johnson_drops_points_not_supporting_the_closest_feature() {
        let mut it = GjkJohnsonsDistanceIterator::<Vec3>::new();
        it.iterate(Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO);
        it.iterate(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        assert_eq!(it.point_count(), 1);
        assert_relative_eq!(it.v(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn triangle_around_origin_fills_the_plane() {
        let mut it = GjkJohnsonsDistanceIterator::<Vec2>::new();
        it.iterate(Vec2::new(-1.0, -1.0), Vec2::ZERO);
        it.iterate(Vec2::new(1.0, -1.0), Vec2::ZERO);
        it.iterate(Vec2::new(0.0, 1.0), Vec2::ZERO);
        assert!(it.is_full());
    }

    #[test]
    fn separated_spheres_return_zero() {
        let a = Shape::sphere(Vec3::ZERO, 1.0);
        let b = Shape::sphere(Vec3::new(3.0, 0.0, 0.0), 1.0);
        let mut it = GjkJohnsonsDistanceIterator::new();
        let mut out = GjkOutput::default();
        let seed = a.center() - b.center();
        let r = gjk_shallow_penetration_test(&a, &b, 2.0, &mut it, seed, &mut out, &mut ());
        assert_eq!(r, 0.0);
    }

    #[test]
    fn shallow_box_sphere_reports_margin_overlap() {
        let a = Shape::cuboid(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let b = Shape::sphere(Vec3::new(1.75, 0.0, 0.0), 1.0);
        let mut it = GjkJohnsonsDistanceIterator::new();
        let mut out = GjkOutput::default();
        let seed = a.center() - b.center();
        let r = gjk_shallow_penetration_test(&a, &b, 1.0, &mut it, seed, &mut out, &mut ());
        assert_relative_eq!(r, 0.25, epsilon = 1e-4);
        assert_relative_eq!(out.point_a.x, 1.0, epsilon = 1e-4);
        assert_relative_eq!(out.point_b, Vec3::new(1.75, 0.0, 0.0), epsilon = 1e-4);
    }

    #[test]
    fn overlapping_cores_need_fallback() {
        let a = Shape::cuboid(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let b = Shape::sphere(Vec3::new(0.5, 0.2, 0.0), 0.5);
        let mut it = GjkJohnsonsDistanceIterator::new();
        let mut out = GjkOutput::default();
        let seed = a.center() - b.center();
        let r = gjk_shallow_penetration_test(&a, &b, 0.5, &mut it, seed, &mut out, &mut ());
        assert_eq!(r, -1.0);
    }

    #[test]
    fn boolean_test_accepts_touching_boxes() {
        let a = Shape::cuboid(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let b = Shape::cuboid(Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        let c = Shape::cuboid(Vec3::new(2.5, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        let mut it = GjkJohnsonsDistanceIterator::new();
        let mut seed = a.center() - b.center();
        assert!(gjk_intersection_test(&a, &b, &mut it, &mut seed));
        let mut seed = a.center() - c.center();
        assert!(!gjk_intersection_test(&a, &c, &mut it, &mut seed));
    }
}
