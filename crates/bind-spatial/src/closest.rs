//! Closest point on a triangle.
//!
//! Implements the Voronoi-region walk from Ericson, *Real-Time Collision
//! Detection* (§5.1.5): the query point is tested against the vertex regions,
//! then the edge regions, and finally projected onto the face. The same code
//! runs on 3-D positions and on 2-D texture coordinates.

use nalgebra::{Point, SVector, Vector3};

/// A point on a triangle together with its barycentric coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint<const D: usize> {
    /// The closest point.
    pub position: Point<f32, D>,
    /// Weights `(u, v, w)` relative to the triangle's `(a, b, c)`; they sum to one.
    pub barycentric: Vector3<f32>,
}

/// Closest point on triangle `(a, b, c)` to `p`, with barycentric coordinates.
///
/// Works in any dimension; the binding code uses `D = 3` for surface
/// projection and `D = 2` for UV-space lookup.
///
/// Sliver triangles, whose face-region denominator vanishes relative to their
/// edge lengths, fall back to the closest of the three edges, so the result is
/// always finite and its barycentrics stay in `[0, 1]`.
///
/// # Example
///
/// ```
/// use bind_spatial::closest_point_on_triangle;
/// use nalgebra::Point3;
///
/// let a = Point3::new(0.0, 0.0, 0.0);
/// let b = Point3::new(1.0, 0.0, 0.0);
/// let c = Point3::new(0.0, 1.0, 0.0);
///
/// // Above the face: projects straight down
/// let hit = closest_point_on_triangle(&Point3::new(0.25, 0.25, 3.0), &a, &b, &c);
/// assert!((hit.position - Point3::new(0.25, 0.25, 0.0)).norm() < 1e-6);
/// assert!((hit.barycentric.sum() - 1.0).abs() < 1e-6);
///
/// // Beyond vertex b: clamps to b
/// let hit = closest_point_on_triangle(&Point3::new(2.0, -1.0, 0.0), &a, &b, &c);
/// assert_eq!(hit.position, b);
/// ```
#[must_use]
pub fn closest_point_on_triangle<const D: usize>(
    p: &Point<f32, D>,
    a: &Point<f32, D>,
    b: &Point<f32, D>,
    c: &Point<f32, D>,
) -> ClosestPoint<D> {
    let ab = b - a;
    let ac = c - a;

    // Vertex region A
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return vertex(a, Vector3::x());
    }

    // Vertex region B
    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return vertex(b, Vector3::y());
    }

    // Edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = ratio(d1, d1 - d3);
        return ClosestPoint {
            position: a + ab * v,
            barycentric: Vector3::new(1.0 - v, v, 0.0),
        };
    }

    // Vertex region C
    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return vertex(c, Vector3::z());
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = ratio(d2, d2 - d6);
        return ClosestPoint {
            position: a + ac * w,
            barycentric: Vector3::new(1.0 - w, 0.0, w),
        };
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
        let w = ratio(d4 - d3, (d4 - d3) + (d5 - d6));
        return ClosestPoint {
            position: b + (c - b) * w,
            barycentric: Vector3::new(0.0, 1.0 - w, w),
        };
    }

    // Face region. The denominator is |ab × ac|², so compare it against the
    // edge lengths to catch slivers regardless of scale.
    let denom = va + vb + vc;
    if denom <= f32::EPSILON * ab.norm_squared() * ac.norm_squared() || !denom.is_normal() {
        return closest_on_edges(p, a, b, c);
    }
    let v = vb / denom;
    let w = vc / denom;
    ClosestPoint {
        position: a + ab * v + ac * w,
        barycentric: Vector3::new(1.0 - v - w, v, w),
    }
}

#[inline]
fn vertex<const D: usize>(p: &Point<f32, D>, barycentric: Vector3<f32>) -> ClosestPoint<D> {
    ClosestPoint {
        position: *p,
        barycentric,
    }
}

/// `num / den` clamped to `[0, 1]`, or zero when `den` vanishes.
#[inline]
fn ratio(num: f32, den: f32) -> f32 {
    if den > f32::MIN_POSITIVE {
        (num / den).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Parameter of the closest point to `p` on segment `a + t (b - a)`.
#[inline]
fn segment_parameter<const D: usize>(
    p: &Point<f32, D>,
    a: &Point<f32, D>,
    ab: &SVector<f32, D>,
) -> f32 {
    ratio(ab.dot(&(p - a)), ab.norm_squared())
}

fn closest_on_edges<const D: usize>(
    p: &Point<f32, D>,
    a: &Point<f32, D>,
    b: &Point<f32, D>,
    c: &Point<f32, D>,
) -> ClosestPoint<D> {
    let ab = b - a;
    let ac = c - a;
    let bc = c - b;

    let t_ab = segment_parameter(p, a, &ab);
    let t_ac = segment_parameter(p, a, &ac);
    let t_bc = segment_parameter(p, b, &bc);

    let candidates = [
        ClosestPoint {
            position: a + ab * t_ab,
            barycentric: Vector3::new(1.0 - t_ab, t_ab, 0.0),
        },
        ClosestPoint {
            position: a + ac * t_ac,
            barycentric: Vector3::new(1.0 - t_ac, 0.0, t_ac),
        },
        ClosestPoint {
            position: b + bc * t_bc,
            barycentric: Vector3::new(0.0, 1.0 - t_bc, t_bc),
        },
    ];

    let mut best = candidates[0];
    let mut best_distance = (best.position - p).norm_squared();
    for candidate in &candidates[1..] {
        let distance = (candidate.position - p).norm_squared();
        if distance < best_distance {
            best = *candidate;
            best_distance = distance;
        }
    }
    best
}
