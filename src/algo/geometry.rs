//! Per-face frames and small angle helpers shared by the layout stages.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{Point3, Vector3};

use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex};

/// Wrap an angle into `(-period / 2, period / 2]`.
#[inline]
pub fn wrap_angle(a: f64, period: f64) -> f64 {
    let half = 0.5 * period;
    let w = a - period * ((a + half) / period).floor();
    // floor() maps +half to -half; keep the upper end.
    if w <= -half {
        w + period
    } else {
        w
    }
}

/// Wrap into `(-pi, pi]`.
#[inline]
pub fn wrap_pi(a: f64) -> f64 {
    wrap_angle(a, 2.0 * PI)
}

/// Wrap into `(-pi/4, pi/4]`, the class of an angle under quarter turns.
#[inline]
pub fn wrap_quarter(a: f64) -> f64 {
    wrap_angle(a, FRAC_PI_2)
}

/// Number of quarter turns closest to `a`, in `0..4`.
#[inline]
pub fn quarter_turns(a: f64) -> u8 {
    ((a / FRAC_PI_2).round() as i64).rem_euclid(4) as u8
}

/// Orthonormal tangent frame of a triangle.
///
/// `x` follows the face's first half-edge, `n` is the unit normal and
/// `y = n × x`. Degenerate faces get an arbitrary frame and `valid == false`.
#[derive(Debug, Clone, Copy)]
pub struct FaceFrame {
    /// First tangent axis.
    pub x: Vector3<f64>,
    /// Second tangent axis.
    pub y: Vector3<f64>,
    /// Unit normal.
    pub n: Vector3<f64>,
    /// Whether the face has a well-defined plane.
    pub valid: bool,
}

impl FaceFrame {
    /// Frame of face `f`.
    pub fn new<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, f: FaceId<I>) -> Self {
        let n = mesh.face_normal(f);
        let e = mesh.edge_vector(mesh.face(f).halfedge);
        let len = e.norm();
        if n == Vector3::zeros() || len < 1e-300 {
            return Self {
                x: Vector3::x(),
                y: Vector3::y(),
                n: Vector3::z(),
                valid: false,
            };
        }
        let x = e / len;
        Self {
            x,
            y: n.cross(&x),
            n,
            valid: true,
        }
    }

    /// Polar angle of a tangent vector in this frame.
    #[inline]
    pub fn angle_of(&self, v: &Vector3<f64>) -> f64 {
        v.dot(&self.y).atan2(v.dot(&self.x))
    }

    /// Unit tangent vector at polar angle `a`.
    #[inline]
    pub fn direction(&self, a: f64) -> Vector3<f64> {
        self.x * a.cos() + self.y * a.sin()
    }
}

/// Frames of all faces.
pub fn face_frames<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> Vec<FaceFrame> {
    mesh.face_ids().map(|f| FaceFrame::new(mesh, f)).collect()
}

/// Cotangent of the angle at `a` in triangle `(a, b, c)`, zero when degenerate.
pub fn cotangent_angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let cross_len = ab.cross(&ac).norm();
    if cross_len < 1e-12 {
        0.0
    } else {
        ab.dot(&ac) / cross_len
    }
}

/// Gradients of the three barycentric hat functions of a triangle.
///
/// Returns `None` for a degenerate triangle.
pub fn hat_gradients(p: &[Point3<f64>; 3]) -> Option<[Vector3<f64>; 3]> {
    let n = (p[1] - p[0]).cross(&(p[2] - p[0]));
    let twice_area = n.norm();
    if twice_area < 1e-14 {
        return None;
    }
    let n = n / twice_area;
    let grad = |i: usize| n.cross(&(p[(i + 2) % 3] - p[(i + 1) % 3])) / twice_area;
    Some([grad(0), grad(1), grad(2)])
}

/// Barycentric coordinates of `q` projected into triangle `p`.
pub fn barycentric(p: &[Point3<f64>; 3], q: &Point3<f64>) -> Option<[f64; 3]> {
    let e1 = p[1] - p[0];
    let e2 = p[2] - p[0];
    let d = q - p[0];
    let (a, b, c) = (e1.dot(&e1), e1.dot(&e2), e2.dot(&e2));
    let det = a * c - b * b;
    if det.abs() < 1e-300 {
        return None;
    }
    let (r1, r2) = (d.dot(&e1), d.dot(&e2));
    let s = (c * r1 - b * r2) / det;
    let t = (a * r2 - b * r1) / det;
    Some([1.0 - s - t, s, t])
}

/// Distance from `q` to the segment `a`-`b`.
pub fn point_segment_distance(q: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    let t = if len_sq > 0.0 {
        ((q - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (q - (a + ab * t)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::fixtures;

    #[test]
    fn test_wrap_quarter() {
        assert!((wrap_quarter(FRAC_PI_2 + 0.1) - 0.1).abs() < 1e-12);
        assert!((wrap_quarter(-0.1) + 0.1).abs() < 1e-12);
        assert!((wrap_quarter(FRAC_PI_2 / 2.0) - FRAC_PI_2 / 2.0).abs() < 1e-12);
        assert!((wrap_quarter(-FRAC_PI_2 / 2.0) - FRAC_PI_2 / 2.0).abs() < 1e-12);
        assert!((wrap_pi(3.0 * PI) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_quarter_turns() {
        assert_eq!(quarter_turns(0.01), 0);
        assert_eq!(quarter_turns(FRAC_PI_2 - 0.01), 1);
        assert_eq!(quarter_turns(-FRAC_PI_2), 3);
        assert_eq!(quarter_turns(PI), 2);
    }

    #[test]
    fn test_hat_gradients_reproduce_linear_function() {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let g = hat_gradients(&p).unwrap();
        // f(x, y) = 3x - y sampled at the corners.
        let f: Vec<f64> = p.iter().map(|q| 3.0 * q.x - q.y).collect();
        let grad = g[0] * f[0] + g[1] * f[1] + g[2] * f[2];
        assert!((grad - Vector3::new(3.0, -1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_face_frame_is_orthonormal() {
        let surface = fixtures::icosphere(1);
        let mesh = surface.mesh();
        for frame in face_frames(mesh) {
            assert!(frame.valid);
            assert!(frame.x.dot(&frame.y).abs() < 1e-12);
            assert!(frame.x.dot(&frame.n).abs() < 1e-12);
            assert!((frame.y.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_barycentric() {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let b = barycentric(&p, &Point3::new(0.25, 0.5, 0.0)).unwrap();
        assert!((b[0] - 0.25).abs() < 1e-12);
        assert!((b[1] - 0.25).abs() < 1e-12);
        assert!((b[2] - 0.5).abs() < 1e-12);
    }
}
