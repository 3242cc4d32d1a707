//! Linear isoparametric elements and their inverse maps
//!
//! Every supported element is reduced to its corner nodes. For the simplices the
//! natural coordinates are found in closed form, for the other shapes with a few
//! Newton iterations on the isoparametric map.

use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

/// tolerance on natural coordinates when deciding if a point is inside an element
const NATURAL_TOLERANCE: f64 = 1e-6;
const NEWTON_ITERATIONS: usize = 25;
const NEWTON_CONVERGENCE: f64 = 1e-12;

/// the largest number of corner nodes of any supported element
pub const MAX_CORNERS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Hex8,
    Wedge6,
    Tet4,
    Quad4,
    Tri3,
}

impl ElementKind {
    /// map an Exodus `elem_type` attribute (`HEX8`, `HEX27`, `TETRA10`, `QUAD4`, ..)
    /// to the linear element formed by its corner nodes
    pub fn from_exodus_name(name: &str, nodes_per_element: usize) -> Option<Self> {
        let name = name.trim().to_ascii_uppercase();

        let kind = if name.starts_with("HEX") {
            Self::Hex8
        } else if name.starts_with("WEDGE") {
            Self::Wedge6
        } else if name.starts_with("TET") {
            Self::Tet4
        } else if name.starts_with("QUAD") {
            Self::Quad4
        } else if name.starts_with("TRI") {
            Self::Tri3
        } else {
            return None;
        };

        if nodes_per_element < kind.corner_count() {
            return None;
        }

        Some(kind)
    }

    pub fn corner_count(&self) -> usize {
        match self {
            Self::Hex8 => 8,
            Self::Wedge6 => 6,
            Self::Tet4 | Self::Quad4 => 4,
            Self::Tri3 => 3,
        }
    }

    /// spatial dimension of the element
    pub fn dimension(&self) -> usize {
        match self {
            Self::Hex8 | Self::Wedge6 | Self::Tet4 => 3,
            Self::Quad4 | Self::Tri3 => 2,
        }
    }

    /// Interpolation weights of the corner nodes at `point`, or `None` if the point
    /// lies outside the element. Two dimensional elements ignore the z coordinate.
    pub fn weights(&self, corners: &[[f64; 3]], point: [f64; 3]) -> Option<[f64; MAX_CORNERS]> {
        debug_assert_eq!(corners.len(), self.corner_count());

        match self {
            Self::Hex8 => hex8_weights(corners, point),
            Self::Wedge6 => wedge6_weights(corners, point),
            Self::Tet4 => tet4_weights(corners, point),
            Self::Quad4 => quad4_weights(corners, point),
            Self::Tri3 => tri3_weights(corners, point),
        }
    }
}

const HEX_NATURAL: [[f64; 3]; 8] = [
    [-1., -1., -1.],
    [1., -1., -1.],
    [1., 1., -1.],
    [-1., 1., -1.],
    [-1., -1., 1.],
    [1., -1., 1.],
    [1., 1., 1.],
    [-1., 1., 1.],
];

const QUAD_NATURAL: [[f64; 2]; 4] = [[-1., -1.], [1., -1.], [1., 1.], [-1., 1.]];

/// shape functions and their natural derivatives for a trilinear hexahedron
fn hex8_shape(xi: [f64; 3]) -> ([f64; 8], [[f64; 3]; 8]) {
    let mut n = [0.; 8];
    let mut dn = [[0.; 3]; 8];

    for (i, node) in HEX_NATURAL.iter().enumerate() {
        let a = 1. + xi[0] * node[0];
        let b = 1. + xi[1] * node[1];
        let c = 1. + xi[2] * node[2];

        n[i] = 0.125 * a * b * c;
        dn[i] = [
            0.125 * node[0] * b * c,
            0.125 * a * node[1] * c,
            0.125 * a * b * node[2],
        ];
    }

    (n, dn)
}

/// shape functions for a linear wedge: triangle coordinates (r, s) times a linear
/// interpolation in zeta between the bottom (nodes 0..3) and top (nodes 3..6) faces
fn wedge6_shape(xi: [f64; 3]) -> ([f64; 6], [[f64; 3]; 6]) {
    let [r, s, zeta] = xi;
    let tri = [1. - r - s, r, s];
    let tri_dr = [-1., 1., 0.];
    let tri_ds = [-1., 0., 1.];

    let mut n = [0.; 6];
    let mut dn = [[0.; 3]; 6];

    for i in 0..3 {
        let bottom = 0.5 * (1. - zeta);
        let top = 0.5 * (1. + zeta);

        n[i] = tri[i] * bottom;
        n[i + 3] = tri[i] * top;

        dn[i] = [tri_dr[i] * bottom, tri_ds[i] * bottom, -0.5 * tri[i]];
        dn[i + 3] = [tri_dr[i] * top, tri_ds[i] * top, 0.5 * tri[i]];
    }

    (n, dn)
}

fn quad4_shape(xi: [f64; 2]) -> ([f64; 4], [[f64; 2]; 4]) {
    let mut n = [0.; 4];
    let mut dn = [[0.; 2]; 4];

    for (i, node) in QUAD_NATURAL.iter().enumerate() {
        let a = 1. + xi[0] * node[0];
        let b = 1. + xi[1] * node[1];

        n[i] = 0.25 * a * b;
        dn[i] = [0.25 * node[0] * b, 0.25 * a * node[1]];
    }

    (n, dn)
}

/// Newton iteration on a three dimensional isoparametric map
fn invert_3d<const N: usize>(
    corners: &[[f64; 3]],
    point: [f64; 3],
    start: [f64; 3],
    shape: fn([f64; 3]) -> ([f64; N], [[f64; 3]; N]),
) -> Option<[f64; 3]> {
    let target = Vector3::from(point);
    let mut xi = Vector3::from(start);

    for _ in 0..NEWTON_ITERATIONS {
        let (n, dn) = shape([xi.x, xi.y, xi.z]);

        let mut mapped = Vector3::zeros();
        let mut jacobian = Matrix3::zeros();

        for i in 0..N {
            let x = Vector3::from(corners[i]);
            mapped += x * n[i];
            jacobian += x * Vector3::from(dn[i]).transpose();
        }

        let delta = jacobian.try_inverse()? * (target - mapped);
        xi += delta;

        if delta.norm() < NEWTON_CONVERGENCE {
            break;
        }
    }

    if xi.iter().all(|v| v.is_finite()) {
        Some([xi.x, xi.y, xi.z])
    } else {
        None
    }
}

fn invert_2d<const N: usize>(
    corners: &[[f64; 3]],
    point: [f64; 3],
    start: [f64; 2],
    shape: fn([f64; 2]) -> ([f64; N], [[f64; 2]; N]),
) -> Option<[f64; 2]> {
    let target = Vector2::new(point[0], point[1]);
    let mut xi = Vector2::from(start);

    for _ in 0..NEWTON_ITERATIONS {
        let (n, dn) = shape([xi.x, xi.y]);

        let mut mapped = Vector2::zeros();
        let mut jacobian = Matrix2::zeros();

        for i in 0..N {
            let x = Vector2::new(corners[i][0], corners[i][1]);
            mapped += x * n[i];
            jacobian += x * Vector2::from(dn[i]).transpose();
        }

        let delta = jacobian.try_inverse()? * (target - mapped);
        xi += delta;

        if delta.norm() < NEWTON_CONVERGENCE {
            break;
        }
    }

    if xi.iter().all(|v| v.is_finite()) {
        Some([xi.x, xi.y])
    } else {
        None
    }
}

fn within_unit_box(coordinates: &[f64]) -> bool {
    coordinates
        .iter()
        .all(|c| c.abs() <= 1. + NATURAL_TOLERANCE)
}

fn expand<const N: usize>(weights: [f64; N]) -> [f64; MAX_CORNERS] {
    let mut out = [0.; MAX_CORNERS];
    out[..N].copy_from_slice(&weights);
    out
}

fn hex8_weights(corners: &[[f64; 3]], point: [f64; 3]) -> Option<[f64; MAX_CORNERS]> {
    let xi = invert_3d(corners, point, [0.; 3], hex8_shape)?;

    if !within_unit_box(&xi) {
        return None;
    }

    Some(expand(hex8_shape(xi).0))
}

fn wedge6_weights(corners: &[[f64; 3]], point: [f64; 3]) -> Option<[f64; MAX_CORNERS]> {
    let xi = invert_3d(corners, point, [1. / 3., 1. / 3., 0.], wedge6_shape)?;
    let [r, s, zeta] = xi;

    let inside = r >= -NATURAL_TOLERANCE
        && s >= -NATURAL_TOLERANCE
        && r + s <= 1. + NATURAL_TOLERANCE
        && zeta.abs() <= 1. + NATURAL_TOLERANCE;

    if !inside {
        return None;
    }

    Some(expand(wedge6_shape(xi).0))
}

fn quad4_weights(corners: &[[f64; 3]], point: [f64; 3]) -> Option<[f64; MAX_CORNERS]> {
    let xi = invert_2d(corners, point, [0.; 2], quad4_shape)?;

    if !within_unit_box(&xi) {
        return None;
    }

    Some(expand(quad4_shape(xi).0))
}

fn tet4_weights(corners: &[[f64; 3]], point: [f64; 3]) -> Option<[f64; MAX_CORNERS]> {
    let origin = Vector3::from(corners[0]);
    let edges = Matrix3::from_columns(&[
        Vector3::from(corners[1]) - origin,
        Vector3::from(corners[2]) - origin,
        Vector3::from(corners[3]) - origin,
    ]);

    let local = edges.try_inverse()? * (Vector3::from(point) - origin);
    let weights = [1. - local.x - local.y - local.z, local.x, local.y, local.z];

    if weights.iter().any(|w| *w < -NATURAL_TOLERANCE) {
        return None;
    }

    Some(expand(weights))
}

fn tri3_weights(corners: &[[f64; 3]], point: [f64; 3]) -> Option<[f64; MAX_CORNERS]> {
    let origin = Vector2::new(corners[0][0], corners[0][1]);
    let edges = Matrix2::from_columns(&[
        Vector2::new(corners[1][0], corners[1][1]) - origin,
        Vector2::new(corners[2][0], corners[2][1]) - origin,
    ]);

    let local = edges.try_inverse()? * (Vector2::new(point[0], point[1]) - origin);
    let weights = [1. - local.x - local.y, local.x, local.y];

    if weights.iter().any(|w| *w < -NATURAL_TOLERANCE) {
        return None;
    }

    Some(expand(weights))
}
