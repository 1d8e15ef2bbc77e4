//! Rigid transforms: rotation, translation and an optional mirror.
//!
//! A transform maps a point `p`, expressed relative to the image center, to
//! `p' = R · M · p + t`, where `M` negates x when the mirror flag is set and
//! `R` is the rotation. In 2-D the rotation is a single in-plane angle
//! `alpha`; in 3-D it is a ZXZ Euler triple `(az, alt, phi)` with
//! `R = Rz(phi) · Rx(alt) · Rz(az)`. All angles are in degrees.

use std::fmt;

use serde::{Deserialize, Serialize};

pub type Matrix3 = [[f64; 3]; 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformKind {
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "3d")]
    ThreeD,
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwoD => write!(f, "2d"),
            Self::ThreeD => write!(f, "3d"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    kind: TransformKind,
    /// `[alpha, 0, 0]` for 2-D, `[az, alt, phi]` for 3-D.
    euler: [f64; 3],
    translation: [f64; 3],
    #[serde(default)]
    mirror: bool,
}

/// Decomposed in-plane parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Params2d {
    pub alpha: f64,
    pub tx: f64,
    pub ty: f64,
    pub mirror: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity_2d()
    }
}

impl Transform {
    pub fn identity_2d() -> Self {
        Self {
            kind: TransformKind::TwoD,
            euler: [0.0; 3],
            translation: [0.0; 3],
            mirror: false,
        }
    }

    pub fn identity_3d() -> Self {
        Self {
            kind: TransformKind::ThreeD,
            ..Self::identity_2d()
        }
    }

    /// In-plane rotation by `alpha` degrees followed by a `(tx, ty)` shift.
    pub fn planar(alpha: f64, tx: f64, ty: f64, mirror: bool) -> Self {
        Self {
            kind: TransformKind::TwoD,
            euler: [alpha, 0.0, 0.0],
            translation: [tx, ty, 0.0],
            mirror,
        }
    }

    pub fn rotation_2d(alpha: f64) -> Self {
        Self::planar(alpha, 0.0, 0.0, false)
    }

    pub fn translation_3d(t: [f64; 3]) -> Self {
        Self {
            translation: t,
            ..Self::identity_3d()
        }
    }

    pub fn euler_3d(az: f64, alt: f64, phi: f64, translation: [f64; 3]) -> Self {
        Self {
            kind: TransformKind::ThreeD,
            euler: [az, alt, phi],
            translation,
            mirror: false,
        }
    }

    /// Build from `Params2d`.
    pub fn from_params_2d(p: &Params2d) -> Self {
        Self::planar(p.alpha, p.tx, p.ty, p.mirror)
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    pub fn alpha(&self) -> f64 {
        self.euler[0]
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.euler[0] = alpha;
    }

    pub fn euler(&self) -> [f64; 3] {
        self.euler
    }

    pub fn translation(&self) -> [f64; 3] {
        self.translation
    }

    pub fn set_translation(&mut self, t: [f64; 3]) {
        self.translation = t;
        if self.kind == TransformKind::TwoD {
            self.translation[2] = 0.0;
        }
    }

    /// Set the translation so that it is applied *before* the rotation and
    /// mirror: `p' = R · M · (p + v)`.
    pub fn set_pre_translation(&mut self, v: [f64; 3]) {
        let l = self.linear();
        let t = mat_vec(&l, v);
        self.set_translation(t);
    }

    pub fn mirror(&self) -> bool {
        self.mirror
    }

    pub fn set_mirror(&mut self, mirror: bool) {
        self.mirror = mirror;
    }

    pub fn is_identity(&self) -> bool {
        !self.mirror && self.euler.iter().chain(&self.translation).all(|v| *v == 0.0)
    }

    pub fn params_2d(&self) -> Params2d {
        Params2d {
            alpha: self.euler[0],
            tx: self.translation[0],
            ty: self.translation[1],
            mirror: self.mirror,
        }
    }

    /// Rotation matrix `R` without the mirror.
    pub fn rotation_matrix(&self) -> Matrix3 {
        match self.kind {
            TransformKind::TwoD => rot_z(self.euler[0]),
            TransformKind::ThreeD => {
                let [az, alt, phi] = self.euler;
                mat_mul(&rot_z(phi), &mat_mul(&rot_x(alt), &rot_z(az)))
            }
        }
    }

    /// Linear part `R · M`.
    pub fn linear(&self) -> Matrix3 {
        let mut l = self.rotation_matrix();
        if self.mirror {
            for row in l.iter_mut() {
                row[0] = -row[0];
            }
        }
        l
    }

    /// Inverse of the linear part, `M · Rᵀ`.
    pub fn linear_inverse(&self) -> Matrix3 {
        let r = self.rotation_matrix();
        let mut inv = transpose(&r);
        if self.mirror {
            for v in inv[0].iter_mut() {
                *v = -*v;
            }
        }
        inv
    }

    /// Map a center-relative point forward.
    pub fn apply_point(&self, p: [f64; 3]) -> [f64; 3] {
        let q = mat_vec(&self.linear(), p);
        [
            q[0] + self.translation[0],
            q[1] + self.translation[1],
            q[2] + self.translation[2],
        ]
    }

    /// Map a center-relative output point back to its source location.
    pub fn invert_point(&self, p: [f64; 3]) -> [f64; 3] {
        let d = [
            p[0] - self.translation[0],
            p[1] - self.translation[1],
            p[2] - self.translation[2],
        ];
        mat_vec(&self.linear_inverse(), d)
    }

    /// Compose a horizontal flip on the output side (`M · T`), keeping the
    /// canonical "mirror first, then rotate, then translate" form.
    pub fn mirrored(&self) -> Self {
        let [a, b, c] = self.euler;
        let euler = match self.kind {
            TransformKind::TwoD => [-a, 0.0, 0.0],
            TransformKind::ThreeD => [-a, b, -c],
        };
        let [tx, ty, tz] = self.translation;
        Self {
            kind: self.kind,
            euler,
            translation: [-tx, ty, tz],
            mirror: !self.mirror,
        }
    }

    pub fn inverse(&self) -> Self {
        let [a, b, c] = self.euler;
        let euler = match (self.kind, self.mirror) {
            (TransformKind::TwoD, false) => [-a, 0.0, 0.0],
            (TransformKind::TwoD, true) => [a, 0.0, 0.0],
            (TransformKind::ThreeD, false) => [-c, -b, -a],
            (TransformKind::ThreeD, true) => [c, -b, a],
        };
        let t = mat_vec(&self.linear_inverse(), self.translation);
        Self {
            kind: self.kind,
            euler,
            translation: [-t[0], -t[1], -t[2]],
            mirror: self.mirror,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [tx, ty, tz] = self.translation;
        match self.kind {
            TransformKind::TwoD => write!(
                f,
                "2d alpha={:.3} tx={:.3} ty={:.3} mirror={}",
                self.euler[0], tx, ty, self.mirror
            ),
            TransformKind::ThreeD => write!(
                f,
                "3d az={:.3} alt={:.3} phi={:.3} tx={:.3} ty={:.3} tz={:.3} mirror={}",
                self.euler[0], self.euler[1], self.euler[2], tx, ty, tz, self.mirror
            ),
        }
    }
}

fn rot_z(deg: f64) -> Matrix3 {
    let (s, c) = deg.to_radians().sin_cos();
    [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]
}

fn rot_x(deg: f64) -> Matrix3 {
    let (s, c) = deg.to_radians().sin_cos();
    [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]
}

fn mat_mul(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn transpose(a: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in a.iter().enumerate() {
        for (j, v) in row.iter().enumerate() {
            out[j][i] = *v;
        }
    }
    out
}

pub(crate) fn mat_vec(a: &Matrix3, v: [f64; 3]) -> [f64; 3] {
    [
        a[0][0] * v[0] + a[0][1] * v[1] + a[0][2] * v[2],
        a[1][0] * v[0] + a[1][1] * v[1] + a[1][2] * v[2],
        a[2][0] * v[0] + a[2][1] * v[1] + a[2][2] * v[2],
    ]
}
