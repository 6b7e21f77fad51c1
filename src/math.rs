//! 4x4 homogeneous transforms and 3-vectors.
//!
//! Matrices are stored column-major and applied by post-multiplication:
//! `transform_vector(m, v)` computes `M * v`, and `multiply(a, b)` applies `b`
//! first. Every operation returns a fresh value; nothing mutates its inputs.
//!
//! All arithmetic is `f32`. Degeneracy checks use [`EPSILON`] relative to the
//! magnitude of the operands: a matrix counts as singular when
//! `|det| <= EPSILON * product(column lengths)` (the Hadamard bound, which
//! equals `|det|` for orthogonal columns), and a direction counts as zero when
//! its length is at most `EPSILON` times the length of the vectors it came from.

use std::f32::consts::PI;
use std::ops::{Add, Mul, Neg, Sub};

use crate::error::{RenderError, Result};

/// Relative tolerance for invertibility and degeneracy checks.
pub const EPSILON: f32 = 1e-6;

/// Three `f32` components used for positions, directions and colors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or zero when the length is too small
    /// to divide by.
    pub fn normalize(self) -> Self {
        let length = self.length();
        if length > f32::MIN_POSITIVE {
            self * (1.0 / length)
        } else {
            Self::ZERO
        }
    }

    /// Homogeneous point (`w = 1`).
    pub fn extend_point(self) -> Vector4 {
        Vector4::new(self.x, self.y, self.z, 1.0)
    }

    /// Homogeneous direction (`w = 0`).
    pub fn extend_direction(self) -> Vector4 {
        Vector4::new(self.x, self.y, self.z, 0.0)
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vector3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Homogeneous 4-vector accepted and returned by [`transform_vector`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vector4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    pub fn truncate(self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Column-major 4x4 matrix. Element `(row, col)` lives at `col * 4 + row`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4 {
    elements: [f32; 16],
}

impl Matrix4 {
    pub const IDENTITY: Self = Self {
        elements: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub const fn from_cols_array(elements: [f32; 16]) -> Self {
        Self { elements }
    }

    pub fn to_cols_array(&self) -> [f32; 16] {
        self.elements
    }

    pub fn as_array(&self) -> &[f32; 16] {
        &self.elements
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.elements[col * 4 + row]
    }

    /// Largest componentwise difference to `other`.
    pub fn max_abs_diff(&self, other: &Self) -> f32 {
        self.elements
            .iter()
            .zip(other.elements.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max)
    }

    pub fn abs_diff_eq(&self, other: &Self, tolerance: f32) -> bool {
        self.max_abs_diff(other) <= tolerance
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Matrix4 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        multiply(&self, &rhs)
    }
}

pub fn identity() -> Matrix4 {
    Matrix4::IDENTITY
}

/// Composes two transforms; `b` is applied first, then `a`.
pub fn multiply(a: &Matrix4, b: &Matrix4) -> Matrix4 {
    let a = &a.elements;
    let b = &b.elements;
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = a[row] * b[col * 4]
                + a[4 + row] * b[col * 4 + 1]
                + a[8 + row] * b[col * 4 + 2]
                + a[12 + row] * b[col * 4 + 3];
        }
    }
    Matrix4::from_cols_array(out)
}

pub fn transpose(m: &Matrix4) -> Matrix4 {
    let e = &m.elements;
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[row * 4 + col] = e[col * 4 + row];
        }
    }
    Matrix4::from_cols_array(out)
}

pub fn determinant(m: &Matrix4) -> f32 {
    let c = Cofactors::new(&m.elements);
    c.determinant()
}

/// Inverts `m`, reporting [`RenderError::DegenerateTransform`] when the matrix
/// is singular relative to [`EPSILON`].
pub fn inverse(m: &Matrix4) -> Result<Matrix4> {
    let e = &m.elements;
    let c = Cofactors::new(e);
    let det = c.determinant();

    let column_bound: f32 = e
        .chunks_exact(4)
        .map(|col| col.iter().map(|v| v * v).sum::<f32>().sqrt())
        .product();
    if !det.is_finite() || column_bound == 0.0 || det.abs() <= EPSILON * column_bound {
        return Err(RenderError::DegenerateTransform(format!(
            "matrix is singular (determinant {det:e})"
        )));
    }

    let [a00, a01, a02, a03, a10, a11, a12, a13, a20, a21, a22, a23, a30, a31, a32, a33] = *e;
    let Cofactors {
        b00,
        b01,
        b02,
        b03,
        b04,
        b05,
        b06,
        b07,
        b08,
        b09,
        b10,
        b11,
    } = c;
    let inv = 1.0 / det;

    Ok(Matrix4::from_cols_array([
        (a11 * b11 - a12 * b10 + a13 * b09) * inv,
        (a02 * b10 - a01 * b11 - a03 * b09) * inv,
        (a31 * b05 - a32 * b04 + a33 * b03) * inv,
        (a22 * b04 - a21 * b05 - a23 * b03) * inv,
        (a12 * b08 - a10 * b11 - a13 * b07) * inv,
        (a00 * b11 - a02 * b08 + a03 * b07) * inv,
        (a32 * b02 - a30 * b05 - a33 * b01) * inv,
        (a20 * b05 - a22 * b02 + a23 * b01) * inv,
        (a10 * b10 - a11 * b08 + a13 * b06) * inv,
        (a01 * b08 - a00 * b10 - a03 * b06) * inv,
        (a30 * b04 - a31 * b02 + a33 * b00) * inv,
        (a21 * b02 - a20 * b04 - a23 * b00) * inv,
        (a11 * b07 - a10 * b09 - a12 * b06) * inv,
        (a00 * b09 - a01 * b07 + a02 * b06) * inv,
        (a31 * b01 - a30 * b03 - a32 * b00) * inv,
        (a20 * b03 - a21 * b01 + a22 * b00) * inv,
    ]))
}

/// 2x2 sub-determinants shared by [`determinant`] and [`inverse`].
struct Cofactors {
    b00: f32,
    b01: f32,
    b02: f32,
    b03: f32,
    b04: f32,
    b05: f32,
    b06: f32,
    b07: f32,
    b08: f32,
    b09: f32,
    b10: f32,
    b11: f32,
}

impl Cofactors {
    fn new(e: &[f32; 16]) -> Self {
        let [a00, a01, a02, a03, a10, a11, a12, a13, a20, a21, a22, a23, a30, a31, a32, a33] = *e;
        Self {
            b00: a00 * a11 - a01 * a10,
            b01: a00 * a12 - a02 * a10,
            b02: a00 * a13 - a03 * a10,
            b03: a01 * a12 - a02 * a11,
            b04: a01 * a13 - a03 * a11,
            b05: a02 * a13 - a03 * a12,
            b06: a20 * a31 - a21 * a30,
            b07: a20 * a32 - a22 * a30,
            b08: a20 * a33 - a23 * a30,
            b09: a21 * a32 - a22 * a31,
            b10: a21 * a33 - a23 * a31,
            b11: a22 * a33 - a23 * a32,
        }
    }

    fn determinant(&self) -> f32 {
        self.b00 * self.b11 - self.b01 * self.b10 + self.b02 * self.b09 + self.b03 * self.b08
            - self.b04 * self.b07
            + self.b05 * self.b06
    }
}

pub fn translation(tx: f32, ty: f32, tz: f32) -> Matrix4 {
    Matrix4::from_cols_array([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        tx, ty, tz, 1.0,
    ])
}

pub fn scaling(sx: f32, sy: f32, sz: f32) -> Matrix4 {
    Matrix4::from_cols_array([
        sx, 0.0, 0.0, 0.0, //
        0.0, sy, 0.0, 0.0, //
        0.0, 0.0, sz, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ])
}

pub fn x_rotation(radians: f32) -> Matrix4 {
    let (s, c) = radians.sin_cos();
    Matrix4::from_cols_array([
        1.0, 0.0, 0.0, 0.0, //
        0.0, c, s, 0.0, //
        0.0, -s, c, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ])
}

pub fn y_rotation(radians: f32) -> Matrix4 {
    let (s, c) = radians.sin_cos();
    Matrix4::from_cols_array([
        c, 0.0, -s, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        s, 0.0, c, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ])
}

pub fn z_rotation(radians: f32) -> Matrix4 {
    let (s, c) = radians.sin_cos();
    Matrix4::from_cols_array([
        c, s, 0.0, 0.0, //
        -s, c, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ])
}

/// `multiply(m, translation(tx, ty, tz))`: the translation applies first.
pub fn translate(m: &Matrix4, tx: f32, ty: f32, tz: f32) -> Matrix4 {
    multiply(m, &translation(tx, ty, tz))
}

pub fn scale(m: &Matrix4, sx: f32, sy: f32, sz: f32) -> Matrix4 {
    multiply(m, &scaling(sx, sy, sz))
}

pub fn x_rotate(m: &Matrix4, radians: f32) -> Matrix4 {
    multiply(m, &x_rotation(radians))
}

pub fn y_rotate(m: &Matrix4, radians: f32) -> Matrix4 {
    multiply(m, &y_rotation(radians))
}

pub fn z_rotate(m: &Matrix4, radians: f32) -> Matrix4 {
    multiply(m, &z_rotation(radians))
}

/// Right-handed perspective projection into GL clip space (depth in `[-w, w]`).
///
/// Fails for `z_near <= 0`, `z_far <= z_near`, `aspect <= 0`, a field of view
/// outside `(0, pi)`, or any non-finite argument.
pub fn perspective(fov_y: f32, aspect: f32, z_near: f32, z_far: f32) -> Result<Matrix4> {
    let finite = [fov_y, aspect, z_near, z_far].iter().all(|v| v.is_finite());
    if !finite {
        return Err(degenerate("perspective parameters must be finite"));
    }
    if z_near <= 0.0 {
        return Err(degenerate(format!("z_near must be positive (got {z_near})")));
    }
    if z_far <= z_near {
        return Err(degenerate(format!(
            "z_far ({z_far}) must be greater than z_near ({z_near})"
        )));
    }
    if aspect <= 0.0 {
        return Err(degenerate(format!("aspect must be positive (got {aspect})")));
    }
    if fov_y <= 0.0 || fov_y >= PI {
        return Err(degenerate(format!(
            "vertical field of view must lie in (0, pi) (got {fov_y})"
        )));
    }

    let f = (PI * 0.5 - 0.5 * fov_y).tan();
    let range_inv = 1.0 / (z_near - z_far);
    Ok(Matrix4::from_cols_array([
        f / aspect,
        0.0,
        0.0,
        0.0,
        0.0,
        f,
        0.0,
        0.0,
        0.0,
        0.0,
        (z_near + z_far) * range_inv,
        -1.0,
        0.0,
        0.0,
        z_near * z_far * range_inv * 2.0,
        0.0,
    ]))
}

/// Camera-to-world matrix placing the camera at `eye` with its forward axis
/// (`-Z`) pointing at `target`. Invert it to obtain a view matrix.
///
/// `eye == target` and an `up` vector parallel to the view direction have no
/// well-defined orientation; both report [`RenderError::DegenerateTransform`].
pub fn look_at(eye: Vector3, target: Vector3, up: Vector3) -> Result<Matrix4> {
    let back = eye - target;
    let scale = eye.length().max(target.length()).max(1.0);
    if back.length() <= EPSILON * scale {
        return Err(degenerate("look_at eye and target coincide"));
    }
    let z_axis = back.normalize();

    let side = up.cross(z_axis);
    if side.length() <= EPSILON * up.length().max(f32::MIN_POSITIVE) {
        return Err(degenerate(
            "look_at up vector is parallel to the view direction",
        ));
    }
    let x_axis = side.normalize();
    let y_axis = z_axis.cross(x_axis).normalize();

    Ok(Matrix4::from_cols_array([
        x_axis.x, x_axis.y, x_axis.z, 0.0, //
        y_axis.x, y_axis.y, y_axis.z, 0.0, //
        z_axis.x, z_axis.y, z_axis.z, 0.0, //
        eye.x, eye.y, eye.z, 1.0,
    ]))
}

/// `M * v` with no perspective divide.
pub fn transform_vector(m: &Matrix4, v: Vector4) -> Vector4 {
    let e = &m.elements;
    let input = v.to_array();
    let mut out = [0.0; 4];
    for (row, value) in out.iter_mut().enumerate() {
        *value = (0..4).map(|col| e[col * 4 + row] * input[col]).sum();
    }
    Vector4::new(out[0], out[1], out[2], out[3])
}

/// Transforms a point and divides by `w` when `w` is non-zero.
pub fn transform_point(m: &Matrix4, p: Vector3) -> Vector3 {
    let v = transform_vector(m, p.extend_point());
    if v.w != 0.0 && v.w != 1.0 {
        v.truncate() * (1.0 / v.w)
    } else {
        v.truncate()
    }
}

fn degenerate(reason: impl Into<String>) -> RenderError {
    RenderError::DegenerateTransform(reason.into())
}
