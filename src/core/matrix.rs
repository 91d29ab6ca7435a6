//! Affine transforms for page geometry.
//!
//! Matrices use the row-vector convention of the document format: a point is
//! transformed as `[x y 1] · M`, so `a.then(b)` applies `a` first and `b`
//! second. Placement chains read left to right in the order they are applied:
//!
//! ```text
//! Matrix::scale(2.0, 2.0).then(&Matrix::translate(10.0, 10.0)).then(&parent)
//! ```

use std::fmt;

/// A 2×3 affine transform `[a b c d e f]`.
///
/// ```text
/// | a b 0 |
/// | c d 0 |
/// | e f 1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::identity()
    }
}

impl Matrix {
    /// Create a matrix from its six components.
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Matrix { a, b, c, d, e, f }
    }

    /// The identity transform.
    pub const fn identity() -> Self {
        Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// Translation by (tx, ty).
    pub const fn translate(tx: f64, ty: f64) -> Self {
        Matrix::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Scale by (sx, sy) around the origin.
    pub const fn scale(sx: f64, sy: f64) -> Self {
        Matrix::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Mirror across the x axis (glyph space is y-up, page space is y-down).
    pub const fn flip_y() -> Self {
        Matrix::scale(1.0, -1.0)
    }

    /// Create a matrix from a `[a b c d e f]` array.
    pub fn from_array(m: [f64; 6]) -> Self {
        Matrix::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }

    /// Parse a whitespace separated `"a b c d e f"` string.
    ///
    /// Returns `None` unless exactly six finite numbers are present.
    pub fn parse(text: &str) -> Option<Self> {
        let mut values = [0.0; 6];
        let mut count = 0;
        for token in text.split_whitespace() {
            if count == 6 {
                return None;
            }
            let value: f64 = token.parse().ok()?;
            if !value.is_finite() {
                return None;
            }
            values[count] = value;
            count += 1;
        }
        (count == 6).then(|| Matrix::from_array(values))
    }

    /// Components as `[a b c d e f]`.
    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Apply `self` first, then `next`.
    pub fn then(&self, next: &Matrix) -> Matrix {
        Matrix {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    /// Transform a point.
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Whether all components are finite and the transform is invertible.
    pub fn is_invertible(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite()) && self.determinant().abs() > f64::EPSILON
    }

    /// Whether this is exactly the identity.
    pub fn is_identity(&self) -> bool {
        *self == Matrix::identity()
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.a, self.b, self.c, self.d, self.e, self.f
        )
    }
}
