use serde::{Deserialize, Serialize};

use super::{ModelError, Result};

const SINGULAR_EPSILON: f64 = 1e-12;

/// 4x4 homogeneous transform mapping voxel indices to physical coordinates.
///
/// Stored row-major. The bottom row is assumed to be `[0, 0, 0, 1]`; loaders that
/// produce anything else are rejected by [`Affine::from_rows`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    rows: [[f64; 4]; 4],
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine {
    pub fn identity() -> Self {
        Self::from_spacing([1.0, 1.0, 1.0])
    }

    pub fn from_spacing(spacing: [f64; 3]) -> Self {
        let mut rows = [[0.0; 4]; 4];
        for (axis, value) in spacing.iter().enumerate() {
            rows[axis][axis] = *value;
        }
        rows[3][3] = 1.0;
        Self { rows }
    }

    pub fn from_rows(rows: [[f64; 4]; 4]) -> Result<Self> {
        if rows.iter().flatten().any(|value| !value.is_finite()) {
            return Err(ModelError::NonFiniteAffine);
        }
        if rows[3] != [0.0, 0.0, 0.0, 1.0] {
            return Err(ModelError::NotAffine);
        }
        Ok(Self { rows })
    }

    pub fn with_translation(mut self, translation: [f64; 3]) -> Self {
        for (axis, value) in translation.iter().enumerate() {
            self.rows[axis][3] = *value;
        }
        self
    }

    pub fn rows(&self) -> &[[f64; 4]; 4] {
        &self.rows
    }

    pub fn translation(&self) -> [f64; 3] {
        [self.rows[0][3], self.rows[1][3], self.rows[2][3]]
    }

    pub fn transform_point(&self, point: [f64; 3]) -> [f64; 3] {
        let mut output = [0.0; 3];
        for (row, value) in output.iter_mut().enumerate() {
            *value = self.rows[row][0] * point[0]
                + self.rows[row][1] * point[1]
                + self.rows[row][2] * point[2]
                + self.rows[row][3];
        }
        output
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.rows;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    pub fn inverse(&self) -> Result<Affine> {
        let det = self.determinant();
        if det.abs() < SINGULAR_EPSILON || !det.is_finite() {
            return Err(ModelError::SingularAffine);
        }
        let m = &self.rows;
        let mut inv = [[0.0; 4]; 4];
        inv[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det;
        inv[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det;
        inv[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det;
        inv[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det;
        inv[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det;
        inv[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det;
        inv[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det;
        inv[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det;
        inv[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det;
        for row in 0..3 {
            inv[row][3] = -(0..3).map(|col| inv[row][col] * m[col][3]).sum::<f64>();
        }
        inv[3][3] = 1.0;
        Ok(Affine { rows: inv })
    }

    /// Physical size of one voxel step along each spatial axis.
    pub fn spacing(&self) -> [f64; 3] {
        let mut spacing = [0.0; 3];
        for (col, value) in spacing.iter_mut().enumerate() {
            *value = (0..3)
                .map(|row| self.rows[row][col] * self.rows[row][col])
                .sum::<f64>()
                .sqrt();
        }
        spacing
    }

    /// Affine of a grid sampled `factor` times more densely over the same extent.
    pub fn refined(&self, factor: f64) -> Affine {
        let mut rows = self.rows;
        for row in rows.iter_mut().take(3) {
            for value in row.iter_mut().take(3) {
                *value /= factor;
            }
        }
        Affine { rows }
    }
}
