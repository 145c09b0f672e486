//! Linear algebra utilities for homogeneous affine transforms.
//!
//! Thin helpers over nalgebra's `Matrix4` used by [`crate::matrix`].

use nalgebra::{Matrix4, Vector4};

/// Fixed bottom row of a homogeneous affine matrix.
pub const HOMOGENEOUS_ROW: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

/// Overwrite the bottom row with `[0, 0, 0, 1]`.
pub fn normalize_homogeneous_row(matrix: &mut Matrix4<f64>) {
    for (col, &value) in HOMOGENEOUS_ROW.iter().enumerate() {
        matrix[(3, col)] = value;
    }
}

/// Build a matrix from row-major nested arrays.
#[must_use]
pub fn matrix_from_rows(rows: &[[f64; 4]; 4]) -> Matrix4<f64> {
    Matrix4::from_fn(|r, c| rows[r][c])
}

/// Copy a matrix out into row-major nested arrays.
#[must_use]
pub fn matrix_to_rows(matrix: &Matrix4<f64>) -> [[f64; 4]; 4] {
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = matrix[(r, c)];
        }
    }
    rows
}

/// Apply an affine matrix to a 3D point.
///
/// The point is lifted to `[x, y, z, 1]`, multiplied, and the trailing
/// homogeneous component is dropped.
#[must_use]
#[inline]
pub fn apply_affine(matrix: &Matrix4<f64>, point: &[f64; 3]) -> [f64; 3] {
    let out = matrix * Vector4::new(point[0], point[1], point[2], 1.0);
    [out[0], out[1], out[2]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_is_noop() {
        let point = [18000.0, -200.0, 48000.0];
        let out = apply_affine(&Matrix4::identity(), &point);
        for i in 0..3 {
            assert_relative_eq!(out[i], point[i]);
        }
    }

    #[test]
    fn test_translation_column() {
        let rows = [
            [1.0, 0.0, 0.0, 10.0],
            [0.0, 1.0, 0.0, -5.0],
            [0.0, 0.0, 1.0, 2.5],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let out = apply_affine(&matrix_from_rows(&rows), &[1.0, 2.0, 3.0]);
        assert_relative_eq!(out[0], 11.0);
        assert_relative_eq!(out[1], -3.0);
        assert_relative_eq!(out[2], 5.5);
    }

    #[test]
    fn test_rows_round_trip() {
        let rows = [
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0, 16.0],
        ];
        assert_eq!(matrix_to_rows(&matrix_from_rows(&rows)), rows);
    }

    #[test]
    fn test_normalize_row() {
        let mut m = Matrix4::from_element(7.0);
        normalize_homogeneous_row(&mut m);
        assert_eq!(matrix_to_rows(&m)[3], HOMOGENEOUS_ROW);
        assert_relative_eq!(m[(2, 3)], 7.0);
    }
}
