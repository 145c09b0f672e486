//! Adjusted transform matrix.
//!
//! An [`AdjustedMatrix`] pairs a 4×4 homogeneous affine matrix with a pier
//! correction. Rows 0–2 carry rotation, scale and shear, column 3 carries the
//! translation, and row 3 is always `[0, 0, 0, 1]`.
//!
//! # Example
//!
//! ```
//! use geomag_adjusted::AdjustedMatrix;
//!
//! let m = AdjustedMatrix::from_rows(
//!     [
//!         [1.0, 0.0, 0.0, 10.0],
//!         [0.0, 1.0, 0.0, 0.0],
//!         [0.0, 0.0, 1.0, 0.0],
//!         [9.0, 9.0, 9.0, 9.0], // normalized to [0, 0, 0, 1]
//!     ],
//!     -22.0,
//! );
//!
//! assert_eq!(m.transform(&[1.0, 2.0, 3.0]), [11.0, 2.0, 3.0]);
//! assert_eq!(m.to_rows()[3], [0.0, 0.0, 0.0, 1.0]);
//! ```

use chrono::{DateTime, Utc};
use nalgebra::Matrix4;

use crate::error::{AdjustedError, Result};
use crate::math::linalg::{apply_affine, matrix_from_rows, matrix_to_rows, normalize_homogeneous_row};

/// Affine transform from observatory to geographic basis plus pier correction.
///
/// Immutable once built. Wrap in `Arc` to share between algorithm instances.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedMatrix {
    matrix: Matrix4<f64>,
    pier_correction: f64,
    starttime: Option<DateTime<Utc>>,
    endtime: Option<DateTime<Utc>>,
}

impl AdjustedMatrix {
    /// Create a matrix; row 3 is forced to `[0, 0, 0, 1]`.
    #[must_use]
    pub fn new(mut matrix: Matrix4<f64>, pier_correction: f64) -> Self {
        normalize_homogeneous_row(&mut matrix);
        Self {
            matrix,
            pier_correction,
            starttime: None,
            endtime: None,
        }
    }

    /// Create a matrix from row-major nested arrays.
    #[must_use]
    pub fn from_rows(rows: [[f64; 4]; 4], pier_correction: f64) -> Self {
        Self::new(matrix_from_rows(&rows), pier_correction)
    }

    /// Identity transform with no pier correction.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(Matrix4::identity(), 0.0)
    }

    /// Attach the interval this matrix was fit for.
    ///
    /// `None` leaves that side of the interval open.
    #[must_use]
    pub fn with_validity(
        mut self,
        starttime: Option<DateTime<Utc>>,
        endtime: Option<DateTime<Utc>>,
    ) -> Self {
        self.starttime = starttime;
        self.endtime = endtime;
        self
    }

    /// The homogeneous 4×4 matrix.
    #[must_use]
    pub const fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Offset added to the vertical output channel.
    #[must_use]
    pub const fn pier_correction(&self) -> f64 {
        self.pier_correction
    }

    /// Start of the validity interval, if any.
    #[must_use]
    pub fn starttime(&self) -> Option<DateTime<Utc>> {
        self.starttime
    }

    /// End of the validity interval, if any.
    #[must_use]
    pub fn endtime(&self) -> Option<DateTime<Utc>> {
        self.endtime
    }

    /// Cell at zero-based `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is not below 4.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix[(row, col)]
    }

    /// Row-major copy of the matrix.
    #[must_use]
    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        matrix_to_rows(&self.matrix)
    }

    /// Apply the affine part to a 3-channel sample, without pier correction.
    #[must_use]
    #[inline]
    pub fn transform(&self, sample: &[f64; 3]) -> [f64; 3] {
        apply_affine(&self.matrix, sample)
    }

    /// Determinant of the full homogeneous matrix.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.matrix.determinant()
    }

    /// Inverse of the homogeneous matrix.
    ///
    /// # Errors
    ///
    /// Returns [`AdjustedError::SingularMatrix`] if the matrix cannot be inverted.
    pub fn inverse(&self) -> Result<Matrix4<f64>> {
        self.matrix
            .try_inverse()
            .ok_or_else(|| AdjustedError::SingularMatrix {
                determinant: self.determinant(),
            })
    }

    /// Whether `time` falls inside the validity interval.
    #[must_use]
    pub fn is_valid_at(&self, time: DateTime<Utc>) -> bool {
        self.starttime.map_or(true, |start| time >= start)
            && self.endtime.map_or(true, |end| time <= end)
    }
}

impl Default for AdjustedMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn bou_2016() -> AdjustedMatrix {
        AdjustedMatrix::from_rows(
            [
                [0.983_427_576_709_061_7, -0.154_730_742_009_021_57, 0.027_384_986_324_932_026, -1276.164_681_191_976],
                [0.166_801_729_927_065_68, 0.987_916_201_012_128, -0.004_986_833_229_585_152_5, -0.845_819_258_135_041_9],
                [-0.006_725_053_082_782_385, -0.011_809_351_484_171_948, 0.996_186_901_249_397_6, 905.380_088_579_684_4],
                [0.0, 0.0, 0.0, 1.0],
            ],
            -22.0,
        )
    }

    #[test]
    fn test_identity() {
        let m = AdjustedMatrix::identity();
        assert_relative_eq!(m.determinant(), 1.0);
        assert_relative_eq!(m.pier_correction(), 0.0);
        assert_eq!(m.transform(&[1.0, 2.0, 3.0]), [1.0, 2.0, 3.0]);
        assert_eq!(m, AdjustedMatrix::default());
    }

    #[test]
    fn test_row_normalized_on_construction() {
        let m = AdjustedMatrix::new(Matrix4::from_element(2.0), 1.5);
        assert_eq!(m.to_rows()[3], [0.0, 0.0, 0.0, 1.0]);
        assert_relative_eq!(m.get(0, 3), 2.0);
    }

    #[test]
    fn test_transform_known_matrix() {
        let m = bou_2016();
        let out = m.transform(&[20000.0, 0.0, 47000.0]);
        let expected_x = 0.983_427_576_709_061_7 * 20000.0 + 0.027_384_986_324_932_026 * 47000.0
            - 1276.164_681_191_976;
        assert_relative_eq!(out[0], expected_x, epsilon = 1e-9);
        assert_relative_eq!(m.get(0, 0), 9.834_275_77e-1, epsilon = 1e-6);
    }

    #[test]
    fn test_inverse_round_trip() {
        let m = bou_2016();
        let inv = m.inverse().unwrap();
        let product = m.matrix() * inv;
        assert_relative_eq!(product, Matrix4::identity(), epsilon = 1e-9);
    }

    #[test]
    fn test_singular_inverse_fails() {
        let m = AdjustedMatrix::from_rows(
            [
                [1.0, 2.0, 3.0, 0.0],
                [2.0, 4.0, 6.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            0.0,
        );
        assert!(matches!(
            m.inverse(),
            Err(AdjustedError::SingularMatrix { .. })
        ));
        // forward transform still works
        assert_eq!(m.transform(&[1.0, 0.0, 0.0]), [1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_validity_interval() {
        let start = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2016, 2, 1, 0, 0, 0).unwrap();
        let m = bou_2016().with_validity(Some(start), Some(end));

        assert!(m.is_valid_at(Utc.with_ymd_and_hms(2016, 1, 16, 0, 0, 0).unwrap()));
        assert!(m.is_valid_at(start));
        assert!(!m.is_valid_at(Utc.with_ymd_and_hms(2015, 12, 31, 0, 0, 0).unwrap()));
        assert!(!m.is_valid_at(Utc.with_ymd_and_hms(2016, 3, 1, 0, 0, 0).unwrap()));

        let open = bou_2016();
        assert!(open.is_valid_at(start));
        assert_eq!(open.starttime(), None);
        assert_eq!(open.endtime(), None);
    }
}
