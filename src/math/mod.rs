//! Mathematical utilities for the adjusted transform.
//!
//! - [`linalg`]: homogeneous affine helpers over nalgebra

pub mod linalg;

pub use linalg::{apply_affine, matrix_from_rows, matrix_to_rows, normalize_homogeneous_row};
