//! Geomagnetic Adjusted Transform
//!
//! Converts geomagnetic observatory time-series from the sensor-native
//! basis (`H, E, Z, F`) to a geographic basis (`X, Y, Z, F`) with a 4×4
//! affine matrix and a pier correction fitted from absolute measurements.
//!
//! # Features
//!
//! - **Affine transform**: per-sample homogeneous matrix multiply in `f64`
//! - **Gap aware**: NaN samples propagate all-or-nothing across the three
//!   transformed channels; the magnitude channel keeps its own gaps
//! - **Statefile**: the matrix persists as a flat 17-key JSON object
//! - **Pipelines**: the [`Algorithm`] trait and [`Controller`] chain
//!   transforms between [`TimeseriesFactory`] sources and sinks
//!
//! # Quick Start
//!
//! ```
//! use geomag_adjusted::{AdjustedAlgorithm, AdjustedMatrix, Algorithm, Timeseries, GAP};
//!
//! let matrix = AdjustedMatrix::from_rows(
//!     [
//!         [1.0, 0.0, 0.0, 0.0],
//!         [0.0, 1.0, 0.0, 0.0],
//!         [0.0, 0.0, 1.0, 0.0],
//!         [0.0, 0.0, 0.0, 1.0],
//!     ],
//!     -22.0,
//! );
//! let algorithm = AdjustedAlgorithm::from_matrix(matrix)?;
//!
//! let raw = Timeseries::default()
//!     .with_channel("H", vec![18000.0, GAP, 18005.2])
//!     .with_channel("E", vec![-200.0, GAP, -199.8])
//!     .with_channel("Z", vec![48000.0, GAP, 48010.1])
//!     .with_channel("F", vec![52000.0, 52001.0, GAP]);
//!
//! let adjusted = algorithm.process(&raw)?;
//! assert_eq!(adjusted.channel_names(), vec!["X", "Y", "Z", "F"]);
//! assert_eq!(adjusted.data("Z").unwrap()[0], 47978.0);
//! # Ok::<(), geomag_adjusted::AdjustedError>(())
//! ```
//!
//! # Statefiles
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `M11`..`M34` | rows 1–3 of the matrix (1-based) |
//! | `M41`..`M44` | written as `0, 0, 0, 1`, ignored on load |
//! | `PC` | pier correction |

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod algorithm;
pub mod config;
pub mod controller;
pub mod error;
pub mod factory;
pub mod math;
pub mod matrix;
pub mod statefile;
pub mod timeseries;

// Re-exports for convenient access
pub use algorithm::{AdjustedAlgorithm, Algorithm};
pub use config::{AdjustedConfig, PassThrough};
pub use controller::Controller;
pub use error::{AdjustedError, Result};
pub use factory::{MemoryFactory, TimeseriesFactory};
pub use matrix::AdjustedMatrix;
pub use statefile::{from_statefile, read_statefile, to_statefile, write_statefile, Statefile};
pub use timeseries::{is_gap, Channel, GapSpan, Timeseries, TimeseriesStats, GAP};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of channels the matrix transforms.
pub const TRANSFORMED_CHANNELS: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn generate_raw(n: usize) -> Timeseries {
        let h = (0..n).map(|i| 20000.0 + i as f64 * 0.1).collect();
        let e = (0..n).map(|i| -150.0 + (i as f64 * 0.05).sin()).collect();
        let z = (0..n).map(|i| 47000.0 - i as f64 * 0.02).collect();
        let f = (0..n).map(|i| 51500.0 + i as f64 * 0.01).collect();
        Timeseries::default()
            .with_channel("H", h)
            .with_channel("E", e)
            .with_channel("Z", z)
            .with_channel("F", f)
    }

    #[test]
    fn test_full_pipeline() {
        let matrix = AdjustedMatrix::from_rows(
            [
                [0.98, -0.15, 0.03, -1276.0],
                [0.17, 0.99, -0.005, -0.8],
                [-0.007, -0.01, 0.996, 905.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            -22.0,
        );
        let json = to_statefile(&matrix).to_json_string().unwrap();
        let loaded = from_statefile(&Statefile::from_json_str(&json).unwrap()).unwrap();

        let algorithm = AdjustedAlgorithm::from_matrix(loaded).unwrap();
        let out = algorithm.process(&generate_raw(100)).unwrap();

        assert_eq!(out.sample_count().unwrap(), 100);
        assert_eq!(out.channels().len(), TRANSFORMED_CHANNELS + 1);
        assert!(out.channels().iter().all(|c| c.data.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_shared_matrix_across_threads() {
        let matrix = Arc::new(AdjustedMatrix::identity());
        let algorithm = Arc::new(AdjustedAlgorithm::from_matrix(Arc::clone(&matrix)).unwrap());
        let raw = Arc::new(generate_raw(50));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let algorithm = Arc::clone(&algorithm);
                let raw = Arc::clone(&raw);
                thread::spawn(move || algorithm.process(&raw).unwrap())
            })
            .collect();

        for handle in handles {
            let out = handle.join().unwrap();
            assert_eq!(out.data("X").unwrap(), raw.data("H").unwrap());
        }
        assert!(Arc::ptr_eq(algorithm.matrix(), &matrix));
    }
}
