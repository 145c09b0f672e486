//! Adjusted algorithm: observatory basis to geographic basis.
//!
//! For every sample index `i` the three transformable input channels form the
//! homogeneous vector `[c1, c2, c3, 1]`, which is multiplied by the 4×4
//! [`AdjustedMatrix`]. The pier correction is then added to the configured
//! vertical output. A gap in any of the three inputs gaps all three outputs
//! at that index. The magnitude channel (usually `F`) is copied through and
//! keeps its own gaps; when a transformable input is absent it is the only
//! channel produced.
//!
//! # Example
//!
//! ```
//! use geomag_adjusted::{AdjustedAlgorithm, AdjustedMatrix, Algorithm, Timeseries, GAP};
//!
//! let algorithm = AdjustedAlgorithm::from_matrix(
//!     AdjustedMatrix::from_rows(
//!         [
//!             [1.0, 0.0, 0.0, 0.0],
//!             [0.0, 1.0, 0.0, 0.0],
//!             [0.0, 0.0, 1.0, 0.0],
//!             [0.0, 0.0, 0.0, 1.0],
//!         ],
//!         -22.0,
//!     ),
//! )?;
//!
//! let raw = Timeseries::default()
//!     .with_channel("H", vec![18000.0, GAP])
//!     .with_channel("E", vec![-200.0, 1.0])
//!     .with_channel("Z", vec![48000.0, 2.0])
//!     .with_channel("F", vec![52000.0, 52001.0]);
//!
//! let adjusted = algorithm.process(&raw)?;
//! assert_eq!(adjusted.data("Z").unwrap()[0], 47978.0);
//! assert!(adjusted.data("X").unwrap()[1].is_nan());
//! assert_eq!(adjusted.data("F").unwrap()[1], 52001.0);
//! # Ok::<(), geomag_adjusted::AdjustedError>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::algorithm::Algorithm;
use crate::config::AdjustedConfig;
use crate::error::{AdjustedError, Result};
use crate::matrix::AdjustedMatrix;
use crate::statefile::{read_statefile, write_statefile};
use crate::timeseries::{gap_count, is_gap, Channel, Timeseries, GAP};
use crate::TRANSFORMED_CHANNELS;

/// Affine transform of observatory channels using an [`AdjustedMatrix`].
#[derive(Debug, Clone)]
pub struct AdjustedAlgorithm {
    config: AdjustedConfig,
    matrix: Arc<AdjustedMatrix>,
    pier_index: usize,
}

impl AdjustedAlgorithm {
    /// Build the algorithm, loading the statefile if one is configured.
    ///
    /// # Errors
    ///
    /// Returns a configuration error from [`AdjustedConfig::validate`], or a
    /// statefile error if the configured statefile cannot be loaded.
    pub fn new(config: AdjustedConfig) -> Result<Self> {
        config.validate()?;
        let matrix = match (&config.matrix, &config.statefile) {
            (Some(matrix), None) => Arc::clone(matrix),
            (None, Some(path)) => Arc::new(read_statefile(path)?),
            (None, None) => return Err(AdjustedError::MissingMatrix),
            (Some(_), Some(_)) => return Err(AdjustedError::AmbiguousMatrixSource),
        };
        let pier_index = config.pier_correction_index().ok_or_else(|| {
            AdjustedError::invalid_channel_mapping(format!(
                "pier correction channel {:?} is not an output channel",
                config.pier_correction_channel
            ))
        })?;

        Ok(Self {
            config,
            matrix,
            pier_index,
        })
    }

    /// Default channel mapping with an in-memory matrix.
    ///
    /// # Errors
    ///
    /// See [`AdjustedAlgorithm::new`].
    pub fn from_matrix(matrix: impl Into<Arc<AdjustedMatrix>>) -> Result<Self> {
        Self::new(AdjustedConfig::default().with_matrix(matrix))
    }

    /// Default channel mapping with the matrix read from `path`.
    ///
    /// # Errors
    ///
    /// See [`AdjustedAlgorithm::new`].
    pub fn from_statefile(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(AdjustedConfig::default().with_statefile(path.as_ref()))
    }

    /// The transform matrix in use.
    #[must_use]
    pub fn matrix(&self) -> &Arc<AdjustedMatrix> {
        &self.matrix
    }

    /// The configuration the algorithm was built with.
    #[must_use]
    pub const fn config(&self) -> &AdjustedConfig {
        &self.config
    }

    /// Write the matrix to the configured statefile.
    ///
    /// Does nothing when the matrix was supplied in memory.
    ///
    /// # Errors
    ///
    /// Returns [`AdjustedError::StatefileIo`] if the file cannot be written.
    pub fn save_state(&self) -> Result<()> {
        match &self.config.statefile {
            Some(path) => write_statefile(path, &self.matrix),
            None => Ok(()),
        }
    }

    /// Look up the three transformable inputs and check they line up.
    fn transformable_inputs<'a>(
        &self,
        input: &'a Timeseries,
    ) -> Result<[&'a [f64]; TRANSFORMED_CHANNELS]> {
        let lookup = |name: &String| {
            input
                .data(name)
                .ok_or_else(|| AdjustedError::missing_channel(name))
        };
        let [first, second, third] = &self.config.inchannels;
        let found = [lookup(first)?, lookup(second)?, lookup(third)?];
        let expected = found[0].len();
        for (data, name) in found.iter().zip(&self.config.inchannels).skip(1) {
            if data.len() != expected {
                return Err(AdjustedError::channel_shape_mismatch(name, expected, data.len()));
            }
        }
        Ok(found)
    }

    /// Apply the matrix sample by sample.
    fn transform_channels(
        &self,
        inputs: [&[f64]; TRANSFORMED_CHANNELS],
    ) -> [Vec<f64>; TRANSFORMED_CHANNELS] {
        let n = inputs[0].len();
        let pier_correction = self.matrix.pier_correction();
        let mut outputs: [Vec<f64>; TRANSFORMED_CHANNELS] = [
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
        ];

        for i in 0..n {
            let sample = [inputs[0][i], inputs[1][i], inputs[2][i]];
            if sample.iter().any(|&v| is_gap(v)) {
                for out in &mut outputs {
                    out.push(GAP);
                }
                continue;
            }
            let mut adjusted = self.matrix.transform(&sample);
            adjusted[self.pier_index] += pier_correction;
            for (out, value) in outputs.iter_mut().zip(adjusted) {
                out.push(value);
            }
        }
        outputs
    }
}

impl Algorithm for AdjustedAlgorithm {
    fn name(&self) -> &str {
        "adjusted"
    }

    fn input_channels(&self) -> Vec<String> {
        let mut channels = self.config.inchannels.to_vec();
        if let Some(pass) = &self.config.pass_through {
            channels.push(pass.input.clone());
        }
        channels
    }

    fn output_channels(&self) -> Vec<String> {
        let mut channels = self.config.outchannels.to_vec();
        if let Some(pass) = &self.config.pass_through {
            channels.push(pass.output.clone());
        }
        channels
    }

    fn get_input_channels(&self, output_channels: &[String]) -> Vec<String> {
        let wants_transformed = output_channels
            .iter()
            .any(|c| self.config.outchannels.contains(c));
        if wants_transformed {
            return self.input_channels();
        }
        match &self.config.pass_through {
            Some(pass) if output_channels.contains(&pass.output) => vec![pass.input.clone()],
            _ => Vec::new(),
        }
    }

    fn process(&self, input: &Timeseries) -> Result<Timeseries> {
        let pass_through = self
            .config
            .pass_through
            .as_ref()
            .and_then(|pass| input.data(&pass.input).map(|data| (pass, data)));

        // Without every transformable input only the pass-through can be produced.
        let inputs = match self.transformable_inputs(input) {
            Ok(inputs) => Some(inputs),
            Err(AdjustedError::MissingChannel { channel }) if pass_through.is_some() => {
                debug!(%channel, "transformable input absent, emitting pass-through only");
                None
            }
            Err(e) => return Err(e),
        };

        if let (Some(inputs), Some((pass, data))) = (inputs, pass_through) {
            if data.len() != inputs[0].len() {
                return Err(AdjustedError::channel_shape_mismatch(
                    &pass.input,
                    inputs[0].len(),
                    data.len(),
                ));
            }
        }

        let mut stats = input.stats.clone();
        stats.data_type.clone_from(&self.config.data_type);
        stats.location.clone_from(&self.config.location);
        let mut output = Timeseries::new(stats);

        if let Some(inputs) = inputs {
            let transformed = self.transform_channels(inputs);
            debug!(
                samples = inputs[0].len(),
                gaps = gap_count(&transformed[0]),
                pass_through = pass_through.is_some(),
                "adjusted transform applied"
            );
            for (name, data) in self.config.outchannels.iter().zip(transformed) {
                output.push_channel(Channel::new(name.clone(), data));
            }
        }
        if let Some((pass, data)) = pass_through {
            output.push_channel(Channel::new(pass.output.clone(), data.to_vec()));
        }
        Ok(output)
    }

    fn can_produce_data(&self, start: DateTime<Utc>, end: DateTime<Utc>, input: &Timeseries) -> bool {
        if let Some(pass) = &self.config.pass_through {
            if input.has_data(&pass.input, start, end) {
                return true;
            }
        }
        let ok = self
            .config
            .inchannels
            .iter()
            .all(|c| input.has_data(c, start, end));
        if !ok {
            info!(%start, %end, "adjusted inputs have no data in range");
        }
        ok
    }
}
