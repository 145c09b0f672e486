//! Configuration for the adjusted algorithm.
//!
//! [`AdjustedConfig`] gathers the matrix source, the channel mapping between
//! observatory and geographic bases, and the metadata stamped on output.
//!
//! # Example
//!
//! ```
//! use geomag_adjusted::{AdjustedConfig, AdjustedMatrix};
//!
//! let config = AdjustedConfig::geographic().with_matrix(AdjustedMatrix::identity());
//! assert!(config.validate().is_ok());
//!
//! // Without a matrix source the configuration is rejected.
//! assert!(AdjustedConfig::geographic().validate().is_err());
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AdjustedError, Result};
use crate::matrix::AdjustedMatrix;
use crate::TRANSFORMED_CHANNELS;

/// Channel copied unchanged from input to output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassThrough {
    /// Input channel name.
    pub input: String,
    /// Output channel name.
    pub output: String,
}

impl PassThrough {
    /// Create a pass-through mapping.
    #[must_use]
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Configuration for [`crate::AdjustedAlgorithm`].
///
/// Exactly one of `matrix` and `statefile` must be set. The three
/// `inchannels` map positionally onto matrix rows 1–3 and produce the three
/// `outchannels` in the same order.
///
/// Channel names default to the EDGE convention: `H, E, Z` in, `X, Y, Z`
/// out, `F` passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustedConfig {
    /// In-memory transform matrix.
    #[serde(skip)]
    pub matrix: Option<Arc<AdjustedMatrix>>,

    /// Path of a statefile holding the transform matrix.
    pub statefile: Option<PathBuf>,

    /// Observatory-basis channels, in matrix row order.
    pub inchannels: [String; TRANSFORMED_CHANNELS],

    /// Geographic-basis channels, in matrix row order.
    pub outchannels: [String; TRANSFORMED_CHANNELS],

    /// Magnitude channel copied through untransformed.
    pub pass_through: Option<PassThrough>,

    /// Output channel receiving the pier correction.
    pub pier_correction_channel: String,

    /// `data_type` stamped on output stats.
    pub data_type: String,

    /// `location` stamped on output stats.
    pub location: String,
}

impl Default for AdjustedConfig {
    fn default() -> Self {
        Self {
            matrix: None,
            statefile: None,
            inchannels: ["H".to_string(), "E".to_string(), "Z".to_string()],
            outchannels: ["X".to_string(), "Y".to_string(), "Z".to_string()],
            pass_through: Some(PassThrough::new("F", "F")),
            pier_correction_channel: "Z".to_string(),
            data_type: "adjusted".to_string(),
            location: "A0".to_string(),
        }
    }
}

impl AdjustedConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`AdjustedError::MissingMatrix`] if no matrix source is set.
    /// - [`AdjustedError::AmbiguousMatrixSource`] if both are set.
    /// - [`AdjustedError::InvalidChannelMapping`] for empty or duplicate
    ///   channel names, or a pier-correction channel outside `outchannels`.
    pub fn validate(&self) -> Result<()> {
        match (&self.matrix, &self.statefile) {
            (None, None) => return Err(AdjustedError::MissingMatrix),
            (Some(_), Some(_)) => return Err(AdjustedError::AmbiguousMatrixSource),
            _ => {}
        }

        let mut inputs: Vec<&str> = self.inchannels.iter().map(String::as_str).collect();
        let mut outputs: Vec<&str> = self.outchannels.iter().map(String::as_str).collect();
        if let Some(pass) = &self.pass_through {
            inputs.push(&pass.input);
            outputs.push(&pass.output);
        }
        check_unique("input", &inputs)?;
        check_unique("output", &outputs)?;

        if !self.outchannels.contains(&self.pier_correction_channel) {
            return Err(AdjustedError::invalid_channel_mapping(format!(
                "pier correction channel {:?} is not one of the transformed outputs {:?}",
                self.pier_correction_channel, self.outchannels
            )));
        }
        Ok(())
    }

    /// Index of the pier-correction channel within `outchannels`.
    #[must_use]
    pub fn pier_correction_index(&self) -> Option<usize> {
        self.outchannels
            .iter()
            .position(|c| *c == self.pier_correction_channel)
    }

    /// Preset for observatory `H, E, Z, F` to geographic `X, Y, Z, F`.
    ///
    /// A matrix source still has to be supplied.
    #[must_use]
    pub fn geographic() -> Self {
        Self::default()
    }

    /// Preset transforming `H, E, Z` to `X, Y, Z` with no magnitude channel.
    #[must_use]
    pub fn no_pass_through() -> Self {
        Self {
            pass_through: None,
            ..Self::default()
        }
    }

    /// Use an in-memory matrix.
    #[must_use]
    pub fn with_matrix(mut self, matrix: impl Into<Arc<AdjustedMatrix>>) -> Self {
        self.matrix = Some(matrix.into());
        self
    }

    /// Load the matrix from a statefile.
    #[must_use]
    pub fn with_statefile(mut self, path: impl Into<PathBuf>) -> Self {
        self.statefile = Some(path.into());
        self
    }

    /// Set the observatory-basis channels.
    #[must_use]
    pub fn with_inchannels(mut self, channels: [&str; TRANSFORMED_CHANNELS]) -> Self {
        self.inchannels = channels.map(str::to_string);
        self
    }

    /// Set the geographic-basis channels.
    #[must_use]
    pub fn with_outchannels(mut self, channels: [&str; TRANSFORMED_CHANNELS]) -> Self {
        self.outchannels = channels.map(str::to_string);
        self
    }

    /// Set the pass-through channel.
    #[must_use]
    pub fn with_pass_through(mut self, input: &str, output: &str) -> Self {
        self.pass_through = Some(PassThrough::new(input, output));
        self
    }

    /// Drop the pass-through channel.
    #[must_use]
    pub fn without_pass_through(mut self) -> Self {
        self.pass_through = None;
        self
    }

    /// Set the output channel receiving the pier correction.
    #[must_use]
    pub fn with_pier_correction_channel(mut self, channel: &str) -> Self {
        self.pier_correction_channel = channel.to_string();
        self
    }

    /// Set the output `data_type`.
    #[must_use]
    pub fn with_data_type(mut self, data_type: &str) -> Self {
        self.data_type = data_type.to_string();
        self
    }

    /// Set the output `location`.
    #[must_use]
    pub fn with_location(mut self, location: &str) -> Self {
        self.location = location.to_string();
        self
    }
}

fn check_unique(side: &str, names: &[&str]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(AdjustedError::invalid_channel_mapping(format!(
                "empty {side} channel name"
            )));
        }
        if !seen.insert(*name) {
            return Err(AdjustedError::invalid_channel_mapping(format!(
                "duplicate {side} channel {name:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_identity() -> AdjustedConfig {
        AdjustedConfig::geographic().with_matrix(AdjustedMatrix::identity())
    }

    #[test]
    fn test_default_config() {
        let config = AdjustedConfig::default();
        assert_eq!(config.inchannels, ["H", "E", "Z"]);
        assert_eq!(config.outchannels, ["X", "Y", "Z"]);
        assert_eq!(config.pass_through, Some(PassThrough::new("F", "F")));
        assert_eq!(config.pier_correction_index(), Some(2));
        assert_eq!(config.data_type, "adjusted");
        assert_eq!(config.location, "A0");
    }

    #[test]
    fn test_matrix_source() {
        assert!(matches!(
            AdjustedConfig::default().validate(),
            Err(AdjustedError::MissingMatrix)
        ));
        assert!(matches!(
            with_identity().with_statefile("adjbou_state_.json").validate(),
            Err(AdjustedError::AmbiguousMatrixSource)
        ));
        assert!(with_identity().validate().is_ok());
        assert!(AdjustedConfig::default()
            .with_statefile("adjbou_state_.json")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_channel_validation() {
        let dup = with_identity().with_inchannels(["H", "H", "Z"]);
        assert!(matches!(
            dup.validate(),
            Err(AdjustedError::InvalidChannelMapping(_))
        ));

        let clash = with_identity().with_pass_through("Z", "G");
        assert!(clash.validate().is_err());

        let empty = with_identity().with_outchannels(["X", "", "Z"]);
        assert!(empty.validate().is_err());

        let bad_pier = with_identity().with_pier_correction_channel("F");
        assert!(bad_pier.validate().is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let config = with_identity()
            .with_inchannels(["U", "V", "W"])
            .with_outchannels(["X", "Y", "V"])
            .with_pier_correction_channel("V")
            .without_pass_through()
            .with_data_type("quasi-definitive")
            .with_location("Q0");
        assert!(config.validate().is_ok());
        assert_eq!(config.pier_correction_index(), Some(2));
        assert!(config.pass_through.is_none());
        assert_eq!(config.location, "Q0");
    }

    #[test]
    fn test_no_pass_through_preset() {
        let config = AdjustedConfig::no_pass_through();
        assert!(config.pass_through.is_none());
        assert_eq!(config.outchannels, AdjustedConfig::geographic().outchannels);
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{
            "statefile": "etc/adjusted/adjbou_state_.json",
            "outchannels": ["N", "E", "D"],
            "pier_correction_channel": "D"
        }"#;
        let config: AdjustedConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.statefile,
            Some(PathBuf::from("etc/adjusted/adjbou_state_.json"))
        );
        assert_eq!(config.inchannels, ["H", "E", "Z"]);
        assert_eq!(config.outchannels, ["N", "E", "D"]);
        assert!(config.matrix.is_none());
        assert!(config.validate().is_ok());
    }
}
