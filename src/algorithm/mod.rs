//! Algorithm abstraction.
//!
//! Every transform implements [`Algorithm`] so a
//! [`Controller`](crate::controller::Controller) can chain them uniformly.
//! Implementations keep only immutable configuration, so one instance can be
//! shared across threads and reused for any number of time ranges.

pub mod adjusted;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::timeseries::Timeseries;

pub use adjusted::AdjustedAlgorithm;

/// A transform from one channel time-series to another.
pub trait Algorithm: Send + Sync {
    /// Short algorithm name used in logs.
    fn name(&self) -> &str;

    /// Every channel the algorithm can consume.
    fn input_channels(&self) -> Vec<String>;

    /// Every channel the algorithm can produce.
    fn output_channels(&self) -> Vec<String>;

    /// Input channels needed to produce `output_channels`.
    ///
    /// Lets a controller fetch only what the requested outputs depend on.
    fn get_input_channels(&self, output_channels: &[String]) -> Vec<String>;

    /// Transform `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` lacks required channels or is misaligned.
    fn process(&self, input: &Timeseries) -> Result<Timeseries>;

    /// Whether `input` holds enough data to produce output in `[start, end]`.
    ///
    /// By default every input channel needs at least one non-gap sample in
    /// the range.
    fn can_produce_data(&self, start: DateTime<Utc>, end: DateTime<Utc>, input: &Timeseries) -> bool {
        self.input_channels()
            .iter()
            .all(|c| input.has_data(c, start, end))
    }
}
