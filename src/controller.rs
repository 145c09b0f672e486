//! Controller: fetch, transform, persist.
//!
//! A [`Controller`] asks its input factory for the channels the algorithm
//! chain needs, threads the time-series through each algorithm in order and
//! hands the result to its output factory.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::algorithm::Algorithm;
use crate::error::{AdjustedError, Result};
use crate::factory::TimeseriesFactory;
use crate::timeseries::Timeseries;

/// Runs a chain of algorithms between two factories.
pub struct Controller {
    input_factory: Box<dyn TimeseriesFactory>,
    output_factory: Box<dyn TimeseriesFactory>,
    algorithms: Vec<Box<dyn Algorithm>>,
}

impl Controller {
    /// Create a controller. An empty chain copies input to output.
    #[must_use]
    pub fn new(
        input_factory: Box<dyn TimeseriesFactory>,
        output_factory: Box<dyn TimeseriesFactory>,
        algorithms: Vec<Box<dyn Algorithm>>,
    ) -> Self {
        Self {
            input_factory,
            output_factory,
            algorithms,
        }
    }

    /// Input channels the chain needs to produce `output_channels`.
    #[must_use]
    pub fn input_channels(&self, output_channels: &[String]) -> Vec<String> {
        self.algorithms
            .iter()
            .rev()
            .fold(output_channels.to_vec(), |wanted, algorithm| {
                algorithm.get_input_channels(&wanted)
            })
    }

    /// Apply every algorithm in order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by an algorithm.
    pub fn process(&self, input: Timeseries) -> Result<Timeseries> {
        self.algorithms
            .iter()
            .try_fold(input, |timeseries, algorithm| algorithm.process(&timeseries))
    }

    /// Produce `output_channels` over `[start, end]`.
    ///
    /// Returns the persisted time-series, or `None` when the first algorithm
    /// reports it cannot produce data for the range and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`AdjustedError::InvalidTimeRange`] if `end` precedes `start`,
    /// or the first factory or algorithm error encountered.
    pub fn run(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        output_channels: &[String],
    ) -> Result<Option<Timeseries>> {
        if end < start {
            return Err(AdjustedError::invalid_time_range(format!(
                "start {start} is after end {end}"
            )));
        }

        let input_channels = self.input_channels(output_channels);
        info!(
            %start,
            %end,
            inputs = ?input_channels,
            outputs = ?output_channels,
            "controller run"
        );
        let input = self
            .input_factory
            .get_timeseries(start, end, &input_channels)?;

        if let Some(first) = self.algorithms.first() {
            if !first.can_produce_data(start, end, &input) {
                warn!(algorithm = first.name(), %start, %end, "no data to process, skipping");
                return Ok(None);
            }
        }

        let output = self.process(input)?.select(output_channels);
        self.output_factory.put_timeseries(&output, output_channels)?;
        Ok(Some(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::MemoryFactory;
    use crate::timeseries::TimeseriesStats;
    use chrono::{TimeDelta, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 5, 20, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_chain_copies() {
        let source = Timeseries::new(TimeseriesStats::new("BOU", start(), 60.0))
            .with_channel("H", vec![1.0, 2.0]);
        let controller = Controller::new(
            Box::new(MemoryFactory::new(source)),
            Box::new(MemoryFactory::default()),
            Vec::new(),
        );
        let wanted = vec!["H".to_string()];
        assert_eq!(controller.input_channels(&wanted), wanted);

        let out = controller
            .run(start(), start() + TimeDelta::minutes(1), &wanted)
            .unwrap()
            .unwrap();
        assert_eq!(out.data("H").unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn test_reversed_range_rejected() {
        let controller = Controller::new(
            Box::new(MemoryFactory::default()),
            Box::new(MemoryFactory::default()),
            Vec::new(),
        );
        let err = controller
            .run(start(), start() - TimeDelta::minutes(1), &["H".to_string()])
            .unwrap_err();
        assert!(matches!(err, AdjustedError::InvalidTimeRange(_)));
    }
}
