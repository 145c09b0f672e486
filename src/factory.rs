//! Time-series factories.
//!
//! A [`TimeseriesFactory`] is where a controller fetches input and persists
//! output. File formats and remote services live outside this crate; the
//! in-memory [`MemoryFactory`] serves tests and embedding applications.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{AdjustedError, Result};
use crate::timeseries::{Channel, Timeseries, TimeseriesStats, GAP};

/// Source and sink of channel time-series.
///
/// Gaps in produced time-series must be [`GAP`](crate::GAP) samples, and every
/// requested channel must cover the whole requested range.
pub trait TimeseriesFactory: Send + Sync {
    /// Fetch `channels` over `[start, end]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be retrieved.
    fn get_timeseries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        channels: &[String],
    ) -> Result<Timeseries>;

    /// Persist `channels` of `timeseries`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be stored.
    fn put_timeseries(&self, timeseries: &Timeseries, channels: &[String]) -> Result<()>;
}

/// Factory backed by an in-memory time-series.
///
/// Reads slice the stored series onto the requested range, padding samples
/// and channels it does not hold with gaps. Writes are appended to a log that
/// can be inspected with [`MemoryFactory::written`]. Reads longer than
/// [`MemoryFactory::MAX_SAMPLES`] are rejected.
#[derive(Debug, Default)]
pub struct MemoryFactory {
    source: Timeseries,
    written: RwLock<Vec<Timeseries>>,
}

impl MemoryFactory {
    /// Largest number of samples a single read may return.
    pub const MAX_SAMPLES: usize = 31_622_400;

    /// Factory serving `source`.
    #[must_use]
    pub fn new(source: Timeseries) -> Self {
        Self {
            source,
            written: RwLock::new(Vec::new()),
        }
    }

    /// Everything written so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`AdjustedError::Factory`] if the write log lock is poisoned.
    pub fn written(&self) -> Result<Vec<Timeseries>> {
        self.written
            .read()
            .map(|log| log.clone())
            .map_err(|e| AdjustedError::factory(e.to_string()))
    }
}

impl TimeseriesFactory for MemoryFactory {
    fn get_timeseries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        channels: &[String],
    ) -> Result<Timeseries> {
        if end < start {
            return Err(AdjustedError::invalid_time_range(format!(
                "start {start} is after end {end}"
            )));
        }
        let period = self.source.stats.sampling_period;
        if !(period.is_finite() && period > 0.0) {
            return Err(AdjustedError::factory(format!(
                "sampling period must be positive, got {period}"
            )));
        }

        let stats = TimeseriesStats {
            starttime: start,
            ..self.source.stats.clone()
        };
        let last = stats.fractional_index(end).floor();
        if last >= Self::MAX_SAMPLES as f64 {
            return Err(AdjustedError::invalid_time_range(format!(
                "{start} to {end} spans more than {} samples",
                Self::MAX_SAMPLES
            )));
        }
        let count = last as usize + 1;
        let times = (0..count)
            .map(|i| stats.checked_sample_time(i))
            .collect::<Option<Vec<DateTime<Utc>>>>()
            .ok_or_else(|| {
                AdjustedError::invalid_time_range(format!("{start} to {end} is not representable"))
            })?;

        let mut out = Timeseries::new(stats);
        for name in channels {
            let data = times
                .iter()
                .map(|&time| {
                    let at = self.source.stats.fractional_index(time);
                    self.source
                        .data(name)
                        .filter(|_| at >= 0.0 && (at - at.round()).abs() < 1e-6)
                        .and_then(|d| d.get(at.round() as usize).copied())
                        .unwrap_or(GAP)
                })
                .collect();
            out.push_channel(Channel::new(name.clone(), data));
        }
        debug!(%start, %end, channels = channels.len(), samples = count, "memory factory read");
        Ok(out)
    }

    fn put_timeseries(&self, timeseries: &Timeseries, channels: &[String]) -> Result<()> {
        let selected = timeseries.select(channels);
        let mut log = self
            .written
            .write()
            .map_err(|e| AdjustedError::factory(e.to_string()))?;
        debug!(channels = selected.channels().len(), "memory factory write");
        log.push(selected);
        Ok(())
    }
}
