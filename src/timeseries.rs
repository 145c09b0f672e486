//! Channel-oriented geomagnetic time-series.
//!
//! A [`Timeseries`] holds named channels of `f64` samples on a shared, evenly
//! spaced time grid described by [`TimeseriesStats`]. Missing samples are
//! stored as [`GAP`] (NaN) in place, so every channel always covers the full
//! requested range.

use std::ops::Range;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AdjustedError, Result};

/// Sentinel for a missing sample.
pub const GAP: f64 = f64::NAN;

/// Whether `value` is the gap sentinel.
///
/// NaN is not equal to itself, so gaps must never be tested with `==`.
#[must_use]
#[inline]
pub fn is_gap(value: f64) -> bool {
    value.is_nan()
}

/// Number of gap samples in `values`.
#[must_use]
pub fn gap_count(values: &[f64]) -> usize {
    values.iter().filter(|&&v| is_gap(v)).count()
}

/// Metadata shared by every channel of a time-series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesStats {
    /// Observatory code, e.g. `BOU`.
    pub station: String,
    /// Network code.
    pub network: String,
    /// Location code, e.g. `R0` for raw or `A0` for adjusted.
    pub location: String,
    /// Processing level, e.g. `variation` or `adjusted`.
    pub data_type: String,
    /// Time of the first sample.
    pub starttime: DateTime<Utc>,
    /// Seconds between samples.
    pub sampling_period: f64,
}

impl Default for TimeseriesStats {
    fn default() -> Self {
        Self {
            station: String::new(),
            network: "NT".to_string(),
            location: "R0".to_string(),
            data_type: "variation".to_string(),
            starttime: DateTime::<Utc>::default(),
            sampling_period: 60.0,
        }
    }
}

impl TimeseriesStats {
    /// Stats for `station` starting at `starttime` with the given period.
    #[must_use]
    pub fn new(station: impl Into<String>, starttime: DateTime<Utc>, sampling_period: f64) -> Self {
        Self {
            station: station.into(),
            starttime,
            sampling_period,
            ..Self::default()
        }
    }

    /// Timestamp of sample `index`, or `None` if it is not representable.
    #[must_use]
    pub fn checked_sample_time(&self, index: usize) -> Option<DateTime<Utc>> {
        let offset_ms = (index as f64 * self.sampling_period * 1000.0).round();
        if !offset_ms.is_finite() {
            return None;
        }
        let offset = TimeDelta::try_milliseconds(offset_ms as i64)?;
        self.starttime.checked_add_signed(offset)
    }

    /// Timestamp of sample `index`, saturating at the representable range.
    #[must_use]
    pub fn sample_time(&self, index: usize) -> DateTime<Utc> {
        self.checked_sample_time(index)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Fractional sample index of `time`; negative before the first sample.
    #[must_use]
    pub fn fractional_index(&self, time: DateTime<Utc>) -> f64 {
        let offset_ms = (time - self.starttime).num_milliseconds() as f64;
        offset_ms / (self.sampling_period * 1000.0)
    }
}

/// One named channel of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel name, e.g. `H` or `X`.
    pub name: String,
    /// Samples, with [`GAP`] marking missing values.
    pub data: Vec<f64>,
}

impl Channel {
    /// Create a channel.
    #[must_use]
    pub fn new(name: impl Into<String>, data: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A contiguous run of gap samples, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapSpan {
    /// Time of the first missing sample.
    pub start: DateTime<Utc>,
    /// Time of the last missing sample.
    pub end: DateTime<Utc>,
}

/// Index-aligned multi-channel time-series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Timeseries {
    /// Shared metadata.
    pub stats: TimeseriesStats,
    channels: Vec<Channel>,
}

impl Timeseries {
    /// Empty time-series with the given stats.
    #[must_use]
    pub fn new(stats: TimeseriesStats) -> Self {
        Self {
            stats,
            channels: Vec::new(),
        }
    }

    /// Add a channel, replacing any channel with the same name.
    #[must_use]
    pub fn with_channel(mut self, name: impl Into<String>, data: Vec<f64>) -> Self {
        self.push_channel(Channel::new(name, data));
        self
    }

    /// Add a channel, replacing any channel with the same name.
    pub fn push_channel(&mut self, channel: Channel) {
        match self.channels.iter_mut().find(|c| c.name == channel.name) {
            Some(existing) => *existing = channel,
            None => self.channels.push(channel),
        }
    }

    /// All channels in insertion order.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channel names in insertion order.
    #[must_use]
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Channel by name.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Samples of a channel by name.
    #[must_use]
    pub fn data(&self, name: &str) -> Option<&[f64]> {
        self.channel(name).map(|c| c.data.as_slice())
    }

    /// Whether a channel is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.channel(name).is_some()
    }

    /// Whether there are no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Common sample count of all channels; 0 when there are none.
    ///
    /// # Errors
    ///
    /// Returns [`AdjustedError::ChannelShapeMismatch`] naming the first
    /// channel whose length differs from the first channel.
    pub fn sample_count(&self) -> Result<usize> {
        let Some(first) = self.channels.first() else {
            return Ok(0);
        };
        let expected = first.data.len();
        match self.channels.iter().find(|c| c.data.len() != expected) {
            Some(bad) => Err(AdjustedError::channel_shape_mismatch(
                &bad.name,
                expected,
                bad.data.len(),
            )),
            None => Ok(expected),
        }
    }

    /// New time-series holding the named channels that exist, in the
    /// requested order.
    #[must_use]
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let mut out = Self::new(self.stats.clone());
        for name in names {
            if let Some(channel) = self.channel(name.as_ref()) {
                out.push_channel(channel.clone());
            }
        }
        out
    }

    /// Timestamp of sample `index`.
    #[must_use]
    pub fn sample_time(&self, index: usize) -> DateTime<Utc> {
        self.stats.sample_time(index)
    }

    /// Timestamp of the last sample of the longest channel.
    #[must_use]
    pub fn endtime(&self) -> DateTime<Utc> {
        let len = self.channels.iter().map(|c| c.data.len()).max().unwrap_or(0);
        self.sample_time(len.saturating_sub(1))
    }

    /// Sample indices of a channel of length `len` that fall in `[start, end]`.
    #[must_use]
    pub fn index_range(&self, start: DateTime<Utc>, end: DateTime<Utc>, len: usize) -> Range<usize> {
        if len == 0 || end < start {
            return 0..0;
        }
        let first = self.stats.fractional_index(start).ceil().max(0.0);
        let last = self.stats.fractional_index(end).floor();
        if last < 0.0 || first >= len as f64 {
            return 0..0;
        }
        let first = first as usize;
        let last = (last as usize).min(len - 1);
        if first > last {
            0..0
        } else {
            first..last + 1
        }
    }

    /// Whether `channel` has at least one non-gap sample in `[start, end]`.
    #[must_use]
    pub fn has_data(&self, channel: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.data(channel).is_some_and(|data| {
            self.index_range(start, end, data.len())
                .any(|i| !is_gap(data[i]))
        })
    }

    /// Contiguous gap spans of a channel, or `None` if it is absent.
    #[must_use]
    pub fn gaps(&self, channel: &str) -> Option<Vec<GapSpan>> {
        let data = self.data(channel)?;
        let mut spans = Vec::new();
        let mut open: Option<usize> = None;
        for (i, &value) in data.iter().enumerate() {
            match (is_gap(value), open) {
                (true, None) => open = Some(i),
                (false, Some(start)) => {
                    spans.push(GapSpan {
                        start: self.sample_time(start),
                        end: self.sample_time(i - 1),
                    });
                    open = None;
                }
                _ => {}
            }
        }
        if let Some(start) = open {
            spans.push(GapSpan {
                start: self.sample_time(start),
                end: self.sample_time(data.len() - 1),
            });
        }
        Some(spans)
    }

    /// Gap spans of several channels merged where they overlap or touch.
    ///
    /// Absent channels contribute nothing.
    #[must_use]
    pub fn merged_gaps<S: AsRef<str>>(&self, channels: &[S]) -> Vec<GapSpan> {
        let mut spans: Vec<GapSpan> = channels
            .iter()
            .filter_map(|c| self.gaps(c.as_ref()))
            .flatten()
            .collect();
        spans.sort_by_key(|s| s.start);

        let step = TimeDelta::try_milliseconds((self.stats.sampling_period * 1000.0).round() as i64)
            .unwrap_or(TimeDelta::MAX);
        let mut merged: Vec<GapSpan> = Vec::with_capacity(spans.len());
        for span in spans {
            if let Some(last) = merged.last_mut() {
                let touches = last
                    .end
                    .checked_add_signed(step)
                    .map_or(true, |limit| span.start <= limit);
                if touches {
                    if span.end > last.end {
                        last.end = span.end;
                    }
                    continue;
                }
            }
            merged.push(span);
        }
        merged
    }
}
