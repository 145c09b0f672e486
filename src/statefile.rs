//! Statefile persistence for [`AdjustedMatrix`].
//!
//! A statefile is a flat JSON object with the 16 matrix cells under
//! 1-based keys `M11` through `M44` plus the pier correction under `PC`:
//!
//! ```json
//! {"M11": 0.98, "M12": -0.15, "M13": 0.03, "M14": -1276.2,
//!  "M21": 0.17, "M22": 0.99, "M23": -0.005, "M24": -0.85,
//!  "M31": -0.007, "M32": -0.012, "M33": 0.996, "M34": 905.4,
//!  "M41": 0, "M42": 0, "M43": 0, "M44": 1,
//!  "PC": -22}
//! ```
//!
//! All 17 keys are required. The `M4x` row is written as `0, 0, 0, 1` and
//! ignored on load.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{AdjustedError, Result};
use crate::matrix::AdjustedMatrix;

/// Key holding the pier correction.
pub const PIER_CORRECTION_KEY: &str = "PC";

/// Key for zero-based matrix cell `(row, col)`.
#[must_use]
pub fn cell_key(row: usize, col: usize) -> String {
    format!("M{}{}", row + 1, col + 1)
}

/// All 17 statefile keys in canonical order.
#[must_use]
pub fn statefile_keys() -> Vec<String> {
    let mut keys: Vec<String> = (0..4)
        .flat_map(|row| (0..4).map(move |col| cell_key(row, col)))
        .collect();
    keys.push(PIER_CORRECTION_KEY.to_string());
    keys
}

/// Keyed numeric representation of an [`AdjustedMatrix`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Statefile {
    values: BTreeMap<String, f64>,
}

impl Statefile {
    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Parse statefile JSON.
    ///
    /// Values may be JSON numbers or strings holding a float. Every statefile
    /// key must be present; other keys are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AdjustedError::MalformedStatefile`] for invalid JSON, a
    /// missing key, or a non-numeric value.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Value> = serde_json::from_str(json)
            .map_err(|e| AdjustedError::malformed_statefile("<document>", e.to_string()))?;

        let mut values = BTreeMap::new();
        for key in statefile_keys() {
            let value = raw
                .get(&key)
                .ok_or_else(|| AdjustedError::malformed_statefile(&key, "missing"))?;
            let number = parse_value(&key, value)?;
            values.insert(key, number);
        }
        Ok(Self { values })
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AdjustedError::MalformedStatefile`] if a value cannot be
    /// represented in JSON (NaN or infinite).
    pub fn to_json_string(&self) -> Result<String> {
        if let Some((key, value)) = self.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AdjustedError::malformed_statefile(
                key,
                format!("{value} is not representable in JSON"),
            ));
        }
        serde_json::to_string(&self.values)
            .map_err(|e| AdjustedError::malformed_statefile("<document>", e.to_string()))
    }
}

fn parse_value(key: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| AdjustedError::malformed_statefile(key, format!("{n} is not a float"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| AdjustedError::malformed_statefile(key, format!("{s:?}: {e}"))),
        other => Err(AdjustedError::malformed_statefile(
            key,
            format!("expected a number, got {other}"),
        )),
    }
}

/// Convert a matrix to its keyed representation.
#[must_use]
pub fn to_statefile(matrix: &AdjustedMatrix) -> Statefile {
    let rows = matrix.to_rows();
    let mut values = BTreeMap::new();
    for (r, row) in rows.iter().enumerate() {
        for (c, &cell) in row.iter().enumerate() {
            values.insert(cell_key(r, c), cell);
        }
    }
    values.insert(PIER_CORRECTION_KEY.to_string(), matrix.pier_correction());
    Statefile { values }
}

/// Rebuild a matrix from its keyed representation.
///
/// Row 4 of the file is replaced by `[0, 0, 0, 1]` whatever it holds.
///
/// # Errors
///
/// Returns [`AdjustedError::MalformedStatefile`] naming the first missing key.
pub fn from_statefile(statefile: &Statefile) -> Result<AdjustedMatrix> {
    let lookup = |key: String| {
        statefile
            .get(&key)
            .ok_or_else(|| AdjustedError::malformed_statefile(key, "missing"))
    };

    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = lookup(cell_key(r, c))?;
        }
    }
    let pier_correction = lookup(PIER_CORRECTION_KEY.to_string())?;

    Ok(AdjustedMatrix::from_rows(rows, pier_correction))
}

/// Load a matrix from a statefile on disk.
///
/// # Errors
///
/// Returns [`AdjustedError::StatefileIo`] if the file cannot be read and
/// [`AdjustedError::MalformedStatefile`] if its content is invalid.
pub fn read_statefile(path: impl AsRef<Path>) -> Result<AdjustedMatrix> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|e| AdjustedError::statefile_io(path, e))?;
    let matrix = from_statefile(&Statefile::from_json_str(&json)?)?;
    info!(
        path = %path.display(),
        pier_correction = matrix.pier_correction(),
        "loaded adjusted statefile"
    );
    Ok(matrix)
}

/// Write a matrix to a statefile on disk, replacing any existing file.
///
/// # Errors
///
/// Returns [`AdjustedError::StatefileIo`] if the file cannot be written.
pub fn write_statefile(path: impl AsRef<Path>, matrix: &AdjustedMatrix) -> Result<()> {
    let path = path.as_ref();
    let json = to_statefile(matrix).to_json_string()?;
    fs::write(path, json).map_err(|e| AdjustedError::statefile_io(path, e))?;
    info!(path = %path.display(), "saved adjusted statefile");
    Ok(())
}
