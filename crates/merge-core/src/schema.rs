//! Column roles for the reconciled dataset.
//!
//! After reconciliation every canonical label is assigned exactly one
//! [`ColumnRole`]. Later stages consult the resulting [`Schema`] instead of
//! re-deriving which columns are timestamp inputs and which get averaged.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::table::Table;

/// Row-level timestamp column added by the temporal stage.
pub const DATETIME_COLUMN: &str = "datetime_utc";

/// Day-floored timestamp column added by the daily stage.
pub const DATE_COLUMN: &str = "date_utc";

// ── TemporalFields ────────────────────────────────────────────────────────────

/// Canonical names of the four columns that make up an observation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalFields {
    pub year: String,
    pub month: String,
    pub day: String,
    /// Three-hourly observation time, in whole UTC hours.
    pub hour: String,
}

impl Default for TemporalFields {
    fn default() -> Self {
        Self {
            year: "Year".to_string(),
            month: "Month".to_string(),
            day: "Day".to_string(),
            hour: "Three-hourly observation time(UTC)".to_string(),
        }
    }
}

impl TemporalFields {
    /// The four names in year, month, day, hour order.
    pub fn names(&self) -> [&str; 4] {
        [
            self.year.as_str(),
            self.month.as_str(),
            self.day.as_str(),
            self.hour.as_str(),
        ]
    }

    pub fn contains(&self, label: &str) -> bool {
        self.names().contains(&label)
    }

    /// Fail with every field name absent from `columns`.
    pub fn require_in(&self, columns: &[String]) -> Result<(), SchemaError> {
        let missing: Vec<String> = self
            .names()
            .into_iter()
            .filter(|name| !columns.iter().any(|c| c == name))
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::MissingFields(missing))
        }
    }
}

// ── ColumnRole / Schema ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// One of the four timestamp inputs.
    TemporalKey,
    /// `datetime_utc` / `date_utc`.
    Derived,
    /// Numeric column with at least one value; averaged per day.
    Measurement,
    /// Anything that never coerces to a number.
    Ignored,
}

/// Role of every column in a table, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    roles: Vec<(String, ColumnRole)>,
}

impl Schema {
    /// Classify each column of `table`.
    ///
    /// A column is a measurement when it is neither a temporal key nor a
    /// derived column and at least one of its cells coerces to a number.
    pub fn discover(table: &Table, fields: &TemporalFields) -> Self {
        let roles = table
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let role = if fields.contains(name) {
                    ColumnRole::TemporalKey
                } else if name == DATETIME_COLUMN || name == DATE_COLUMN {
                    ColumnRole::Derived
                } else if table.rows().iter().any(|row| row[idx].as_number().is_some()) {
                    ColumnRole::Measurement
                } else {
                    ColumnRole::Ignored
                };
                (name.clone(), role)
            })
            .collect();
        Self { roles }
    }

    pub fn role_of(&self, name: &str) -> Option<ColumnRole> {
        self.roles
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, role)| *role)
    }

    /// Measurement column names in table order.
    pub fn measurement_columns(&self) -> Vec<String> {
        self.roles
            .iter()
            .filter(|(_, role)| *role == ColumnRole::Measurement)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // ── require_in ────────────────────────────────────────────────────────────

    #[test]
    fn test_require_in_all_present() {
        let fields = TemporalFields::default();
        let cols = columns(&[
            "Year",
            "Month",
            "Day",
            "Three-hourly observation time(UTC)",
            "Temp",
        ]);
        assert!(fields.require_in(&cols).is_ok());
    }

    #[test]
    fn test_require_in_names_missing_fields() {
        let fields = TemporalFields::default();
        let err = fields
            .require_in(&columns(&["Year", "Month", "Temp"]))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingFields(vec![
                "Day".to_string(),
                "Three-hourly observation time(UTC)".to_string()
            ])
        );
    }

    // ── Schema::discover ──────────────────────────────────────────────────────

    #[test]
    fn test_discover_roles() {
        let table = Table::new(
            columns(&[
                "Year",
                "Month",
                "Day",
                "Three-hourly observation time(UTC)",
                "Temp",
                "Station",
                "Blank",
                "Pressure",
                "datetime_utc",
            ]),
            vec![
                vec![
                    Cell::Number(2005.0),
                    Cell::Number(1.0),
                    Cell::Number(1.0),
                    Cell::Number(0.0),
                    Cell::Number(5.0),
                    Cell::Text("north".into()),
                    Cell::Empty,
                    Cell::Text("1013.2".into()),
                    Cell::Empty,
                ],
                vec![
                    Cell::Number(2005.0),
                    Cell::Number(1.0),
                    Cell::Number(1.0),
                    Cell::Number(3.0),
                    Cell::Empty,
                    Cell::Text("south".into()),
                    Cell::Empty,
                    Cell::Text("n/a".into()),
                    Cell::Empty,
                ],
            ],
        )
        .unwrap();

        let schema = Schema::discover(&table, &TemporalFields::default());
        assert_eq!(schema.role_of("Year"), Some(ColumnRole::TemporalKey));
        assert_eq!(
            schema.role_of("Three-hourly observation time(UTC)"),
            Some(ColumnRole::TemporalKey)
        );
        assert_eq!(schema.role_of("datetime_utc"), Some(ColumnRole::Derived));
        assert_eq!(schema.role_of("Station"), Some(ColumnRole::Ignored));
        assert_eq!(schema.role_of("Blank"), Some(ColumnRole::Ignored));
        assert_eq!(schema.role_of("nope"), None);
        assert_eq!(schema.measurement_columns(), vec!["Temp", "Pressure"]);
    }

    #[test]
    fn test_custom_field_names() {
        let fields = TemporalFields {
            year: "yr".into(),
            month: "mo".into(),
            day: "dy".into(),
            hour: "hh".into(),
        };
        assert_eq!(fields.names(), ["yr", "mo", "dy", "hh"]);
        assert!(fields.contains("hh"));
        assert!(!fields.contains("Year"));
    }
}
