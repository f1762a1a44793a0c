//! Read-only view over the precomputed ARIMA forecast.
//!
//! The table is a CSV with `date` and `forecast` columns. It usually carries a
//! leading unnamed index column left over from the export, which is ignored.

use std::{io::Read, path::Path};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{chart::LineSeries, errors::ForecastError};

/// Legend name of the forecast line.
pub const FORECAST_SERIES_NAME: &str = "Forecast ARIMA";

/// One forecast row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    /// Forecast day.
    pub date: NaiveDate,
    /// Forecast adjusted close.
    pub forecast: f64,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    forecast: f64,
}

/// The forecast rows, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastTable {
    /// Rows as read.
    pub rows: Vec<ForecastPoint>,
}

impl ForecastTable {
    /// Reads the table from `path`.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, ForecastError> {
        let path = path.as_ref();
        let reader = csv::Reader::from_path(path).map_err(|source| ForecastError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_csv(reader, path)?;
        info!(path = %path.display(), rows = table.len(), "loaded forecast table");
        Ok(table)
    }

    /// Reads the table from any CSV source with a header row.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, ForecastError> {
        Self::from_csv(csv::Reader::from_reader(rdr), Path::new("<reader>"))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>, path: &Path) -> Result<Self, ForecastError> {
        let mut rows = Vec::new();
        for (i, record) in reader.deserialize::<RawRow>().enumerate() {
            let raw = record.map_err(|source| ForecastError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let date = parse_date(&raw.date).ok_or_else(|| ForecastError::Date {
                row: i + 1,
                value: raw.date.clone(),
            })?;
            rows.push(ForecastPoint {
                date,
                forecast: raw.forecast,
            });
        }
        Ok(Self { rows })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of pages of `size` rows.
    pub fn page_count(&self, size: usize) -> usize {
        if size == 0 {
            return 0;
        }
        self.rows.len().div_ceil(size)
    }

    /// Rows of the zero-based page `n`. Out-of-range pages are empty.
    pub fn page(&self, n: usize, size: usize) -> &[ForecastPoint] {
        let start = n.saturating_mul(size).min(self.rows.len());
        let end = start.saturating_add(size).min(self.rows.len());
        &self.rows[start..end]
    }

    /// The forecast as a chart line.
    pub fn series(&self) -> LineSeries {
        LineSeries::new(
            FORECAST_SERIES_NAME,
            self.rows.iter().map(|r| (r.date, r.forecast)),
        )
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const CSV: &str = "\
,date,forecast
0,2023-01-03,125.07
1,2023-01-04 00:00:00,125.71
2,2023-01-05,126.02
3,2023-01-06,126.4
4,2023-01-09,126.93
";

    #[test]
    fn ignores_the_index_column() {
        let table = ForecastTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(
            table.rows[1],
            ForecastPoint {
                date: NaiveDate::from_ymd_opt(2023, 1, 4).unwrap(),
                forecast: 125.71
            }
        );
    }

    #[test]
    fn pages() {
        let table = ForecastTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.page_count(2), 3);
        assert_eq!(table.page(0, 2).len(), 2);
        assert_eq!(table.page(2, 2).len(), 1);
        assert_eq!(table.page(2, 2)[0].forecast, 126.93);
        assert!(table.page(3, 2).is_empty());
        assert!(table.page(0, 0).is_empty());
        assert_eq!(table.page_count(0), 0);
    }

    #[test]
    fn series_is_named() {
        let table = ForecastTable::from_reader(CSV.as_bytes()).unwrap();
        let line = table.series();
        assert_eq!(line.name, "Forecast ARIMA");
        assert_eq!(line.points.len(), 5);
    }

    #[test]
    fn bad_date_names_the_row() {
        let err = ForecastTable::from_reader("date,forecast\n2023-01-03,1.0\nJan 4,2.0\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, ForecastError::Date { row: 2, .. }), "{err}");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        let table = ForecastTable::load_csv(file.path()).unwrap();
        assert_eq!(table.len(), 5);

        let missing = ForecastTable::load_csv(file.path().with_extension("absent"));
        assert!(matches!(missing, Err(ForecastError::Csv { .. })));
    }
}
