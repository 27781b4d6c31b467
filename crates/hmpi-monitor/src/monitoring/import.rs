//! Bulk sample import file: an 11-column CSV with a published template.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;

use super::domain::{parse_sample_date, NewSample, RecordId, SampleReadings};

pub const TEMPLATE_COLUMNS: [&str; 11] = [
    "SampleID",
    "ProjectID",
    "District",
    "City",
    "Latitude",
    "Longitude",
    "Metal",
    "Si",
    "Ii",
    "Mi",
    "Date",
];

const TEMPLATE_ROWS: [[&str; 11]; 2] = [
    [
        "S001", "P001", "Dhanbad", "Jharia", "23.7479", "86.4206", "Lead", "0.09", "0.3", "0.7",
        "2025-01-15",
    ],
    [
        "S002", "P001", "Dhanbad", "Jharia", "23.7512", "86.4178", "Cadmium", "0.004", "0.003",
        "0.7", "2025-01-16",
    ],
];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unreadable import file: {0}")]
    Csv(#[from] csv::Error),
    #[error("import header mismatch: expected '{expected}', found '{found}'")]
    Header { expected: String, found: String },
    #[error("row {row}: column {column}: {message}")]
    Field {
        row: usize,
        column: &'static str,
        message: String,
    },
    #[error("import file contains no samples")]
    Empty,
}

/// One parsed line of an import file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleImportRow {
    pub sample_label: String,
    pub project_id: RecordId,
    pub district: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub metal: String,
    pub readings: SampleReadings,
    pub date: NaiveDate,
}

impl SampleImportRow {
    /// Insert payload for this row. The external label is not stored; the table assigns
    /// the record id.
    pub fn to_new_sample(&self) -> NewSample {
        NewSample {
            project_id: self.project_id.clone(),
            metal: self.metal.clone(),
            readings: self.readings,
            latitude: self.latitude,
            longitude: self.longitude,
            district: self.district.clone(),
            city: self.city.clone(),
            date: self.date,
        }
    }
}

/// The downloadable template: header plus two example rows.
pub fn template_csv() -> String {
    std::iter::once(TEMPLATE_COLUMNS)
        .chain(TEMPLATE_ROWS)
        .map(|record| record.join(",") + "\n")
        .collect()
}

/// Parse an import file. The first invalid row rejects the whole file.
pub fn parse_samples<R: Read>(reader: R) -> Result<Vec<SampleImportRow>, ImportError> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    check_headers(&headers)?;

    let mut rows = Vec::new();
    for (index, record) in csv.records().enumerate() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(parse_row(index + 1, &record)?);
    }

    if rows.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(rows)
}

fn check_headers(headers: &StringRecord) -> Result<(), ImportError> {
    let matches = headers.len() == TEMPLATE_COLUMNS.len()
        && headers
            .iter()
            .zip(TEMPLATE_COLUMNS)
            .all(|(found, expected)| found.eq_ignore_ascii_case(expected));

    if matches {
        Ok(())
    } else {
        Err(ImportError::Header {
            expected: TEMPLATE_COLUMNS.join(","),
            found: headers.iter().collect::<Vec<_>>().join(","),
        })
    }
}

fn parse_row(row: usize, record: &StringRecord) -> Result<SampleImportRow, ImportError> {
    let field = |position: usize| record.get(position).unwrap_or_default();

    let required = |position: usize| -> Result<String, ImportError> {
        let value = field(position);
        if value.is_empty() {
            Err(ImportError::Field {
                row,
                column: TEMPLATE_COLUMNS[position],
                message: "value is required".to_string(),
            })
        } else {
            Ok(value.to_string())
        }
    };

    let number = |position: usize| -> Result<f64, ImportError> {
        let raw = required(position)?;
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| ImportError::Field {
                row,
                column: TEMPLATE_COLUMNS[position],
                message: format!("'{raw}' is not a number"),
            })
    };

    let optional_number = |position: usize| -> Result<Option<f64>, ImportError> {
        if field(position).is_empty() {
            Ok(None)
        } else {
            number(position).map(Some)
        }
    };

    let date = parse_sample_date(&required(10)?).map_err(|message| ImportError::Field {
        row,
        column: TEMPLATE_COLUMNS[10],
        message,
    })?;

    Ok(SampleImportRow {
        sample_label: field(0).to_string(),
        project_id: RecordId(required(1)?),
        district: field(2).to_string(),
        city: field(3).to_string(),
        latitude: optional_number(4)?,
        longitude: optional_number(5)?,
        metal: required(6)?,
        readings: SampleReadings {
            si: number(7)?,
            ii: number(8)?,
            mi: number(9)?,
        },
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_has_header_and_two_examples() {
        let template = template_csv();
        let lines: Vec<&str> = template.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "SampleID,ProjectID,District,City,Latitude,Longitude,Metal,Si,Ii,Mi,Date"
        );
    }

    #[test]
    fn template_parses_into_samples() {
        let rows = parse_samples(template_csv().as_bytes()).expect("template parses");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sample_label, "S001");
        assert_eq!(rows[0].project_id, RecordId::from("P001"));
        assert_eq!(rows[1].metal, "Cadmium");
        assert_eq!(rows[1].readings.ii, 0.003);
    }

    #[test]
    fn rejects_wrong_header() {
        let err = parse_samples("id,metal\n1,Lead\n".as_bytes()).expect_err("bad header");
        assert!(matches!(err, ImportError::Header { .. }));
    }

    #[test]
    fn reports_row_and_column_of_bad_value() {
        let csv = format!(
            "{}\nS1,P1,D,C,,,Lead,abc,0.3,0.7,2025-01-01\n",
            TEMPLATE_COLUMNS.join(",")
        );
        let err = parse_samples(csv.as_bytes()).expect_err("bad number");
        match err {
            ImportError::Field { row, column, .. } => {
                assert_eq!(row, 1);
                assert_eq!(column, "Si");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_coordinates_are_optional() {
        let csv = format!(
            "{}\n S1 , P1 ,D,C,,,Lead,0.09,0.3,0.7,2025-01-01\n",
            TEMPLATE_COLUMNS.join(",")
        );
        let rows = parse_samples(csv.as_bytes()).expect("parses");
        assert_eq!(rows[0].latitude, None);
        assert_eq!(rows[0].sample_label, "S1");
        assert_eq!(rows[0].to_new_sample().project_id, RecordId::from("P1"));
    }

    #[test]
    fn header_only_file_is_empty() {
        let csv = format!("{}\n", TEMPLATE_COLUMNS.join(","));
        assert!(matches!(
            parse_samples(csv.as_bytes()),
            Err(ImportError::Empty)
        ));
    }
}
