use crate::models::Record;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;

/// Column headers of the seat-allocation CSV, in file order.
pub const COLUMNS: [&str; 8] = [
    "Institute",
    "Academic_Program_Name",
    "Quota",
    "Seat_Type",
    "Gender",
    "Opening_Rank",
    "Closing_Rank",
    "Year",
];

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Institute")]
    institute: Option<String>,
    #[serde(rename = "Academic_Program_Name")]
    academic_program_name: Option<String>,
    #[serde(rename = "Quota")]
    quota: Option<String>,
    #[serde(rename = "Seat_Type")]
    seat_type: Option<String>,
    #[serde(rename = "Gender")]
    gender: Option<String>,
    #[serde(rename = "Opening_Rank")]
    opening_rank: Option<String>,
    #[serde(rename = "Closing_Rank")]
    closing_rank: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub missing_opening_rank: usize,
    pub missing_closing_rank: usize,
}

pub struct RecordLoader {
    client: reqwest::Client,
}

impl Default for RecordLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordLoader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn load_file(&self, file_path: &str) -> Result<(Vec<Record>, LoadReport)> {
        let file = File::open(file_path)
            .with_context(|| format!("Failed to open file: {}", file_path))?;

        self.parse_csv(file, file_path)
    }

    pub async fn load_url(&self, url: &str) -> Result<(Vec<Record>, LoadReport)> {
        log::info!("fetching seat allocation data from {}", url);

        let response = self
            .client
            .get(url)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {}", url))?;

        if !response.status().is_success() {
            bail!("HTTP request failed with status: {}", response.status());
        }

        let content = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from: {}", url))?;

        self.parse_csv(content.as_ref(), url)
    }

    /// Parse CSV rows into records.
    ///
    /// Rows missing a categorical field or a usable year are skipped. Ranks
    /// that are not positive numbers (e.g. preparatory ranks like `"120P"`)
    /// are kept as missing.
    pub fn parse_csv<R: Read>(&self, reader: R, source: &str) -> Result<(Vec<Record>, LoadReport)> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .with_context(|| format!("Failed to read CSV header from: {}", source))?
            .clone();
        let missing: Vec<&str> = COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|header| header == *column))
            .collect();
        if !missing.is_empty() {
            bail!("{} is missing column(s): {}", source, missing.join(", "));
        }

        let mut records = Vec::new();
        let mut report = LoadReport::default();

        for (line, row) in csv_reader.deserialize::<RawRecord>().enumerate() {
            report.rows_read += 1;
            let raw = match row {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("{}: skipping unreadable row {}: {}", source, line + 1, e);
                    report.rows_skipped += 1;
                    continue;
                }
            };

            match into_record(raw) {
                Some(record) => {
                    if record.opening_rank.is_none() {
                        report.missing_opening_rank += 1;
                    }
                    if record.closing_rank.is_none() {
                        report.missing_closing_rank += 1;
                    }
                    records.push(record);
                }
                None => {
                    log::warn!("{}: skipping incomplete row {}", source, line + 1);
                    report.rows_skipped += 1;
                }
            }
        }

        if records.is_empty() {
            log::warn!("no usable rows found in {}", source);
        }
        log::info!(
            "loaded {} record(s) from {} ({} skipped)",
            records.len(),
            source,
            report.rows_skipped
        );

        Ok((records, report))
    }
}

fn into_record(raw: RawRecord) -> Option<Record> {
    Some(Record {
        year: parse_year(raw.year.as_deref()?)?,
        institute: non_empty(raw.institute)?,
        academic_program_name: non_empty(raw.academic_program_name)?,
        seat_type: non_empty(raw.seat_type)?,
        quota: non_empty(raw.quota)?,
        gender: non_empty(raw.gender)?,
        opening_rank: raw.opening_rank.as_deref().and_then(parse_rank),
        closing_rank: raw.closing_rank.as_deref().and_then(parse_rank),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    text.parse::<i32>().ok().or_else(|| {
        // Spreadsheet exports sometimes write "2016.0"
        text.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && v.abs() < f64::from(i32::MAX))
            .map(|v| v as i32)
    })
}

/// Positive, finite number or nothing.
pub fn parse_rank(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Institute,Academic_Program_Name,Quota,Seat_Type,Gender,Opening_Rank,Closing_Rank,Year
IIT Bombay,Computer Science and Engineering,AI,OPEN,Gender-Neutral,1,67,2023
IIT Bombay,Computer Science and Engineering,AI,OPEN (PwD),Gender-Neutral,12P,30P,2023
IIT Madras,Civil Engineering,AI,SC,Female-only (including Supernumerary),1200.0,,2022.0
,Civil Engineering,AI,SC,Male,5,10,2022
IIT Madras,Civil Engineering,AI,SC,Male,5,10,unknown
";

    #[test]
    fn parses_rows_and_coerces_ranks() {
        let loader = RecordLoader::new();
        let (records, report) = loader.parse_csv(SAMPLE.as_bytes(), "sample").unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].closing_rank, Some(67.0));
        assert_eq!(records[1].opening_rank, None);
        assert_eq!(records[1].closing_rank, None);
        assert_eq!(records[2].year, 2022);
        assert_eq!(records[2].opening_rank, Some(1200.0));
        assert_eq!(records[2].closing_rank, None);

        assert_eq!(
            report,
            LoadReport {
                rows_read: 5,
                rows_skipped: 2,
                missing_opening_rank: 1,
                missing_closing_rank: 2,
            }
        );
    }

    #[test]
    fn missing_columns_fail_the_load() {
        let loader = RecordLoader::new();
        let err = loader
            .parse_csv("Institute,Year\nIIT Kanpur,2020\n".as_bytes(), "broken.csv")
            .unwrap_err();
        assert!(err.to_string().contains("Academic_Program_Name"));
    }

    #[test]
    fn extra_columns_are_ignored() {
        let loader = RecordLoader::new();
        let text = "\
id,Institute,Academic_Program_Name,Quota,Seat_Type,Gender,Opening_Rank,Closing_Rank,Year
0,IIT Roorkee,Architecture,AI,OPEN,Gender-Neutral,900,1500,2019
";
        let (records, _) = loader.parse_csv(text.as_bytes(), "indexed").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].institute, "IIT Roorkee");
    }

    #[test]
    fn rank_must_be_positive_and_finite() {
        assert_eq!(parse_rank(" 42 "), Some(42.0));
        assert_eq!(parse_rank("0"), None);
        assert_eq!(parse_rank("-3"), None);
        assert_eq!(parse_rank("NaN"), None);
        assert_eq!(parse_rank("inf"), None);
        assert_eq!(parse_rank(""), None);
    }
}
