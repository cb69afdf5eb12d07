use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Data source configuration
    pub data_source_mode: DataSourceMode,
    pub data_file: Option<String>,
    pub data_url: Option<String>,
    pub output_directory: Option<String>,
    // View selection
    pub top_n: i64,
    pub compare_by: ComparisonType,
    pub selected_program: Option<String>,
    pub selected_institute: Option<String>,
    // Tables must come last in TOML output
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceMode {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "internet")]
    Internet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonType {
    #[serde(rename = "institute")]
    Institute,
    #[serde(rename = "program")]
    Program,
}

impl ComparisonType {
    pub fn dimension(self) -> Dimension {
        match self {
            ComparisonType::Institute => Dimension::Institute,
            ComparisonType::Program => Dimension::Program,
        }
    }
}

impl std::str::FromStr for ComparisonType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "institute" => Ok(ComparisonType::Institute),
            "program" => Ok(ComparisonType::Program),
            other => Err(anyhow::anyhow!("Unknown comparison type: {}", other)),
        }
    }
}

/// Filter overrides from the config file. Anything left out falls back to
/// the full range of values present in the loaded records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub year_range: Option<[i32; 2]>,
    pub quotas: Option<Vec<String>>,
    pub genders: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source_mode: DataSourceMode::Local,
            data_file: Some("data/JEE_Rank_2016_2024.csv".to_string()),
            data_url: Some("https://example.com/JEE_Rank_2016_2024.csv".to_string()),
            output_directory: Some("output".to_string()),
            top_n: 5,
            compare_by: ComparisonType::Institute,
            selected_program: None,
            selected_institute: None,
            filter: FilterConfig {
                year_range: Some([2016, 2024]),
                // Note: leave quotas/genders unset to analyze every value in the data
                quotas: None,
                genders: None,
            },
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

/// One seat-allocation entry: a single (year, institute, program, category) row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub year: i32,
    pub institute: String,
    pub academic_program_name: String,
    pub seat_type: String,
    pub quota: String,
    pub gender: String,
    pub opening_rank: Option<f64>,
    pub closing_rank: Option<f64>,
}

/// Categorical fields a record can be grouped or distinct-counted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    Year,
    Institute,
    Program,
    SeatType,
    Quota,
    Gender,
}

impl Dimension {
    pub fn name(self) -> &'static str {
        match self {
            Dimension::Year => "year",
            Dimension::Institute => "institute",
            Dimension::Program => "academic_program_name",
            Dimension::SeatType => "seat_type",
            Dimension::Quota => "quota",
            Dimension::Gender => "gender",
        }
    }

    pub fn value_of(self, record: &Record) -> KeyValue {
        match self {
            Dimension::Year => KeyValue::Year(record.year),
            Dimension::Institute => KeyValue::Text(record.institute.clone()),
            Dimension::Program => KeyValue::Text(record.academic_program_name.clone()),
            Dimension::SeatType => KeyValue::Text(record.seat_type.clone()),
            Dimension::Quota => KeyValue::Text(record.quota.clone()),
            Dimension::Gender => KeyValue::Text(record.gender.clone()),
        }
    }
}

/// Numeric fields a mean can be taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measure {
    Year,
    OpeningRank,
    ClosingRank,
}

impl Measure {
    pub fn name(self) -> &'static str {
        match self {
            Measure::Year => "year",
            Measure::OpeningRank => "opening_rank",
            Measure::ClosingRank => "closing_rank",
        }
    }

    pub fn value_of(self, record: &Record) -> Option<f64> {
        match self {
            Measure::Year => Some(f64::from(record.year)),
            Measure::OpeningRank => record.opening_rank,
            Measure::ClosingRank => record.closing_rank,
        }
    }
}

/// A single component of a group key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Year(i32),
    Text(String),
}

impl KeyValue {
    pub fn as_year(&self) -> Option<i32> {
        match self {
            KeyValue::Year(year) => Some(*year),
            KeyValue::Text(_) => None,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Year(year) => write!(f, "{year}"),
            KeyValue::Text(text) => write!(f, "{text}"),
        }
    }
}
