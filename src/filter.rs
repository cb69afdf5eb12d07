use crate::error::{EngineError, Result};
use crate::models::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive year bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.min <= year && year <= self.max
    }
}

/// Which records an analytic view works on.
///
/// Sets are ordered so two criteria built from the same values in a
/// different order compare and hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub year_range: YearRange,
    pub quotas: BTreeSet<String>,
    pub genders: BTreeSet<String>,
    pub program: Option<String>,
    pub institute: Option<String>,
}

impl FilterCriteria {
    pub fn new<Q, G>(year_range: YearRange, quotas: Q, genders: G) -> Result<Self>
    where
        Q: IntoIterator,
        Q::Item: Into<String>,
        G: IntoIterator,
        G::Item: Into<String>,
    {
        let criteria = Self {
            year_range,
            quotas: quotas.into_iter().map(Into::into).collect(),
            genders: genders.into_iter().map(Into::into).collect(),
            program: None,
            institute: None,
        };
        criteria.validate()?;
        Ok(criteria)
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn with_institute(mut self, institute: impl Into<String>) -> Self {
        self.institute = Some(institute.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.year_range.min > self.year_range.max {
            return Err(EngineError::InvalidCriteria(format!(
                "year range start {} is after end {}",
                self.year_range.min, self.year_range.max
            )));
        }
        if self.quotas.is_empty() {
            return Err(EngineError::InvalidCriteria("no quota selected".to_string()));
        }
        if self.genders.is_empty() {
            return Err(EngineError::InvalidCriteria("no gender selected".to_string()));
        }
        Ok(())
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.year_range.contains(record.year)
            && self.quotas.contains(&record.quota)
            && self.genders.contains(&record.gender)
            && self
                .program
                .as_ref()
                .map_or(true, |program| record.academic_program_name == *program)
            && self
                .institute
                .as_ref()
                .map_or(true, |institute| record.institute == *institute)
    }
}

/// Narrow `records` to those matching `criteria`, keeping their relative order.
pub fn filter<'a, I>(records: I, criteria: &FilterCriteria) -> Result<Vec<&'a Record>>
where
    I: IntoIterator<Item = &'a Record>,
{
    criteria.validate()?;
    let subset: Vec<&Record> = records
        .into_iter()
        .filter(|record| criteria.matches(record))
        .collect();
    log::debug!("filter kept {} record(s)", subset.len());
    Ok(subset)
}
