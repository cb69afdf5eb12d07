use crate::aggregate::{AggregateRow, AggregateSpec, GroupOrder};
use crate::cache::AggregateCache;
use crate::error::{EngineError, Result};
use crate::filter::{filter, FilterCriteria};
use crate::models::{ComparisonType, Dimension, Measure, Record};
use crate::ranking::{rank, Direction, RankedTable};
use crate::store::RecordStore;
use crate::trend::{fit_linear_trend, series_from_rows, TrendFit};

pub const SEATS: &str = "seats";
pub const PROGRAMS: &str = "programs";
pub const AVG_OPENING_RANK: &str = "avg_opening_rank";
pub const AVG_CLOSING_RANK: &str = "avg_closing_rank";

/// Dashboard-wide tables over the filtered records.
#[derive(Debug, Clone)]
pub struct OverallAnalysis {
    pub programs_per_institute: RankedTable,
    pub seat_distribution: RankedTable,
    pub gender_distribution: RankedTable,
    pub seat_intake_by_year: Vec<AggregateRow>,
    pub seat_intake_trend: Result<TrendFit>,
    pub avg_closing_rank_by_year: Vec<AggregateRow>,
    pub avg_closing_rank_by_seat_type: RankedTable,
}

/// Rank history of one program at one institute.
#[derive(Debug, Clone)]
pub struct ProgramAnalysis {
    pub program: String,
    pub institute: String,
    pub opening_rank_by_year: Vec<AggregateRow>,
    pub closing_rank_by_year: Vec<AggregateRow>,
    pub opening_rank_trend: Result<TrendFit>,
    pub closing_rank_trend: Result<TrendFit>,
}

impl ProgramAnalysis {
    pub fn has_data(&self) -> bool {
        !self.opening_rank_by_year.is_empty()
    }
}

/// Top-N institutes or programs by average opening and closing rank.
#[derive(Debug, Clone)]
pub struct ComparisonAnalysis {
    pub compare_by: ComparisonType,
    pub top_n: i64,
    pub by_opening_rank: RankedTable,
    pub by_closing_rank: RankedTable,
}

pub struct AdmissionAnalyzer<'a> {
    pub store: &'a RecordStore,
    pub cache: &'a AggregateCache,
}

impl<'a> AdmissionAnalyzer<'a> {
    pub fn new(store: &'a RecordStore, cache: &'a AggregateCache) -> Self {
        Self { store, cache }
    }

    /// The filtered subset, in store order, for export.
    pub fn filtered_records(&self, criteria: &FilterCriteria) -> Result<Vec<&'a Record>> {
        filter(self.store.records(), criteria)
    }

    /// First value of `dimension` among the filtered records, if any.
    pub fn first_value(&self, criteria: &FilterCriteria, dimension: Dimension) -> Result<Option<String>> {
        Ok(self
            .filtered_records(criteria)?
            .first()
            .map(|record| dimension.value_of(record).to_string()))
    }

    fn table(&self, criteria: &FilterCriteria, spec: &AggregateSpec) -> Result<Vec<AggregateRow>> {
        let rows = self.cache.get_or_compute(self.store, criteria, spec)?;
        Ok(rows.to_vec())
    }

    pub fn overall_analysis(&self, criteria: &FilterCriteria) -> Result<OverallAnalysis> {
        let programs = self.table(
            criteria,
            &AggregateSpec::group_by([Dimension::Institute]).distinct_count(PROGRAMS, Dimension::Program),
        )?;
        let seats = self.table(criteria, &AggregateSpec::group_by([Dimension::Institute]).count(SEATS))?;
        let genders = self.table(criteria, &AggregateSpec::group_by([Dimension::Gender]).count(SEATS))?;

        let seat_intake_by_year = self.table(
            criteria,
            &AggregateSpec::group_by([Dimension::Year])
                .count(SEATS)
                .ordered(GroupOrder::KeyAscending),
        )?;
        let seat_intake_trend = fit_rows(&seat_intake_by_year, SEATS);

        let avg_closing_rank_by_year = self.table(
            criteria,
            &AggregateSpec::group_by([Dimension::Year])
                .mean(AVG_CLOSING_RANK, Measure::ClosingRank)
                .ordered(GroupOrder::KeyAscending),
        )?;
        let by_seat_type = self.table(
            criteria,
            &AggregateSpec::group_by([Dimension::SeatType]).mean(AVG_CLOSING_RANK, Measure::ClosingRank),
        )?;

        Ok(OverallAnalysis {
            programs_per_institute: rank(&programs, PROGRAMS, Direction::Ascending, 0)?,
            seat_distribution: rank(&seats, SEATS, Direction::Ascending, 0)?,
            gender_distribution: rank(&genders, SEATS, Direction::Descending, 0)?,
            seat_intake_by_year,
            seat_intake_trend,
            avg_closing_rank_by_year,
            avg_closing_rank_by_seat_type: rank(&by_seat_type, AVG_CLOSING_RANK, Direction::Ascending, 0)?,
        })
    }

    pub fn program_analysis(
        &self,
        criteria: &FilterCriteria,
        program: &str,
        institute: &str,
    ) -> Result<ProgramAnalysis> {
        let narrowed = criteria.clone().with_program(program).with_institute(institute);

        let opening_rank_by_year = self.table(
            &narrowed,
            &AggregateSpec::group_by([Dimension::Year])
                .mean(AVG_OPENING_RANK, Measure::OpeningRank)
                .ordered(GroupOrder::KeyAscending),
        )?;
        let closing_rank_by_year = self.table(
            &narrowed,
            &AggregateSpec::group_by([Dimension::Year])
                .mean(AVG_CLOSING_RANK, Measure::ClosingRank)
                .ordered(GroupOrder::KeyAscending),
        )?;

        if opening_rank_by_year.is_empty() {
            log::info!("no records for {} at {}", program, institute);
        }

        Ok(ProgramAnalysis {
            program: program.to_string(),
            institute: institute.to_string(),
            opening_rank_trend: fit_rows(&opening_rank_by_year, AVG_OPENING_RANK),
            closing_rank_trend: fit_rows(&closing_rank_by_year, AVG_CLOSING_RANK),
            opening_rank_by_year,
            closing_rank_by_year,
        })
    }

    pub fn comparison_analysis(
        &self,
        criteria: &FilterCriteria,
        compare_by: ComparisonType,
        top_n: i64,
    ) -> Result<ComparisonAnalysis> {
        let rows = self.table(
            criteria,
            &AggregateSpec::group_by([compare_by.dimension()])
                .mean(AVG_OPENING_RANK, Measure::OpeningRank)
                .mean(AVG_CLOSING_RANK, Measure::ClosingRank),
        )?;

        Ok(ComparisonAnalysis {
            compare_by,
            top_n,
            by_opening_rank: rank(&rows, AVG_OPENING_RANK, Direction::Ascending, top_n)?,
            by_closing_rank: rank(&rows, AVG_CLOSING_RANK, Direction::Ascending, top_n)?,
        })
    }
}

fn fit_rows(rows: &[AggregateRow], metric: &str) -> Result<TrendFit> {
    let fit = series_from_rows(rows, metric).and_then(|series| fit_linear_trend(&series));
    if let Err(err) = &fit {
        match err {
            EngineError::InsufficientData { .. } | EngineError::DegenerateInput { .. } => {
                log::warn!("{} trend not computed: {}", metric, err)
            }
            _ => log::error!("{} trend failed: {}", metric, err),
        }
    }
    fit
}
