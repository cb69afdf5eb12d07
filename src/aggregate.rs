use crate::error::{EngineError, Result};
use crate::models::{Dimension, KeyValue, Measure, Record};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// What to compute for each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reducer {
    /// Number of records in the group, missing ranks included
    Count,
    /// Number of distinct values of a categorical field within the group
    DistinctCount(Dimension),
    /// Arithmetic mean of a numeric field, skipping records where it is missing
    Mean(Measure),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedReducer {
    pub name: String,
    pub reducer: Reducer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupOrder {
    /// Rows appear in the order their first record appears in the input
    FirstAppearance,
    /// Rows are sorted by their key tuple
    KeyAscending,
}

/// A group-by plus the reducers to run per group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub group_keys: Vec<Dimension>,
    pub reducers: Vec<NamedReducer>,
    pub order: GroupOrder,
}

impl AggregateSpec {
    pub fn group_by(group_keys: impl Into<Vec<Dimension>>) -> Self {
        Self {
            group_keys: group_keys.into(),
            reducers: Vec::new(),
            order: GroupOrder::FirstAppearance,
        }
    }

    pub fn count(self, name: &str) -> Self {
        self.reduce(name, Reducer::Count)
    }

    pub fn distinct_count(self, name: &str, field: Dimension) -> Self {
        self.reduce(name, Reducer::DistinctCount(field))
    }

    pub fn mean(self, name: &str, field: Measure) -> Self {
        self.reduce(name, Reducer::Mean(field))
    }

    pub fn reduce(mut self, name: &str, reducer: Reducer) -> Self {
        self.reducers.push(NamedReducer {
            name: name.to_string(),
            reducer,
        });
        self
    }

    pub fn ordered(mut self, order: GroupOrder) -> Self {
        self.order = order;
        self
    }

    /// A spec needs at least one group key.
    pub fn validate(&self) -> Result<()> {
        if self.group_keys.is_empty() {
            return Err(EngineError::InvalidAggregate(
                "at least one group key is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    /// `None` when no record in the group contributed
    pub value: Option<f64>,
}

/// One group's key plus its reduced metrics, in reducer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub key: Vec<KeyValue>,
    pub metrics: Vec<Metric>,
}

impl AggregateRow {
    /// Outer `None`: the row has no such metric. Inner `None`: undefined value.
    pub fn metric(&self, name: &str) -> Option<Option<f64>> {
        self.metrics
            .iter()
            .find(|metric| metric.name == name)
            .map(|metric| metric.value)
    }

    pub fn key_label(&self) -> String {
        self.key
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

enum Accumulator {
    Count(usize),
    Distinct(Dimension, HashSet<KeyValue>),
    Mean {
        field: Measure,
        sum: f64,
        contributors: usize,
    },
}

impl Accumulator {
    fn new(reducer: Reducer) -> Self {
        match reducer {
            Reducer::Count => Accumulator::Count(0),
            Reducer::DistinctCount(field) => Accumulator::Distinct(field, HashSet::new()),
            Reducer::Mean(field) => Accumulator::Mean {
                field,
                sum: 0.0,
                contributors: 0,
            },
        }
    }

    fn push(&mut self, record: &Record) {
        match self {
            Accumulator::Count(count) => *count += 1,
            Accumulator::Distinct(field, seen) => {
                seen.insert(field.value_of(record));
            }
            Accumulator::Mean {
                field,
                sum,
                contributors,
            } => {
                if let Some(value) = field.value_of(record) {
                    *sum += value;
                    *contributors += 1;
                }
            }
        }
    }

    fn finish(self) -> Option<f64> {
        match self {
            Accumulator::Count(count) => Some(count as f64),
            Accumulator::Distinct(_, seen) => Some(seen.len() as f64),
            Accumulator::Mean { contributors: 0, .. } => None,
            Accumulator::Mean {
                sum, contributors, ..
            } => Some(sum / contributors as f64),
        }
    }
}

/// Group `subset` by `spec.group_keys` and reduce each group.
///
/// Grouping is by exact equality of the full key tuple. An empty subset gives
/// an empty result. `spec` is not validated here: with no group keys every
/// record lands in a single group. Use [`AggregateSpec::validate`] to reject
/// such specs, as the cache does.
pub fn aggregate<'a, I>(subset: I, spec: &AggregateSpec) -> Vec<AggregateRow>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut index: HashMap<Vec<KeyValue>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<KeyValue>, Vec<Accumulator>)> = Vec::new();

    for record in subset {
        let key: Vec<KeyValue> = spec
            .group_keys
            .iter()
            .map(|field| field.value_of(record))
            .collect();

        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = groups.len();
                let accumulators = spec
                    .reducers
                    .iter()
                    .map(|named| Accumulator::new(named.reducer))
                    .collect();
                groups.push((key.clone(), accumulators));
                index.insert(key, slot);
                slot
            }
        };

        for accumulator in groups[slot].1.iter_mut() {
            accumulator.push(record);
        }
    }

    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(key, accumulators)| AggregateRow {
            key,
            metrics: accumulators
                .into_iter()
                .zip(&spec.reducers)
                .map(|(accumulator, named)| Metric {
                    name: named.name.clone(),
                    value: accumulator.finish(),
                })
                .collect(),
        })
        .collect();

    if spec.order == GroupOrder::KeyAscending {
        rows.sort_by(|a, b| a.key.cmp(&b.key));
    }

    log::debug!(
        "aggregated into {} group(s) by {:?}",
        rows.len(),
        spec.group_keys
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, institute: &str, program: &str, closing: Option<f64>) -> Record {
        Record {
            year,
            institute: institute.to_string(),
            academic_program_name: program.to_string(),
            seat_type: "OPEN".to_string(),
            quota: "AI".to_string(),
            gender: "Male".to_string(),
            opening_rank: Some(1.0),
            closing_rank: closing,
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record(2022, "Y", "Civil", Some(900.0)),
            record(2021, "X", "Civil", Some(100.0)),
            record(2021, "X", "Chemical", None),
            record(2022, "X", "Civil", Some(300.0)),
            record(2021, "Y", "Civil", None),
        ]
    }

    #[test]
    fn count_includes_records_with_missing_ranks() {
        let records = sample();
        let rows = aggregate(&records, &AggregateSpec::group_by([Dimension::Institute]).count("n"));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, vec![KeyValue::Text("Y".to_string())]);
        assert_eq!(rows[0].metric("n"), Some(Some(2.0)));
        assert_eq!(rows[1].metric("n"), Some(Some(3.0)));
    }

    #[test]
    fn distinct_count_counts_each_value_once() {
        let records = sample();
        let spec = AggregateSpec::group_by([Dimension::Institute])
            .distinct_count("programs", Dimension::Program)
            .ordered(GroupOrder::KeyAscending);
        let rows = aggregate(&records, &spec);

        assert_eq!(rows[0].key_label(), "X");
        assert_eq!(rows[0].metric("programs"), Some(Some(2.0)));
        assert_eq!(rows[1].metric("programs"), Some(Some(1.0)));
    }

    #[test]
    fn mean_skips_missing_values() {
        let records = sample();
        let spec = AggregateSpec::group_by([Dimension::Institute])
            .mean("avg_closing_rank", Measure::ClosingRank)
            .ordered(GroupOrder::KeyAscending);
        let rows = aggregate(&records, &spec);

        assert_eq!(rows[0].metric("avg_closing_rank"), Some(Some(200.0)));
        assert_eq!(rows[1].metric("avg_closing_rank"), Some(Some(900.0)));
    }

    #[test]
    fn mean_of_only_missing_values_is_undefined() {
        let records = vec![record(2021, "X", "Civil", None), record(2021, "X", "Civil", None)];
        let spec = AggregateSpec::group_by([Dimension::Year])
            .count("n")
            .mean("avg", Measure::ClosingRank);
        let rows = aggregate(&records, &spec);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].metric("n"), Some(Some(2.0)));
        assert_eq!(rows[0].metric("avg"), Some(None));
    }

    #[test]
    fn mean_keeps_fractional_ranks() {
        let records = vec![record(2021, "X", "Civil", Some(1.0)), record(2021, "X", "Civil", Some(2.0))];
        let rows = aggregate(&records, &AggregateSpec::group_by([Dimension::Year]).mean("avg", Measure::ClosingRank));
        assert_eq!(rows[0].metric("avg"), Some(Some(1.5)));
    }

    #[test]
    fn multi_key_groups_use_the_full_tuple() {
        let records = sample();
        let spec = AggregateSpec::group_by([Dimension::Institute, Dimension::Year])
            .count("n")
            .ordered(GroupOrder::KeyAscending);
        let rows = aggregate(&records, &spec);

        let labels: Vec<String> = rows.iter().map(AggregateRow::key_label).collect();
        assert_eq!(labels, vec!["X / 2021", "X / 2022", "Y / 2021", "Y / 2022"]);
    }

    #[test]
    fn empty_subset_gives_no_rows() {
        let rows = aggregate(Vec::<Record>::new().iter(), &AggregateSpec::group_by([Dimension::Institute]).count("n"));
        assert!(rows.is_empty());
    }

    #[test]
    fn spec_without_group_keys_fails_validation() {
        let spec = AggregateSpec::group_by(Vec::<Dimension>::new()).count("n");
        assert!(matches!(spec.validate(), Err(EngineError::InvalidAggregate(_))));
        assert!(AggregateSpec::group_by([Dimension::Year]).count("n").validate().is_ok());
    }

    #[test]
    fn unknown_metric_lookup_is_distinguished_from_undefined() {
        let records = sample();
        let rows = aggregate(&records, &AggregateSpec::group_by([Dimension::Institute]).count("n"));
        assert_eq!(rows[0].metric("missing"), None);
    }
}
