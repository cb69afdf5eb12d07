use crate::aggregate::AggregateRow;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTable {
    pub metric: String,
    pub direction: Direction,
    /// Rows available before truncation
    pub total_rows: usize,
    pub rows: Vec<AggregateRow>,
}

/// Order rows by `metric` and keep the first `limit`.
///
/// Rows with an undefined metric always sort last. Equal metrics keep their
/// input order. A `limit` of 0 keeps every row; a negative one is rejected.
pub fn rank(
    rows: &[AggregateRow],
    metric: &str,
    direction: Direction,
    limit: i64,
) -> Result<RankedTable> {
    if limit < 0 {
        return Err(EngineError::InvalidLimit(limit));
    }
    if !rows.is_empty() && rows.iter().all(|row| row.metric(metric).is_none()) {
        return Err(EngineError::UnknownMetric(metric.to_string()));
    }

    let mut sorted: Vec<AggregateRow> = rows.to_vec();
    // sort_by is stable, which gives the input-order tie-break
    sorted.sort_by(|a, b| {
        compare_metric(
            a.metric(metric).flatten(),
            b.metric(metric).flatten(),
            direction,
        )
    });

    let keep = usize::try_from(limit).unwrap_or(usize::MAX);
    if keep > 0 && keep < sorted.len() {
        sorted.truncate(keep);
    }

    Ok(RankedTable {
        metric: metric.to_string(),
        direction,
        total_rows: rows.len(),
        rows: sorted,
    })
}

fn compare_metric(a: Option<f64>, b: Option<f64>, direction: Direction) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            Direction::Ascending => a.total_cmp(&b),
            Direction::Descending => b.total_cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Metric;
    use crate::models::KeyValue;

    fn row(label: &str, value: Option<f64>) -> AggregateRow {
        AggregateRow {
            key: vec![KeyValue::Text(label.to_string())],
            metrics: vec![Metric {
                name: "m".to_string(),
                value,
            }],
        }
    }

    fn labels(table: &RankedTable) -> Vec<String> {
        table.rows.iter().map(AggregateRow::key_label).collect()
    }

    fn sample() -> Vec<AggregateRow> {
        vec![
            row("A", Some(5.0)),
            row("B", Some(3.0)),
            row("C", Some(3.0)),
            row("D", None),
        ]
    }

    #[test]
    fn ascending_keeps_ties_in_input_order() {
        let table = rank(&sample(), "m", Direction::Ascending, 3).unwrap();
        assert_eq!(labels(&table), vec!["B", "C", "A"]);
        assert_eq!(table.total_rows, 4);
    }

    #[test]
    fn undefined_metric_is_last_in_both_directions() {
        let asc = rank(&sample(), "m", Direction::Ascending, 0).unwrap();
        assert_eq!(labels(&asc), vec!["B", "C", "A", "D"]);

        let desc = rank(&sample(), "m", Direction::Descending, 0).unwrap();
        assert_eq!(labels(&desc), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn oversized_limit_returns_every_row() {
        let table = rank(&sample(), "m", Direction::Ascending, 50).unwrap();
        assert_eq!(table.rows.len(), 4);
    }

    #[test]
    fn negative_limit_is_rejected() {
        let err = rank(&sample(), "m", Direction::Ascending, -1).unwrap_err();
        assert_eq!(err, EngineError::InvalidLimit(-1));
    }

    #[test]
    fn unknown_metric_is_rejected() {
        let err = rank(&sample(), "seats", Direction::Ascending, 1).unwrap_err();
        assert_eq!(err, EngineError::UnknownMetric("seats".to_string()));
    }

    #[test]
    fn empty_rows_rank_to_empty_table() {
        let table = rank(&[], "anything", Direction::Descending, 5).unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.total_rows, 0);
    }

    #[test]
    fn input_is_left_untouched() {
        let rows = sample();
        let _ = rank(&rows, "m", Direction::Descending, 1).unwrap();
        assert_eq!(rows, sample());
    }
}
