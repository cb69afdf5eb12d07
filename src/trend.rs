use crate::aggregate::AggregateRow;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// `value ≈ slope·year + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearModel {
    pub fn predict(&self, year: i32) -> f64 {
        self.slope * f64::from(year) + self.intercept
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub observed: Vec<TrendPoint>,
    /// One point per observed year, same order
    pub predicted: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    pub model: LinearModel,
    pub series: TrendSeries,
}

/// Turn year-keyed aggregate rows into a series sorted by year.
///
/// The year is taken from the first year component of each row's key. Rows
/// without one, or whose metric is undefined, are left out.
pub fn series_from_rows(rows: &[AggregateRow], metric: &str) -> Result<Vec<TrendPoint>> {
    if !rows.is_empty() && rows.iter().all(|row| row.metric(metric).is_none()) {
        return Err(EngineError::UnknownMetric(metric.to_string()));
    }

    let mut points: Vec<TrendPoint> = rows
        .iter()
        .filter_map(|row| {
            let year = row.key.iter().find_map(|part| part.as_year())?;
            let value = row.metric(metric).flatten()?;
            Some(TrendPoint { year, value })
        })
        .collect();
    points.sort_by_key(|point| point.year);
    Ok(points)
}

/// Ordinary least-squares fit of value against year.
pub fn fit_linear_trend(series: &[TrendPoint]) -> Result<TrendFit> {
    if series.len() < 2 {
        return Err(EngineError::InsufficientData {
            points: series.len(),
        });
    }

    let n = series.len() as f64;
    let mean_year = series.iter().map(|p| f64::from(p.year)).sum::<f64>() / n;
    let mean_value = series.iter().map(|p| p.value).sum::<f64>() / n;

    let (sxy, sxx) = series.iter().fold((0.0, 0.0), |(sxy, sxx), p| {
        let dx = f64::from(p.year) - mean_year;
        (sxy + dx * (p.value - mean_value), sxx + dx * dx)
    });

    if sxx == 0.0 {
        return Err(EngineError::DegenerateInput {
            year: series[0].year,
        });
    }

    let slope = sxy / sxx;
    let model = LinearModel {
        slope,
        intercept: mean_value - slope * mean_year,
    };
    let predicted = series
        .iter()
        .map(|p| TrendPoint {
            year: p.year,
            value: model.predict(p.year),
        })
        .collect();

    log::debug!(
        "fitted trend over {} point(s): slope {:.4}, intercept {:.4}",
        series.len(),
        model.slope,
        model.intercept
    );

    Ok(TrendFit {
        model,
        series: TrendSeries {
            observed: series.to_vec(),
            predicted,
        },
    })
}
