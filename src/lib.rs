//! Seat allocation trend analysis.
//!
//! The analytics engine is a chain of pure stages over an immutable record
//! store:
//!
//! ```text
//!  RecordStore ──► filter ──► aggregate ──┬──► trend (least-squares fit)
//!                                         └──► rank  (top-N)
//! ```
//!
//! [`analyzer::AdmissionAnalyzer`] composes the stages into the overall,
//! program-specific and comparison views. Loading and report writing live in
//! [`loader`] and [`report`] and hold no analytic logic.

pub mod aggregate;
pub mod analyzer;
pub mod cache;
pub mod error;
pub mod filter;
pub mod loader;
pub mod models;
pub mod ranking;
pub mod report;
pub mod store;
pub mod trend;

pub use aggregate::{aggregate, AggregateRow, AggregateSpec, GroupOrder, Metric, Reducer};
pub use error::EngineError;
pub use filter::{filter, FilterCriteria, YearRange};
pub use models::{Dimension, KeyValue, Measure, Record};
pub use ranking::{rank, Direction, RankedTable};
pub use store::{RecordStore, StoreHandle};
pub use trend::{fit_linear_trend, LinearModel, TrendFit, TrendPoint, TrendSeries};
