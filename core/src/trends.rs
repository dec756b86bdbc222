//! Delinquency trend operations: daily history, forecast and summary
//! statistics.
//!
//! The daily series is built from the dataset's (month, day) columns under
//! the configured year. Rows whose (month, day) is not a real date are
//! dropped here with a warning rather than failing the request.

use crate::{
    aggregate::{self, DailyStats},
    dashboard::{COL_DAY, COL_MONTH},
    error::{DashError, DashResult},
    forecast::{DailyRate, ForecastPoint},
    resources::ResourceStore,
};
use chrono::NaiveDate;
use serde::Serialize;

/// Observations averaged for the "current" rate in a forecast summary.
const CURRENT_WINDOW_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub current_avg_rate:     f64,
    pub forecast_avg_rate:    f64,
    pub trend_direction:      TrendDirection,
    pub forecast_period_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendForecast {
    pub historical: Vec<DailyStats>,
    pub forecast:   Vec<ForecastPoint>,
    pub summary:    ForecastSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end:   NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendStatistics {
    pub total_days:           usize,
    pub avg_delinquency_rate: f64,
    pub min_delinquency_rate: f64,
    pub max_delinquency_rate: f64,
    /// Sample standard deviation; `null` with fewer than two days.
    pub std_delinquency_rate: Option<f64>,
    pub total_loans:          u64,
    pub total_repaid:         u64,
    pub date_range:           DateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub statistics: TrendStatistics,
}

/// Per-day delinquency over the whole dataset, dates ascending.
pub fn daily_series(store: &ResourceStore) -> DashResult<Vec<DailyStats>> {
    let dataset = store.dataset()?;
    let year = store.config().assumed_year;
    let months = dataset.column(COL_MONTH)?;
    let days = dataset.column(COL_DAY)?;

    let dates: Vec<Option<NaiveDate>> = months
        .iter()
        .zip(&days)
        .map(|(&m, &d)| aggregate::synthesize_date(year, m, d))
        .collect();
    let dropped = dates.iter().filter(|d| d.is_none()).count();
    if dropped > 0 {
        log::warn!("dropped {dropped} rows with no valid {year} date");
    }

    aggregate::daily_delinquency(&dates, &dataset.labels()?)
}

pub fn forecast(store: &ResourceStore, periods: u32) -> DashResult<TrendForecast> {
    if periods == 0 {
        return Err(DashError::computation("Forecast horizon must be at least one day"));
    }
    let historical = daily_series(store)?;
    let series: Vec<DailyRate> = historical
        .iter()
        .map(|d| DailyRate { date: d.date, rate: d.delinquency_rate })
        .collect();

    let forecast = store.forecaster().fit_and_forecast(&series, periods)?;

    let recent = &series[series.len().saturating_sub(CURRENT_WINDOW_DAYS)..];
    let current_avg_rate =
        aggregate::mean(&recent.iter().map(|d| d.rate).collect::<Vec<_>>())?;
    let forecast_avg_rate =
        aggregate::mean(&forecast.iter().map(|p| p.predicted_rate).collect::<Vec<_>>())?;
    let trend_direction = if forecast_avg_rate > current_avg_rate {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    Ok(TrendForecast {
        historical,
        forecast,
        summary: ForecastSummary {
            current_avg_rate,
            forecast_avg_rate,
            trend_direction,
            forecast_period_days: periods,
        },
    })
}

pub fn statistics(store: &ResourceStore) -> DashResult<StatisticsReport> {
    let daily = daily_series(store)?;
    let (first, last) = match (daily.first(), daily.last()) {
        (Some(f), Some(l)) => (f.date, l.date),
        _ => return Err(DashError::computation("No dated rows to summarize")),
    };
    let rates: Vec<f64> = daily.iter().map(|d| d.delinquency_rate).collect();

    Ok(StatisticsReport {
        statistics: TrendStatistics {
            total_days:           daily.len(),
            avg_delinquency_rate: aggregate::mean(&rates)?,
            min_delinquency_rate: aggregate::min(&rates)?,
            max_delinquency_rate: aggregate::max(&rates)?,
            std_delinquency_rate: aggregate::std_dev(&rates, 1),
            total_loans:          daily.iter().map(|d| d.total_loans).sum(),
            total_repaid:         daily.iter().map(|d| d.repaid_loans).sum(),
            date_range:           DateRange { start: first, end: last },
        },
    })
}
