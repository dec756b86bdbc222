//! Time-series projection behind the `Forecaster` trait.
//!
//! `SeasonalTrendForecaster` fits a least-squares line over the day index,
//! then a day-of-week offset from the residuals. The interval is the 95%
//! normal band of what remains.

use crate::error::{DashError, DashResult};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.959_963_984_540_054;

/// Minimum observations before weekday offsets are fitted.
const MIN_POINTS_FOR_WEEKLY: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyRate {
    pub date: NaiveDate,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date:           NaiveDate,
    pub predicted_rate: f64,
    pub lower_bound:    f64,
    pub upper_bound:    f64,
}

pub trait Forecaster {
    /// Project `horizon_days` calendar days past the last observation.
    /// `series` is date-ordered; gaps are allowed.
    fn fit_and_forecast(&self, series: &[DailyRate], horizon_days: u32) -> DashResult<Vec<ForecastPoint>>;
}

#[derive(Debug, Clone, Default)]
pub struct SeasonalTrendForecaster;

impl SeasonalTrendForecaster {
    pub fn new() -> Self {
        Self
    }
}

struct Fit {
    origin:    NaiveDate,
    intercept: f64,
    slope:     f64,
    weekly:    [f64; 7],
    sigma:     f64,
}

impl Fit {
    fn predict(&self, date: NaiveDate) -> f64 {
        let t = (date - self.origin).num_days() as f64;
        self.intercept + self.slope * t + self.weekly[weekday(date)]
    }
}

fn weekday(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

fn fit(series: &[DailyRate]) -> DashResult<Fit> {
    if series.len() < 2 {
        return Err(DashError::computation(format!(
            "Forecasting needs at least 2 daily observations, got {}",
            series.len()
        )));
    }
    if let Some(p) = series.iter().find(|p| !p.rate.is_finite()) {
        return Err(DashError::computation(format!("Non-finite rate on {}", p.date)));
    }

    let origin = series[0].date;
    let ts: Vec<f64> = series.iter().map(|p| (p.date - origin).num_days() as f64).collect();
    let n = series.len() as f64;
    let t_mean = ts.iter().sum::<f64>() / n;
    let y_mean = series.iter().map(|p| p.rate).sum::<f64>() / n;

    let sxx: f64 = ts.iter().map(|t| (t - t_mean).powi(2)).sum();
    let sxy: f64 = ts
        .iter()
        .zip(series)
        .map(|(t, p)| (t - t_mean) * (p.rate - y_mean))
        .sum();
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = y_mean - slope * t_mean;

    let residuals: Vec<f64> = ts
        .iter()
        .zip(series)
        .map(|(t, p)| p.rate - (intercept + slope * t))
        .collect();

    let mut weekly = [0.0; 7];
    if series.len() >= MIN_POINTS_FOR_WEEKLY {
        let mut sums = [0.0; 7];
        let mut counts = [0usize; 7];
        for (p, r) in series.iter().zip(&residuals) {
            sums[weekday(p.date)] += r;
            counts[weekday(p.date)] += 1;
        }
        for d in 0..7 {
            if counts[d] > 0 {
                weekly[d] = sums[d] / counts[d] as f64;
            }
        }
    }

    let sse: f64 = series
        .iter()
        .zip(&residuals)
        .map(|(p, r)| (r - weekly[weekday(p.date)]).powi(2))
        .sum();
    let sigma = if series.len() > 2 {
        (sse / (n - 2.0)).sqrt()
    } else {
        0.0
    };

    Ok(Fit { origin, intercept, slope, weekly, sigma })
}

impl Forecaster for SeasonalTrendForecaster {
    fn fit_and_forecast(&self, series: &[DailyRate], horizon_days: u32) -> DashResult<Vec<ForecastPoint>> {
        let fit = fit(series)?;
        let last = series[series.len() - 1].date;
        log::debug!(
            "forecast fit: n={} slope={:.5}/day sigma={:.4}",
            series.len(),
            fit.slope,
            fit.sigma
        );

        let half_width = Z_95 * fit.sigma;
        Ok((1..=i64::from(horizon_days))
            .map(|d| {
                let date = last + Duration::days(d);
                let yhat = fit.predict(date);
                ForecastPoint {
                    date,
                    predicted_rate: yhat,
                    lower_bound:    yhat - half_width,
                    upper_bound:    yhat + half_width,
                }
            })
            .collect())
    }
}
