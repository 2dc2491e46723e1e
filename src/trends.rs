//! Trend aggregation.
//!
//! Keeps one fixed-length rolling series per period and compares periods.
//! Query methods take `&self` and are safe to call from many readers; only
//! [`TrendAggregator::record`] and [`TrendAggregator::reconfigure`] mutate.

use std::collections::VecDeque;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::model::{
    Direction, HourlySeries, PercentDelta, PeriodComparison, Pollutant, PollutantDelta,
    TrendPeriod, TrendSeries,
};

/// Number of pollutant axes in a snapshot comparison.
pub const SNAPSHOT_LEN: usize = 6;

/// Hours kept by [`HourlyHistory`].
pub const HISTORY_HOURS: i64 = 24;

/// Rolling series for every [`TrendPeriod`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrendAggregator {
    series: [TrendSeries; 3],
}

impl Default for TrendAggregator {
    fn default() -> Self {
        Self::reference()
    }
}

fn series(period: TrendPeriod, labels: &[&str], values: &[f64]) -> TrendSeries {
    TrendSeries {
        period,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        values: values.to_vec(),
    }
}

fn slot(period: TrendPeriod) -> usize {
    match period {
        TrendPeriod::Weekly => 0,
        TrendPeriod::Monthly => 1,
        TrendPeriod::Yearly => 2,
    }
}

impl TrendAggregator {
    /// Reference configuration: 7 weekly, 4 monthly and 6 yearly points.
    pub fn reference() -> Self {
        Self {
            series: [
                series(
                    TrendPeriod::Weekly,
                    &["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
                    &[45.0, 52.0, 49.0, 60.0, 55.0, 48.0, 42.0],
                ),
                series(
                    TrendPeriod::Monthly,
                    &["Week 1", "Week 2", "Week 3", "Week 4"],
                    &[50.0, 45.0, 55.0, 48.0],
                ),
                series(
                    TrendPeriod::Yearly,
                    &["Jan", "Feb", "Mar", "Apr", "May", "Jun"],
                    &[40.0, 45.0, 55.0, 48.0, 52.0, 49.0],
                ),
            ],
        }
    }

    /// Series for a period key; unknown keys fail with `InvalidPeriod`.
    pub fn get_series(&self, period: &str) -> EngineResult<TrendSeries> {
        let period: TrendPeriod = period.parse()?;
        Ok(self.series(period).clone())
    }

    pub fn series(&self, period: TrendPeriod) -> &TrendSeries {
        &self.series[slot(period)]
    }

    /// Append a point, dropping the oldest so the length stays fixed.
    pub fn record(&mut self, period: TrendPeriod, label: impl Into<String>, value: f64) {
        let series = &mut self.series[slot(period)];
        let label = label.into();

        if !series.values.is_empty() {
            series.labels.remove(0);
            series.values.remove(0);
        }
        series.labels.push(label);
        series.values.push(value.max(0.0));

        debug!(period = %period, value, "Trend point recorded");
    }

    /// Replace a period's series with externally supplied history.
    ///
    /// This is the only way a period's length changes. Negative values are
    /// clamped to zero, as in [`TrendAggregator::record`].
    pub fn reconfigure(
        &mut self,
        period: TrendPeriod,
        labels: Vec<String>,
        values: Vec<f64>,
    ) -> EngineResult<()> {
        if labels.len() != values.len() || labels.is_empty() {
            return Err(EngineError::SeriesLengthMismatch {
                labels: labels.len(),
                values: values.len(),
            });
        }

        info!(period = %period, points = labels.len(), "Trend series reconfigured");

        self.series[slot(period)] = TrendSeries {
            period,
            labels,
            values: values.into_iter().map(|v| v.max(0.0)).collect(),
        };
        Ok(())
    }
}

/// Arithmetic mean, 0 for an empty slice.
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentage change of the current average over the previous one.
///
/// A previous average of zero has no meaningful baseline and yields
/// `Undefined` rather than an infinite or NaN delta.
pub fn compare_to_previous(current: &[f64], previous: &[f64]) -> PeriodComparison {
    let baseline = average(previous);
    if baseline == 0.0 {
        return PeriodComparison {
            percent_delta: PercentDelta::Undefined,
            direction: Direction::Undefined,
        };
    }

    let delta = (average(current) - baseline) / baseline * 100.0;
    let direction = if delta > 0.0 {
        Direction::Up
    } else if delta < 0.0 {
        Direction::Down
    } else {
        Direction::Flat
    };

    PeriodComparison {
        percent_delta: PercentDelta::Defined(delta),
        direction,
    }
}

/// Pairwise current-minus-previous deltas for the six pollutant axes.
pub fn snapshot_comparison(
    current: &[f64],
    previous: &[f64],
) -> EngineResult<[PollutantDelta; SNAPSHOT_LEN]> {
    for vector in [current, previous] {
        if vector.len() != SNAPSHOT_LEN {
            return Err(EngineError::InvalidVectorLength {
                expected: SNAPSHOT_LEN,
                actual: vector.len(),
            });
        }
    }

    Ok(std::array::from_fn(|i| PollutantDelta {
        pollutant: Pollutant::ALL[i],
        current: current[i],
        previous: previous[i],
        delta: current[i] - previous[i],
    }))
}

/// Rolls live AQI samples up into trend points.
///
/// Samples are averaged per calendar bucket (day for weekly, week-of-month
/// for monthly, month for yearly). When a sample lands in a new bucket the
/// finished bucket is recorded into the aggregator.
#[derive(Debug, Clone, Default)]
pub struct TrendFeed {
    open: [Option<OpenBucket>; 3],
}

#[derive(Debug, Clone, PartialEq)]
struct OpenBucket {
    key: String,
    label: String,
    sum: f64,
    count: usize,
}

fn bucket_of(period: TrendPeriod, at: DateTime<Utc>) -> (String, String) {
    match period {
        TrendPeriod::Weekly => (
            at.format("%Y-%m-%d").to_string(),
            at.format("%a").to_string(),
        ),
        TrendPeriod::Monthly => {
            let week = (at.day() - 1) / 7 + 1;
            (
                format!("{}-{}", at.format("%Y-%m"), week),
                format!("Week {}", week),
            )
        }
        TrendPeriod::Yearly => (at.format("%Y-%m").to_string(), at.format("%b").to_string()),
    }
}

impl TrendFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one AQI value observed at `at`. Samples must arrive in time order.
    pub fn observe(&mut self, trends: &mut TrendAggregator, aqi: f64, at: DateTime<Utc>) {
        for period in TrendPeriod::ALL {
            let (key, label) = bucket_of(period, at);
            let open = &mut self.open[slot(period)];

            if let Some(bucket) = open.as_mut().filter(|b| b.key == key) {
                bucket.sum += aqi;
                bucket.count += 1;
                continue;
            }

            if let Some(done) = open.take() {
                trends.record(period, done.label, done.sum / done.count as f64);
            }
            *open = Some(OpenBucket {
                key,
                label,
                sum: aqi,
                count: 1,
            });
        }
    }
}

/// Last-day AQI history for one location, averaged per UTC hour.
#[derive(Debug, Clone, Default)]
pub struct HourlyHistory {
    hours: VecDeque<HourBucket>,
}

#[derive(Debug, Clone, PartialEq)]
struct HourBucket {
    start: DateTime<Utc>,
    sum: f64,
    count: usize,
}

fn hour_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

impl HourlyHistory {
    /// Add one AQI value observed at `at`. Samples must arrive in time order.
    pub fn observe(&mut self, aqi: f64, at: DateTime<Utc>) {
        let start = hour_start(at);

        match self.hours.back_mut() {
            Some(bucket) if bucket.start == start => {
                bucket.sum += aqi;
                bucket.count += 1;
            }
            _ => self.hours.push_back(HourBucket {
                start,
                sum: aqi,
                count: 1,
            }),
        }

        let cutoff = start - Duration::hours(HISTORY_HOURS);
        while self.hours.front().is_some_and(|b| b.start <= cutoff) {
            self.hours.pop_front();
        }
    }

    /// Hours with at least one sample, labelled `H:00`.
    pub fn series(&self, location: &str) -> HourlySeries {
        HourlySeries {
            location: location.to_string(),
            labels: self
                .hours
                .iter()
                .map(|b| format!("{}:00", b.start.hour()))
                .collect(),
            values: self
                .hours
                .iter()
                .map(|b| b.sum / b.count as f64)
                .collect(),
        }
    }
}
