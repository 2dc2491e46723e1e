//! The monitor: explicit owned state for the whole pipeline.
//!
//! One [`Monitor::tick`] call advances every simulated location, classifies
//! the new samples, runs them through the alert evaluator, and fires the
//! observer events, all before returning. The caller owns the timer, so ticks
//! never overlap.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alerts::AlertEvaluator;
use crate::classifier::Classification;
use crate::config::Settings;
use crate::error::EngineResult;
use crate::model::{
    AlertRule, AqiSample, HourlySeries, Measurement, Notification, NotificationSeverity,
    PollutantReading,
};
use crate::notifications::NotificationLog;
use crate::simulator::{Simulator, initial_measurement};
use crate::trends::{HourlyHistory, TrendAggregator, TrendFeed};

/// Receives the outbound events of the engine.
///
/// Both methods default to doing nothing so observers implement only what
/// they need.
pub trait EngineObserver: Send + Sync {
    /// Fired once per location per tick.
    fn on_sample(&self, _sample: &AqiSample, _reading: &PollutantReading) {}

    /// Fired for every transition or digest notification.
    fn on_notification(&self, _notification: &Notification) {}
}

/// Observer that writes events to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn on_sample(&self, sample: &AqiSample, reading: &PollutantReading) {
        debug!(
            location = %sample.location,
            aqi = sample.value,
            pm25 = reading.pm25,
            pm10 = reading.pm10,
            "Sample"
        );
    }

    fn on_notification(&self, notification: &Notification) {
        match notification.severity {
            NotificationSeverity::High => warn!(
                rule_id = %notification.rule_id,
                location = %notification.location,
                kind = ?notification.kind,
                aqi = notification.aqi,
                "{}",
                notification.message
            ),
            _ => info!(
                rule_id = %notification.rule_id,
                location = %notification.location,
                kind = ?notification.kind,
                aqi = notification.aqi,
                "{}",
                notification.message
            ),
        }
    }
}

/// Latest measurement for a location with its classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationStatus {
    pub measurement: Measurement,
    pub classification: Classification,
}

impl LocationStatus {
    fn of(measurement: &Measurement) -> Self {
        Self {
            classification: Classification::of(measurement.sample.value),
            measurement: measurement.clone(),
        }
    }
}

/// What one tick produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub locations: Vec<LocationStatus>,
    pub notifications: Vec<Notification>,
}

/// Owns the simulator, per-location snapshots, alert state, notification log
/// and trend series.
pub struct Monitor {
    simulator: Simulator,
    latest: Vec<Measurement>,
    alerts: AlertEvaluator,
    notifications: NotificationLog,
    trends: TrendAggregator,
    feed: TrendFeed,
    history: BTreeMap<String, HourlyHistory>,
    observers: Vec<Arc<dyn EngineObserver>>,
}

impl Monitor {
    /// Build a monitor from settings, starting every location at the
    /// reference reading.
    pub fn from_settings(settings: &Settings, now: DateTime<Utc>) -> Self {
        let simulator = match settings.seed {
            Some(seed) => Simulator::seeded(seed),
            None => Simulator::from_entropy(),
        };
        Self::new(simulator, &settings.locations, settings.notification_ttl, now)
    }

    pub fn new(
        simulator: Simulator,
        locations: &[String],
        notification_ttl: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            simulator,
            latest: locations
                .iter()
                .map(|location| initial_measurement(location, now))
                .collect(),
            alerts: AlertEvaluator::new(),
            notifications: NotificationLog::new(notification_ttl),
            trends: TrendAggregator::reference(),
            feed: TrendFeed::new(),
            history: BTreeMap::new(),
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn EngineObserver>) {
        self.observers.push(observer);
    }

    /// Advance every location one step and process the results.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let next: Vec<Measurement> = self
            .latest
            .iter()
            .map(|previous| self.simulator.tick(previous, now))
            .collect();

        let mut notifications = Vec::new();
        for measurement in &next {
            notifications.extend(self.observe(measurement));
        }
        self.latest = next;

        if !self.latest.is_empty() {
            let mean = self.latest.iter().map(|m| m.sample.value).sum::<f64>()
                / self.latest.len() as f64;
            self.feed.observe(&mut self.trends, mean, now);
        }

        let notifications = self.finish_tick(notifications, now);

        TickReport {
            locations: self.current(),
            notifications,
        }
    }

    /// Process an externally supplied measurement instead of a simulated one.
    ///
    /// Replaces the snapshot for its location, adding the location if new.
    pub fn ingest(&mut self, measurement: Measurement) -> Vec<Notification> {
        let now = measurement.sample.timestamp;
        let notifications = self.observe(&measurement);

        match self
            .latest
            .iter_mut()
            .find(|m| m.sample.location == measurement.sample.location)
        {
            Some(slot) => *slot = measurement,
            None => self.latest.push(measurement),
        }

        self.finish_tick(notifications, now)
    }

    fn observe(&mut self, measurement: &Measurement) -> Vec<Notification> {
        for observer in &self.observers {
            observer.on_sample(&measurement.sample, &measurement.reading);
        }
        let sample = &measurement.sample;
        self.history
            .entry(sample.location.clone())
            .or_default()
            .observe(sample.value, sample.timestamp);
        self.alerts.evaluate(&measurement.sample)
    }

    /// Close due digests, then publish and retain this tick's notifications.
    fn finish_tick(
        &mut self,
        mut notifications: Vec<Notification>,
        now: DateTime<Utc>,
    ) -> Vec<Notification> {
        notifications.extend(self.alerts.flush_due(now));
        self.notifications.prune(now);
        self.publish(&notifications);
        notifications
    }

    /// Publish notifications to observers and the retention log.
    fn publish(&mut self, notifications: &[Notification]) {
        for notification in notifications {
            for observer in &self.observers {
                observer.on_notification(notification);
            }
            self.notifications.push(notification.clone());
        }
    }

    /// Latest status per location, in configuration order.
    pub fn current(&self) -> Vec<LocationStatus> {
        self.latest.iter().map(LocationStatus::of).collect()
    }

    /// Last-day hourly AQI per location, in configuration order. Locations
    /// not yet sampled have an empty series.
    pub fn history(&self) -> Vec<HourlySeries> {
        self.latest
            .iter()
            .map(|m| {
                let location = &m.sample.location;
                self.history
                    .get(location)
                    .map(|h| h.series(location))
                    .unwrap_or_else(|| HourlyHistory::default().series(location))
            })
            .collect()
    }

    pub fn upsert_rule(&mut self, rule: AlertRule) -> EngineResult<()> {
        self.alerts.upsert_rule(rule)
    }

    pub fn remove_rule(&mut self, rule_id: &str) -> EngineResult<AlertRule> {
        self.alerts.remove_rule(rule_id)
    }

    pub fn rules(&self) -> Vec<AlertRule> {
        self.alerts.rules()
    }

    pub fn alerts(&self) -> &AlertEvaluator {
        &self.alerts
    }

    pub fn active_notifications(&self, now: DateTime<Utc>) -> Vec<Notification> {
        self.notifications.active(now)
    }

    pub fn acknowledge(&mut self, id: Uuid) -> EngineResult<Notification> {
        self.notifications.acknowledge(id)
    }

    pub fn trends(&self) -> &TrendAggregator {
        &self.trends
    }

    pub fn trends_mut(&mut self) -> &mut TrendAggregator {
        &mut self.trends
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Band;
    use crate::model::{Channel, FrequencyMode, NotificationKind, Relationship};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        samples: Mutex<Vec<AqiSample>>,
        notifications: Mutex<Vec<Notification>>,
    }

    impl EngineObserver for Recorder {
        fn on_sample(&self, sample: &AqiSample, _reading: &PollutantReading) {
            self.samples.lock().unwrap().push(sample.clone());
        }

        fn on_notification(&self, notification: &Notification) {
            self.notifications.lock().unwrap().push(notification.clone());
        }
    }

    fn monitor(locations: &[&str], now: DateTime<Utc>) -> Monitor {
        let locations: Vec<String> = locations.iter().map(|l| l.to_string()).collect();
        Monitor::new(
            Simulator::seeded(3),
            &locations,
            chrono::Duration::hours(24),
            now,
        )
    }

    fn measurement(location: &str, aqi: f64, now: DateTime<Utc>) -> Measurement {
        Measurement {
            reading: PollutantReading::reference(location, now),
            sample: AqiSample::new(location, aqi, now),
        }
    }

    fn rule(threshold: i64) -> AlertRule {
        AlertRule {
            id: "r1".to_string(),
            location_scope: "all".to_string(),
            threshold,
            frequency_mode: FrequencyMode::Immediate,
            channel: Channel::Email,
            enabled: true,
        }
    }

    #[test]
    fn test_tick_fires_one_sample_per_location() {
        let now = Utc::now();
        let mut monitor = monitor(&["Downtown", "Rural"], now);
        let recorder = Arc::new(Recorder::default());
        monitor.add_observer(recorder.clone());

        let report = monitor.tick(now);

        assert_eq!(report.locations.len(), 2);
        assert_eq!(recorder.samples.lock().unwrap().len(), 2);
        assert_eq!(report.locations[0].measurement.sample.location, "Downtown");
        // Starting at 42 with a step of at most 5 keeps the first tick Good.
        assert_eq!(report.locations[0].classification.band, Band::Good);
    }

    #[test]
    fn test_low_threshold_breaches_on_first_tick() {
        let now = Utc::now();
        let mut monitor = monitor(&["Downtown"], now);
        monitor.upsert_rule(rule(10)).unwrap();
        let recorder = Arc::new(Recorder::default());
        monitor.add_observer(recorder.clone());

        let report = monitor.tick(now);
        let again = monitor.tick(now);

        assert_eq!(report.notifications.len(), 1);
        assert_eq!(report.notifications[0].kind, NotificationKind::Breach);
        assert_eq!(report.notifications[0].channel, Channel::Email);
        assert!(again.notifications.is_empty());
        assert_eq!(recorder.notifications.lock().unwrap().len(), 1);
        assert_eq!(monitor.active_notifications(now).len(), 1);
    }

    #[test]
    fn test_ingest_runs_breach_recovery_sequence() {
        let now = Utc::now();
        let mut monitor = monitor(&[], now);
        monitor.upsert_rule(rule(50)).unwrap();

        let emitted: Vec<Notification> = [40.0, 60.0, 70.0, 45.0]
            .iter()
            .flat_map(|aqi| monitor.ingest(measurement("Harbor", *aqi, now)))
            .collect();

        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].kind, NotificationKind::Breach);
        assert_eq!(emitted[1].kind, NotificationKind::Recovered);
        assert_eq!(monitor.current().len(), 1);
        assert_eq!(monitor.current()[0].measurement.sample.value, 45.0);
    }

    #[test]
    fn test_steady_locations_do_not_flap_all_scope_rule() {
        let now = Utc::now();
        let mut monitor = monitor(&["Downtown", "Rural"], now);
        monitor.upsert_rule(rule(50)).unwrap();

        let mut total = 0;
        for _ in 0..5 {
            total += monitor.ingest(measurement("Downtown", 60.0, now)).len();
            total += monitor.ingest(measurement("Rural", 40.0, now)).len();
        }

        assert_eq!(total, 1);
        assert_eq!(monitor.active_notifications(now).len(), 1);
        let rural = monitor.alerts().state("r1", "Rural").unwrap();
        assert_eq!(rural.last_relationship, Relationship::Below);
    }

    #[test]
    fn test_history_follows_samples() {
        let now = Utc::now();
        let mut monitor = monitor(&["Downtown", "Rural"], now);

        assert!(monitor.history()[0].values.is_empty());
        monitor.tick(now);
        monitor.ingest(measurement("Rural", 90.0, now));

        let history = monitor.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].location, "Downtown");
        assert_eq!(history[0].values.len(), 1);
        assert_eq!(history[1].labels.len(), 1);
    }

    #[test]
    fn test_acknowledge_removes_from_active() {
        let now = Utc::now();
        let mut monitor = monitor(&[], now);
        monitor.upsert_rule(rule(50)).unwrap();
        let emitted = monitor.ingest(measurement("Harbor", 120.0, now));

        monitor.acknowledge(emitted[0].id).unwrap();

        assert!(monitor.active_notifications(now).is_empty());
        assert!(monitor.acknowledge(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_remove_rule_stops_notifications() {
        let now = Utc::now();
        let mut monitor = monitor(&[], now);
        monitor.upsert_rule(rule(50)).unwrap();
        monitor.remove_rule("r1").unwrap();

        assert!(monitor.ingest(measurement("Harbor", 120.0, now)).is_empty());
        assert!(monitor.rules().is_empty());
    }
}
