//! Threshold alert evaluation.
//!
//! Each rule runs a two-state machine (`BELOW` / `ABOVE`) over the AQI samples
//! within its location scope. Notifications are edge-triggered: one when the
//! AQI crosses above the threshold, one when it falls back to or below it, and
//! nothing while the relationship holds. Rules in `hourly` or `daily` mode
//! batch their transitions into a single digest per UTC-aligned window.
//!
//! State is tracked per rule and location: an `"all"`-scope rule runs one
//! machine for every location it observes, created lazily as `BELOW`. Rules
//! never share state, so evaluation order only matters within a rule.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::{
    AlertRule, AlertState, AqiSample, FrequencyMode, Notification, NotificationKind,
    NotificationSeverity, Relationship,
};

/// Highest threshold a rule may be configured with.
pub const MAX_THRESHOLD: i64 = 200;

impl FrequencyMode {
    /// Length of the batching window, `None` for immediate delivery.
    pub fn window(&self) -> Option<Duration> {
        match self {
            FrequencyMode::Immediate => None,
            FrequencyMode::Hourly => Some(Duration::hours(1)),
            FrequencyMode::Daily => Some(Duration::days(1)),
        }
    }
}

/// Severity of a breach: high once the AQI is more than twice the threshold.
pub fn breach_severity(aqi: f64, threshold: i64) -> NotificationSeverity {
    if aqi > 2.0 * threshold as f64 {
        NotificationSeverity::High
    } else {
        NotificationSeverity::Medium
    }
}

/// One observed crossing of a rule's threshold.
#[derive(Debug, Clone, PartialEq)]
struct Transition {
    to: Relationship,
    aqi: f64,
    location: String,
    at: DateTime<Utc>,
}

impl Transition {
    fn severity(&self, threshold: i64) -> NotificationSeverity {
        match self.to {
            Relationship::Above => breach_severity(self.aqi, threshold),
            Relationship::Below => NotificationSeverity::Low,
        }
    }
}

/// Transitions collected for one digest window.
#[derive(Debug, Clone, PartialEq)]
struct DigestWindow {
    mode: FrequencyMode,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    breaches: usize,
    recoveries: usize,
    /// Most severe breach so far: severity and AQI.
    worst: Option<(NotificationSeverity, f64)>,
    locations: BTreeSet<String>,
}

impl DigestWindow {
    fn open(mode: FrequencyMode, window: Duration, at: DateTime<Utc>) -> Self {
        let start = window_start(at, window);
        Self {
            mode,
            start,
            end: start + window,
            breaches: 0,
            recoveries: 0,
            worst: None,
            locations: BTreeSet::new(),
        }
    }

    fn record(&mut self, transition: &Transition, threshold: i64) {
        match transition.to {
            Relationship::Above => {
                self.breaches += 1;
                let severity = transition.severity(threshold);
                let worse = match self.worst {
                    None => true,
                    Some((s, aqi)) => (severity, transition.aqi) > (s, aqi),
                };
                if worse {
                    self.worst = Some((severity, transition.aqi));
                }
            }
            Relationship::Below => self.recoveries += 1,
        }

        self.locations.insert(transition.location.clone());
    }

    fn transitions(&self) -> usize {
        self.breaches + self.recoveries
    }
}

/// Align `at` to the start of its window (UTC hour or day).
fn window_start(at: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    let secs = at.timestamp();
    let span = window.num_seconds().max(1);
    DateTime::<Utc>::from_timestamp(secs - secs.rem_euclid(span), 0).unwrap_or(at)
}

/// State machines and digest buffer for a single rule.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    rule: AlertRule,
    /// Keyed by location.
    states: BTreeMap<String, AlertState>,
    digest: Option<DigestWindow>,
}

impl RuleEvaluator {
    fn new(rule: AlertRule) -> Self {
        Self {
            rule,
            states: BTreeMap::new(),
            digest: None,
        }
    }

    pub fn rule(&self) -> &AlertRule {
        &self.rule
    }

    /// State at `location`, `None` until the rule has seen a sample there.
    pub fn state(&self, location: &str) -> Option<&AlertState> {
        self.states.get(location)
    }

    /// Feed one sample. Samples must arrive in timestamp order.
    pub fn evaluate(&mut self, sample: &AqiSample) -> Vec<Notification> {
        let mut out = Vec::new();

        // A sample past the window end closes it before anything else.
        out.extend(self.flush_due(sample.timestamp));

        if !self.rule.enabled || !self.rule.observes(&sample.location) {
            return out;
        }

        let relationship = if sample.value > self.rule.threshold as f64 {
            Relationship::Above
        } else {
            Relationship::Below
        };

        let state = self
            .states
            .entry(sample.location.clone())
            .or_insert_with(|| AlertState::new(self.rule.id.clone(), sample.location.clone()));
        if relationship == state.last_relationship {
            return out;
        }

        state.last_relationship = relationship;
        let transition = Transition {
            to: relationship,
            aqi: sample.value,
            location: sample.location.clone(),
            at: sample.timestamp,
        };

        debug!(
            rule_id = %self.rule.id,
            to = ?relationship,
            aqi = sample.value,
            threshold = self.rule.threshold,
            "Threshold crossed"
        );

        match self.rule.frequency_mode.window() {
            None => {
                let notification = self.transition_notification(&transition);
                if let Some(state) = self.states.get_mut(&transition.location) {
                    state.last_notified_at = Some(notification.timestamp);
                }
                out.push(notification);
            }
            Some(window) => {
                let mode = self.rule.frequency_mode;
                let digest = self
                    .digest
                    .get_or_insert_with(|| DigestWindow::open(mode, window, transition.at));
                digest.record(&transition, self.rule.threshold);
            }
        }

        out
    }

    /// Emit the pending digest if its window has closed by `now`.
    pub fn flush_due(&mut self, now: DateTime<Utc>) -> Option<Notification> {
        let due = self
            .digest
            .as_ref()
            .is_some_and(|digest| now >= digest.end);
        if !due {
            return None;
        }

        let digest = self.digest.take()?;
        if digest.transitions() == 0 {
            return None;
        }

        let notification = self.digest_notification(&digest);
        for location in &digest.locations {
            if let Some(state) = self.states.get_mut(location) {
                state.last_notified_at = Some(notification.timestamp);
            }
        }

        info!(
            rule_id = %self.rule.id,
            transitions = digest.transitions(),
            severity = ?notification.severity,
            "Digest emitted"
        );

        Some(notification)
    }

    fn transition_notification(&self, transition: &Transition) -> Notification {
        let threshold = self.rule.threshold;
        let severity = transition.severity(threshold);

        let (kind, title, message) = match transition.to {
            Relationship::Above => (
                NotificationKind::Breach,
                match severity {
                    NotificationSeverity::High => "High AQI Alert",
                    _ => "AQI Threshold Exceeded",
                },
                format!(
                    "AQI in {} has reached {:.0}, above your threshold of {}.",
                    transition.location, transition.aqi, threshold
                ),
            ),
            Relationship::Below => (
                NotificationKind::Recovered,
                "Air Quality Improving",
                format!(
                    "AQI in {} is back to {:.0}, at or below your threshold of {}.",
                    transition.location, transition.aqi, threshold
                ),
            ),
        };

        Notification {
            id: Uuid::new_v4(),
            rule_id: self.rule.id.clone(),
            kind,
            severity,
            title: title.to_string(),
            message,
            location: transition.location.clone(),
            aqi: transition.aqi,
            channel: self.rule.channel,
            timestamp: transition.at,
            acknowledged: false,
        }
    }

    fn digest_notification(&self, digest: &DigestWindow) -> Notification {
        let title = match digest.mode {
            FrequencyMode::Daily => "Daily AQI Summary",
            _ => "Hourly AQI Summary",
        };

        let location = match digest.locations.first() {
            Some(loc) if digest.locations.len() == 1 => loc.clone(),
            _ => "Multiple locations".to_string(),
        };

        let worst_text = match digest.worst {
            Some((severity, aqi)) => format!(
                " Most severe breach: AQI {:.0} ({:?}).",
                aqi, severity
            ),
            None => String::new(),
        };

        let message = format!(
            "{} threshold crossings between {} and {}: {} breaches, {} recoveries (threshold {}).{}",
            digest.transitions(),
            digest.start.format("%Y-%m-%d %H:%M UTC"),
            digest.end.format("%Y-%m-%d %H:%M UTC"),
            digest.breaches,
            digest.recoveries,
            self.rule.threshold,
            worst_text
        );

        Notification {
            id: Uuid::new_v4(),
            rule_id: self.rule.id.clone(),
            kind: NotificationKind::Digest,
            severity: digest
                .worst
                .map(|(severity, _)| severity)
                .unwrap_or(NotificationSeverity::Low),
            title: title.to_string(),
            message,
            location,
            aqi: digest.worst.map(|(_, aqi)| aqi).unwrap_or(0.0),
            channel: self.rule.channel,
            timestamp: digest.end,
            acknowledged: false,
        }
    }
}

/// Owns every rule's runtime state.
///
/// `&mut self` on the evaluating methods makes each rule single-writer.
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    rules: BTreeMap<String, RuleEvaluator>,
}

impl AlertEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a rule.
    ///
    /// New rules start `BELOW`. Editing an existing rule keeps its last
    /// relationship and any pending digest, so an edit alone never notifies.
    pub fn upsert_rule(&mut self, rule: AlertRule) -> EngineResult<()> {
        if !(0..=MAX_THRESHOLD).contains(&rule.threshold) {
            return Err(EngineError::InvalidThreshold(rule.threshold));
        }

        match self.rules.get_mut(&rule.id) {
            Some(existing) => {
                info!(rule_id = %rule.id, threshold = rule.threshold, "Alert rule updated");
                existing.rule = rule;
            }
            None => {
                info!(rule_id = %rule.id, threshold = rule.threshold, "Alert rule created");
                self.rules.insert(rule.id.clone(), RuleEvaluator::new(rule));
            }
        }

        Ok(())
    }

    /// Delete a rule together with its per-location state and pending digest.
    pub fn remove_rule(&mut self, rule_id: &str) -> EngineResult<AlertRule> {
        let removed = self
            .rules
            .remove(rule_id)
            .ok_or_else(|| EngineError::RuleNotFound(rule_id.to_string()))?;

        info!(rule_id = %rule_id, "Alert rule removed");
        Ok(removed.rule)
    }

    pub fn rule(&self, rule_id: &str) -> Option<&AlertRule> {
        self.rules.get(rule_id).map(RuleEvaluator::rule)
    }

    pub fn state(&self, rule_id: &str, location: &str) -> Option<&AlertState> {
        self.rules.get(rule_id)?.state(location)
    }

    /// All rules, ordered by id.
    pub fn rules(&self) -> Vec<AlertRule> {
        self.rules.values().map(|e| e.rule.clone()).collect()
    }

    /// Run one sample through every rule.
    pub fn evaluate(&mut self, sample: &AqiSample) -> Vec<Notification> {
        self.rules
            .values_mut()
            .flat_map(|evaluator| evaluator.evaluate(sample))
            .collect()
    }

    /// Emit every digest whose window closed by `now`.
    pub fn flush_due(&mut self, now: DateTime<Utc>) -> Vec<Notification> {
        self.rules
            .values_mut()
            .filter_map(|evaluator| evaluator.flush_due(now))
            .collect()
    }
}
