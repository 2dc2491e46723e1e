//! Data models for Airwatch.
//!
//! Everything here is plain data: readings produced by the simulator, alert
//! configuration supplied by the settings collaborator, notifications emitted
//! by the evaluator, and the questionnaire and trend types exchanged with the
//! UI layer. All types are serde-serializable so the UI (or a storage
//! collaborator) can persist them using these field layouts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Lower bound of the AQI scale.
pub const AQI_MIN: f64 = 0.0;

/// Upper bound of the AQI scale.
pub const AQI_MAX: f64 = 500.0;

/// Location scope that matches every reading.
pub const ALL_LOCATIONS: &str = "all";

/// One instantaneous pollutant measurement at a location.
///
/// Concentrations are never negative; [`PollutantReading::clamped`] is applied
/// by every producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantReading {
    pub location: String,
    pub pm25: f64,
    pub pm10: f64,
    pub co: f64,
    pub no2: f64,
    pub so2: f64,
    pub o3: f64,
    pub timestamp: DateTime<Utc>,
}

impl PollutantReading {
    /// The reading every simulated location starts from.
    pub fn reference(location: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            location: location.into(),
            pm25: 25.0,
            pm10: 45.0,
            co: 0.8,
            no2: 21.0,
            so2: 5.0,
            o3: 48.0,
            timestamp,
        }
    }

    /// Normalize negative concentrations to zero.
    pub fn clamped(mut self) -> Self {
        for value in [
            &mut self.pm25,
            &mut self.pm10,
            &mut self.co,
            &mut self.no2,
            &mut self.so2,
            &mut self.o3,
        ] {
            *value = value.max(0.0);
        }
        self
    }

    /// Concentration of one pollutant.
    pub fn get(&self, pollutant: Pollutant) -> f64 {
        match pollutant {
            Pollutant::Pm25 => self.pm25,
            Pollutant::Pm10 => self.pm10,
            Pollutant::No2 => self.no2,
            Pollutant::So2 => self.so2,
            Pollutant::Co => self.co,
            Pollutant::O3 => self.o3,
        }
    }

    /// The six sub-indices in [`Pollutant::ALL`] order.
    pub fn sub_indices(&self) -> [f64; 6] {
        Pollutant::ALL.map(|p| self.get(p))
    }
}

/// Composite AQI value for one location, clamped to `[0, 500]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiSample {
    pub location: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl AqiSample {
    /// Build a sample, clamping the value onto the AQI scale.
    pub fn new(location: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            location: location.into(),
            value: clamp_aqi(value),
            timestamp,
        }
    }
}

/// Clamp any value onto the AQI scale. NaN maps to the lower bound.
pub fn clamp_aqi(value: f64) -> f64 {
    if value.is_nan() {
        return AQI_MIN;
    }
    value.clamp(AQI_MIN, AQI_MAX)
}

/// A reading together with the AQI sample derived for the same tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub reading: PollutantReading,
    pub sample: AqiSample,
}

/// The six pollutants tracked per reading, in comparison-chart order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    Pm25,
    Pm10,
    No2,
    So2,
    Co,
    O3,
}

impl Pollutant {
    /// Axis order used by multi-pollutant comparisons.
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::No2,
        Pollutant::So2,
        Pollutant::Co,
        Pollutant::O3,
    ];
}

// ============================================================================
// Alerting
// ============================================================================

/// How often a rule may notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyMode {
    /// One notification per transition.
    Immediate,
    /// Transitions batched into one digest per UTC hour.
    Hourly,
    /// Transitions batched into one digest per UTC day.
    Daily,
}

/// Delivery channel requested by the user. Delivery itself is external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    App,
    Email,
    Sms,
}

/// A user-configured AQI watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,

    /// `"all"` or an exact location name.
    #[serde(default = "default_location_scope")]
    pub location_scope: String,

    /// AQI threshold, 0 to 200 inclusive.
    pub threshold: i64,

    #[serde(default = "default_frequency_mode")]
    pub frequency_mode: FrequencyMode,

    #[serde(default = "default_channel")]
    pub channel: Channel,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_location_scope() -> String {
    ALL_LOCATIONS.to_string()
}

fn default_frequency_mode() -> FrequencyMode {
    FrequencyMode::Immediate
}

fn default_channel() -> Channel {
    Channel::App
}

fn default_enabled() -> bool {
    true
}

/// Request body for `PUT /alerts/rules/:id`; the id comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertRuleRequest {
    #[serde(default = "default_location_scope")]
    pub location_scope: String,
    pub threshold: i64,
    #[serde(default = "default_frequency_mode")]
    pub frequency_mode: FrequencyMode,
    #[serde(default = "default_channel")]
    pub channel: Channel,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl AlertRuleRequest {
    pub fn into_rule(self, id: impl Into<String>) -> AlertRule {
        AlertRule {
            id: id.into(),
            location_scope: self.location_scope,
            threshold: self.threshold,
            frequency_mode: self.frequency_mode,
            channel: self.channel,
            enabled: self.enabled,
        }
    }
}

impl AlertRule {
    /// Whether readings from `location` fall within this rule's scope.
    pub fn observes(&self, location: &str) -> bool {
        self.location_scope == ALL_LOCATIONS || self.location_scope == location
    }
}

/// Relationship of the last observed AQI to a rule's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relationship {
    Below,
    Above,
}

/// Runtime state of one rule at one location, owned by the alert evaluator.
///
/// An `"all"`-scope rule keeps one of these per location it has seen, so
/// locations on opposite sides of the threshold never flip each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertState {
    pub rule_id: String,
    pub location: String,
    pub last_relationship: Relationship,
    pub last_notified_at: Option<DateTime<Utc>>,
}

impl AlertState {
    /// Fresh `BELOW` state for a rule at a location.
    pub fn new(rule_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            location: location.into(),
            last_relationship: Relationship::Below,
            last_notified_at: None,
        }
    }
}

/// What caused a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// AQI crossed above the threshold.
    Breach,
    /// AQI fell back to or below the threshold.
    Recovered,
    /// Summary of all transitions in a batching window.
    Digest,
}

/// Notification severity levels, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSeverity {
    Low,
    Medium,
    High,
}

/// An emitted alert, recovery or digest event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub rule_id: String,
    pub kind: NotificationKind,
    pub severity: NotificationSeverity,
    pub title: String,
    pub message: String,
    pub location: String,
    /// AQI that triggered the event (peak AQI for digests).
    pub aqi: f64,
    pub channel: Channel,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
}

// ============================================================================
// Advisory questionnaire
// ============================================================================

/// Typical daily activity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    #[serde(rename = "Mostly Indoors")]
    MostlyIndoors,
    #[serde(rename = "Regular Outdoor Activities")]
    RegularOutdoorActivities,
    #[serde(rename = "Athletic Training")]
    AthleticTraining,
}

/// Respiratory sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensitivity {
    None,
    Mild,
    Moderate,
    Severe,
}

/// Where the user spends most of their time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationType {
    #[serde(rename = "Urban Area")]
    UrbanArea,
    Suburban,
    Rural,
    #[serde(rename = "Industrial Zone")]
    IndustrialZone,
}

/// A user profile snapshot. Unset fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionnaireAnswer {
    #[serde(default)]
    pub activity: Option<Activity>,
    #[serde(default)]
    pub sensitivity: Option<Sensitivity>,
    #[serde(default)]
    pub location_type: Option<LocationType>,
}

impl QuestionnaireAnswer {
    /// Number of questions in the questionnaire.
    pub const QUESTION_COUNT: usize = 3;

    /// How many fields are set.
    pub fn answered(&self) -> usize {
        [
            self.activity.is_some(),
            self.sensitivity.is_some(),
            self.location_type.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

/// One named, ordered group of advisory tips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationBundle {
    pub title: String,
    pub tips: Vec<String>,
    /// 1 is the highest priority; bundles are returned in priority order.
    pub priority: u8,
}

/// Result of resolving a questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Advisory {
    /// Not every question is answered yet.
    Incomplete {
        answered: usize,
        /// `answered / 3`, in `[0, 1]`.
        progress: f64,
    },
    /// All questions answered.
    Ready { bundles: Vec<RecommendationBundle> },
}

// ============================================================================
// Trends
// ============================================================================

/// Granularity of a trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    Weekly,
    Monthly,
    Yearly,
}

impl TrendPeriod {
    pub const ALL: [TrendPeriod; 3] = [TrendPeriod::Weekly, TrendPeriod::Monthly, TrendPeriod::Yearly];

    /// Lowercase key used by callers.
    pub fn key(&self) -> &'static str {
        match self {
            TrendPeriod::Weekly => "weekly",
            TrendPeriod::Monthly => "monthly",
            TrendPeriod::Yearly => "yearly",
        }
    }
}

impl fmt::Display for TrendPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TrendPeriod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(TrendPeriod::Weekly),
            "monthly" => Ok(TrendPeriod::Monthly),
            "yearly" => Ok(TrendPeriod::Yearly),
            other => Err(EngineError::InvalidPeriod(other.to_string())),
        }
    }
}

/// A labelled series for one period. `labels.len() == values.len()` always.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub period: TrendPeriod,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Hourly AQI averages for one location over the last day, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    pub location: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Direction of a period-over-period change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
    /// The previous period averaged zero.
    Undefined,
}

/// Percentage change, undefined when the baseline is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentDelta {
    Defined(f64),
    Undefined,
}

/// Result of comparing one series against the previous period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub percent_delta: PercentDelta,
    pub direction: Direction,
}

/// Current vs previous value for one pollutant axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollutantDelta {
    pub pollutant: Pollutant,
    pub current: f64,
    pub previous: f64,
    pub delta: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_clamps_negative_values() {
        let mut reading = PollutantReading::reference("Downtown", Utc::now());
        reading.co = -0.3;
        reading.o3 = -12.0;

        let reading = reading.clamped();

        assert_eq!(reading.co, 0.0);
        assert_eq!(reading.o3, 0.0);
        assert_eq!(reading.pm25, 25.0);
    }

    #[test]
    fn test_sample_clamps_to_scale() {
        let now = Utc::now();
        assert_eq!(AqiSample::new("x", -4.0, now).value, 0.0);
        assert_eq!(AqiSample::new("x", 720.0, now).value, 500.0);
        assert_eq!(AqiSample::new("x", 137.0, now).value, 137.0);
        assert_eq!(AqiSample::new("x", f64::NAN, now).value, 0.0);
    }

    #[test]
    fn test_rule_scope() {
        let mut rule = AlertRule {
            id: "r1".to_string(),
            location_scope: "all".to_string(),
            threshold: 50,
            frequency_mode: FrequencyMode::Immediate,
            channel: Channel::App,
            enabled: true,
        };
        assert!(rule.observes("Downtown"));
        assert!(rule.observes("Industrial Zone"));

        rule.location_scope = "Downtown".to_string();
        assert!(rule.observes("Downtown"));
        assert!(!rule.observes("downtown"));
        assert!(!rule.observes("Industrial Zone"));
    }

    #[test]
    fn test_rule_defaults_from_json() {
        let rule: AlertRule =
            serde_json::from_str(r#"{"id": "r1", "threshold": 80}"#).unwrap();

        assert_eq!(rule.location_scope, "all");
        assert_eq!(rule.frequency_mode, FrequencyMode::Immediate);
        assert_eq!(rule.channel, Channel::App);
        assert!(rule.enabled);
    }

    #[test]
    fn test_questionnaire_wire_names() {
        let answers: QuestionnaireAnswer = serde_json::from_str(
            r#"{"activity": "Athletic Training", "sensitivity": "Severe", "location_type": "Industrial Zone"}"#,
        )
        .unwrap();

        assert_eq!(answers.activity, Some(Activity::AthleticTraining));
        assert_eq!(answers.sensitivity, Some(Sensitivity::Severe));
        assert_eq!(answers.location_type, Some(LocationType::IndustrialZone));
        assert_eq!(answers.answered(), 3);
        assert_eq!(QuestionnaireAnswer::default().answered(), 0);
    }

    #[test]
    fn test_trend_period_parse() {
        assert_eq!("weekly".parse::<TrendPeriod>(), Ok(TrendPeriod::Weekly));
        assert_eq!("yearly".parse::<TrendPeriod>(), Ok(TrendPeriod::Yearly));
        assert_eq!(
            "decade".parse::<TrendPeriod>(),
            Err(EngineError::InvalidPeriod("decade".to_string()))
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(NotificationSeverity::High > NotificationSeverity::Medium);
        assert!(NotificationSeverity::Medium > NotificationSeverity::Low);
    }
}
