//! AQI classification.
//!
//! Maps an AQI value onto one of six contiguous, non-overlapping severity
//! bands and onto a three-way advice tier used to pick generic tips. Both
//! functions are total: out-of-range input is clamped, never rejected.

use serde::{Deserialize, Serialize};

use crate::model::clamp_aqi;

/// Ordinal severity classification of an AQI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

/// One row of the band table. Upper bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandInfo {
    pub band: Band,
    pub label: &'static str,
    pub lower: u16,
    pub upper: u16,
    pub description: &'static str,
}

/// The band table, ordered by severity.
pub static BANDS: [BandInfo; 6] = [
    BandInfo {
        band: Band::Good,
        label: "Good",
        lower: 0,
        upper: 50,
        description: "Air quality is satisfactory and poses little or no risk.",
    },
    BandInfo {
        band: Band::Moderate,
        label: "Moderate",
        lower: 51,
        upper: 100,
        description: "Acceptable; unusually sensitive people may be affected.",
    },
    BandInfo {
        band: Band::UnhealthySensitive,
        label: "Unhealthy for Sensitive Groups",
        lower: 101,
        upper: 150,
        description: "Members of sensitive groups may experience health effects.",
    },
    BandInfo {
        band: Band::Unhealthy,
        label: "Unhealthy",
        lower: 151,
        upper: 200,
        description: "Everyone may begin to experience health effects.",
    },
    BandInfo {
        band: Band::VeryUnhealthy,
        label: "Very Unhealthy",
        lower: 201,
        upper: 300,
        description: "Health alert: everyone may experience more serious effects.",
    },
    BandInfo {
        band: Band::Hazardous,
        label: "Hazardous",
        lower: 301,
        upper: 500,
        description: "Emergency conditions; the entire population is likely affected.",
    },
];

impl Band {
    /// Table row for this band.
    pub fn info(&self) -> &'static BandInfo {
        &BANDS[*self as usize]
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        self.info().label
    }
}

/// Classify an AQI value.
///
/// Values are compared against inclusive upper bounds, so fractional values
/// between two integer bounds (e.g. 50.4) fall into the higher band only once
/// they exceed the lower band's upper bound. Values below 0 are `Good`, values
/// above 500 are `Hazardous`.
pub fn classify(aqi: f64) -> Band {
    let aqi = clamp_aqi(aqi);

    BANDS
        .iter()
        .find(|info| aqi <= f64::from(info.upper))
        .map(|info| info.band)
        .unwrap_or(Band::Hazardous)
}

/// Coarse tier used to select generic advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceTier {
    Favorable,
    Caution,
    Severe,
}

/// Split AQI at 50 and 100; boundary values belong to the lower tier.
pub fn advice_tier(aqi: f64) -> AdviceTier {
    let aqi = clamp_aqi(aqi);

    if aqi <= 50.0 {
        AdviceTier::Favorable
    } else if aqi <= 100.0 {
        AdviceTier::Caution
    } else {
        AdviceTier::Severe
    }
}

impl AdviceTier {
    /// Generic tips shown alongside the current reading.
    pub fn tips(&self) -> &'static [&'static str] {
        match self {
            AdviceTier::Favorable => &[
                "Perfect conditions for outdoor activities",
                "Enjoy the fresh air",
                "Great time for exercise",
            ],
            AdviceTier::Caution => &[
                "Consider reducing prolonged outdoor activities",
                "Keep windows closed during peak hours",
                "Monitor any respiratory symptoms",
            ],
            AdviceTier::Severe => &[
                "Stay indoors as much as possible",
                "Use air purifiers if available",
                "Wear masks when going outside",
                "Avoid strenuous outdoor activities",
            ],
        }
    }
}

/// Band, tier and tips for one AQI value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub aqi: f64,
    pub band: Band,
    pub label: &'static str,
    pub tier: AdviceTier,
    pub tips: &'static [&'static str],
}

impl Classification {
    pub fn of(aqi: f64) -> Self {
        let band = classify(aqi);
        let tier = advice_tier(aqi);
        Self {
            aqi: clamp_aqi(aqi),
            band,
            label: band.label(),
            tier,
            tips: tier.tips(),
        }
    }
}
