//! Telemetry simulator.
//!
//! Produces the next measurement from the previous one via a bounded random
//! walk. The random source is injected so runs are reproducible; cadence is
//! owned by whoever calls [`Simulator::tick`].

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{AqiSample, Measurement, PollutantReading};

/// AQI every simulated location starts from.
pub const REFERENCE_AQI: f64 = 42.0;

/// Starting point for a location: the reference reading at AQI 42.
pub fn initial_measurement(location: &str, now: DateTime<Utc>) -> Measurement {
    Measurement {
        reading: PollutantReading::reference(location, now),
        sample: AqiSample::new(location, REFERENCE_AQI, now),
    }
}

/// Maximum absolute per-tick change for each quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkMagnitudes {
    pub aqi: f64,
    pub pm25: f64,
    pub pm10: f64,
    pub co: f64,
    pub no2: f64,
    pub so2: f64,
    pub o3: f64,
}

impl Default for WalkMagnitudes {
    fn default() -> Self {
        Self {
            aqi: 5.0,
            pm25: 2.0,
            pm10: 3.0,
            co: 0.1,
            no2: 2.0,
            so2: 1.0,
            o3: 3.0,
        }
    }
}

/// Bounded random-walk generator over an injected RNG.
pub struct Simulator<R = StdRng> {
    rng: R,
    magnitudes: WalkMagnitudes,
}

impl Simulator<StdRng> {
    /// Reproducible simulator.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Simulator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> Simulator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            magnitudes: WalkMagnitudes::default(),
        }
    }

    pub fn with_magnitudes(mut self, magnitudes: WalkMagnitudes) -> Self {
        self.magnitudes = magnitudes;
        self
    }

    /// Advance one step from `previous`.
    ///
    /// Each pollutant moves by an independent uniform delta and is clamped to
    /// zero; AQI moves the same way, is rounded to a whole number and clamped
    /// to `[0, 500]`.
    pub fn tick(&mut self, previous: &Measurement, now: DateTime<Utc>) -> Measurement {
        let m = self.magnitudes;
        let prev = &previous.reading;

        let reading = PollutantReading {
            location: prev.location.clone(),
            pm25: prev.pm25 + self.delta(m.pm25),
            pm10: prev.pm10 + self.delta(m.pm10),
            co: prev.co + self.delta(m.co),
            no2: prev.no2 + self.delta(m.no2),
            so2: prev.so2 + self.delta(m.so2),
            o3: prev.o3 + self.delta(m.o3),
            timestamp: now,
        }
        .clamped();

        let aqi = (previous.sample.value + self.delta(m.aqi)).round();
        let sample = AqiSample::new(previous.sample.location.clone(), aqi, now);

        Measurement { reading, sample }
    }

    fn delta(&mut self, magnitude: f64) -> f64 {
        if magnitude <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-magnitude..=magnitude)
    }
}
