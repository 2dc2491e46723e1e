//! Airwatch - air-quality classification, alerting and health advisories.
//!
//! # Overview
//!
//! Airwatch turns pollutant measurements into a severity band, evaluates
//! user-defined AQI thresholds to emit edge-triggered notifications, resolves
//! a short questionnaire into prioritized health-advisory bundles, and keeps
//! rolling trend series for period-over-period comparison.
//!
//! The engine holds no global state. A [`engine::Monitor`] owns everything
//! and is advanced explicitly by whoever owns the timer; every operation is a
//! short synchronous unit of work.
//!
//! # Modules
//!
//! - [`model`]: Readings, alert rules, notifications, questionnaire and trend types
//! - [`classifier`]: AQI bands and advice tiers
//! - [`simulator`]: Bounded random-walk telemetry
//! - [`alerts`]: Per-rule threshold state machines and digests
//! - [`notifications`]: Retention of emitted notifications
//! - [`advisory`]: Questionnaire to recommendation bundles
//! - [`trends`]: Rolling trend series and comparisons
//! - [`engine`]: The owned monitor state and observer events
//! - [`config`]: Environment-driven settings
//! - [`api`]: HTTP API handlers

pub mod advisory;
pub mod alerts;
pub mod api;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod notifications;
pub mod simulator;
pub mod trends;
