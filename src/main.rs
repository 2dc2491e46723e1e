//! Airwatch service binary.
//!
//! Runs the monitor on a fixed tick and serves the engine over HTTP.
//!
//! # API Endpoints
//!
//! - `GET /current` - Latest reading, band and tips per location
//! - `GET /alerts/rules`, `PUT|DELETE /alerts/rules/:id` - Alert configuration
//! - `GET /notifications`, `POST /notifications/:id/ack` - Notification feed
//! - `POST /recommendations` - Questionnaire to advisory bundles
//! - `GET|PUT /trends/:period`, `POST /trends/compare`, `POST /trends/snapshot` - Trends
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use tokio::net::TcpListener;
use tokio::time::{MissedTickBehavior, interval};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use airwatch::api::{AppState, router};
use airwatch::config::Settings;
use airwatch::engine::{Monitor, TracingObserver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("airwatch=info".parse()?))
        .init();

    let settings = Settings::from_env();

    info!(
        port = settings.port,
        tick_secs = settings.tick_interval.as_secs(),
        seeded = settings.seed.is_some(),
        locations = ?settings.locations,
        "Starting Airwatch"
    );

    let mut monitor = Monitor::from_settings(&settings, Utc::now());
    monitor.add_observer(Arc::new(TracingObserver));
    let state = AppState::new(monitor);

    // Each tick completes under the lock before the next one is considered.
    let ticker = state.monitor.clone();
    let tick_interval = settings.tick_interval;
    tokio::spawn(async move {
        let mut timer = interval(tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            timer.tick().await;
            let report = ticker.lock().await.tick(Utc::now());
            debug!(
                locations = report.locations.len(),
                notifications = report.notifications.len(),
                "Tick processed"
            );
        }
    });

    let app = router(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Airwatch is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
