//! The `server` module is the HTTP boundary of the dashboard backend.
//!
//! It exposes the latest sensor values and accepts operator commands,
//! translating requests into latest-value-store reads and telemetry-client
//! publishes. No business logic lives here.

pub mod routes;

pub use routes::{router, AppState};

use tracing::info;


/// Bind `addr` and serve the dashboard API until the task is stopped.
pub async fn serve(addr: String, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("dashboard listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
