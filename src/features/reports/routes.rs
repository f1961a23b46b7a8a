use axum::{routing::get, Router};
use std::sync::Arc;

use crate::features::reports::handlers::{create_report, get_report, list_reports};
use crate::features::reports::services::ReportService;

/// Create routes for the reports feature (auth middleware applied by caller)
pub fn routes(service: Arc<ReportService>) -> Router {
    Router::new()
        .route("/api/reports", get(list_reports).post(create_report))
        .route("/api/reports/{id}", get(get_report))
        .with_state(service)
}
