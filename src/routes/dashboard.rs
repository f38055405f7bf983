use actix_web::{get, web, HttpResponse};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::DashboardStats;
use crate::session::AdminSession;
use crate::state::AppState;

#[utoipa::path(
    context_path = "/admin",
    tag = "triage",
    responses((status = 200, body = DashboardStats))
)]
#[get("/stats")]
async fn dashboard_stats(
    app_state: web::Data<Arc<AppState>>,
    _session: AdminSession,
) -> Result<HttpResponse, AppError> {
    let stats = app_state.store.dashboard_stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}
