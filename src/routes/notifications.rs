use actix_web::{get, post, web, HttpResponse};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Notification;
use crate::notify::NOTIFICATION_PAGE;
use crate::session::AdminSession;
use crate::state::AppState;

#[utoipa::path(
    context_path = "/admin",
    tag = "notifications",
    responses((status = 200, description = "The caller's newest notifications", body = Vec<Notification>))
)]
#[get("/notifications")]
async fn list_notifications(
    app_state: web::Data<Arc<AppState>>,
    session: AdminSession,
) -> Result<HttpResponse, AppError> {
    let notifications = app_state
        .store
        .list_notifications(session.user_id(), NOTIFICATION_PAGE)
        .await?;
    Ok(HttpResponse::Ok().json(notifications))
}

#[utoipa::path(
    context_path = "/admin",
    tag = "notifications",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Marked read"),
        (status = 404, description = "Not one of the caller's notifications")
    )
)]
#[post("/notifications/{id}/read")]
async fn mark_notification_read(
    app_state: web::Data<Arc<AppState>>,
    session: AdminSession,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    app_state
        .store
        .mark_notification_read(path.into_inner(), session.user_id())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
