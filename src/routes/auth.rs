use actix_web::{get, post, web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::models::Profile;
use crate::session::Session;
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct SessionView {
    pub profile: Profile,
    pub is_admin: bool,
}

#[utoipa::path(
    context_path = "/auth",
    tag = "session",
    responses(
        (status = 200, body = SessionView),
        (status = 401, description = "No valid token, or no profile behind it")
    )
)]
#[get("/session")]
async fn current_session(session: Session) -> Result<HttpResponse, AppError> {
    let is_admin = session.is_admin();
    Ok(HttpResponse::Ok().json(SessionView {
        profile: session.profile,
        is_admin,
    }))
}

#[utoipa::path(
    context_path = "/auth",
    tag = "session",
    responses((status = 204, description = "Cached session dropped"))
)]
#[post("/sign-out")]
async fn sign_out(
    app_state: web::Data<Arc<AppState>>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    app_state.sessions.teardown(session.user_id()).await;
    Ok(HttpResponse::NoContent().finish())
}
