use actix_web::{get, patch, web, HttpResponse};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Lead;
use crate::session::AdminSession;
use crate::state::AppState;
use crate::triage;
use crate::types::{AssignLeadRequest, LeadListQuery, UpdateLeadStatusRequest};

#[utoipa::path(
    context_path = "/admin",
    tag = "triage",
    params(LeadListQuery),
    responses(
        (status = 200, description = "Leads, newest first", body = Vec<Lead>),
        (status = 403, description = "Not staff")
    )
)]
#[get("/leads")]
async fn list_leads(
    app_state: web::Data<Arc<AppState>>,
    _session: AdminSession,
    query: web::Query<LeadListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = triage::lead_filter(&query)?;
    let leads = app_state.store.list_leads(&filter).await?;
    Ok(HttpResponse::Ok().json(leads))
}

#[utoipa::path(
    context_path = "/admin",
    tag = "triage",
    params(("id" = Uuid, Path, description = "Lead id")),
    request_body = UpdateLeadStatusRequest,
    responses(
        (status = 200, body = Lead),
        (status = 404, description = "No such lead"),
        (status = 409, description = "Move not allowed by the transition policy")
    )
)]
#[patch("/leads/{id}/status")]
async fn update_lead_status(
    app_state: web::Data<Arc<AppState>>,
    _session: AdminSession,
    path: web::Path<Uuid>,
    req_body: web::Json<UpdateLeadStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let lead = triage::set_lead_status(
        app_state.store.as_ref(),
        app_state.config.lead_transitions,
        path.into_inner(),
        req_body.status,
    )
    .await?;
    Ok(HttpResponse::Ok().json(lead))
}

#[utoipa::path(
    context_path = "/admin",
    tag = "triage",
    params(("id" = Uuid, Path, description = "Lead id")),
    request_body = AssignLeadRequest,
    responses(
        (status = 200, body = Lead),
        (status = 422, description = "Assignee is not staff")
    )
)]
#[patch("/leads/{id}/assignee")]
async fn assign_lead(
    app_state: web::Data<Arc<AppState>>,
    _session: AdminSession,
    path: web::Path<Uuid>,
    req_body: web::Json<AssignLeadRequest>,
) -> Result<HttpResponse, AppError> {
    let lead = triage::assign_lead(
        app_state.store.as_ref(),
        path.into_inner(),
        req_body.assigned_to,
    )
    .await?;
    Ok(HttpResponse::Ok().json(lead))
}
