use actix_web::{get, post, web, HttpResponse};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Inquiry;
use crate::session::AdminSession;
use crate::state::AppState;
use crate::triage;
use crate::types::{InquiryListQuery, RespondInquiryRequest};

#[utoipa::path(
    context_path = "/admin",
    tag = "triage",
    params(InquiryListQuery),
    responses((status = 200, description = "Inquiries, newest first", body = Vec<Inquiry>))
)]
#[get("/inquiries")]
async fn list_inquiries(
    app_state: web::Data<Arc<AppState>>,
    _session: AdminSession,
    query: web::Query<InquiryListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = triage::inquiry_filter(&query)?;
    let inquiries = app_state.store.list_inquiries(&filter).await?;
    Ok(HttpResponse::Ok().json(inquiries))
}

#[utoipa::path(
    context_path = "/admin",
    tag = "triage",
    params(("id" = Uuid, Path, description = "Inquiry id")),
    responses((status = 200, body = Inquiry), (status = 404, description = "No such inquiry"))
)]
#[post("/inquiries/{id}/read")]
async fn mark_inquiry_read(
    app_state: web::Data<Arc<AppState>>,
    _session: AdminSession,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let inquiry = triage::mark_inquiry_read(app_state.store.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(inquiry))
}

#[utoipa::path(
    context_path = "/admin",
    tag = "triage",
    params(("id" = Uuid, Path, description = "Inquiry id")),
    request_body = RespondInquiryRequest,
    responses((status = 200, body = Inquiry), (status = 404, description = "No such inquiry"))
)]
#[post("/inquiries/{id}/respond")]
async fn respond_to_inquiry(
    app_state: web::Data<Arc<AppState>>,
    session: AdminSession,
    path: web::Path<Uuid>,
    req_body: web::Json<RespondInquiryRequest>,
) -> Result<HttpResponse, AppError> {
    let inquiry = triage::respond_to_inquiry(
        app_state.store.as_ref(),
        path.into_inner(),
        session.user_id(),
        req_body.reply.as_deref(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(inquiry))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::header::AUTHORIZATION, http::StatusCode, test};
    use serde_json::{json, Value};

    use crate::models::{Inquiry, NewInquiry, Role};
    use crate::routes::test_support::{bearer, Harness};
    use crate::store::{EntityStore, InquiryFilter, Table};

    async fn inquiry(harness: &Harness, name: &str, subject: &str) -> Inquiry {
        harness
            .store
            .insert_inquiry(NewInquiry {
                customer_name: name.to_string(),
                customer_email: Some(format!("{}@mail.ng", name.to_lowercase())),
                customer_phone: None,
                subject: Some(subject.to_string()),
                message: "Please call me".to_string(),
            })
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn read_filter_and_response_bookkeeping() {
        let harness = Harness::new().await;
        let (staff_id, token) = harness.user(Role::Staff).await;
        let first = inquiry(&harness, "Ada", "Financing").await;
        let second = inquiry(&harness, "Emeka", "Trade-in").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri(&format!("/admin/inquiries/{}/read", first.id))
            .insert_header((AUTHORIZATION, bearer(&token)))
            .to_request();
        let read: Inquiry = test::call_and_read_body_json(&app, req).await;
        assert!(read.is_read);
        assert_eq!(read.responded_at, None);

        let req = test::TestRequest::post()
            .uri(&format!("/admin/inquiries/{}/respond", second.id))
            .insert_header((AUTHORIZATION, bearer(&token)))
            .set_json(json!({ "reply": "We have a trade-in offer for you" }))
            .to_request();
        let answered: Inquiry = test::call_and_read_body_json(&app, req).await;
        assert!(answered.is_read);
        assert_eq!(answered.responded_by, Some(staff_id));

        let req = test::TestRequest::get()
            .uri("/admin/inquiries?filter=unread")
            .insert_header((AUTHORIZATION, bearer(&token)))
            .to_request();
        let unread: Vec<Inquiry> = test::call_and_read_body_json(&app, req).await;
        assert!(unread.is_empty());

        let req = test::TestRequest::get()
            .uri("/admin/inquiries?search=trade")
            .insert_header((AUTHORIZATION, bearer(&token)))
            .to_request();
        let found: Vec<Inquiry> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, second.id);
    }

    #[actix_web::test]
    async fn unknown_inquiry_is_not_found() {
        let harness = Harness::new().await;
        let (_, token) = harness.user(Role::Admin).await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri(&format!("/admin/inquiries/{}/read", uuid::Uuid::new_v4()))
            .insert_header((AUTHORIZATION, bearer(&token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn failed_mark_read_keeps_the_inquiry_unread() {
        let harness = Harness::new().await;
        let (_, token) = harness.user(Role::Staff).await;
        let pending = inquiry(&harness, "Ada", "Financing").await;
        harness.store.fail_table(Table::Inquiries);
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri(&format!("/admin/inquiries/{}/read", pending.id))
            .insert_header((AUTHORIZATION, bearer(&token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], 500);

        harness.store.restore_table(Table::Inquiries);
        let stored = harness
            .store
            .list_inquiries(&InquiryFilter::default())
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].is_read);
    }

    #[actix_web::test]
    async fn non_positive_limit_is_unprocessable() {
        let harness = Harness::new().await;
        let (_, token) = harness.user(Role::Staff).await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::get()
            .uri("/admin/inquiries?limit=-5")
            .insert_header((AUTHORIZATION, bearer(&token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
