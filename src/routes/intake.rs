use actix_web::{post, web, HttpResponse};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::intake::{self, Submission};
use crate::models::{Inquiry, Lead};
use crate::state::AppState;
use crate::types::{CarInquiryForm, ContactForm, ShowroomVisitForm};

#[utoipa::path(
    tag = "intake",
    request_body = ContactForm,
    responses(
        (status = 201, description = "Inquiry recorded", body = Submission<Inquiry>),
        (status = 422, description = "Name or message missing")
    )
)]
#[post("/contact")]
async fn submit_contact(
    app_state: web::Data<Arc<AppState>>,
    form: web::Json<ContactForm>,
) -> Result<HttpResponse, AppError> {
    let submission = intake::submit_contact(app_state.store.as_ref(), &form).await?;
    Ok(HttpResponse::Created().json(submission))
}

#[utoipa::path(
    tag = "intake",
    params(("id" = Uuid, Path, description = "Car the customer asks about")),
    request_body = CarInquiryForm,
    responses(
        (status = 201, description = "Lead recorded", body = Submission<Lead>),
        (status = 404, description = "No such car"),
        (status = 422, description = "Name or phone missing")
    )
)]
#[post("/cars/{id}/inquiry")]
async fn submit_car_inquiry(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
    form: web::Json<CarInquiryForm>,
) -> Result<HttpResponse, AppError> {
    let submission =
        intake::submit_car_inquiry(app_state.store.as_ref(), path.into_inner(), &form).await?;
    Ok(HttpResponse::Created().json(submission))
}

#[utoipa::path(
    tag = "intake",
    request_body = ShowroomVisitForm,
    responses(
        (status = 201, description = "Visit request recorded as a lead", body = Submission<Lead>),
        (status = 422, description = "Missing or malformed fields")
    )
)]
#[post("/showroom/visits")]
async fn submit_showroom_visit(
    app_state: web::Data<Arc<AppState>>,
    form: web::Json<ShowroomVisitForm>,
) -> Result<HttpResponse, AppError> {
    let submission = intake::submit_showroom_visit(app_state.store.as_ref(), &form).await?;
    Ok(HttpResponse::Created().json(submission))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    use crate::models::{LeadStatus, Role};
    use crate::routes::test_support::Harness;
    use crate::store::{EntityStore, LeadFilter, Table};

    #[actix_web::test]
    async fn contact_form_returns_created_inquiry() {
        let harness = Harness::new().await;
        harness.user(Role::Staff).await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/contact")
            .set_json(json!({ "name": "Ada", "message": "Interested in Camry" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["record"]["is_read"], false);
        assert_eq!(body["record"]["responded_at"], Value::Null);
        assert_eq!(body["record"]["customer_phone"], Value::Null);
        assert_eq!(body["notified_staff"], 1);
    }

    #[actix_web::test]
    async fn missing_fields_are_unprocessable() {
        let harness = Harness::new().await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/showroom/visits")
            .set_json(json!({ "name": "Bayo", "preferred_date": "2024-01-10" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], 422);
        assert_eq!(body["error"], "Phone number is required");
        assert!(harness
            .store
            .list_leads(&LeadFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[actix_web::test]
    async fn showroom_visit_is_kept_when_notifications_fail() {
        let harness = Harness::new().await;
        harness.user(Role::Admin).await;
        harness.store.fail_table(Table::Notifications);
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/showroom/visits")
            .set_json(json!({
                "name": "Bayo",
                "phone": "08012345678",
                "preferred_date": "2024-01-10",
                "preferred_time": "10:00 AM"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["notified_staff"], 0);
        assert_eq!(body["record"]["source"], "showroom_visit");

        let leads = harness.store.list_leads(&LeadFilter::default()).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].status, LeadStatus::New);
        assert!(leads[0]
            .message
            .as_deref()
            .unwrap()
            .contains("Wednesday, January 10, 2024 at 10:00 AM"));
    }

    #[actix_web::test]
    async fn inquiry_about_missing_car_is_not_found() {
        let harness = Harness::new().await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri(&format!("/cars/{}/inquiry", uuid::Uuid::new_v4()))
            .set_json(json!({ "name": "Chidi", "phone": "0803" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
