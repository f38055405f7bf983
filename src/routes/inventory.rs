use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::inventory;
use crate::models::Car;
use crate::session::AdminSession;
use crate::state::AppState;
use crate::types::{CarForm, CarListQuery, UpdateCarStatusRequest};

#[utoipa::path(
    context_path = "/admin",
    tag = "inventory",
    params(CarListQuery),
    responses((status = 200, description = "All cars, newest first", body = Vec<Car>))
)]
#[get("/cars")]
async fn list_inventory(
    app_state: web::Data<Arc<AppState>>,
    _session: AdminSession,
    query: web::Query<CarListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = inventory::admin_filter(&query)?;
    let cars = app_state.store.list_cars(&filter).await?;
    Ok(HttpResponse::Ok().json(cars))
}

#[utoipa::path(
    context_path = "/admin",
    tag = "inventory",
    request_body = CarForm,
    responses((status = 201, body = Car), (status = 422, description = "Invalid form"))
)]
#[post("/cars")]
async fn create_car(
    app_state: web::Data<Arc<AppState>>,
    session: AdminSession,
    form: web::Json<CarForm>,
) -> Result<HttpResponse, AppError> {
    let car = inventory::create_car(
        app_state.store.as_ref(),
        form.into_inner(),
        session.user_id(),
    )
    .await?;
    Ok(HttpResponse::Created().json(car))
}

#[utoipa::path(
    context_path = "/admin",
    tag = "inventory",
    params(("id" = Uuid, Path, description = "Car id")),
    request_body = CarForm,
    responses((status = 200, body = Car), (status = 404, description = "No such car"))
)]
#[put("/cars/{id}")]
async fn update_car(
    app_state: web::Data<Arc<AppState>>,
    _session: AdminSession,
    path: web::Path<Uuid>,
    form: web::Json<CarForm>,
) -> Result<HttpResponse, AppError> {
    let car =
        inventory::update_car(app_state.store.as_ref(), path.into_inner(), form.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(car))
}

#[utoipa::path(
    context_path = "/admin",
    tag = "inventory",
    params(("id" = Uuid, Path, description = "Car id")),
    request_body = UpdateCarStatusRequest,
    responses((status = 200, body = Car), (status = 404, description = "No such car"))
)]
#[patch("/cars/{id}/status")]
async fn update_car_status(
    app_state: web::Data<Arc<AppState>>,
    _session: AdminSession,
    path: web::Path<Uuid>,
    req_body: web::Json<UpdateCarStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let car =
        inventory::set_car_status(app_state.store.as_ref(), path.into_inner(), req_body.status)
            .await?;
    Ok(HttpResponse::Ok().json(car))
}

#[utoipa::path(
    context_path = "/admin",
    tag = "inventory",
    params(("id" = Uuid, Path, description = "Car id")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "No such car"))
)]
#[delete("/cars/{id}")]
async fn delete_car(
    app_state: web::Data<Arc<AppState>>,
    _session: AdminSession,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    inventory::delete_car(app_state.store.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use actix_web::{http::header::AUTHORIZATION, http::StatusCode, test};
    use serde_json::{json, Value};

    use crate::models::{Car, CarStatus, Role};
    use crate::routes::test_support::{bearer, Harness};
    use crate::store::{EntityStore, Table};

    #[actix_web::test]
    async fn create_coerces_form_text() {
        let harness = Harness::new().await;
        let (staff_id, token) = harness.user(Role::Staff).await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/admin/cars")
            .insert_header((AUTHORIZATION, bearer(&token)))
            .set_json(json!({
                "make": "Lexus",
                "model": "ES 350",
                "year": "2021",
                "price": "15800000",
                "mileage": "",
                "color": " ",
                "features": "Leather seats, Sunroof"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let car: Car = test::read_body_json(resp).await;
        assert_eq!(car.year, 2021);
        assert_eq!(car.price, 15_800_000);
        assert_eq!(car.mileage, None);
        assert_eq!(car.color, None);
        assert_eq!(car.features, vec!["Leather seats", "Sunroof"]);
        assert_eq!(car.created_by, Some(staff_id));
        assert_eq!(car.status, CarStatus::Available);

        let req = test::TestRequest::post()
            .uri("/admin/cars")
            .insert_header((AUTHORIZATION, bearer(&token)))
            .set_json(json!({ "make": "Lexus", "model": "ES", "year": "2021", "price": "-5" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn camry_search_with_available_status() {
        let harness = Harness::new().await;
        let (staff_id, token) = harness.user(Role::Admin).await;
        let camry = harness.car("Toyota", "Camry", 7_500_000, staff_id).await;
        let sold = harness.car("Toyota", "Camry", 6_900_000, staff_id).await;
        harness.car("Honda", "Accord", 6_200_000, staff_id).await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::patch()
            .uri(&format!("/admin/cars/{}/status", sold.id))
            .insert_header((AUTHORIZATION, bearer(&token)))
            .set_json(json!({ "status": "sold" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/admin/cars?search=camry&status=available")
            .insert_header((AUTHORIZATION, bearer(&token)))
            .to_request();
        let cars: Vec<Car> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].id, camry.id);
    }

    #[actix_web::test]
    async fn delete_removes_the_car_for_good() {
        let harness = Harness::new().await;
        let (staff_id, token) = harness.user(Role::Staff).await;
        let car = harness.car("Toyota", "Corolla", 4_500_000, staff_id).await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/cars/{}", car.id))
            .insert_header((AUTHORIZATION, bearer(&token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri("/admin/cars")
            .insert_header((AUTHORIZATION, bearer(&token)))
            .to_request();
        let cars: Value = test::call_and_read_body_json(&app, req).await;
        assert!(cars
            .as_array()
            .unwrap()
            .iter()
            .all(|c| c["id"] != car.id.to_string()));

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/cars/{}", car.id))
            .insert_header((AUTHORIZATION, bearer(&token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn failed_delete_keeps_the_car() {
        let harness = Harness::new().await;
        let (staff_id, token) = harness.user(Role::Staff).await;
        let car = harness.car("Toyota", "Corolla", 4_500_000, staff_id).await;
        harness.store.fail_table(Table::Cars);
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/cars/{}", car.id))
            .insert_header((AUTHORIZATION, bearer(&token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], 500);

        harness.store.restore_table(Table::Cars);
        assert!(harness.store.get_car(car.id).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn price_edit_does_not_change_status() {
        let harness = Harness::new().await;
        let (staff_id, token) = harness.user(Role::Staff).await;
        let car = harness.car("Toyota", "Camry", 7_500_000, staff_id).await;
        harness
            .store
            .set_car_status(car.id, CarStatus::Reserved)
            .await
            .unwrap();
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::put()
            .uri(&format!("/admin/cars/{}", car.id))
            .insert_header((AUTHORIZATION, bearer(&token)))
            .set_json(json!({ "make": "Toyota", "model": "Camry", "year": "2020", "price": "7200000" }))
            .to_request();
        let edited: Car = test::call_and_read_body_json(&app, req).await;
        assert_eq!(edited.price, 7_200_000);
        assert_eq!(edited.status, CarStatus::Reserved);

        let req = test::TestRequest::get().uri("/cars/featured").to_request();
        let featured: Vec<Car> = test::call_and_read_body_json(&app, req).await;
        assert!(featured.is_empty());
    }
}
