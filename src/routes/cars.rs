use actix_web::{get, web, HttpResponse};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::inventory;
use crate::models::Car;
use crate::state::AppState;
use crate::types::CatalogueQuery;

#[utoipa::path(
    tag = "catalogue",
    params(CatalogueQuery),
    responses((status = 200, description = "Available cars, newest first", body = Vec<Car>))
)]
#[get("/cars")]
async fn list_cars(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<CatalogueQuery>,
) -> Result<HttpResponse, AppError> {
    let cars = inventory::catalogue(app_state.store.as_ref(), &query).await?;
    Ok(HttpResponse::Ok().json(cars))
}

#[utoipa::path(
    tag = "catalogue",
    responses((status = 200, description = "Newest available cars", body = Vec<Car>))
)]
#[get("/cars/featured")]
async fn featured_cars(app_state: web::Data<Arc<AppState>>) -> Result<HttpResponse, AppError> {
    let cars = inventory::featured(app_state.store.as_ref()).await?;
    Ok(HttpResponse::Ok().json(cars))
}

#[utoipa::path(
    tag = "catalogue",
    params(("id" = Uuid, Path, description = "Car id")),
    responses(
        (status = 200, body = Car),
        (status = 404, description = "No such car")
    )
)]
#[get("/cars/{id}")]
async fn get_car(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let car = inventory::public_car(app_state.store.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(car))
}
